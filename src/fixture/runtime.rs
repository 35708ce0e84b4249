//! Container runtime seam used by [`Fixture`](super::Fixture).

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::image::{CreateImageOptions, ListImagesOptions};
use bollard::models::{HostConfig, PortBinding};
use futures_util::TryStreamExt;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::OnceCell;
use tracing::debug;

use super::FixtureSpec;
use crate::error::Error;

/// Container the fixture asks the runtime to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRequest {
    /// Image reference, `repository:tag`
    pub image: String,
    /// Fixed container name
    pub name: String,
    /// Port exposed by the container
    pub container_port: u16,
    /// Host port bound to `container_port` on all interfaces
    pub host_port: u16,
}

impl From<&FixtureSpec> for ContainerRequest {
    fn from(spec: &FixtureSpec) -> Self {
        Self {
            image: spec.image.clone(),
            name: spec.name.clone(),
            container_port: spec.container_port,
            host_port: spec.host_port,
        }
    }
}

/// Operations a fixture needs from a container runtime
///
/// `id` arguments accept either the id returned by
/// [`create_container`](ContainerRuntime::create_container) or the container
/// name.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Repository tags of every image present locally
    async fn list_image_tags(&self) -> Result<Vec<String>, Error>;

    /// Pull `reference`, returning once the pull completed
    async fn pull_image(&self, reference: &str) -> Result<(), Error>;

    /// Create a container, returning its id
    async fn create_container(&self, request: &ContainerRequest) -> Result<String, Error>;

    /// Start a created container
    async fn start_container(&self, id: &str) -> Result<(), Error>;

    /// Address of the container on its runtime network, if it has one
    async fn container_address(&self, id: &str) -> Result<Option<String>, Error>;

    /// Freeze every process in the container
    async fn pause_container(&self, id: &str) -> Result<(), Error>;

    /// Thaw a paused container
    async fn unpause_container(&self, id: &str) -> Result<(), Error>;

    /// Stop the container with the runtime's default grace period
    async fn stop_container(&self, id: &str) -> Result<(), Error>;

    /// Force-remove the container and its anonymous volumes
    async fn remove_container(&self, id: &str) -> Result<(), Error>;
}

/// [`ContainerRuntime`] backed by the local Docker daemon
///
/// The API version is negotiated with the daemon on first use, so daemons
/// older than the client's default API are still served.
pub struct DockerRuntime {
    docker: Docker,
    negotiated: OnceCell<Docker>,
}

impl fmt::Debug for DockerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerRuntime").finish_non_exhaustive()
    }
}

impl DockerRuntime {
    /// Connect using the platform defaults (`DOCKER_HOST`, unix socket or named pipe)
    pub fn connect() -> Result<Self, Error> {
        Ok(Self::with_client(Docker::connect_with_local_defaults()?))
    }

    /// Wrap an existing client
    pub fn with_client(docker: Docker) -> Self {
        Self {
            docker,
            negotiated: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Docker, Error> {
        let docker = self
            .negotiated
            .get_or_try_init(|| async {
                let docker = self.docker.clone().negotiate_version().await?;
                let version = docker.client_version();
                debug!(
                    major = version.major_version,
                    minor = version.minor_version,
                    "negotiated Docker API version"
                );
                Ok::<_, Error>(docker)
            })
            .await?;
        Ok(docker)
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_image_tags(&self) -> Result<Vec<String>, Error> {
        let options = ListImagesOptions::<String> {
            all: false,
            ..Default::default()
        };
        let images = self.client().await?.list_images(Some(options)).await?;

        Ok(images
            .into_iter()
            .flat_map(|image| image.repo_tags)
            .collect())
    }

    async fn pull_image(&self, reference: &str) -> Result<(), Error> {
        let options = CreateImageOptions {
            from_image: reference,
            ..Default::default()
        };
        let docker = self.client().await?;
        let mut progress = std::pin::pin!(docker.create_image(Some(options), None, None));

        while let Some(info) = progress.try_next().await? {
            if let Some(status) = info.status {
                debug!(
                    image = %reference,
                    progress = info.progress.as_deref().unwrap_or_default(),
                    "{}",
                    status
                );
            }
        }
        Ok(())
    }

    async fn create_container(&self, request: &ContainerRequest) -> Result<String, Error> {
        let port = format!("{}/tcp", request.container_port);
        let binding = PortBinding {
            host_ip: Some("0.0.0.0".to_string()),
            host_port: Some(request.host_port.to_string()),
        };

        let config = Config {
            image: Some(request.image.clone()),
            exposed_ports: Some(HashMap::from([(port.clone(), HashMap::new())])),
            host_config: Some(HostConfig {
                port_bindings: Some(HashMap::from([(port, Some(vec![binding]))])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: request.name.clone(),
            platform: None,
        };

        let response = self.client().await?.create_container(Some(options), config).await?;
        for warning in &response.warnings {
            debug!(container = %request.name, "{}", warning);
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), Error> {
        self.client()
            .await?
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn container_address(&self, id: &str) -> Result<Option<String>, Error> {
        let details = self
            .client()
            .await?
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;

        Ok(details
            .network_settings
            .and_then(|settings| settings.ip_address)
            .filter(|ip| !ip.is_empty()))
    }

    async fn pause_container(&self, id: &str) -> Result<(), Error> {
        self.client().await?.pause_container(id).await?;
        Ok(())
    }

    async fn unpause_container(&self, id: &str) -> Result<(), Error> {
        self.client().await?.unpause_container(id).await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), Error> {
        self.client()
            .await?
            .stop_container(id, None::<StopContainerOptions>)
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), Error> {
        let options = RemoveContainerOptions {
            v: true,
            force: true,
            ..Default::default()
        };
        self.client().await?.remove_container(id, Some(options)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::mock::HttpStub;
    use bollard::API_DEFAULT_VERSION;

    #[test]
    fn test_request_from_spec() {
        let spec = FixtureSpec::new("mongo:latest", "mongolocal", 27017, |a| format!("mongodb://{a}/"))
            .with_host_port(37017);
        let request = ContainerRequest::from(&spec);

        assert_eq!(request.image, "mongo:latest");
        assert_eq!(request.name, "mongolocal");
        assert_eq!(request.container_port, 27017);
        assert_eq!(request.host_port, 37017);
    }

    #[tokio::test]
    async fn test_api_version_negotiated_before_first_call() {
        let daemon = HttpStub::serve(
            "application/json",
            &[r#"{"Version":"20.10.24","ApiVersion":"1.41"}"#, "[]"],
        )
        .await;
        let docker = Docker::connect_with_http(&daemon.url, 5, API_DEFAULT_VERSION).unwrap();
        let runtime = DockerRuntime::with_client(docker);

        assert!(runtime.list_image_tags().await.unwrap().is_empty());
        assert!(runtime.list_image_tags().await.unwrap().is_empty());

        let paths: Vec<String> = daemon.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("/version"), "{paths:?}");
        assert!(paths[1].starts_with("/v1.41/images/json"), "{paths:?}");
        assert!(paths[2].starts_with("/v1.41/images/json"), "{paths:?}");
    }

    #[tokio::test]
    async fn test_unanswered_negotiation_is_docker_error() {
        let daemon = HttpStub::serve("application/json", &[r#"{"Version":"20.10.24"}"#]).await;
        let docker = Docker::connect_with_http(&daemon.url, 5, API_DEFAULT_VERSION).unwrap();
        let runtime = DockerRuntime::with_client(docker);

        let err = runtime.list_image_tags().await.unwrap_err();
        assert!(matches!(err, Error::Docker(_)), "{err}");
        assert!(daemon.requests().iter().all(|r| r.body.is_empty()));
    }
}

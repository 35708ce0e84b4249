//! Disposable database containers for tests.
//!
//! A [`Fixture`] owns one container from creation to removal:
//!
//! ```text
//! Unstarted --start--> Running --pause--> Paused
//!                         ^                  |
//!                         +-----resume-------+
//! any --shutdown--> Removed
//! ```
//!
//! Provisioning errors are returned from [`Fixture::start`]. Pause, resume
//! and shutdown never fail; runtime errors are logged, since a fixture that
//! cannot be torn down must not fail the test that used it.
//!
//! ```rust,no_run
//! use lambda_utilities::fixture::DynamoFixture;
//!
//! # async fn example() -> Result<(), lambda_utilities::Error> {
//! let mut fixture = DynamoFixture::new()?;
//! fixture.start().await?;
//!
//! let client = fixture.connect().await?;
//! let tables = client.list_tables().send().await;
//!
//! fixture.shutdown().await;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

use crate::env::Environment;
use crate::error::Error;

mod dynamodb;
#[cfg(test)]
mod mock;
mod mongo;
pub mod runtime;

pub use dynamodb::{DYNAMODB_LOCAL_IMAGE, DYNAMODB_LOCAL_NAME, DYNAMODB_LOCAL_PORT, DynamoDbLocal, table_input};
pub use mongo::{MONGO_LOCAL_IMAGE, MONGO_LOCAL_NAME, MONGO_LOCAL_PORT, MongoLocal};
pub use runtime::{ContainerRequest, ContainerRuntime, DockerRuntime};

/// DynamoDB Local fixture
pub type DynamoFixture<R = DockerRuntime> = Fixture<DynamoDbLocal, R>;

/// MongoDB fixture
pub type MongoFixture<R = DockerRuntime> = Fixture<MongoLocal, R>;

/// Builds a connection URI from a resolved `host:port` address
pub type UriBuilder = fn(&str) -> String;

/// Static description of a fixture container
#[derive(Debug, Clone)]
pub struct FixtureSpec {
    /// Image reference, matched exactly against local repository tags
    pub image: String,
    /// Fixed container name
    pub name: String,
    /// Port the database listens on inside the container
    pub container_port: u16,
    /// Host port bound to `container_port`
    pub host_port: u16,
    /// Connection URI for a resolved address
    pub uri: UriBuilder,
}

impl FixtureSpec {
    /// Spec binding `port` to the same host port
    pub fn new(image: impl Into<String>, name: impl Into<String>, port: u16, uri: UriBuilder) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            container_port: port,
            host_port: port,
            uri,
        }
    }

    /// Bind the container port to another host port
    pub fn with_host_port(mut self, host_port: u16) -> Self {
        self.host_port = host_port;
        self
    }

    /// Use another container name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Use another image reference
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Address the database is reachable on
    ///
    /// Inside CI the host is the container's own network address and the
    /// container port applies; elsewhere the published port on `localhost`.
    pub fn address(&self, ci: bool, container_ip: Option<&str>) -> Result<String, Error> {
        if !ci {
            return Ok(format!("localhost:{}", self.host_port));
        }

        match container_ip.filter(|ip| !ip.is_empty()) {
            Some(ip) => Ok(format!("{}:{}", ip, self.container_port)),
            None => Err(Error::EndpointUnresolved {
                container: self.name.clone(),
            }),
        }
    }
}

/// Lifecycle position of a fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureStatus {
    /// Constructed, no container yet
    Unstarted,
    /// Container running and endpoint resolved
    Running,
    /// Container frozen
    Paused,
    /// Container stopped and removed, terminal
    Removed,
}

impl fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FixtureStatus::Unstarted => "unstarted",
            FixtureStatus::Running => "running",
            FixtureStatus::Paused => "paused",
            FixtureStatus::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// Mutable part of a fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureState {
    /// Lifecycle position
    pub status: FixtureStatus,
    /// Runtime id of the container once created
    pub container_id: Option<String>,
    /// Connection URI, set while the container is running or paused
    pub endpoint: Option<String>,
}

impl Default for FixtureState {
    fn default() -> Self {
        Self {
            status: FixtureStatus::Unstarted,
            container_id: None,
            endpoint: None,
        }
    }
}

/// Database flavor served by a fixture
#[async_trait]
pub trait Flavor: Send + Sync + 'static {
    /// Connected client handed to tests
    type Client: Send;

    /// Default container description
    fn spec() -> FixtureSpec;

    /// Build a client for `endpoint` and check that the database answers
    async fn connect(endpoint: &str) -> Result<Self::Client, Error>;
}

/// A disposable database container
pub struct Fixture<F: Flavor, R: ContainerRuntime = DockerRuntime> {
    spec: FixtureSpec,
    runtime: R,
    ci: bool,
    state: FixtureState,
    flavor: PhantomData<fn() -> F>,
}

impl<F: Flavor, R: ContainerRuntime> fmt::Debug for Fixture<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture")
            .field("spec", &self.spec)
            .field("ci", &self.ci)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<F: Flavor> Fixture<F, DockerRuntime> {
    /// Fixture with the flavor defaults, the local Docker daemon and the
    /// process environment
    pub fn new() -> Result<Self, Error> {
        Ok(Self::with_runtime(DockerRuntime::connect()?, &Environment::from_env()))
    }
}

impl<F: Flavor, R: ContainerRuntime> Fixture<F, R> {
    /// Fixture with the flavor defaults on `runtime`
    pub fn with_runtime(runtime: R, env: &Environment) -> Self {
        Self::with_spec(F::spec(), runtime, env)
    }

    /// Fixture with a custom container description
    pub fn with_spec(spec: FixtureSpec, runtime: R, env: &Environment) -> Self {
        Self {
            spec,
            runtime,
            ci: env.ci,
            state: FixtureState::default(),
            flavor: PhantomData,
        }
    }

    /// Container description
    pub fn spec(&self) -> &FixtureSpec {
        &self.spec
    }

    /// Container runtime
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Current lifecycle position
    pub fn status(&self) -> FixtureStatus {
        self.state.status
    }

    /// Current state
    pub fn state(&self) -> &FixtureState {
        &self.state
    }

    /// Connection URI, once started
    pub fn endpoint(&self) -> Option<&str> {
        self.state.endpoint.as_deref()
    }

    /// Provision the container and resolve its endpoint
    ///
    /// Pulls the image when no local tag matches it exactly. A container
    /// created by this call is stopped and removed again if a later step
    /// fails, leaving the fixture `Unstarted`.
    pub async fn start(&mut self) -> Result<(), Error> {
        if self.state.status != FixtureStatus::Unstarted {
            return Err(Error::InvalidState {
                operation: "start",
                status: self.state.status,
            });
        }

        self.ensure_image().await?;

        let request = ContainerRequest::from(&self.spec);
        let id = self.runtime.create_container(&request).await?;
        info!(container = %self.spec.name, id = %id, "container created");

        let endpoint = match self.launch(&id).await {
            Ok(endpoint) => endpoint,
            Err(err) => {
                warn!(container = %self.spec.name, error = %err, "container failed to start, removing it");
                self.discard(&id).await;
                return Err(err);
            }
        };

        info!(container = %self.spec.name, endpoint = %endpoint, "fixture running");
        self.state = FixtureState {
            status: FixtureStatus::Running,
            container_id: Some(id),
            endpoint: Some(endpoint),
        };
        Ok(())
    }

    /// Connected client for the fixture's database
    ///
    /// Fails with a probe error when the database does not answer, for
    /// instance while the fixture is paused.
    pub async fn connect(&self) -> Result<F::Client, Error> {
        let endpoint = self.require_endpoint("connect to")?;
        F::connect(endpoint).await
    }

    /// Freeze the container
    pub async fn pause(&mut self) {
        if self.state.status != FixtureStatus::Running {
            warn!(container = %self.spec.name, status = %self.state.status, "container no active, pause skipped");
            return;
        }

        let paused = self.runtime.pause_container(self.target()).await;
        match paused {
            Ok(()) => {
                info!(container = %self.spec.name, "container paused");
                self.state.status = FixtureStatus::Paused;
            }
            Err(err) => warn!(container = %self.spec.name, error = %err, "container no active"),
        }
    }

    /// Thaw a paused container
    pub async fn resume(&mut self) {
        if self.state.status != FixtureStatus::Paused {
            warn!(container = %self.spec.name, status = %self.state.status, "container not paused, resume skipped");
            return;
        }

        let resumed = self.runtime.unpause_container(self.target()).await;
        match resumed {
            Ok(()) => {
                info!(container = %self.spec.name, "container resumed");
                self.state.status = FixtureStatus::Running;
            }
            Err(err) => warn!(container = %self.spec.name, error = %err, "container no active"),
        }
    }

    /// Stop and remove the container
    ///
    /// Removal goes by container name, so a container left behind by an
    /// earlier run is cleaned up as well. The fixture ends `Removed` whatever
    /// the runtime answers.
    pub async fn shutdown(&mut self) {
        if self.state.status == FixtureStatus::Removed {
            debug!(container = %self.spec.name, "fixture already shut down");
            return;
        }

        let name = self.spec.name.clone();
        if self.state.status == FixtureStatus::Paused {
            if let Err(err) = self.runtime.unpause_container(&name).await {
                warn!(container = %name, error = %err, "unable to unpause container before stop");
            }
        }
        self.discard(&name).await;

        self.state = FixtureState {
            status: FixtureStatus::Removed,
            container_id: None,
            endpoint: None,
        };
        info!(container = %name, "fixture shut down");
    }

    pub(crate) fn require_endpoint(&self, operation: &'static str) -> Result<&str, Error> {
        match (self.state.status, self.state.endpoint.as_deref()) {
            (FixtureStatus::Running | FixtureStatus::Paused, Some(endpoint)) => Ok(endpoint),
            (status, _) => Err(Error::InvalidState { operation, status }),
        }
    }

    fn target(&self) -> &str {
        self.state.container_id.as_deref().unwrap_or(&self.spec.name)
    }

    async fn ensure_image(&self) -> Result<(), Error> {
        let tags = self.runtime.list_image_tags().await?;
        if tags.iter().any(|tag| *tag == self.spec.image) {
            debug!(image = %self.spec.image, "image present");
            return Ok(());
        }

        info!(image = %self.spec.image, "pulling image");
        self.runtime.pull_image(&self.spec.image).await
    }

    async fn launch(&self, id: &str) -> Result<String, Error> {
        self.runtime.start_container(id).await?;

        let container_ip = if self.ci {
            self.runtime.container_address(id).await?
        } else {
            None
        };
        let address = self.spec.address(self.ci, container_ip.as_deref())?;
        Ok((self.spec.uri)(&address))
    }

    async fn discard(&self, id: &str) {
        if let Err(err) = self.runtime.stop_container(id).await {
            warn!(container = %self.spec.name, error = %err, "unable to stop container");
        }
        if let Err(err) = self.runtime.remove_container(id).await {
            warn!(container = %self.spec.name, error = %err, "unable to remove container");
        }
    }
}

impl<F: Flavor, R: ContainerRuntime> Drop for Fixture<F, R> {
    fn drop(&mut self) {
        if matches!(self.state.status, FixtureStatus::Running | FixtureStatus::Paused) {
            warn!(container = %self.spec.name, "fixture dropped without shutdown, container left running");
        }
    }
}

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use super::runtime::{ContainerRequest, ContainerRuntime};
use crate::error::Error;

/// In-memory runtime recording every call
#[derive(Debug, Default)]
pub(crate) struct MockRuntime {
    images: Vec<String>,
    address: Option<String>,
    failing: HashSet<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl MockRuntime {
    pub(crate) fn with_images(images: &[&str]) -> Self {
        Self {
            images: images.iter().map(|i| i.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn address(mut self, ip: &str) -> Self {
        self.address = Some(ip.to_string());
        self
    }

    pub(crate) fn failing(mut self, operation: &'static str) -> Self {
        let _ = self.failing.insert(operation);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn called(&self, prefix: &str) -> bool {
        self.count(prefix) > 0
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, operation: &'static str, call: String) -> Result<(), Error> {
        self.calls.lock().unwrap().push(call);
        if self.failing.contains(operation) {
            return Err(Error::Docker(bollard::errors::Error::DockerResponseServerError {
                status_code: 409,
                message: format!("{operation} refused"),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn list_image_tags(&self) -> Result<Vec<String>, Error> {
        self.record("list_images", "list_images".to_string())?;
        Ok(self.images.clone())
    }

    async fn pull_image(&self, reference: &str) -> Result<(), Error> {
        self.record("pull", format!("pull {reference}"))
    }

    async fn create_container(&self, request: &ContainerRequest) -> Result<String, Error> {
        self.record(
            "create",
            format!(
                "create {} {} {}->{}",
                request.name, request.image, request.container_port, request.host_port
            ),
        )?;
        Ok(format!("mock-{}", request.name))
    }

    async fn start_container(&self, id: &str) -> Result<(), Error> {
        self.record("start", format!("start {id}"))
    }

    async fn container_address(&self, id: &str) -> Result<Option<String>, Error> {
        self.record("inspect", format!("inspect {id}"))?;
        Ok(self.address.clone())
    }

    async fn pause_container(&self, id: &str) -> Result<(), Error> {
        self.record("pause", format!("pause {id}"))
    }

    async fn unpause_container(&self, id: &str) -> Result<(), Error> {
        self.record("unpause", format!("unpause {id}"))
    }

    async fn stop_container(&self, id: &str) -> Result<(), Error> {
        self.record("stop", format!("stop {id}"))
    }

    async fn remove_container(&self, id: &str) -> Result<(), Error> {
        self.record("remove", format!("remove {id}"))
    }
}

/// Request seen by an [`HttpStub`]
#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub(crate) path: String,
    pub(crate) body: String,
}

/// Local HTTP server answering every request with the next canned JSON body
///
/// The last body is repeated once the list runs out. Each connection serves
/// a single request and is closed.
#[derive(Debug)]
pub(crate) struct HttpStub {
    pub(crate) url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    server: JoinHandle<()>,
}

impl HttpStub {
    pub(crate) async fn serve(content_type: &'static str, bodies: &[&'static str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        let bodies = bodies.to_vec();
        let server = tokio::spawn(async move {
            let mut served = 0;
            while let Ok((mut stream, _)) = listener.accept().await {
                let Ok(request) = read_request(&mut stream).await else {
                    continue;
                };
                seen.lock().unwrap().push(request);

                let body = bodies[served.min(bodies.len() - 1)];
                served += 1;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            url,
            requests,
            server,
        }
    }

    pub(crate) fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for HttpStub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let end = buf.len().min(head_end + length);
    Ok(CapturedRequest {
        path: head.split_whitespace().nth(1).unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[head_end..end]).into_owned(),
    })
}

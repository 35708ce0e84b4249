/// Test helpers for the integration tests
///
/// The fixture tests need a Docker daemon and are ignored by default:
/// `cargo test -- --ignored` runs them.
pub mod fixtures;

pub use lambda_utilities::fixture::{self, DynamoFixture, FixtureStatus, MongoFixture};
pub use serde::{Deserialize, Serialize};

pub use fixtures::TestObject;

use bollard::errors::Error as DockerError;
use lambda_utilities::Error;
use lambda_utilities::fixture::{ContainerRuntime, DockerRuntime};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber honouring `RUST_LOG` (idempotent)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Generate a unique test prefix for isolation
///
/// Returns a timestamp-based prefix to avoid test data conflicts
#[allow(dead_code)]
pub fn unique_test_prefix(name: &str) -> String {
    format!(
        "{}_{}_",
        name,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    )
}

/// Whether the daemon still knows a container called `name`
///
/// Only a 404 from the daemon means absent; any other failure panics.
#[allow(dead_code)]
pub async fn container_exists(name: &str) -> bool {
    let runtime = DockerRuntime::connect().unwrap();
    match runtime.container_address(name).await {
        Ok(_) => true,
        Err(err) => {
            assert!(is_not_found(&err), "cannot inspect container {name}: {err}");
            false
        }
    }
}

/// Whether `err` is the daemon answering 404
#[allow(dead_code)]
pub fn is_not_found(err: &Error) -> bool {
    matches!(
        err.root(),
        Error::Docker(DockerError::DockerResponseServerError {
            status_code: 404,
            ..
        })
    )
}

/// Start a DynamoDB Local fixture from the process environment
#[allow(dead_code)]
pub async fn start_dynamo() -> DynamoFixture {
    init_tracing();
    let mut fixture = DynamoFixture::new().unwrap();
    fixture.start().await.unwrap();
    fixture
}

/// Start a MongoDB fixture from the process environment
#[allow(dead_code)]
pub async fn start_mongo() -> MongoFixture {
    init_tracing();
    let mut fixture = MongoFixture::new().unwrap();
    fixture.start().await.unwrap();
    fixture
}

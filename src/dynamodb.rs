use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::Credentials;
use aws_types::sdk_config::{RetryConfig, TimeoutConfig};
use std::time::Duration;
use tracing::{debug, info};

use crate::env::{DEFAULT_REGION, Environment};
use crate::error::{ConnectionError, Error};
use crate::timeout::{DEFAULT_TIMEOUT, with_timeout};

/// Production client
///
/// A `local` stage connects to the developer endpoint in `DB_URI` with
/// placeholder credentials. Any other stage resolves region and credentials
/// from the environment with adaptive retries (3 attempts, 1s initial
/// backoff) and connect/read/operation timeouts of 3/20/60 seconds.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example() -> Result<(), lambda_utilities::Error> {
/// use lambda_utilities::env::Environment;
///
/// let client = lambda_utilities::dynamodb::new_client(&Environment::from_env()).await?;
/// let tables = client.list_tables().send().await;
/// # Ok(())
/// # }
/// ```
pub async fn new_client(env: &Environment) -> Result<Client, Error> {
    with_timeout(DEFAULT_TIMEOUT, async {
        if env.is_local() {
            let endpoint = env.db_uri.as_deref().ok_or_else(|| {
                ConnectionError::config_invalid("DB_URI must point at DynamoDB when ENV is local")
            })?;
            return local_client(endpoint).await;
        }

        info!(region = %env.region, "loading AWS configuration");
        let config = aws_config_defaults(&env.region).await;
        Ok::<_, Error>(Client::new(&config))
    })
    .await
}

/// Client for a DynamoDB Local endpoint
///
/// Credentials are hard-coded; DynamoDB Local accepts any.
pub async fn local_client(endpoint: &str) -> Result<Client, Error> {
    if !endpoint.contains("://") {
        return Err(ConnectionError::config_invalid(format!(
            "DynamoDB endpoint {endpoint:?} is not a URL"
        ))
        .into());
    }

    debug!(endpoint = %endpoint, "connecting to local DynamoDB");
    let credentials = Credentials::new(
        "dummy",
        "dummy",
        Some("dummy".to_string()),
        None,
        "Hard-coded credentials; values are irrelevant for local DynamoDB",
    );

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(DEFAULT_REGION))
        .endpoint_url(endpoint)
        .credentials_provider(credentials)
        .load()
        .await;

    Ok(Client::new(&config))
}

/// Liveness probe: a one-table `ListTables`
pub async fn probe(client: &Client, endpoint: &str, timeout: Duration) -> Result<(), Error> {
    let answer = with_timeout(timeout, async {
        let _ = client.list_tables().limit(1).send().await?;
        Ok::<_, Error>(())
    })
    .await;

    answer.map_err(|e| {
        ConnectionError::probe_failed(format!("DynamoDB at {endpoint} did not answer"))
            .with_source(e)
            .into()
    })
}

async fn aws_config_defaults(region: &str) -> SdkConfig {
    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(3))
        .read_timeout(Duration::from_secs(20))
        .operation_timeout(Duration::from_secs(60))
        .build();

    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .retry_config(
            RetryConfig::adaptive()
                .with_max_attempts(3)
                .with_initial_backoff(Duration::from_secs(1)),
        )
        .timeout_config(timeout_config)
        .load()
        .await
}

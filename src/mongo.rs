use mongodb::Client;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use std::time::Duration;
use tracing::{info, warn};

use crate::env::Environment;
use crate::error::{ConnectionError, Error};
use crate::timeout::{DEFAULT_TIMEOUT, with_timeout};

/// Production client for the URI in `DB_URI`
///
/// The client has answered a `ping` on the primary before it is returned.
pub async fn new_conn(env: &Environment) -> Result<Client, Error> {
    let uri = env
        .db_uri
        .as_deref()
        .ok_or_else(|| ConnectionError::config_invalid("DB_URI is not set"))?;
    connect(uri, DEFAULT_TIMEOUT).await
}

/// Connect to `uri` and ping the primary, each step bounded by `timeout`
///
/// A client whose ping fails is shut down before the error is returned.
pub async fn connect(uri: &str, timeout: Duration) -> Result<Client, Error> {
    let client = with_timeout(timeout, async {
        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            ConnectionError::config_invalid("invalid MongoDB connection string").with_source(e)
        })?;
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(|e| {
            ConnectionError::config_invalid("invalid MongoDB client options").with_source(e)
        })?;
        Ok::<_, Error>(client)
    })
    .await?;

    info!("doing ping to db");
    let ping = with_timeout(timeout, async {
        let _ = client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .selection_criteria(SelectionCriteria::ReadPreference(ReadPreference::Primary))
            .await?;
        Ok::<_, Error>(())
    })
    .await;

    if let Err(err) = ping {
        warn!(error = %err, "ping to db failed, disconnecting");
        client.shutdown().await;
        return Err(ConnectionError::probe_failed("MongoDB did not answer ping")
            .with_source(err)
            .into());
    }

    Ok(client)
}

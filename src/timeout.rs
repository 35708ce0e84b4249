use std::future::Future;
use std::time::Duration;

use crate::error::Error;

/// Timeout for production connection bootstrapping
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for each fixture client operation
pub const FIXTURE_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `future` with a deadline
///
/// Expiry drops the future and returns [`Error::Timeout`].
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(duration)),
    }
}

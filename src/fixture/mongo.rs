use async_trait::async_trait;
use mongodb::Client;

use super::{FixtureSpec, Flavor};
use crate::error::Error;
use crate::timeout::FIXTURE_TIMEOUT;

/// MongoDB image
pub const MONGO_LOCAL_IMAGE: &str = "mongo:latest";
/// MongoDB container name
pub const MONGO_LOCAL_NAME: &str = "mongolocal";
/// MongoDB port
pub const MONGO_LOCAL_PORT: u16 = 27017;

/// MongoDB flavor, the client is a pinged [`mongodb::Client`]
#[derive(Debug, Clone, Copy)]
pub struct MongoLocal;

#[async_trait]
impl Flavor for MongoLocal {
    type Client = Client;

    fn spec() -> FixtureSpec {
        FixtureSpec::new(
            MONGO_LOCAL_IMAGE,
            MONGO_LOCAL_NAME,
            MONGO_LOCAL_PORT,
            |address| format!("mongodb://{address}/"),
        )
    }

    async fn connect(endpoint: &str) -> Result<Client, Error> {
        crate::mongo::connect(endpoint, FIXTURE_TIMEOUT).await
    }
}

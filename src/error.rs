use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::list_tables::ListTablesError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use bollard::errors::Error as DockerError;
use mongodb::error::Error as MongoError;
use serde_dynamo::Error as SerdeDynamoError;
use serde_json::Error as JsonError;
use std::error::Error as StdError;
use std::fmt;
use std::num::ParseIntError;
use std::time::Duration;

use crate::fixture::FixtureStatus;

type DynamoPutError = SdkError<PutItemError, Response>;
type DynamoDeleteItemError = SdkError<DeleteItemError, Response>;
type DynamoCreateTableError = SdkError<CreateTableError, Response>;
type DynamoListTablesError = SdkError<ListTablesError, Response>;

/// Crate error
#[derive(Debug)]
pub enum Error {
    /// Attribute-value serialization/deserialization error
    SerdeDynamo(SerdeDynamoError),
    /// JSON serialization/deserialization error
    Json(JsonError),
    /// Integer parsing error
    ParseInt(ParseIntError),
    /// DynamoDB request builder error
    BuildError(BuildError),
    /// DynamoDB PutItem operation error
    DynamoPutError(DynamoPutError),
    /// DynamoDB DeleteItem operation error
    DynamoDeleteItemError(DynamoDeleteItemError),
    /// DynamoDB CreateTable operation error
    DynamoCreateTableError(DynamoCreateTableError),
    /// DynamoDB ListTables operation error
    DynamoListTablesError(DynamoListTablesError),
    /// MongoDB driver error
    Mongo(MongoError),
    /// Container runtime error
    Docker(DockerError),
    /// Database could not be configured or reached
    Connection(ConnectionError),
    /// A fixture operation was called in a state that does not allow it
    InvalidState {
        /// Operation that was attempted
        operation: &'static str,
        /// Status of the fixture at the time of the call
        status: FixtureStatus,
    },
    /// The runtime reported no internal network address for a container
    EndpointUnresolved {
        /// Container name
        container: String,
    },
    /// A timeout scope expired
    Timeout(Duration),
    /// An error annotated with the operation that produced it
    Context {
        /// Human readable operation description
        context: String,
        /// Underlying error
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap the error with a description of the failed operation
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through [`Error::Context`] wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if the error is a connection error of any kind
    pub fn is_connection_error(&self) -> bool {
        matches!(self.root(), Error::Connection(_))
    }

    /// Check if the error is a failed liveness probe
    ///
    /// Callers that used to terminate the process on an unreachable database
    /// can match on this instead.
    pub fn is_probe_failure(&self) -> bool {
        matches!(self.root(), Error::Connection(e) if e.kind() == ConnectionErrorKind::ProbeFailed)
    }

    /// Check if the error is a fixture state-machine violation
    pub fn is_invalid_state(&self) -> bool {
        matches!(self.root(), Error::InvalidState { .. })
    }

    /// Check if the error is a serialization/deserialization error
    ///
    /// Returns `true` for attribute-value, JSON and integer parsing errors.
    pub fn is_serialization_error(&self) -> bool {
        matches!(
            self.root(),
            Error::SerdeDynamo(_) | Error::Json(_) | Error::ParseInt(_)
        )
    }

    /// Check if the error is a DynamoDB SDK error
    pub fn is_dynamodb_error(&self) -> bool {
        matches!(
            self.root(),
            Error::BuildError(_)
                | Error::DynamoPutError(_)
                | Error::DynamoDeleteItemError(_)
                | Error::DynamoCreateTableError(_)
                | Error::DynamoListTablesError(_)
        )
    }

    /// Check if a timeout scope expired
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Error::Timeout(_))
    }
}

/// Reason a database connection could not be established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// The connection settings are missing or malformed
    ConfigInvalid,
    /// A client was built but the liveness probe did not answer
    ProbeFailed,
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionErrorKind::ConfigInvalid => f.write_str("invalid connection configuration"),
            ConnectionErrorKind::ProbeFailed => f.write_str("database did not answer the liveness probe"),
        }
    }
}

/// Database connection failure
#[derive(Debug)]
pub struct ConnectionError {
    kind: ConnectionErrorKind,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ConnectionError {
    pub(crate) fn new(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub(crate) fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::ConfigInvalid, message)
    }

    pub(crate) fn probe_failed(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::ProbeFailed, message)
    }

    /// Failure kind
    pub fn kind(&self) -> ConnectionErrorKind {
        self.kind
    }

    /// Description of what was being attempted
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for ConnectionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let source: &(dyn StdError + 'static) = self.source.as_deref()?;
        Some(source)
    }
}

macro_rules! impl_from_error {
    ($name:ident, $variant:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$variant(e)
            }
        }
    };
    ($name:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$name(e)
            }
        }
    };
}

impl_from_error!(SerdeDynamoError, SerdeDynamo);
impl_from_error!(JsonError, Json);
impl_from_error!(ParseIntError, ParseInt);
impl_from_error!(MongoError, Mongo);
impl_from_error!(DockerError, Docker);
impl_from_error!(ConnectionError, Connection);
impl_from_error!(BuildError);
impl_from_error!(DynamoPutError);
impl_from_error!(DynamoDeleteItemError);
impl_from_error!(DynamoCreateTableError);
impl_from_error!(DynamoListTablesError);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerdeDynamo(e) => write!(f, "DynamoDB serialization error: {}", e),
            Error::Json(e) => write!(f, "JSON serialization error: {}", e),
            Error::ParseInt(e) => write!(f, "integer parsing error: {}", e),
            Error::BuildError(e) => write!(f, "DynamoDB request builder error: {}", e),
            Error::DynamoPutError(e) => {
                write!(f, "DynamoDB PutItem operation failed: {}", e)
            }
            Error::DynamoDeleteItemError(e) => {
                write!(f, "DynamoDB DeleteItem operation failed: {}", e)
            }
            Error::DynamoCreateTableError(e) => {
                write!(f, "DynamoDB CreateTable operation failed: {}", e)
            }
            Error::DynamoListTablesError(e) => {
                write!(f, "DynamoDB ListTables operation failed: {}", e)
            }
            Error::Mongo(e) => write!(f, "MongoDB driver error: {}", e),
            Error::Docker(e) => write!(f, "container runtime error: {}", e),
            Error::Connection(e) => write!(f, "connection unavailable: {}", e),
            Error::InvalidState { operation, status } => {
                write!(f, "cannot {} a fixture that is {}", operation, status)
            }
            Error::EndpointUnresolved { container } => {
                write!(f, "container {} has no internal network address", container)
            }
            Error::Timeout(d) => write!(f, "operation timed out after {:?}", d),
            Error::Context { context, source } => write!(f, "{}: {}", context, source),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::SerdeDynamo(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::ParseInt(e) => Some(e),
            Error::BuildError(e) => Some(e),
            Error::DynamoPutError(e) => Some(e),
            Error::DynamoDeleteItemError(e) => Some(e),
            Error::DynamoCreateTableError(e) => Some(e),
            Error::DynamoListTablesError(e) => Some(e),
            Error::Mongo(e) => Some(e),
            Error::Docker(e) => Some(e),
            Error::Connection(e) => Some(e),
            Error::Context { source, .. } => Some(source.as_ref()),
            Error::InvalidState { .. } | Error::EndpointUnresolved { .. } | Error::Timeout(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_serialization_error() {
        let err: Error = "value".parse::<i64>().unwrap_err().into();
        assert!(err.is_serialization_error());
        assert!(!err.is_dynamodb_error());
    }

    #[test]
    fn test_is_dynamodb_error() {
        let err = Error::BuildError(BuildError::other("test"));
        assert!(err.is_dynamodb_error());
        assert!(!err.is_serialization_error());
    }

    #[test]
    fn test_error_conversion() {
        let build_err = BuildError::other("test");
        let err: Error = build_err.into();
        assert!(matches!(err, Error::BuildError(_)));
    }

    #[test]
    fn test_context_keeps_predicates() {
        let err = Error::from(ConnectionError::probe_failed("ping to mongodb://localhost:27017/"))
            .context("connecting to fixture");
        assert!(err.is_connection_error());
        assert!(err.is_probe_failure());
        assert!(err.source().is_some());

        let msg = err.to_string();
        assert!(msg.starts_with("connecting to fixture: connection unavailable"));
        assert!(msg.contains("liveness probe"));
    }

    #[test]
    fn test_config_invalid_is_not_probe_failure() {
        let err: Error = ConnectionError::config_invalid("DB_URI is not set").into();
        assert!(err.is_connection_error());
        assert!(!err.is_probe_failure());
    }

    #[test]
    fn test_connection_error_source() {
        let parse = "x".parse::<i64>().unwrap_err();
        let err = ConnectionError::config_invalid("bad port").with_source(parse);
        assert!(err.source().is_some());
        assert_eq!(err.kind(), ConnectionErrorKind::ConfigInvalid);
        assert_eq!(err.message(), "bad port");
    }

    #[test]
    fn test_invalid_state_display() {
        let err = Error::InvalidState {
            operation: "start",
            status: FixtureStatus::Running,
        };
        assert!(err.is_invalid_state());
        assert_eq!(err.to_string(), "cannot start a fixture that is running");
    }

    #[test]
    fn test_timeout() {
        let err = Error::Timeout(Duration::from_secs(10));
        assert!(err.is_timeout());
        assert!(err.source().is_none());
    }
}

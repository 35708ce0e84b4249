//! # Lambda Utilities
//!
//! Helpers shared by services that talk to DynamoDB or MongoDB:
//! - Client constructors that switch between a local developer endpoint and
//!   the ambient cloud configuration
//! - Disposable Docker fixtures for both databases, with pause/resume to
//!   simulate outages
//! - Conversion helpers for JSON, base64 and DynamoDB attribute maps
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lambda_utilities::fixture::DynamoFixture;
//! use lambda_utilities::{Error, fixture};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct User {
//!     user_id: String,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let mut dynamo = DynamoFixture::new()?;
//!     dynamo.start().await?;
//!
//!     dynamo.create_table(fixture::table_input("users", "user_id", None)?).await?;
//!     let user = User {
//!         user_id: "123".to_string(),
//!         name: "John Doe".to_string(),
//!     };
//!     dynamo.put_item("users", &user).await?;
//!     dynamo.delete_item("users", "user_id", "123").await?;
//!
//!     dynamo.shutdown().await;
//!     Ok(())
//! }
//! ```
#![deny(
    warnings,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod error;
pub use error::{ConnectionError, ConnectionErrorKind, Error};

mod timeout;
pub use timeout::{DEFAULT_TIMEOUT, FIXTURE_TIMEOUT, with_timeout};

pub mod convert;

/// DynamoDB client construction
pub mod dynamodb;

pub mod env;

pub mod fixture;

/// MongoDB client construction
pub mod mongo;

pub use env::{Environment, get_env};
pub use fixture::{DynamoFixture, Fixture, FixtureSpec, FixtureStatus, MongoFixture};

// Re-export the driver clients handed out by this crate
pub use aws_sdk_dynamodb::Client as DynamoDbClient;
pub use mongodb::Client as MongoClient;

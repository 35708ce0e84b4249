//! Conversion helpers.
//!
//! Every helper comes in two forms. The `try_` form returns the error. The
//! plain form swallows it and returns an empty or default value, which suits
//! call sites that treat malformed input as absent.

use aws_sdk_dynamodb::types::AttributeValue;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_dynamo::{from_item, from_items, to_item};
use std::collections::HashMap;
use tracing::warn;

use crate::error::Error;

/// DynamoDB item as sent over the wire
pub type Item = HashMap<String, AttributeValue>;

/// Serialize `value` to JSON text
pub fn try_to_string<T: Serialize + ?Sized>(value: &T) -> Result<String, Error> {
    Ok(serde_json::to_string(value)?)
}

/// Serialize `value` to JSON text, empty string on failure
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> String {
    or_zero(try_to_string(value), "to_string")
}

/// Parse a decimal integer
pub fn try_string_to_int(value: &str) -> Result<i64, Error> {
    Ok(value.parse::<i64>()?)
}

/// Parse a decimal integer, `0` on failure
pub fn string_to_int(value: &str) -> i64 {
    or_zero(try_string_to_int(value), "string_to_int")
}

/// Standard base64 (padded) encoding of `s`
pub fn encode_str(s: &str) -> String {
    STANDARD.encode(s.as_bytes())
}

/// Marshal `value` into a DynamoDB attribute map
pub fn try_to_dynamodb_map<T: Serialize>(value: &T) -> Result<Item, Error> {
    Ok(to_item(value)?)
}

/// Marshal `value` into a DynamoDB attribute map, empty map on failure
pub fn to_dynamodb_map<T: Serialize>(value: &T) -> Item {
    or_zero(try_to_dynamodb_map(value), "to_dynamodb_map")
}

/// Unmarshal a DynamoDB attribute map
pub fn try_dynamo_map_to<T: DeserializeOwned>(item: Item) -> Result<T, Error> {
    Ok(from_item(item)?)
}

/// Unmarshal a DynamoDB attribute map, `T::default()` on failure
pub fn dynamo_map_to<T: DeserializeOwned + Default>(item: Item) -> T {
    or_zero(try_dynamo_map_to(item), "dynamo_map_to")
}

/// Unmarshal a list of DynamoDB attribute maps
pub fn try_dynamo_list_to<T: DeserializeOwned>(items: Vec<Item>) -> Result<Vec<T>, Error> {
    Ok(from_items(items)?)
}

/// Unmarshal a list of DynamoDB attribute maps, empty on failure
pub fn dynamo_list_to<T: DeserializeOwned>(items: Vec<Item>) -> Vec<T> {
    or_zero(try_dynamo_list_to(items), "dynamo_list_to")
}

/// Copy `source` into a value of another type through its JSON form
///
/// Fields are matched by their serialized names.
pub fn try_copy_struct<S, T>(source: &S) -> Result<T, Error>
where
    S: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let value = serde_json::to_value(source)?;
    Ok(serde_json::from_value(value)?)
}

/// Copy `source` into a value of another type, `T::default()` on failure
pub fn copy_struct<S, T>(source: &S) -> T
where
    S: Serialize + ?Sized,
    T: DeserializeOwned + Default,
{
    or_zero(try_copy_struct(source), "copy_struct")
}

/// Parse JSON text into `T`
pub fn try_string_to_struct<T: DeserializeOwned>(s: &str) -> Result<T, Error> {
    Ok(serde_json::from_str(s)?)
}

/// Parse JSON text into `T`, `T::default()` on failure
pub fn string_to_struct<T: DeserializeOwned + Default>(s: &str) -> T {
    or_zero(try_string_to_struct(s), "string_to_struct")
}

fn or_zero<T: Default>(result: Result<T, Error>, helper: &'static str) -> T {
    result.unwrap_or_else(|err| {
        warn!(helper = helper, error = %err, "conversion failed, using the zero value");
        T::default()
    })
}

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::create_table::CreateTableInput;
use aws_sdk_dynamodb::operation::create_table::builders::CreateTableFluentBuilder;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType,
};
use serde::Serialize;
use tracing::debug;

use super::{ContainerRuntime, Fixture, FixtureSpec, Flavor};
use crate::convert::try_to_dynamodb_map;
use crate::error::Error;
use crate::timeout::{FIXTURE_TIMEOUT, with_timeout};

/// DynamoDB Local image
pub const DYNAMODB_LOCAL_IMAGE: &str = "amazon/dynamodb-local:latest";
/// DynamoDB Local container name
pub const DYNAMODB_LOCAL_NAME: &str = "dynamodblocal";
/// DynamoDB Local port
pub const DYNAMODB_LOCAL_PORT: u16 = 8000;

/// DynamoDB Local flavor, the client is an [`aws_sdk_dynamodb::Client`]
#[derive(Debug, Clone, Copy)]
pub struct DynamoDbLocal;

#[async_trait]
impl Flavor for DynamoDbLocal {
    type Client = Client;

    fn spec() -> FixtureSpec {
        FixtureSpec::new(
            DYNAMODB_LOCAL_IMAGE,
            DYNAMODB_LOCAL_NAME,
            DYNAMODB_LOCAL_PORT,
            |address| format!("http://{address}"),
        )
    }

    async fn connect(endpoint: &str) -> Result<Client, Error> {
        let client = with_timeout(FIXTURE_TIMEOUT, crate::dynamodb::local_client(endpoint)).await?;
        crate::dynamodb::probe(&client, endpoint, FIXTURE_TIMEOUT).await?;
        Ok(client)
    }
}

impl<R: ContainerRuntime> Fixture<DynamoDbLocal, R> {
    /// Client for the running container, without a liveness probe
    pub async fn client(&self) -> Result<Client, Error> {
        let endpoint = self.require_endpoint("open a client on")?;
        crate::dynamodb::local_client(endpoint).await
    }

    /// Create a table, forwarding every field of `input`
    pub async fn create_table(&self, input: CreateTableInput) -> Result<(), Error> {
        let table = input.table_name.clone().unwrap_or_default();

        self.send_create_table(&table, |request| {
            request
                .set_table_name(input.table_name)
                .set_attribute_definitions(input.attribute_definitions)
                .set_key_schema(input.key_schema)
                .set_local_secondary_indexes(input.local_secondary_indexes)
                .set_global_secondary_indexes(input.global_secondary_indexes)
                .set_billing_mode(input.billing_mode)
                .set_provisioned_throughput(input.provisioned_throughput)
                .set_stream_specification(input.stream_specification)
                .set_sse_specification(input.sse_specification)
                .set_tags(input.tags)
                .set_table_class(input.table_class)
                .set_deletion_protection_enabled(input.deletion_protection_enabled)
                .set_warm_throughput(input.warm_throughput)
                .set_resource_policy(input.resource_policy)
                .set_on_demand_throughput(input.on_demand_throughput)
                .set_global_table_source_arn(input.global_table_source_arn)
                .set_global_table_settings_replication_mode(
                    input.global_table_settings_replication_mode,
                )
                .set_vector_indexes(input.vector_indexes)
        })
        .await
    }

    /// Create `table` with a request shaped by `build`
    ///
    /// The table name is set before `build` runs.
    ///
    /// ```rust,no_run
    /// # async fn example(dynamo: &lambda_utilities::DynamoFixture) -> Result<(), lambda_utilities::Error> {
    /// use aws_sdk_dynamodb::types::{
    ///     AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
    /// };
    ///
    /// dynamo
    ///     .create_table_with("events", |request| {
    ///         request
    ///             .billing_mode(BillingMode::PayPerRequest)
    ///             .attribute_definitions(
    ///                 AttributeDefinition::builder()
    ///                     .attribute_name("id")
    ///                     .attribute_type(ScalarAttributeType::S)
    ///                     .build()
    ///                     .unwrap(),
    ///             )
    ///             .key_schema(
    ///                 KeySchemaElement::builder()
    ///                     .attribute_name("id")
    ///                     .key_type(KeyType::Hash)
    ///                     .build()
    ///                     .unwrap(),
    ///             )
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_table_with<B>(&self, table: &str, build: B) -> Result<(), Error>
    where
        B: FnOnce(CreateTableFluentBuilder) -> CreateTableFluentBuilder + Send,
    {
        self.send_create_table(table, |request| build(request.table_name(table)))
            .await
    }

    async fn send_create_table<B>(&self, table: &str, build: B) -> Result<(), Error>
    where
        B: FnOnce(CreateTableFluentBuilder) -> CreateTableFluentBuilder + Send,
    {
        with_timeout(FIXTURE_TIMEOUT, async {
            let client = self.client().await?;
            let _ = build(client.create_table()).send().await?;
            debug!(table = %table, "table created");
            Ok::<_, Error>(())
        })
        .await
        .map_err(|e| e.context(format!("creating table {table}")))
    }

    /// Marshal `item` and put it into `table`
    pub async fn put_item<T: Serialize + Sync>(&self, table: &str, item: &T) -> Result<(), Error> {
        with_timeout(FIXTURE_TIMEOUT, async {
            let values = try_to_dynamodb_map(item)?;
            let client = self.client().await?;
            let _ = client
                .put_item()
                .table_name(table)
                .set_item(Some(values))
                .send()
                .await?;
            Ok::<_, Error>(())
        })
        .await
        .map_err(|e| e.context(format!("putting item into {table}")))
    }

    /// Delete the item whose string partition key `key` equals `value`
    pub async fn delete_item(&self, table: &str, key: &str, value: &str) -> Result<(), Error> {
        with_timeout(FIXTURE_TIMEOUT, async {
            let client = self.client().await?;
            let _ = client
                .delete_item()
                .table_name(table)
                .key(key, AttributeValue::S(value.to_string()))
                .send()
                .await?;
            Ok::<_, Error>(())
        })
        .await
        .map_err(|e| e.context(format!("deleting item {key}={value} from {table}")))
    }
}

/// `CreateTable` input with string keys and 10/10 provisioned throughput
pub fn table_input(
    table: &str,
    partition_key: &str,
    sort_key: Option<&str>,
) -> Result<CreateTableInput, Error> {
    let mut builder = CreateTableInput::builder()
        .table_name(table)
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(partition_key)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(partition_key)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .provisioned_throughput(
            ProvisionedThroughput::builder()
                .read_capacity_units(10)
                .write_capacity_units(10)
                .build()?,
        );

    if let Some(sort_key) = sort_key {
        builder = builder
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(sort_key)
                    .key_type(KeyType::Range)
                    .build()?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(sort_key)
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            );
    }

    Ok(builder.build()?)
}

use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::{AttributeValue, Select, TransactWriteItem};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, Instrument};

use crate::models::{RepositoryError, RepositoryResult};

pub type Item = HashMap<String, AttributeValue>;

/// DynamoDB caps a single TransactWriteItems call at 100 actions
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// One DynamoDB table plus the client used to reach it
#[derive(Clone)]
pub struct DynamoTable {
    client: Arc<DynamoDbClient>,
    name: String,
    region: String,
}

impl DynamoTable {
    pub fn new(client: Arc<DynamoDbClient>, name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
            region: region.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &DynamoDbClient {
        &self.client
    }

    /// Create a DynamoDB client span with X-Ray and OpenTelemetry attributes
    pub fn span(&self, operation: &str) -> tracing::Span {
        dynamodb_span(operation, &self.name, &self.region)
    }

    pub fn map_error(&self, error: DynamoDbError) -> RepositoryError {
        map_dynamodb_error(error, &self.name)
    }

    pub async fn get(&self, key: Item) -> RepositoryResult<Option<Item>> {
        let response = async {
            let result = self
                .client
                .get_item()
                .table_name(&self.name)
                .set_key(Some(key))
                .send()
                .await;

            match &result {
                Ok(output) => {
                    tracing::Span::current().record("http.status_code", 200);
                    if let Some(request_id) = output.request_id() {
                        tracing::Span::current().record("aws.request_id", request_id);
                    }
                }
                Err(e) => {
                    tracing::Span::current().record("http.status_code", 400);
                    error!("DynamoDB GetItem failed: {}", e);
                }
            }

            result.map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("GetItem"))
        .await?;

        Ok(response.item)
    }

    pub async fn put(&self, item: Item) -> RepositoryResult<()> {
        async {
            self.client
                .put_item()
                .table_name(&self.name)
                .set_item(Some(item))
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("PutItem"))
        .await?;
        Ok(())
    }

    pub async fn delete(&self, key: Item) -> RepositoryResult<()> {
        async {
            self.client
                .delete_item()
                .table_name(&self.name)
                .set_key(Some(key))
                .send()
                .await
                .map_err(|e| self.map_error(e.into()))
        }
        .instrument(self.span("DeleteItem"))
        .await?;
        Ok(())
    }

    /// Run a key-condition query, following pagination to the end
    pub async fn query(
        &self,
        index: Option<&str>,
        key_condition: &str,
        values: Item,
    ) -> RepositoryResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let response = async {
                self.client
                    .query()
                    .table_name(&self.name)
                    .set_index_name(index.map(str::to_string))
                    .key_condition_expression(key_condition)
                    .set_expression_attribute_values(Some(values.clone()))
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| self.map_error(e.into()))
            }
            .instrument(self.span("Query"))
            .await?;

            items.extend(response.items.unwrap_or_default());
            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    /// Count the items matching a key condition without reading them
    pub async fn count(
        &self,
        index: Option<&str>,
        key_condition: &str,
        values: Item,
    ) -> RepositoryResult<usize> {
        let mut total = 0usize;
        let mut start_key: Option<Item> = None;

        loop {
            let response = async {
                self.client
                    .query()
                    .table_name(&self.name)
                    .set_index_name(index.map(str::to_string))
                    .key_condition_expression(key_condition)
                    .set_expression_attribute_values(Some(values.clone()))
                    .select(Select::Count)
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| self.map_error(e.into()))
            }
            .instrument(self.span("Query"))
            .await?;

            total += response.count.max(0) as usize;
            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(total)
    }

    /// Full table scan, following pagination to the end
    pub async fn scan(&self) -> RepositoryResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let response = async {
                self.client
                    .scan()
                    .table_name(&self.name)
                    .select(Select::AllAttributes)
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(|e| self.map_error(e.into()))
            }
            .instrument(self.span("Scan"))
            .await?;

            items.extend(response.items.unwrap_or_default());
            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }
}

/// Commit a set of writes across tables all-or-nothing
pub async fn transact_write(
    client: &DynamoDbClient,
    region: &str,
    writes: Vec<TransactWriteItem>,
) -> RepositoryResult<()> {
    if writes.is_empty() {
        return Ok(());
    }
    if writes.len() > MAX_TRANSACTION_ITEMS {
        return Err(RepositoryError::TransactionFailed {
            message: format!(
                "{} writes exceed the limit of {} per transaction",
                writes.len(),
                MAX_TRANSACTION_ITEMS
            ),
        });
    }

    let count = writes.len();
    async {
        client
            .transact_write_items()
            .set_transact_items(Some(writes))
            .send()
            .await
            .map_err(|e| map_dynamodb_error(e.into(), "TransactWriteItems"))
    }
    .instrument(dynamodb_span("TransactWriteItems", "multiple", region))
    .await?;

    tracing::debug!(writes = count, "Transaction committed");
    Ok(())
}

fn dynamodb_span(operation: &str, table_name: &str, region: &str) -> tracing::Span {
    tracing::info_span!(
        "DynamoDB",
        // AWS X-Ray specific attributes
        "aws.service" = "DynamoDB",
        "aws.operation" = operation,
        "aws.region" = %region,
        "aws.dynamodb.table_name" = %table_name,
        "aws.request_id" = tracing::field::Empty,
        "aws.remote.service" = "AWS::DynamoDB",
        "aws.remote.operation" = operation,
        "aws.remote.resource.type" = "AWS::DynamoDB::Table",
        "aws.remote.resource.identifier" = %table_name,

        // OpenTelemetry semantic conventions
        "otel.kind" = "client",
        "otel.name" = format!("DynamoDB.{}", operation),
        "rpc.system" = "aws-api",
        "rpc.service" = "AmazonDynamoDBv2",
        "rpc.method" = operation,
        "http.status_code" = tracing::field::Empty,

        // Database semantic conventions
        "db.system" = "dynamodb",
        "db.name" = %table_name,
        "db.operation" = operation,
    )
}

fn map_dynamodb_error(error: DynamoDbError, table_name: &str) -> RepositoryError {
    error!("DynamoDB error: {:?}", error);

    match error {
        DynamoDbError::ResourceNotFoundException(_) => RepositoryError::TableNotFound {
            table_name: table_name.to_string(),
        },
        DynamoDbError::TransactionCanceledException(e) => RepositoryError::TransactionFailed {
            message: e.to_string(),
        },
        DynamoDbError::ConditionalCheckFailedException(e) => {
            RepositoryError::ConstraintViolation {
                message: e.to_string(),
            }
        }
        DynamoDbError::ProvisionedThroughputExceededException(_)
        | DynamoDbError::RequestLimitExceeded(_) => RepositoryError::RateLimitExceeded,
        other => RepositoryError::AwsSdk {
            message: other.to_string(),
        },
    }
}

/// Wrap an SDK builder failure
pub fn build_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::AwsSdk {
        message: format!("Failed to build request: {}", error),
    }
}

// Attribute helpers shared by the item conversions

pub fn n(value: impl ToString) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

pub fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

pub fn key(name: &str, value: AttributeValue) -> Item {
    HashMap::from([(name.to_string(), value)])
}

pub fn composite_key(hash: (&str, AttributeValue), range: (&str, AttributeValue)) -> Item {
    HashMap::from([
        (hash.0.to_string(), hash.1),
        (range.0.to_string(), range.1),
    ])
}

pub fn put_opt_s(item: &mut Item, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        item.insert(name.to_string(), AttributeValue::S(value.clone()));
    }
}

pub fn put_opt_n<T: ToString>(item: &mut Item, name: &str, value: Option<T>) {
    if let Some(value) = value {
        item.insert(name.to_string(), AttributeValue::N(value.to_string()));
    }
}

fn missing(name: &str) -> RepositoryError {
    RepositoryError::InvalidQuery {
        message: format!("Missing or invalid {}", name),
    }
}

pub fn get_s(item: &Item, name: &str) -> RepositoryResult<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| missing(name))
}

pub fn get_opt_s(item: &Item, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

pub fn get_n<T: FromStr>(item: &Item, name: &str) -> RepositoryResult<T> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| missing(name))
}

pub fn get_opt_n<T: FromStr>(item: &Item, name: &str) -> Option<T> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .and_then(|raw| raw.parse().ok())
}

pub fn get_time(item: &Item, name: &str) -> RepositoryResult<DateTime<Utc>> {
    get_opt_time(item, name).ok_or_else(|| missing(name))
}

pub fn get_opt_time(item: &Item, name: &str) -> Option<DateTime<Utc>> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|time| time.with_timezone(&Utc))
}

pub fn get_string_list(item: &Item, name: &str) -> Vec<String> {
    item.get(name)
        .and_then(|v| v.as_l().ok())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_s().ok().cloned())
                .collect()
        })
        .unwrap_or_default()
}

/// Code-carrying enums are stored as numbers
pub fn get_code<T: TryFrom<u8>>(item: &Item, name: &str) -> RepositoryResult<T> {
    let code: u8 = get_n(item, name)?;
    T::try_from(code).map_err(|_| missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_helpers() {
        let mut item = Item::new();
        item.insert("id".to_string(), n(42));
        item.insert("name".to_string(), s("Rice"));
        item.insert(
            "value".to_string(),
            AttributeValue::L(vec![s("mild"), s("hot")]),
        );
        put_opt_s(&mut item, "image", &None);
        put_opt_n(&mut item, "dish_id", Some(7_i64));

        assert_eq!(get_n::<i64>(&item, "id").unwrap(), 42);
        assert_eq!(get_s(&item, "name").unwrap(), "Rice");
        assert_eq!(get_opt_s(&item, "image"), None);
        assert_eq!(get_opt_n::<i64>(&item, "dish_id"), Some(7));
        assert_eq!(get_string_list(&item, "value"), vec!["mild", "hot"]);
        assert!(get_s(&item, "missing").is_err());
        assert!(get_n::<i64>(&item, "name").is_err());
    }

    #[test]
    fn test_time_round_trips_through_rfc3339() {
        let now = Utc::now();
        let mut item = Item::new();
        item.insert("create_time".to_string(), s(now.to_rfc3339()));
        assert_eq!(get_time(&item, "create_time").unwrap(), now);
        assert!(get_opt_time(&item, "update_time").is_none());
    }
}

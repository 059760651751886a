use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    Projection, ProjectionType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::catalog_repository::{CATEGORY_INDEX, DISH_INDEX};
use super::order_repository::USER_INDEX;
use super::user_repository::PHONE_INDEX;
use crate::config::TableNames;
use crate::models::{RepositoryError, RepositoryResult};

/// A key attribute: name and scalar type
#[derive(Debug, Clone, PartialEq)]
pub struct KeyAttribute {
    pub name: &'static str,
    pub kind: ScalarAttributeType,
}

fn number(name: &'static str) -> KeyAttribute {
    KeyAttribute {
        name,
        kind: ScalarAttributeType::N,
    }
}

fn string(name: &'static str) -> KeyAttribute {
    KeyAttribute {
        name,
        kind: ScalarAttributeType::S,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub hash: KeyAttribute,
    pub range: Option<KeyAttribute>,
}

/// Layout of one table: primary key plus global secondary indexes
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub hash: KeyAttribute,
    pub range: Option<KeyAttribute>,
    pub indexes: Vec<IndexSpec>,
}

impl TableSpec {
    /// Every attribute used in a key, deduplicated
    fn key_attributes(&self) -> Vec<KeyAttribute> {
        let mut attributes: Vec<KeyAttribute> = Vec::new();
        let all = std::iter::once(&self.hash)
            .chain(self.range.iter())
            .chain(
                self.indexes
                    .iter()
                    .flat_map(|index| std::iter::once(&index.hash).chain(index.range.iter())),
            );
        for attribute in all {
            if !attributes.iter().any(|known| known.name == attribute.name) {
                attributes.push(attribute.clone());
            }
        }
        attributes
    }
}

/// Table layouts for the whole service
pub fn table_specs(names: &TableNames) -> Vec<TableSpec> {
    let category_index = IndexSpec {
        name: CATEGORY_INDEX,
        hash: number("category_id"),
        range: None,
    };

    vec![
        TableSpec {
            name: names.categories.clone(),
            hash: number("id"),
            range: None,
            indexes: vec![],
        },
        TableSpec {
            name: names.dishes.clone(),
            hash: number("id"),
            range: None,
            indexes: vec![category_index.clone()],
        },
        TableSpec {
            name: names.dish_flavors.clone(),
            hash: number("dish_id"),
            range: Some(number("id")),
            indexes: vec![],
        },
        TableSpec {
            name: names.setmeals.clone(),
            hash: number("id"),
            range: None,
            indexes: vec![category_index],
        },
        TableSpec {
            name: names.setmeal_dishes.clone(),
            hash: number("setmeal_id"),
            range: Some(number("dish_id")),
            indexes: vec![IndexSpec {
                name: DISH_INDEX,
                hash: number("dish_id"),
                range: Some(number("setmeal_id")),
            }],
        },
        TableSpec {
            name: names.shopping_carts.clone(),
            hash: number("user_id"),
            range: Some(string("item_key")),
            indexes: vec![],
        },
        TableSpec {
            name: names.orders.clone(),
            hash: number("id"),
            range: None,
            indexes: vec![IndexSpec {
                name: USER_INDEX,
                hash: number("user_id"),
                range: None,
            }],
        },
        TableSpec {
            name: names.order_details.clone(),
            hash: number("order_id"),
            range: Some(number("id")),
            indexes: vec![],
        },
        TableSpec {
            name: names.users.clone(),
            hash: number("id"),
            range: None,
            indexes: vec![IndexSpec {
                name: PHONE_INDEX,
                hash: string("phone"),
                range: None,
            }],
        },
    ]
}

fn key_schema(
    hash: &KeyAttribute,
    range: Option<&KeyAttribute>,
) -> RepositoryResult<Vec<KeySchemaElement>> {
    let mut schema = vec![KeySchemaElement::builder()
        .attribute_name(hash.name)
        .key_type(KeyType::Hash)
        .build()
        .map_err(|e| RepositoryError::AwsSdk {
            message: format!("Failed to build key schema: {}", e),
        })?];
    if let Some(range) = range {
        schema.push(
            KeySchemaElement::builder()
                .attribute_name(range.name)
                .key_type(KeyType::Range)
                .build()
                .map_err(|e| RepositoryError::AwsSdk {
                    message: format!("Failed to build key schema: {}", e),
                })?,
        );
    }
    Ok(schema)
}

/// Manages DynamoDB table creation and configuration
pub struct TableManager {
    client: Arc<DynamoDbClient>,
    names: TableNames,
}

impl TableManager {
    pub fn new(client: Arc<DynamoDbClient>, names: TableNames) -> Self {
        Self { client, names }
    }

    /// Create a table from its layout; a table that already exists is left untouched
    #[instrument(skip(self, spec), fields(table_name = %spec.name))]
    pub async fn create_table(&self, spec: &TableSpec) -> RepositoryResult<bool> {
        if self.table_exists(&spec.name).await? {
            info!("Table {} already exists", spec.name);
            return Ok(false);
        }

        let attribute_definitions = spec
            .key_attributes()
            .into_iter()
            .map(|attribute| {
                AttributeDefinition::builder()
                    .attribute_name(attribute.name)
                    .attribute_type(attribute.kind)
                    .build()
                    .map_err(|e| RepositoryError::AwsSdk {
                        message: format!("Failed to build attribute definition: {}", e),
                    })
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        let mut indexes = Vec::new();
        for index in &spec.indexes {
            indexes.push(
                GlobalSecondaryIndex::builder()
                    .index_name(index.name)
                    .set_key_schema(Some(key_schema(&index.hash, index.range.as_ref())?))
                    .projection(
                        Projection::builder()
                            .projection_type(ProjectionType::All)
                            .build(),
                    )
                    .build()
                    .map_err(|e| RepositoryError::AwsSdk {
                        message: format!("Failed to build GSI: {}", e),
                    })?,
            );
        }

        self.client
            .create_table()
            .table_name(&spec.name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema(&spec.hash, spec.range.as_ref())?))
            .set_global_secondary_indexes(if indexes.is_empty() {
                None
            } else {
                Some(indexes)
            })
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| self.map_dynamodb_error(e.into()))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(&spec.name).await?;
        Ok(true)
    }

    /// Create every table the service needs, returning the names that were created
    #[instrument(skip(self))]
    pub async fn create_all_tables(&self) -> RepositoryResult<Vec<String>> {
        let mut created = Vec::new();
        for spec in table_specs(&self.names) {
            if self.create_table(&spec).await? {
                created.push(spec.name);
            }
        }

        info!("All tables ready, {} created", created.len());
        Ok(created)
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => match DynamoDbError::from(e) {
                DynamoDbError::ResourceNotFoundException(_) => {
                    info!("Table {} does not exist", table_name);
                    Ok(false)
                }
                other => {
                    error!("Error checking table existence: {}", other);
                    Err(RepositoryError::ConnectionFailed)
                }
            },
        }
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        let max_attempts = 30;
        let wait_duration = Duration::from_secs(10);

        for _ in 0..max_attempts {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| self.map_dynamodb_error(e.into()))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => info!("Table {} status: {:?}, waiting...", table_name, status),
                None => warn!("Table {} status unknown, waiting...", table_name),
            }

            tokio::time::sleep(wait_duration).await;
        }

        error!("Timeout waiting for table {} to become active", table_name);
        Err(RepositoryError::Timeout)
    }

    fn map_dynamodb_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);
        RepositoryError::AwsSdk {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_has_a_layout() {
        let names = TableNames::with_prefix("Test");
        let specs = table_specs(&names);

        assert_eq!(specs.len(), 9);
        assert!(specs.iter().any(|spec| spec.name == "TestSetmealDishes"));
    }

    #[test]
    fn test_key_attributes_are_deduplicated() {
        let names = TableNames::with_prefix("Test");
        let specs = table_specs(&names);
        let junction = specs
            .iter()
            .find(|spec| spec.name == names.setmeal_dishes)
            .unwrap();

        let attributes: Vec<&str> = junction
            .key_attributes()
            .iter()
            .map(|attribute| attribute.name)
            .collect();
        assert_eq!(attributes, vec!["setmeal_id", "dish_id"]);
    }

    #[test]
    fn test_cart_table_uses_item_sort_key() {
        let names = TableNames::with_prefix("Test");
        let carts = table_specs(&names)
            .into_iter()
            .find(|spec| spec.name == names.shopping_carts)
            .unwrap();

        assert_eq!(carts.hash.name, "user_id");
        assert_eq!(carts.range.unwrap().kind, ScalarAttributeType::S);
    }
}

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{instrument, warn};

use super::dynamo::{s, DynamoTable, Item};
use super::items::{item_to_user, user_to_item};
use crate::models::{RepositoryResult, User};

/// Trait defining the interface for customer account access
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<User>>;

    async fn create(&self, user: User) -> RepositoryResult<User>;
}

pub const PHONE_INDEX: &str = "PhoneIndex";

/// DynamoDB implementation of the UserRepository trait
pub struct DynamoDbUserRepository {
    table: DynamoTable,
}

impl DynamoDbUserRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            table: DynamoTable::new(client, table_name, region),
        }
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    #[instrument(skip(self, phone), fields(table = %self.table.name()))]
    async fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<User>> {
        let items = self
            .table
            .query(
                Some(PHONE_INDEX),
                "phone = :phone",
                Item::from([(":phone".to_string(), s(phone))]),
            )
            .await?;

        if items.len() > 1 {
            warn!("Multiple users share one phone number, using the first");
        }
        items.first().map(item_to_user).transpose()
    }

    #[instrument(skip(self, user), fields(table = %self.table.name(), user_id = user.id))]
    async fn create(&self, user: User) -> RepositoryResult<User> {
        self.table.put(user_to_item(&user)).await?;
        Ok(user)
    }
}

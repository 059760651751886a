use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::dynamo::{composite_key, n, s, DynamoTable, Item};
use super::items::{cart_item_to_item, item_to_cart_item};
use crate::models::{CartItemKey, RepositoryError, RepositoryResult, ShoppingCartItem};

/// Trait defining the interface for shopping cart data access
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Find the line for one item in a user's cart
    async fn find_item(
        &self,
        user_id: i64,
        key: CartItemKey,
    ) -> RepositoryResult<Option<ShoppingCartItem>>;

    /// All lines of a user's cart, oldest first
    async fn list_items(&self, user_id: i64) -> RepositoryResult<Vec<ShoppingCartItem>>;

    /// Insert or overwrite a line
    async fn save_item(&self, item: ShoppingCartItem) -> RepositoryResult<ShoppingCartItem>;

    async fn delete_item(&self, user_id: i64, key: CartItemKey) -> RepositoryResult<()>;

    /// Remove every line of a user's cart, returning how many were removed
    async fn clear(&self, user_id: i64) -> RepositoryResult<usize>;
}

/// DynamoDB implementation of the CartRepository trait.
/// Partition key `user_id`, sort key `item_key` (`dish#{id}` / `setmeal#{id}`).
pub struct DynamoDbCartRepository {
    table: DynamoTable,
}

impl DynamoDbCartRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            table: DynamoTable::new(client, table_name, region),
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    fn line_key(user_id: i64, key: CartItemKey) -> Item {
        composite_key(("user_id", n(user_id)), ("item_key", s(key.storage_key())))
    }
}

#[async_trait]
impl CartRepository for DynamoDbCartRepository {
    #[instrument(skip(self), fields(table = %self.table.name(), user_id = user_id, item = %key))]
    async fn find_item(
        &self,
        user_id: i64,
        key: CartItemKey,
    ) -> RepositoryResult<Option<ShoppingCartItem>> {
        self.table
            .get(Self::line_key(user_id, key))
            .await?
            .map(|item| item_to_cart_item(&item))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.table.name(), user_id = user_id))]
    async fn list_items(&self, user_id: i64) -> RepositoryResult<Vec<ShoppingCartItem>> {
        let items = self
            .table
            .query(
                None,
                "user_id = :user_id",
                Item::from([(":user_id".to_string(), n(user_id))]),
            )
            .await?;

        let mut lines = Vec::new();
        for item in items {
            match item_to_cart_item(&item) {
                Ok(line) => lines.push(line),
                Err(e) => {
                    warn!("Failed to parse cart item: {}", e);
                    continue;
                }
            }
        }
        lines.sort_by_key(|line| line.create_time);

        info!("Found {} cart lines", lines.len());
        Ok(lines)
    }

    #[instrument(skip(self, item), fields(table = %self.table.name(), user_id = item.user_id, number = item.number))]
    async fn save_item(&self, item: ShoppingCartItem) -> RepositoryResult<ShoppingCartItem> {
        if item.key().is_none() {
            return Err(RepositoryError::ConstraintViolation {
                message: "cart line must reference a dish or a setmeal".to_string(),
            });
        }
        self.table.put(cart_item_to_item(&item)).await?;
        Ok(item)
    }

    #[instrument(skip(self), fields(table = %self.table.name(), user_id = user_id, item = %key))]
    async fn delete_item(&self, user_id: i64, key: CartItemKey) -> RepositoryResult<()> {
        self.table.delete(Self::line_key(user_id, key)).await
    }

    #[instrument(skip(self), fields(table = %self.table.name(), user_id = user_id))]
    async fn clear(&self, user_id: i64) -> RepositoryResult<usize> {
        let lines = self.list_items(user_id).await?;
        let mut removed = 0;
        for line in &lines {
            if let Some(key) = line.key() {
                self.table.delete(Self::line_key(user_id, key)).await?;
                removed += 1;
            }
        }

        info!("Cleared {} cart lines", removed);
        Ok(removed)
    }
}

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{Put, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::dynamo::{build_error, key, n, transact_write, DynamoTable, Item};
use super::items::{item_to_order, item_to_order_detail, order_detail_to_item, order_to_item};
use crate::models::{Order, OrderDetail, OrderFilter, RepositoryResult};

/// Trait defining the interface for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Store an order header with its detail lines in one transaction
    async fn create(&self, order: Order, details: Vec<OrderDetail>) -> RepositoryResult<Order>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Order>>;

    /// Overwrite an order header
    async fn update(&self, order: Order) -> RepositoryResult<Order>;

    /// Orders matching the filter, newest first
    async fn list(&self, filter: OrderFilter) -> RepositoryResult<Vec<Order>>;

    async fn find_details(&self, order_id: i64) -> RepositoryResult<Vec<OrderDetail>>;
}

pub const USER_INDEX: &str = "UserIndex";

/// DynamoDB implementation of the OrderRepository trait
pub struct DynamoDbOrderRepository {
    client: Arc<DynamoDbClient>,
    region: String,
    orders: DynamoTable,
    details: DynamoTable,
}

impl DynamoDbOrderRepository {
    pub fn new(
        client: Arc<DynamoDbClient>,
        orders_table: String,
        details_table: String,
        region: String,
    ) -> Self {
        Self {
            orders: DynamoTable::new(client.clone(), orders_table, region.clone()),
            details: DynamoTable::new(client.clone(), details_table, region.clone()),
            client,
            region,
        }
    }

    fn put(table: &DynamoTable, item: Item) -> RepositoryResult<TransactWriteItem> {
        let put = Put::builder()
            .table_name(table.name())
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn parse_orders(items: Vec<Item>) -> Vec<Order> {
        items
            .iter()
            .filter_map(|item| match item_to_order(item) {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!("Failed to parse order item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl OrderRepository for DynamoDbOrderRepository {
    #[instrument(skip(self, order, details), fields(order_id = order.id, lines = details.len()))]
    async fn create(&self, order: Order, details: Vec<OrderDetail>) -> RepositoryResult<Order> {
        let mut actions = vec![Self::put(&self.orders, order_to_item(&order))?];
        for detail in &details {
            actions.push(Self::put(&self.details, order_detail_to_item(detail))?);
        }

        transact_write(&self.client, &self.region, actions).await?;
        info!("Order created");
        Ok(order)
    }

    #[instrument(skip(self), fields(table = %self.orders.name()))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Order>> {
        self.orders
            .get(key("id", n(id)))
            .await?
            .map(|item| item_to_order(&item))
            .transpose()
    }

    #[instrument(skip(self, order), fields(table = %self.orders.name(), order_id = order.id))]
    async fn update(&self, order: Order) -> RepositoryResult<Order> {
        self.orders.put(order_to_item(&order)).await?;
        Ok(order)
    }

    #[instrument(skip(self), fields(table = %self.orders.name()))]
    async fn list(&self, filter: OrderFilter) -> RepositoryResult<Vec<Order>> {
        let items = match filter.user_id {
            Some(user_id) => {
                self.orders
                    .query(
                        Some(USER_INDEX),
                        "user_id = :user_id",
                        Item::from([(":user_id".to_string(), n(user_id))]),
                    )
                    .await?
            }
            None => self.orders.scan().await?,
        };

        let mut orders: Vec<Order> = Self::parse_orders(items)
            .into_iter()
            .filter(|order| filter.matches(order))
            .collect();
        orders.sort_by(|a, b| b.order_time.cmp(&a.order_time));

        info!("Found {} orders", orders.len());
        Ok(orders)
    }

    #[instrument(skip(self), fields(table = %self.details.name()))]
    async fn find_details(&self, order_id: i64) -> RepositoryResult<Vec<OrderDetail>> {
        let items = self
            .details
            .query(
                None,
                "order_id = :order_id",
                Item::from([(":order_id".to_string(), n(order_id))]),
            )
            .await?;

        Ok(items
            .iter()
            .filter_map(|item| match item_to_order_detail(item) {
                Ok(detail) => Some(detail),
                Err(e) => {
                    warn!("Failed to parse order detail item: {}", e);
                    None
                }
            })
            .collect())
    }
}

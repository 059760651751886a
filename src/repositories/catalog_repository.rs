use async_trait::async_trait;
use aws_sdk_dynamodb::types::{Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::dynamo::{build_error, composite_key, key, n, transact_write, DynamoTable, Item};
use super::items::*;
use crate::config::TableNames;
use crate::models::{
    Category, CategoryType, Dish, DishFilter, DishFlavor, RepositoryResult, Setmeal, SetmealDish,
    SetmealFilter,
};

/// A single catalog mutation. A batch of these is applied all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogWrite {
    PutCategory(Category),
    DeleteCategory(i64),
    PutDish(Dish),
    DeleteDish(i64),
    PutFlavor(DishFlavor),
    DeleteFlavor { dish_id: i64, id: i64 },
    PutSetmeal(Setmeal),
    DeleteSetmeal(i64),
    PutSetmealDish(SetmealDish),
    DeleteSetmealDish { setmeal_id: i64, dish_id: i64 },
}

/// Data access for categories, dishes, flavors, combos and combo contents
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_category(&self, id: i64) -> RepositoryResult<Option<Category>>;

    async fn list_categories(
        &self,
        category_type: Option<CategoryType>,
    ) -> RepositoryResult<Vec<Category>>;

    async fn find_dish(&self, id: i64) -> RepositoryResult<Option<Dish>>;

    async fn list_dishes(&self, filter: DishFilter) -> RepositoryResult<Vec<Dish>>;

    async fn count_dishes_in_category(&self, category_id: i64) -> RepositoryResult<usize>;

    async fn find_flavors(&self, dish_id: i64) -> RepositoryResult<Vec<DishFlavor>>;

    async fn find_setmeal(&self, id: i64) -> RepositoryResult<Option<Setmeal>>;

    async fn list_setmeals(&self, filter: SetmealFilter) -> RepositoryResult<Vec<Setmeal>>;

    async fn count_setmeals_in_category(&self, category_id: i64) -> RepositoryResult<usize>;

    /// Junction rows of one combo
    async fn find_setmeal_dishes(&self, setmeal_id: i64) -> RepositoryResult<Vec<SetmealDish>>;

    /// Junction rows referencing one dish, across all combos
    async fn find_setmeal_dishes_by_dish(&self, dish_id: i64)
        -> RepositoryResult<Vec<SetmealDish>>;

    /// Apply every write or none of them
    async fn apply(&self, writes: Vec<CatalogWrite>) -> RepositoryResult<()>;
}

/// Table names backing the catalog
#[derive(Debug, Clone)]
pub struct CatalogTables {
    pub categories: String,
    pub dishes: String,
    pub dish_flavors: String,
    pub setmeals: String,
    pub setmeal_dishes: String,
}

impl From<&TableNames> for CatalogTables {
    fn from(names: &TableNames) -> Self {
        Self {
            categories: names.categories.clone(),
            dishes: names.dishes.clone(),
            dish_flavors: names.dish_flavors.clone(),
            setmeals: names.setmeals.clone(),
            setmeal_dishes: names.setmeal_dishes.clone(),
        }
    }
}

pub const CATEGORY_INDEX: &str = "CategoryIndex";
pub const DISH_INDEX: &str = "DishIndex";

/// DynamoDB implementation of the CatalogRepository trait
pub struct DynamoDbCatalogRepository {
    client: Arc<DynamoDbClient>,
    region: String,
    categories: DynamoTable,
    dishes: DynamoTable,
    dish_flavors: DynamoTable,
    setmeals: DynamoTable,
    setmeal_dishes: DynamoTable,
}

impl DynamoDbCatalogRepository {
    pub fn new(client: Arc<DynamoDbClient>, tables: CatalogTables, region: String) -> Self {
        let table = |name: &str| DynamoTable::new(client.clone(), name, region.clone());
        Self {
            categories: table(&tables.categories),
            dishes: table(&tables.dishes),
            dish_flavors: table(&tables.dish_flavors),
            setmeals: table(&tables.setmeals),
            setmeal_dishes: table(&tables.setmeal_dishes),
            client,
            region,
        }
    }

    fn put(table: &DynamoTable, item: Item) -> RepositoryResult<TransactWriteItem> {
        let put = Put::builder()
            .table_name(table.name())
            .set_item(Some(item))
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn delete(table: &DynamoTable, key: Item) -> RepositoryResult<TransactWriteItem> {
        let delete = Delete::builder()
            .table_name(table.name())
            .set_key(Some(key))
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().delete(delete).build())
    }

    /// Translate a catalog write into a transaction action
    pub fn to_transact_item(&self, write: &CatalogWrite) -> RepositoryResult<TransactWriteItem> {
        match write {
            CatalogWrite::PutCategory(category) => {
                Self::put(&self.categories, category_to_item(category))
            }
            CatalogWrite::DeleteCategory(id) => Self::delete(&self.categories, key("id", n(id))),
            CatalogWrite::PutDish(dish) => Self::put(&self.dishes, dish_to_item(dish)),
            CatalogWrite::DeleteDish(id) => Self::delete(&self.dishes, key("id", n(id))),
            CatalogWrite::PutFlavor(flavor) => {
                Self::put(&self.dish_flavors, flavor_to_item(flavor))
            }
            CatalogWrite::DeleteFlavor { dish_id, id } => Self::delete(
                &self.dish_flavors,
                composite_key(("dish_id", n(dish_id)), ("id", n(id))),
            ),
            CatalogWrite::PutSetmeal(setmeal) => {
                Self::put(&self.setmeals, setmeal_to_item(setmeal))
            }
            CatalogWrite::DeleteSetmeal(id) => Self::delete(&self.setmeals, key("id", n(id))),
            CatalogWrite::PutSetmealDish(row) => {
                Self::put(&self.setmeal_dishes, setmeal_dish_to_item(row))
            }
            CatalogWrite::DeleteSetmealDish {
                setmeal_id,
                dish_id,
            } => Self::delete(
                &self.setmeal_dishes,
                composite_key(("setmeal_id", n(setmeal_id)), ("dish_id", n(dish_id))),
            ),
        }
    }

    fn parse_all<T>(
        items: Vec<Item>,
        kind: &str,
        parse: impl Fn(&Item) -> RepositoryResult<T>,
    ) -> Vec<T> {
        items
            .iter()
            .filter_map(|item| match parse(item) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Failed to parse {} item: {}", kind, e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl CatalogRepository for DynamoDbCatalogRepository {
    #[instrument(skip(self), fields(table = %self.categories.name()))]
    async fn find_category(&self, id: i64) -> RepositoryResult<Option<Category>> {
        self.categories
            .get(key("id", n(id)))
            .await?
            .map(|item| item_to_category(&item))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.categories.name()))]
    async fn list_categories(
        &self,
        category_type: Option<CategoryType>,
    ) -> RepositoryResult<Vec<Category>> {
        let items = self.categories.scan().await?;
        let categories: Vec<Category> = Self::parse_all(items, "category", item_to_category)
            .into_iter()
            .filter(|category| category_type.map_or(true, |kind| category.category_type == kind))
            .collect();

        info!("Found {} categories", categories.len());
        Ok(categories)
    }

    #[instrument(skip(self), fields(table = %self.dishes.name()))]
    async fn find_dish(&self, id: i64) -> RepositoryResult<Option<Dish>> {
        self.dishes
            .get(key("id", n(id)))
            .await?
            .map(|item| item_to_dish(&item))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.dishes.name()))]
    async fn list_dishes(&self, filter: DishFilter) -> RepositoryResult<Vec<Dish>> {
        // Category lookups go through the GSI, everything else scans
        let items = match filter.category_id {
            Some(category_id) => {
                self.dishes
                    .query(
                        Some(CATEGORY_INDEX),
                        "category_id = :category_id",
                        Item::from([(":category_id".to_string(), n(category_id))]),
                    )
                    .await?
            }
            None => self.dishes.scan().await?,
        };

        let dishes: Vec<Dish> = Self::parse_all(items, "dish", item_to_dish)
            .into_iter()
            .filter(|dish| filter.matches(dish))
            .collect();

        info!("Found {} dishes", dishes.len());
        Ok(dishes)
    }

    #[instrument(skip(self), fields(table = %self.dishes.name()))]
    async fn count_dishes_in_category(&self, category_id: i64) -> RepositoryResult<usize> {
        self.dishes
            .count(
                Some(CATEGORY_INDEX),
                "category_id = :category_id",
                Item::from([(":category_id".to_string(), n(category_id))]),
            )
            .await
    }

    #[instrument(skip(self), fields(table = %self.dish_flavors.name()))]
    async fn find_flavors(&self, dish_id: i64) -> RepositoryResult<Vec<DishFlavor>> {
        let items = self
            .dish_flavors
            .query(
                None,
                "dish_id = :dish_id",
                Item::from([(":dish_id".to_string(), n(dish_id))]),
            )
            .await?;
        Ok(Self::parse_all(items, "flavor", item_to_flavor))
    }

    #[instrument(skip(self), fields(table = %self.setmeals.name()))]
    async fn find_setmeal(&self, id: i64) -> RepositoryResult<Option<Setmeal>> {
        self.setmeals
            .get(key("id", n(id)))
            .await?
            .map(|item| item_to_setmeal(&item))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.setmeals.name()))]
    async fn list_setmeals(&self, filter: SetmealFilter) -> RepositoryResult<Vec<Setmeal>> {
        let items = match filter.category_id {
            Some(category_id) => {
                self.setmeals
                    .query(
                        Some(CATEGORY_INDEX),
                        "category_id = :category_id",
                        Item::from([(":category_id".to_string(), n(category_id))]),
                    )
                    .await?
            }
            None => self.setmeals.scan().await?,
        };

        let setmeals: Vec<Setmeal> = Self::parse_all(items, "setmeal", item_to_setmeal)
            .into_iter()
            .filter(|setmeal| filter.matches(setmeal))
            .collect();

        info!("Found {} setmeals", setmeals.len());
        Ok(setmeals)
    }

    #[instrument(skip(self), fields(table = %self.setmeals.name()))]
    async fn count_setmeals_in_category(&self, category_id: i64) -> RepositoryResult<usize> {
        self.setmeals
            .count(
                Some(CATEGORY_INDEX),
                "category_id = :category_id",
                Item::from([(":category_id".to_string(), n(category_id))]),
            )
            .await
    }

    #[instrument(skip(self), fields(table = %self.setmeal_dishes.name()))]
    async fn find_setmeal_dishes(&self, setmeal_id: i64) -> RepositoryResult<Vec<SetmealDish>> {
        let items = self
            .setmeal_dishes
            .query(
                None,
                "setmeal_id = :setmeal_id",
                Item::from([(":setmeal_id".to_string(), n(setmeal_id))]),
            )
            .await?;
        Ok(Self::parse_all(items, "setmeal dish", item_to_setmeal_dish))
    }

    #[instrument(skip(self), fields(table = %self.setmeal_dishes.name()))]
    async fn find_setmeal_dishes_by_dish(
        &self,
        dish_id: i64,
    ) -> RepositoryResult<Vec<SetmealDish>> {
        let items = self
            .setmeal_dishes
            .query(
                Some(DISH_INDEX),
                "dish_id = :dish_id",
                Item::from([(":dish_id".to_string(), n(dish_id))]),
            )
            .await?;
        Ok(Self::parse_all(items, "setmeal dish", item_to_setmeal_dish))
    }

    #[instrument(skip(self, writes), fields(writes = writes.len()))]
    async fn apply(&self, writes: Vec<CatalogWrite>) -> RepositoryResult<()> {
        let actions = writes
            .iter()
            .map(|write| self.to_transact_item(write))
            .collect::<RepositoryResult<Vec<_>>>()?;

        transact_write(&self.client, &self.region, actions).await?;
        info!("Applied {} catalog writes", writes.len());
        Ok(())
    }
}

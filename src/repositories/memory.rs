// In-process repository backends for local runs and tests

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CartRepository, CatalogRepository, CatalogWrite, OrderRepository, UserRepository};
use crate::models::{
    CartItemKey, Category, CategoryType, Dish, DishFilter, DishFlavor, Order, OrderDetail,
    OrderFilter, RepositoryError, RepositoryResult, Setmeal, SetmealDish, SetmealFilter,
    ShoppingCartItem, User,
};

#[derive(Default)]
struct CatalogState {
    categories: HashMap<i64, Category>,
    dishes: HashMap<i64, Dish>,
    flavors: HashMap<(i64, i64), DishFlavor>,
    setmeals: HashMap<i64, Setmeal>,
    setmeal_dishes: HashMap<(i64, i64), SetmealDish>,
}

impl CatalogState {
    fn apply(&mut self, write: CatalogWrite) {
        match write {
            CatalogWrite::PutCategory(category) => {
                self.categories.insert(category.id, category);
            }
            CatalogWrite::DeleteCategory(id) => {
                self.categories.remove(&id);
            }
            CatalogWrite::PutDish(dish) => {
                self.dishes.insert(dish.id, dish);
            }
            CatalogWrite::DeleteDish(id) => {
                self.dishes.remove(&id);
            }
            CatalogWrite::PutFlavor(flavor) => {
                self.flavors.insert((flavor.dish_id, flavor.id), flavor);
            }
            CatalogWrite::DeleteFlavor { dish_id, id } => {
                self.flavors.remove(&(dish_id, id));
            }
            CatalogWrite::PutSetmeal(setmeal) => {
                self.setmeals.insert(setmeal.id, setmeal);
            }
            CatalogWrite::DeleteSetmeal(id) => {
                self.setmeals.remove(&id);
            }
            CatalogWrite::PutSetmealDish(row) => {
                self.setmeal_dishes.insert((row.setmeal_id, row.dish_id), row);
            }
            CatalogWrite::DeleteSetmealDish {
                setmeal_id,
                dish_id,
            } => {
                self.setmeal_dishes.remove(&(setmeal_id, dish_id));
            }
        }
    }
}

/// Catalog held in memory. `apply` runs under one write lock, so a batch is atomic.
#[derive(Default)]
pub struct InMemoryCatalogRepository {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_category(&self, id: i64) -> RepositoryResult<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(
        &self,
        category_type: Option<CategoryType>,
    ) -> RepositoryResult<Vec<Category>> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .filter(|category| category_type.map_or(true, |kind| category.category_type == kind))
            .cloned()
            .collect())
    }

    async fn find_dish(&self, id: i64) -> RepositoryResult<Option<Dish>> {
        Ok(self.state.read().await.dishes.get(&id).cloned())
    }

    async fn list_dishes(&self, filter: DishFilter) -> RepositoryResult<Vec<Dish>> {
        let state = self.state.read().await;
        Ok(state
            .dishes
            .values()
            .filter(|dish| filter.matches(dish))
            .cloned()
            .collect())
    }

    async fn count_dishes_in_category(&self, category_id: i64) -> RepositoryResult<usize> {
        let state = self.state.read().await;
        Ok(state
            .dishes
            .values()
            .filter(|dish| dish.category_id == category_id)
            .count())
    }

    async fn find_flavors(&self, dish_id: i64) -> RepositoryResult<Vec<DishFlavor>> {
        let state = self.state.read().await;
        let mut flavors: Vec<DishFlavor> = state
            .flavors
            .values()
            .filter(|flavor| flavor.dish_id == dish_id)
            .cloned()
            .collect();
        flavors.sort_by_key(|flavor| flavor.id);
        Ok(flavors)
    }

    async fn find_setmeal(&self, id: i64) -> RepositoryResult<Option<Setmeal>> {
        Ok(self.state.read().await.setmeals.get(&id).cloned())
    }

    async fn list_setmeals(&self, filter: SetmealFilter) -> RepositoryResult<Vec<Setmeal>> {
        let state = self.state.read().await;
        Ok(state
            .setmeals
            .values()
            .filter(|setmeal| filter.matches(setmeal))
            .cloned()
            .collect())
    }

    async fn count_setmeals_in_category(&self, category_id: i64) -> RepositoryResult<usize> {
        let state = self.state.read().await;
        Ok(state
            .setmeals
            .values()
            .filter(|setmeal| setmeal.category_id == category_id)
            .count())
    }

    async fn find_setmeal_dishes(&self, setmeal_id: i64) -> RepositoryResult<Vec<SetmealDish>> {
        let state = self.state.read().await;
        let mut rows: Vec<SetmealDish> = state
            .setmeal_dishes
            .values()
            .filter(|row| row.setmeal_id == setmeal_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.sort, row.id));
        Ok(rows)
    }

    async fn find_setmeal_dishes_by_dish(
        &self,
        dish_id: i64,
    ) -> RepositoryResult<Vec<SetmealDish>> {
        let state = self.state.read().await;
        Ok(state
            .setmeal_dishes
            .values()
            .filter(|row| row.dish_id == dish_id)
            .cloned()
            .collect())
    }

    async fn apply(&self, writes: Vec<CatalogWrite>) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        for write in writes {
            state.apply(write);
        }
        Ok(())
    }
}

/// Cart lines held in memory, keyed like the DynamoDB table
#[derive(Default)]
pub struct InMemoryCartRepository {
    lines: RwLock<HashMap<(i64, CartItemKey), ShoppingCartItem>>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn find_item(
        &self,
        user_id: i64,
        key: CartItemKey,
    ) -> RepositoryResult<Option<ShoppingCartItem>> {
        Ok(self.lines.read().await.get(&(user_id, key)).cloned())
    }

    async fn list_items(&self, user_id: i64) -> RepositoryResult<Vec<ShoppingCartItem>> {
        let lines = self.lines.read().await;
        let mut items: Vec<ShoppingCartItem> = lines
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .map(|(_, line)| line.clone())
            .collect();
        items.sort_by_key(|line| (line.create_time, line.id));
        Ok(items)
    }

    async fn save_item(&self, item: ShoppingCartItem) -> RepositoryResult<ShoppingCartItem> {
        let key = item.key().ok_or_else(|| RepositoryError::ConstraintViolation {
            message: "cart line must reference a dish or a setmeal".to_string(),
        })?;
        self.lines
            .write()
            .await
            .insert((item.user_id, key), item.clone());
        Ok(item)
    }

    async fn delete_item(&self, user_id: i64, key: CartItemKey) -> RepositoryResult<()> {
        self.lines.write().await.remove(&(user_id, key));
        Ok(())
    }

    async fn clear(&self, user_id: i64) -> RepositoryResult<usize> {
        let mut lines = self.lines.write().await;
        let before = lines.len();
        lines.retain(|(owner, _), _| *owner != user_id);
        Ok(before - lines.len())
    }
}

#[derive(Default)]
struct OrderState {
    orders: HashMap<i64, Order>,
    details: HashMap<i64, Vec<OrderDetail>>,
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    state: RwLock<OrderState>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: Order, details: Vec<OrderDetail>) -> RepositoryResult<Order> {
        let mut state = self.state.write().await;
        if state.orders.contains_key(&order.id) {
            return Err(RepositoryError::ConstraintViolation {
                message: format!("order {} already exists", order.id),
            });
        }
        state.details.insert(order.id, details);
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn update(&self, order: Order) -> RepositoryResult<Order> {
        self.state
            .write()
            .await
            .orders
            .insert(order.id, order.clone());
        Ok(order)
    }

    async fn list(&self, filter: OrderFilter) -> RepositoryResult<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.order_time.cmp(&a.order_time).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn find_details(&self, order_id: i64) -> RepositoryResult<Vec<OrderDetail>> {
        Ok(self
            .state
            .read()
            .await
            .details
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<i64, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.phone == phone)
            .cloned())
    }

    async fn create(&self, user: User) -> RepositoryResult<User> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(user)
    }
}

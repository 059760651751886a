// Shared fixtures for service tests: in-memory backends wired the way the app wires them

use async_trait::async_trait;
use mockall::mock;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use super::ConsistencyGuard;
use crate::cache::{CatalogCache, MemoryCacheService};
use crate::models::{
    Category, CategoryType, CreateCategoryRequest, Dish, DishFilter, DishFlavor, DishRequest,
    FlavorRequest, RepositoryResult, SaleStatus, Setmeal, SetmealDish, SetmealDishRequest,
    SetmealFilter, SetmealRequest,
};
use crate::observability::{Metrics, OperationTracer};
use crate::repositories::{CatalogRepository, CatalogWrite, InMemoryCatalogRepository};

mock! {
    pub TestCatalogRepository {}

    #[async_trait]
    impl CatalogRepository for TestCatalogRepository {
        async fn find_category(&self, id: i64) -> RepositoryResult<Option<Category>>;
        async fn list_categories(&self, category_type: Option<CategoryType>) -> RepositoryResult<Vec<Category>>;
        async fn find_dish(&self, id: i64) -> RepositoryResult<Option<Dish>>;
        async fn list_dishes(&self, filter: DishFilter) -> RepositoryResult<Vec<Dish>>;
        async fn count_dishes_in_category(&self, category_id: i64) -> RepositoryResult<usize>;
        async fn find_flavors(&self, dish_id: i64) -> RepositoryResult<Vec<DishFlavor>>;
        async fn find_setmeal(&self, id: i64) -> RepositoryResult<Option<Setmeal>>;
        async fn list_setmeals(&self, filter: SetmealFilter) -> RepositoryResult<Vec<Setmeal>>;
        async fn count_setmeals_in_category(&self, category_id: i64) -> RepositoryResult<usize>;
        async fn find_setmeal_dishes(&self, setmeal_id: i64) -> RepositoryResult<Vec<SetmealDish>>;
        async fn find_setmeal_dishes_by_dish(&self, dish_id: i64) -> RepositoryResult<Vec<SetmealDish>>;
        async fn apply(&self, writes: Vec<CatalogWrite>) -> RepositoryResult<()>;
    }
}

pub fn test_tracer() -> OperationTracer {
    OperationTracer::new(Arc::new(Metrics::new().unwrap()))
}

pub fn test_cache() -> CatalogCache {
    CatalogCache::new(
        Arc::new(MemoryCacheService::new()),
        Some(Duration::from_secs(3600)),
        None,
    )
}

pub fn dish_request(category_id: i64, name: &str, status: SaleStatus) -> DishRequest {
    DishRequest {
        id: None,
        name: name.to_string(),
        category_id,
        price: dec!(18),
        code: String::new(),
        image: None,
        description: None,
        status: Some(status),
        sort: 0,
        flavors: vec![FlavorRequest {
            name: "Spice".to_string(),
            value: vec!["mild".to_string(), "hot".to_string()],
        }],
    }
}

pub fn setmeal_request(
    category_id: i64,
    name: &str,
    status: SaleStatus,
    dish_ids: &[i64],
) -> SetmealRequest {
    SetmealRequest {
        category_id,
        name: name.to_string(),
        price: dec!(48),
        status: Some(status),
        code: String::new(),
        description: None,
        image: None,
        setmeal_dishes: dish_ids
            .iter()
            .map(|dish_id| SetmealDishRequest {
                dish_id: *dish_id,
                name: format!("dish {}", dish_id),
                price: dec!(18),
                copies: 1,
                sort: 0,
            })
            .collect(),
    }
}

/// Catalog, cache and guard over in-memory backends, with seeding helpers
/// that write straight to the store
pub struct Fixture {
    pub catalog: Arc<InMemoryCatalogRepository>,
    pub cache: CatalogCache,
    pub guard: Arc<ConsistencyGuard>,
}

impl Fixture {
    pub fn new() -> Self {
        let catalog = Arc::new(InMemoryCatalogRepository::new());
        let cache = test_cache();
        let guard = Arc::new(ConsistencyGuard::new(
            catalog.clone(),
            cache.clone(),
            test_tracer(),
        ));
        Self {
            catalog,
            cache,
            guard,
        }
    }

    pub async fn category(&self, name: &str) -> Category {
        let category = Category::new(CreateCategoryRequest {
            category_type: CategoryType::Dish,
            name: name.to_string(),
            sort: 0,
        });
        self.catalog
            .apply(vec![CatalogWrite::PutCategory(category.clone())])
            .await
            .unwrap();
        category
    }

    pub async fn dish(&self, category_id: i64, name: &str, status: SaleStatus) -> Dish {
        let request = dish_request(category_id, name, status);
        let dish = Dish::new(&request);
        let mut writes = vec![CatalogWrite::PutDish(dish.clone())];
        writes.extend(
            request
                .flavors
                .iter()
                .map(|flavor| CatalogWrite::PutFlavor(DishFlavor::from_request(dish.id, flavor))),
        );
        self.catalog.apply(writes).await.unwrap();
        dish
    }

    pub async fn setmeal(
        &self,
        category_id: i64,
        name: &str,
        status: SaleStatus,
        dish_ids: &[i64],
    ) -> Setmeal {
        let request = setmeal_request(category_id, name, status, dish_ids);
        let setmeal = Setmeal::new(&request);
        let mut writes = vec![CatalogWrite::PutSetmeal(setmeal.clone())];
        writes.extend(request.setmeal_dishes.iter().map(|row| {
            CatalogWrite::PutSetmealDish(SetmealDish::from_request(setmeal.id, row))
        }));
        self.catalog.apply(writes).await.unwrap();
        setmeal
    }
}

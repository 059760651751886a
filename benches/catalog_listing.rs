use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use reggie_rs::cache::{CatalogCache, MemoryCacheService};
use reggie_rs::models::{
    CategoryType, CreateCategoryRequest, DishFilter, DishRequest, FlavorRequest, SaleStatus,
};
use reggie_rs::observability::{Metrics, OperationTracer};
use reggie_rs::repositories::InMemoryCatalogRepository;
use reggie_rs::services::{CategoryService, ConsistencyGuard, DishService};

async fn setup_catalog(num_dishes: usize) -> (DishService, i64) {
    let repository = Arc::new(InMemoryCatalogRepository::new());
    let cache = CatalogCache::new(
        Arc::new(MemoryCacheService::new()),
        Some(Duration::from_secs(3600)),
        None,
    );
    let tracer = OperationTracer::new(Arc::new(Metrics::new().unwrap()));
    let guard = Arc::new(ConsistencyGuard::new(repository.clone(), cache.clone(), tracer));
    let categories = CategoryService::new(repository.clone(), cache.clone(), guard.clone());
    let dishes = DishService::new(repository, cache, guard);

    let category = categories
        .create(CreateCategoryRequest {
            category_type: CategoryType::Dish,
            name: "Benchmark Mains".to_string(),
            sort: 0,
        })
        .await
        .unwrap();

    for i in 0..num_dishes {
        let request = DishRequest {
            id: None,
            name: format!("Benchmark Dish {}", i),
            category_id: category.id,
            price: dec!(18.5),
            code: String::new(),
            image: None,
            description: None,
            status: Some(SaleStatus::OnSale),
            sort: i as i32,
            flavors: vec![FlavorRequest {
                name: "Spice".to_string(),
                value: vec!["mild".to_string(), "hot".to_string()],
            }],
        };
        dishes.save_with_flavor(request).await.unwrap();
    }

    (dishes, category.id)
}

fn bench_dish_list(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("dish_list");

    for size in [10, 100, 500] {
        let (dishes, category_id) = rt.block_on(setup_catalog(size));

        group.bench_with_input(BenchmarkId::new("cached", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                let filter = DishFilter {
                    category_id: Some(category_id),
                    status: Some(SaleStatus::OnSale),
                    name: None,
                };
                black_box(dishes.list(filter).await.unwrap())
            });
        });

        // A name filter always reads through to the store
        group.bench_with_input(BenchmarkId::new("store", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                let filter = DishFilter {
                    category_id: Some(category_id),
                    status: Some(SaleStatus::OnSale),
                    name: Some("Benchmark".to_string()),
                };
                black_box(dishes.list(filter).await.unwrap())
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_dish_list
}
criterion_main!(benches);

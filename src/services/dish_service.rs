use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::ConsistencyGuard;
use crate::cache::CatalogCache;
use crate::models::{
    Dish, DishFilter, DishFlavor, DishRequest, DishView, Page, PageQuery, SaleStatus,
    ServiceError, ServiceResult, Validate,
};
use crate::repositories::{CatalogRepository, CatalogWrite};

/// Service for dishes and their flavors
pub struct DishService {
    catalog: Arc<dyn CatalogRepository>,
    cache: CatalogCache,
    guard: Arc<ConsistencyGuard>,
}

impl DishService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        cache: CatalogCache,
        guard: Arc<ConsistencyGuard>,
    ) -> Self {
        Self {
            catalog,
            cache,
            guard,
        }
    }

    /// Create a dish together with its flavors
    #[instrument(skip(self, request), fields(name = %request.name, category_id = request.category_id))]
    pub async fn save_with_flavor(&self, request: DishRequest) -> ServiceResult<DishView> {
        request.validate()?;
        let category_name = self.category_name(request.category_id).await?;

        let dish = Dish::new(&request);
        let flavors: Vec<DishFlavor> = request
            .flavors
            .iter()
            .map(|flavor| DishFlavor::from_request(dish.id, flavor))
            .collect();

        let mut writes = vec![CatalogWrite::PutDish(dish.clone())];
        writes.extend(flavors.iter().cloned().map(CatalogWrite::PutFlavor));
        self.catalog.apply(writes).await?;

        self.cache.evict_dish_category(dish.category_id).await;

        info!(dish_id = dish.id, "Dish created");
        Ok(DishView {
            dish,
            category_name: Some(category_name),
            flavors,
        })
    }

    pub async fn get_with_flavor(&self, id: i64) -> ServiceResult<DishView> {
        let dish = self
            .catalog
            .find_dish(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Dish", id))?;
        let category_name = self
            .catalog
            .find_category(dish.category_id)
            .await?
            .map(|category| category.name);
        let flavors = self.catalog.find_flavors(id).await?;

        Ok(DishView {
            dish,
            category_name,
            flavors,
        })
    }

    /// Overwrite a dish and replace its flavor set in one batch.
    /// Stopping a dish here has the same combo cascade as the status endpoint.
    #[instrument(skip(self, request), fields(dish_id = ?request.id))]
    pub async fn update_with_flavor(&self, request: DishRequest) -> ServiceResult<DishView> {
        request.validate()?;
        let id = request
            .id
            .ok_or_else(|| ServiceError::validation("id is required"))?;

        let mut dish = self
            .catalog
            .find_dish(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Dish", id))?;
        let category_name = self.category_name(request.category_id).await?;

        let previous_category = dish.category_id;
        let was_on_sale = dish.status.is_on_sale();
        dish.apply(&request);
        let stopped = was_on_sale && !dish.status.is_on_sale();

        let flavors: Vec<DishFlavor> = request
            .flavors
            .iter()
            .map(|flavor| DishFlavor::from_request(id, flavor))
            .collect();

        let mut writes = vec![CatalogWrite::PutDish(dish.clone())];
        for old in self.catalog.find_flavors(id).await? {
            writes.push(CatalogWrite::DeleteFlavor {
                dish_id: id,
                id: old.id,
            });
        }
        writes.extend(flavors.iter().cloned().map(CatalogWrite::PutFlavor));
        if stopped {
            writes.extend(self.guard.deactivation_cascade(&[id]).await?);
        }
        self.catalog.apply(writes).await?;

        self.cache.evict_dish_category(previous_category).await;
        if dish.category_id != previous_category {
            self.cache.evict_dish_category(dish.category_id).await;
        }
        if stopped {
            self.cache.evict_all_setmeals().await;
        }

        info!("Dish updated");
        Ok(DishView {
            dish,
            category_name: Some(category_name),
            flavors,
        })
    }

    /// Admin listing with category names, by sort then most recently updated
    pub async fn page(&self, query: &PageQuery) -> ServiceResult<Page<DishView>> {
        let filter = DishFilter {
            name: query.name_filter(),
            ..Default::default()
        };
        let dishes = self.sorted(filter).await?;
        let page = Page::slice(dishes, query);

        let category_names = self.category_names().await?;
        let mut records = Vec::with_capacity(page.records.len());
        for dish in &page.records {
            records.push(DishView {
                category_name: category_names.get(&dish.category_id).cloned(),
                flavors: self.catalog.find_flavors(dish.id).await?,
                dish: dish.clone(),
            });
        }

        Ok(Page {
            records,
            total: page.total,
            size: page.size,
            current: page.current,
        })
    }

    /// Dishes of a category with flavors, for the ordering front end.
    /// Lists scoped to one category and status are served from the cache.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: DishFilter) -> ServiceResult<Vec<DishView>> {
        let cache_scope = match (filter.category_id, filter.status, filter.name.as_ref()) {
            (Some(category_id), Some(status), None) => Some((category_id, status)),
            _ => None,
        };

        if let Some((category_id, status)) = cache_scope {
            if let Some(views) = self.cache.get_dishes(category_id, status).await {
                debug!(count = views.len(), "Dish list served from cache");
                return Ok(views);
            }
        }

        let dishes = self.sorted(filter).await?;
        let category_names = self.category_names().await?;
        let mut views = Vec::with_capacity(dishes.len());
        for dish in dishes {
            let flavors = self.catalog.find_flavors(dish.id).await?;
            views.push(DishView {
                category_name: category_names.get(&dish.category_id).cloned(),
                flavors,
                dish,
            });
        }

        if let Some((category_id, status)) = cache_scope {
            self.cache.put_dishes(category_id, status, &views).await;
        }
        Ok(views)
    }

    pub async fn set_status(&self, ids: &[i64], status: SaleStatus) -> ServiceResult<()> {
        self.guard.set_dish_status(ids, status).await
    }

    pub async fn delete(&self, ids: &[i64]) -> ServiceResult<()> {
        self.guard.delete_dishes(ids).await
    }

    async fn sorted(&self, filter: DishFilter) -> ServiceResult<Vec<Dish>> {
        let mut dishes = self.catalog.list_dishes(filter).await?;
        dishes.sort_by(|a, b| {
            a.sort
                .cmp(&b.sort)
                .then_with(|| b.update_time.cmp(&a.update_time))
        });
        Ok(dishes)
    }

    async fn category_name(&self, category_id: i64) -> ServiceResult<String> {
        self.catalog
            .find_category(category_id)
            .await?
            .map(|category| category.name)
            .ok_or_else(|| ServiceError::not_found("Category", category_id))
    }

    async fn category_names(&self) -> ServiceResult<HashMap<i64, String>> {
        Ok(self
            .catalog
            .list_categories(None)
            .await?
            .into_iter()
            .map(|category| (category.id, category.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlavorRequest;
    use crate::services::test_support::*;
    use rust_decimal_macros::dec;

    fn create_service(fixture: &Fixture) -> DishService {
        DishService::new(
            fixture.catalog.clone(),
            fixture.cache.clone(),
            fixture.guard.clone(),
        )
    }

    fn on_sale_in(category_id: i64) -> DishFilter {
        DishFilter {
            category_id: Some(category_id),
            status: Some(SaleStatus::OnSale),
            name: None,
        }
    }

    #[tokio::test]
    async fn test_save_and_get_with_flavor() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);
        let category = fixture.category("Mains").await;

        let created = service
            .save_with_flavor(dish_request(category.id, "Mapo tofu", SaleStatus::OnSale))
            .await
            .unwrap();
        assert_eq!(created.flavors.len(), 1);

        let loaded = service.get_with_flavor(created.dish.id).await.unwrap();
        assert_eq!(loaded.category_name.as_deref(), Some("Mains"));
        assert_eq!(loaded.flavors, created.flavors);
    }

    #[tokio::test]
    async fn test_save_requires_existing_category() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);

        let result = service
            .save_with_flavor(dish_request(404, "Mapo tofu", SaleStatus::OnSale))
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_missing_dish() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);

        let result = service.get_with_flavor(12345).await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_replaces_flavors() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);
        let category = fixture.category("Mains").await;
        let dish = fixture.dish(category.id, "Mapo tofu", SaleStatus::OnSale).await;

        let mut request = dish_request(category.id, "Mapo tofu", SaleStatus::OnSale);
        request.id = Some(dish.id);
        request.price = dec!(22.50);
        request.flavors = vec![
            FlavorRequest {
                name: "Sweetness".to_string(),
                value: vec!["none".to_string(), "light".to_string()],
            },
            FlavorRequest {
                name: "Temperature".to_string(),
                value: vec!["hot".to_string()],
            },
        ];

        let updated = service.update_with_flavor(request).await.unwrap();
        assert_eq!(updated.dish.price, dec!(22.50));

        let flavors = fixture.catalog.find_flavors(dish.id).await.unwrap();
        let mut names: Vec<&str> = flavors.iter().map(|flavor| flavor.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Sweetness", "Temperature"]);
    }

    #[tokio::test]
    async fn test_update_without_id_is_rejected() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);
        let category = fixture.category("Mains").await;

        let result = service
            .update_with_flavor(dish_request(category.id, "Mapo tofu", SaleStatus::OnSale))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_every_saved_flavor_is_stored() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);
        let category = fixture.category("Mains").await;

        for index in 0..200 {
            let mut request =
                dish_request(category.id, &format!("Dish {}", index), SaleStatus::OnSale);
            request.flavors = (0..10)
                .map(|flavor| FlavorRequest {
                    name: format!("Flavor {}", flavor),
                    value: vec!["mild".to_string()],
                })
                .collect();

            let created = service.save_with_flavor(request).await.unwrap();
            let stored = fixture.catalog.find_flavors(created.dish.id).await.unwrap();
            assert_eq!(stored.len(), 10, "dish {} lost flavors", index);
        }
    }

    #[tokio::test]
    async fn test_update_to_stopped_cascades_to_combos() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);
        let category = fixture.category("Mains").await;
        let dish = fixture.dish(category.id, "Mapo tofu", SaleStatus::OnSale).await;
        let combo = fixture
            .setmeal(category.id, "Tofu lunch", SaleStatus::OnSale, &[dish.id])
            .await;

        let mut request = dish_request(category.id, "Mapo tofu", SaleStatus::Stopped);
        request.id = Some(dish.id);
        service.update_with_flavor(request).await.unwrap();

        let combo = fixture.catalog.find_setmeal(combo.id).await.unwrap().unwrap();
        assert_eq!(combo.status, SaleStatus::Stopped);
    }

    #[tokio::test]
    async fn test_list_is_cached_and_rebuilt_after_change() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);
        let category = fixture.category("Mains").await;
        service
            .save_with_flavor(dish_request(category.id, "Mapo tofu", SaleStatus::OnSale))
            .await
            .unwrap();

        let first = service.list(on_sale_in(category.id)).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(
            fixture.cache.get_dishes(category.id, SaleStatus::OnSale).await,
            Some(first.clone())
        );

        // A write behind the service's back is invisible until eviction
        fixture.dish(category.id, "Fried rice", SaleStatus::OnSale).await;
        assert_eq!(service.list(on_sale_in(category.id)).await.unwrap().len(), 1);

        service
            .save_with_flavor(dish_request(category.id, "Wonton soup", SaleStatus::OnSale))
            .await
            .unwrap();
        assert_eq!(service.list(on_sale_in(category.id)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_excludes_stopped_dishes() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);
        let category = fixture.category("Mains").await;
        fixture.dish(category.id, "Mapo tofu", SaleStatus::OnSale).await;
        fixture.dish(category.id, "Fried rice", SaleStatus::Stopped).await;

        let views = service.list(on_sale_in(category.id)).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].dish.name, "Mapo tofu");
        assert_eq!(views[0].category_name.as_deref(), Some("Mains"));
    }

    #[tokio::test]
    async fn test_page_attaches_category_names() {
        let fixture = Fixture::new();
        let service = create_service(&fixture);
        let category = fixture.category("Mains").await;
        for name in ["Mapo tofu", "Fried rice", "Tofu soup"] {
            fixture.dish(category.id, name, SaleStatus::OnSale).await;
        }

        let page = service
            .page(&PageQuery {
                page: Some(1),
                page_size: Some(10),
                name: Some("tofu".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let page = service
            .page(&PageQuery {
                page: Some(2),
                page_size: Some(2),
                name: None,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].category_name.as_deref(), Some("Mains"));
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::ConsistencyGuard;
use crate::cache::CatalogCache;
use crate::models::{
    Page, PageQuery, SaleStatus, ServiceError, ServiceResult, Setmeal, SetmealDish,
    SetmealFilter, SetmealRequest, SetmealView, Validate,
};
use crate::repositories::{CatalogRepository, CatalogWrite};

/// Service for combos ("setmeals") and the dishes they contain
pub struct SetmealService {
    catalog: Arc<dyn CatalogRepository>,
    cache: CatalogCache,
    guard: Arc<ConsistencyGuard>,
}

impl SetmealService {
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

    /// Create a combo with its dish rows. A combo created on sale must only contain
    /// dishes that are on sale.
    #[instrument(skip(self, request), fields(name = %request.name, category_id = request.category_id))]
    pub async fn save_with_dishes(&self, request: SetmealRequest) -> ServiceResult<SetmealView> {
        request.validate()?;
        let category_name = self
            .catalog
            .find_category(request.category_id)
            .await?
            .map(|category| category.name)
            .ok_or_else(|| ServiceError::not_found("Category", request.category_id))?;

        let setmeal = Setmeal::new(&request);
        let rows: Vec<SetmealDish> = request
            .setmeal_dishes
            .iter()
            .map(|row| SetmealDish::from_request(setmeal.id, row))
            .collect();

        if setmeal.status.is_on_sale() {
            self.guard
                .ensure_dishes_on_sale(&setmeal.name, &rows)
                .await?;
        }

        let mut writes = vec![CatalogWrite::PutSetmeal(setmeal.clone())];
        writes.extend(rows.iter().cloned().map(CatalogWrite::PutSetmealDish));
        self.catalog.apply(writes).await?;

        self.cache.evict_all_setmeals().await;

        info!(setmeal_id = setmeal.id, "Combo created");
        Ok(SetmealView {
            setmeal,
            category_name: Some(category_name),
            setmeal_dishes: rows,
        })
    }

    /// Admin listing with category names, on-sale combos first, then most recently updated
    pub async fn page(&self, query: &PageQuery) -> ServiceResult<Page<SetmealView>> {
        let filter = SetmealFilter {
            name: query.name_filter(),
            ..Default::default()
        };
        let mut setmeals = self.catalog.list_setmeals(filter).await?;
        setmeals.sort_by(|a, b| {
            b.status
                .code()
                .cmp(&a.status.code())
                .then_with(|| b.update_time.cmp(&a.update_time))
        });
        let page = Page::slice(setmeals, query);

        let category_names: HashMap<i64, String> = self
            .catalog
            .list_categories(None)
            .await?
            .into_iter()
            .map(|category| (category.id, category.name))
            .collect();

        let mut records = Vec::with_capacity(page.records.len());
        for setmeal in &page.records {
            records.push(SetmealView {
                category_name: category_names.get(&setmeal.category_id).cloned(),
                setmeal_dishes: self.catalog.find_setmeal_dishes(setmeal.id).await?,
                setmeal: setmeal.clone(),
            });
        }

        Ok(Page {
            records,
            total: page.total,
            size: page.size,
            current: page.current,
        })
    }

    /// Combos of a category for the ordering front end; cached per category and status
    #[instrument(skip(self))]
    pub async fn list(&self, filter: SetmealFilter) -> ServiceResult<Vec<Setmeal>> {
        let cache_scope = match (filter.category_id, filter.status, filter.name.as_ref()) {
            (Some(category_id), Some(status), None) => Some((category_id, status)),
            _ => None,
        };

        if let Some((category_id, status)) = cache_scope {
            if let Some(setmeals) = self.cache.get_setmeals(category_id, status).await {
                debug!(count = setmeals.len(), "Combo list served from cache");
                return Ok(setmeals);
            }
        }

        let mut setmeals = self.catalog.list_setmeals(filter).await?;
        setmeals.sort_by(|a, b| b.update_time.cmp(&a.update_time));

        if let Some((category_id, status)) = cache_scope {
            self.cache.put_setmeals(category_id, status, &setmeals).await;
        }
        Ok(setmeals)
    }

    pub async fn set_status(&self, ids: &[i64], status: SaleStatus) -> ServiceResult<()> {
        self.guard.set_setmeal_status(ids, status).await
    }

    pub async fn delete(&self, ids: &[i64]) -> ServiceResult<()> {
        self.guard.delete_setmeals(ids).await
    }
}

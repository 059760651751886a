use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::cache::CatalogCache;
use crate::models::{
    Dish, SaleStatus, ServiceError, ServiceResult, Setmeal, SetmealDish,
};
use crate::observability::OperationTracer;
use crate::repositories::{CatalogRepository, CatalogWrite};

/// Cross-entity rules of the catalog.
///
/// Every rule is checked against the store before any write is issued, and the
/// writes of one call are handed to [`CatalogRepository::apply`] as a single
/// batch. Cache eviction happens after the batch commits.
pub struct ConsistencyGuard {
    catalog: Arc<dyn CatalogRepository>,
    cache: CatalogCache,
    tracer: OperationTracer,
}

impl ConsistencyGuard {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        cache: CatalogCache,
        tracer: OperationTracer,
    ) -> Self {
        Self {
            catalog,
            cache,
            tracer,
        }
    }

    /// Delete a category that no dish or combo references
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: i64) -> ServiceResult<()> {
        self.tracer
            .trace_catalog_operation("delete_category", async {
                if self.catalog.find_category(id).await?.is_none() {
                    return Err(ServiceError::not_found("Category", id));
                }

                if self.catalog.count_dishes_in_category(id).await? > 0 {
                    return Err(ServiceError::conflict(
                        "Category is linked to dishes and cannot be deleted",
                    ));
                }
                if self.catalog.count_setmeals_in_category(id).await? > 0 {
                    return Err(ServiceError::conflict(
                        "Category is linked to combos and cannot be deleted",
                    ));
                }

                self.catalog
                    .apply(vec![CatalogWrite::DeleteCategory(id)])
                    .await?;
                self.cache.evict_dish_category(id).await;

                info!("Category deleted");
                Ok(())
            })
            .await
    }

    /// Set the sale status of dishes. Stopping a dish also stops every combo containing it.
    #[instrument(skip(self, ids), fields(count = ids.len(), status = %status))]
    pub async fn set_dish_status(&self, ids: &[i64], status: SaleStatus) -> ServiceResult<()> {
        self.tracer
            .trace_catalog_operation("set_dish_status", async {
                let ids = distinct_ids(ids)?;
                let mut dishes = Vec::with_capacity(ids.len());
                for id in &ids {
                    let mut dish = self.load_dish(*id).await?;
                    dish.set_status(status);
                    dishes.push(dish);
                }

                let mut writes = Vec::new();
                if !status.is_on_sale() {
                    writes.extend(self.deactivation_cascade(&ids).await?);
                }
                let categories: BTreeSet<i64> =
                    dishes.iter().map(|dish| dish.category_id).collect();
                writes.extend(dishes.into_iter().map(CatalogWrite::PutDish));

                self.catalog.apply(writes).await?;

                for category_id in categories {
                    self.cache.evict_dish_category(category_id).await;
                }
                if !status.is_on_sale() {
                    self.cache.evict_all_setmeals().await;
                }

                info!("Dish status updated");
                Ok(())
            })
            .await
    }

    /// Writes that stop every on-sale combo containing one of `dish_ids`.
    /// Each combo appears at most once, however many of the dishes it holds.
    pub async fn deactivation_cascade(&self, dish_ids: &[i64]) -> ServiceResult<Vec<CatalogWrite>> {
        let mut setmeal_ids = BTreeSet::new();
        for dish_id in dish_ids {
            for row in self.catalog.find_setmeal_dishes_by_dish(*dish_id).await? {
                setmeal_ids.insert(row.setmeal_id);
            }
        }

        let mut writes = Vec::new();
        for setmeal_id in setmeal_ids {
            if let Some(mut setmeal) = self.catalog.find_setmeal(setmeal_id).await? {
                if setmeal.status.is_on_sale() {
                    setmeal.set_status(SaleStatus::Stopped);
                    writes.push(CatalogWrite::PutSetmeal(setmeal));
                }
            }
        }

        if !writes.is_empty() {
            info!(combos = writes.len(), "Stopping combos that contain stopped dishes");
        }
        Ok(writes)
    }

    /// Set the sale status of combos. Activation requires every contained dish to be on sale.
    #[instrument(skip(self, ids), fields(count = ids.len(), status = %status))]
    pub async fn set_setmeal_status(&self, ids: &[i64], status: SaleStatus) -> ServiceResult<()> {
        self.tracer
            .trace_catalog_operation("set_setmeal_status", async {
                let ids = distinct_ids(ids)?;
                let mut writes = Vec::with_capacity(ids.len());
                for id in ids {
                    let mut setmeal = self.load_setmeal(id).await?;
                    if status.is_on_sale() {
                        let rows = self.catalog.find_setmeal_dishes(id).await?;
                        self.ensure_dishes_on_sale(&setmeal.name, &rows).await?;
                    }
                    setmeal.set_status(status);
                    writes.push(CatalogWrite::PutSetmeal(setmeal));
                }

                self.catalog.apply(writes).await?;
                self.cache.evict_all_setmeals().await;

                info!("Combo status updated");
                Ok(())
            })
            .await
    }

    /// Conflict unless every dish referenced by `rows` exists and is on sale
    pub async fn ensure_dishes_on_sale(
        &self,
        setmeal_name: &str,
        rows: &[SetmealDish],
    ) -> ServiceResult<()> {
        for row in rows {
            match self.catalog.find_dish(row.dish_id).await? {
                Some(dish) if dish.status.is_on_sale() => {}
                Some(dish) => {
                    return Err(ServiceError::conflict(format!(
                        "Combo {} contains a deactivated dish: {}",
                        setmeal_name, dish.name
                    )));
                }
                None => {
                    return Err(ServiceError::conflict(format!(
                        "Combo {} contains a dish that no longer exists: {}",
                        setmeal_name, row.dish_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Delete stopped combos together with their dish rows
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_setmeals(&self, ids: &[i64]) -> ServiceResult<()> {
        self.tracer
            .trace_catalog_operation("delete_setmeals", async {
                let ids = distinct_ids(ids)?;
                let mut writes = Vec::new();
                for id in ids {
                    let setmeal = self.load_setmeal(id).await?;
                    if setmeal.status.is_on_sale() {
                        return Err(ServiceError::conflict(format!(
                            "Combo {} is on sale and cannot be deleted",
                            setmeal.name
                        )));
                    }
                    for row in self.catalog.find_setmeal_dishes(id).await? {
                        writes.push(CatalogWrite::DeleteSetmealDish {
                            setmeal_id: row.setmeal_id,
                            dish_id: row.dish_id,
                        });
                    }
                    writes.push(CatalogWrite::DeleteSetmeal(id));
                }

                self.catalog.apply(writes).await?;
                self.cache.evict_all_setmeals().await;

                info!("Combos deleted");
                Ok(())
            })
            .await
    }

    /// Delete dishes and their flavors; a dish used by any combo cannot be deleted
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_dishes(&self, ids: &[i64]) -> ServiceResult<()> {
        self.tracer
            .trace_catalog_operation("delete_dishes", async {
                let ids = distinct_ids(ids)?;
                let mut writes = Vec::new();
                for id in ids {
                    let dish = self.load_dish(id).await?;
                    if !self.catalog.find_setmeal_dishes_by_dish(id).await?.is_empty() {
                        return Err(ServiceError::conflict(format!(
                            "Dish {} is part of a combo and cannot be deleted",
                            dish.name
                        )));
                    }
                    for flavor in self.catalog.find_flavors(id).await? {
                        writes.push(CatalogWrite::DeleteFlavor {
                            dish_id: id,
                            id: flavor.id,
                        });
                    }
                    writes.push(CatalogWrite::DeleteDish(id));
                }

                self.catalog.apply(writes).await?;
                self.cache.evict_all_dishes().await;

                info!("Dishes deleted");
                Ok(())
            })
            .await
    }

    async fn load_dish(&self, id: i64) -> ServiceResult<Dish> {
        self.catalog
            .find_dish(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Dish", id))
    }

    async fn load_setmeal(&self, id: i64) -> ServiceResult<Setmeal> {
        self.catalog
            .find_setmeal(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Setmeal", id))
    }
}

/// Batch ids without duplicates, in request order. An empty batch is rejected.
pub fn distinct_ids(ids: &[i64]) -> ServiceResult<Vec<i64>> {
    if ids.is_empty() {
        return Err(ServiceError::validation("ids cannot be empty"));
    }
    let mut seen = BTreeSet::new();
    Ok(ids.iter().copied().filter(|id| seen.insert(*id)).collect())
}

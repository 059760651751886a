use std::sync::Arc;
use tracing::{info, instrument};

use super::ConsistencyGuard;
use crate::cache::CatalogCache;
use crate::models::{
    Category, CategoryType, CreateCategoryRequest, Page, PageQuery, ServiceError, ServiceResult,
    UpdateCategoryRequest, Validate,
};
use crate::repositories::{CatalogRepository, CatalogWrite};

/// Service for managing menu categories
pub struct CategoryService {
    catalog: Arc<dyn CatalogRepository>,
    cache: CatalogCache,
    guard: Arc<ConsistencyGuard>,
}

impl CategoryService {
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

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateCategoryRequest) -> ServiceResult<Category> {
        request.validate()?;
        self.ensure_unique_name(&request.name, None).await?;

        let category = Category::new(request);
        self.catalog
            .apply(vec![CatalogWrite::PutCategory(category.clone())])
            .await?;

        info!(category_id = category.id, "Category created");
        Ok(category)
    }

    /// Rename or re-sort a category. A rename invalidates every cached list
    /// that embeds the category name.
    #[instrument(skip(self, request), fields(category_id = request.id))]
    pub async fn update(&self, request: UpdateCategoryRequest) -> ServiceResult<Category> {
        request.validate()?;

        let mut category = self
            .catalog
            .find_category(request.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", request.id))?;

        let renamed = request
            .name
            .as_deref()
            .map_or(false, |name| name.trim() != category.name);
        if renamed {
            if let Some(name) = request.name.as_deref() {
                self.ensure_unique_name(name, Some(category.id)).await?;
            }
        }

        category.update(request);
        self.catalog
            .apply(vec![CatalogWrite::PutCategory(category.clone())])
            .await?;

        if renamed {
            self.cache.evict_dish_category(category.id).await;
            self.cache.evict_all_setmeals().await;
        }

        info!("Category updated");
        Ok(category)
    }

    pub async fn page(&self, query: &PageQuery) -> ServiceResult<Page<Category>> {
        let mut categories = self.sorted(None).await?;
        if let Some(name) = query.name_filter() {
            categories.retain(|category| category.name.contains(&name));
        }
        Ok(Page::slice(categories, query))
    }

    /// Categories of one type (or all), by sort then most recently updated
    pub async fn list(&self, category_type: Option<CategoryType>) -> ServiceResult<Vec<Category>> {
        self.sorted(category_type).await
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.guard.delete_category(id).await
    }

    async fn sorted(&self, category_type: Option<CategoryType>) -> ServiceResult<Vec<Category>> {
        let mut categories = self.catalog.list_categories(category_type).await?;
        categories.sort_by(|a, b| {
            a.sort
                .cmp(&b.sort)
                .then_with(|| b.update_time.cmp(&a.update_time))
        });
        Ok(categories)
    }

    /// Best-effort uniqueness; two concurrent creates may still both pass
    async fn ensure_unique_name(&self, name: &str, except: Option<i64>) -> ServiceResult<()> {
        let name = name.trim();
        let taken = self
            .catalog
            .list_categories(None)
            .await?
            .iter()
            .any(|category| category.name == name && Some(category.id) != except);
        if taken {
            return Err(ServiceError::conflict(format!(
                "Category name already exists: {}",
                name
            )));
        }
        Ok(())
    }
}

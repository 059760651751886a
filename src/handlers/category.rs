use axum::extract::State;
use serde::Deserialize;
use tracing::{info, instrument};

use super::extract::{Params, Payload};
use super::response::{service_error_to_response, success, HandlerResult};
use crate::app::AppState;
use crate::models::{Category, CategoryType, CreateCategoryRequest, Page, PageQuery, UpdateCategoryRequest};

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryIdQuery {
    pub id: i64,
}

#[instrument(name = "create_category", skip(state, request), fields(name = %request.name))]
pub async fn create_category(
    State(state): State<AppState>,
    Payload(request): Payload<CreateCategoryRequest>,
) -> HandlerResult<Category> {
    state
        .categories
        .create(request)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "update_category", skip(state, request), fields(category_id = request.id))]
pub async fn update_category(
    State(state): State<AppState>,
    Payload(request): Payload<UpdateCategoryRequest>,
) -> HandlerResult<Category> {
    state
        .categories
        .update(request)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "category_page", skip(state))]
pub async fn category_page(
    State(state): State<AppState>,
    Params(query): Params<PageQuery>,
) -> HandlerResult<Page<Category>> {
    state
        .categories
        .page(&query)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "category_list", skip(state))]
pub async fn category_list(
    State(state): State<AppState>,
    Params(query): Params<CategoryListQuery>,
) -> HandlerResult<Vec<Category>> {
    state
        .categories
        .list(query.category_type)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "delete_category", skip(state), fields(category_id = query.id))]
pub async fn delete_category(
    State(state): State<AppState>,
    Params(query): Params<CategoryIdQuery>,
) -> HandlerResult<String> {
    match state.categories.delete(query.id).await {
        Ok(()) => {
            info!("Category deleted");
            Ok(success("Category deleted".to_string()))
        }
        Err(err) => Err(service_error_to_response(err)),
    }
}

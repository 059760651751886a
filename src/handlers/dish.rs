use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::{info, instrument};

use super::extract::{IdsQuery, Params, Payload};
use super::response::{service_error_to_response, success, HandlerResult};
use crate::app::AppState;
use crate::models::{DishFilter, DishRequest, DishView, Page, PageQuery, SaleStatus};

/// `GET /dish/list?categoryId=..&status=..&name=..`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishListQuery {
    pub category_id: Option<i64>,
    pub status: Option<SaleStatus>,
    pub name: Option<String>,
}

impl From<DishListQuery> for DishFilter {
    fn from(query: DishListQuery) -> Self {
        DishFilter {
            category_id: query.category_id,
            // The ordering front end only ever sees dishes on sale
            status: Some(query.status.unwrap_or(SaleStatus::OnSale)),
            name: query
                .name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        }
    }
}

#[instrument(name = "save_dish", skip(state, request), fields(name = %request.name))]
pub async fn save_dish(
    State(state): State<AppState>,
    Payload(request): Payload<DishRequest>,
) -> HandlerResult<DishView> {
    state
        .dishes
        .save_with_flavor(request)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "update_dish", skip(state, request), fields(dish_id = ?request.id))]
pub async fn update_dish(
    State(state): State<AppState>,
    Payload(request): Payload<DishRequest>,
) -> HandlerResult<DishView> {
    state
        .dishes
        .update_with_flavor(request)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "get_dish", skip(state), fields(dish_id = %id))]
pub async fn get_dish(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult<DishView> {
    state
        .dishes
        .get_with_flavor(id)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "dish_page", skip(state))]
pub async fn dish_page(
    State(state): State<AppState>,
    Params(query): Params<PageQuery>,
) -> HandlerResult<Page<DishView>> {
    state
        .dishes
        .page(&query)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "dish_list", skip(state))]
pub async fn dish_list(
    State(state): State<AppState>,
    Params(query): Params<DishListQuery>,
) -> HandlerResult<Vec<DishView>> {
    state
        .dishes
        .list(query.into())
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "set_dish_status", skip(state), fields(status = %status, ids = %query.ids))]
pub async fn set_dish_status(
    State(state): State<AppState>,
    Path(status): Path<SaleStatus>,
    Params(query): Params<IdsQuery>,
) -> HandlerResult<String> {
    let result = match query.parse() {
        Ok(ids) => state.dishes.set_status(&ids, status).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => {
            info!("Dish status updated");
            Ok(success("Dish status updated".to_string()))
        }
        Err(err) => Err(service_error_to_response(err)),
    }
}

#[instrument(name = "delete_dishes", skip(state), fields(ids = %query.ids))]
pub async fn delete_dishes(
    State(state): State<AppState>,
    Params(query): Params<IdsQuery>,
) -> HandlerResult<String> {
    let result = match query.parse() {
        Ok(ids) => state.dishes.delete(&ids).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => {
            info!("Dishes deleted");
            Ok(success("Dishes deleted".to_string()))
        }
        Err(err) => Err(service_error_to_response(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults_to_on_sale() {
        let filter: DishFilter = DishListQuery {
            category_id: Some(3),
            status: None,
            name: Some("  ".to_string()),
        }
        .into();

        assert_eq!(filter.category_id, Some(3));
        assert_eq!(filter.status, Some(SaleStatus::OnSale));
        assert_eq!(filter.name, None);
    }
}

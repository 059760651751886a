use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::{info, instrument};

use super::extract::{IdsQuery, Params, Payload};
use super::response::{service_error_to_response, success, HandlerResult};
use crate::app::AppState;
use crate::models::{
    Page, PageQuery, SaleStatus, Setmeal, SetmealFilter, SetmealRequest, SetmealView,
};

/// `GET /setmeal/list?categoryId=..&status=..`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetmealListQuery {
    pub category_id: Option<i64>,
    pub status: Option<SaleStatus>,
}

impl From<SetmealListQuery> for SetmealFilter {
    fn from(query: SetmealListQuery) -> Self {
        SetmealFilter {
            category_id: query.category_id,
            status: query.status,
            name: None,
        }
    }
}

#[instrument(name = "save_setmeal", skip(state, request), fields(name = %request.name))]
pub async fn save_setmeal(
    State(state): State<AppState>,
    Payload(request): Payload<SetmealRequest>,
) -> HandlerResult<SetmealView> {
    state
        .setmeals
        .save_with_dishes(request)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "setmeal_page", skip(state))]
pub async fn setmeal_page(
    State(state): State<AppState>,
    Params(query): Params<PageQuery>,
) -> HandlerResult<Page<SetmealView>> {
    state
        .setmeals
        .page(&query)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "setmeal_list", skip(state))]
pub async fn setmeal_list(
    State(state): State<AppState>,
    Params(query): Params<SetmealListQuery>,
) -> HandlerResult<Vec<Setmeal>> {
    state
        .setmeals
        .list(query.into())
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "set_setmeal_status", skip(state), fields(status = %status, ids = %query.ids))]
pub async fn set_setmeal_status(
    State(state): State<AppState>,
    Path(status): Path<SaleStatus>,
    Params(query): Params<IdsQuery>,
) -> HandlerResult<String> {
    let result = match query.parse() {
        Ok(ids) => state.setmeals.set_status(&ids, status).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => {
            info!("Combo status updated");
            Ok(success("Combo status updated".to_string()))
        }
        Err(err) => Err(service_error_to_response(err)),
    }
}

#[instrument(name = "delete_setmeals", skip(state), fields(ids = %query.ids))]
pub async fn delete_setmeals(
    State(state): State<AppState>,
    Params(query): Params<IdsQuery>,
) -> HandlerResult<String> {
    let result = match query.parse() {
        Ok(ids) => state.setmeals.delete(&ids).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => {
            info!("Combos deleted");
            Ok(success("Combos deleted".to_string()))
        }
        Err(err) => Err(service_error_to_response(err)),
    }
}

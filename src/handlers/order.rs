use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use super::extract::{Params, Payload};
use super::response::{service_error_to_response, success, HandlerResult};
use crate::app::AppState;
use crate::models::{
    parse_order_time, CurrentUser, Order, OrderFilter, OrderView, Page, PageQuery, ServiceError,
    ServiceResult, SubmitOrderRequest, UpdateOrderStatusRequest, ORDER_TIME_FORMAT,
};

/// `GET /order/page?page=..&pageSize=..&number=..&beginTime=..&endTime=..`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub number: Option<String>,
    pub begin_time: Option<String>,
    pub end_time: Option<String>,
}

impl OrderPageQuery {
    fn paging(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            page_size: self.page_size,
            name: None,
        }
    }

    fn filter(&self) -> ServiceResult<OrderFilter> {
        Ok(OrderFilter {
            user_id: None,
            number: non_blank(self.number.as_deref()),
            begin_time: time_bound("beginTime", self.begin_time.as_deref())?,
            end_time: time_bound("endTime", self.end_time.as_deref())?,
        })
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn time_bound(
    field: &str,
    raw: Option<&str>,
) -> ServiceResult<Option<chrono::DateTime<chrono::Utc>>> {
    match non_blank(raw) {
        None => Ok(None),
        Some(value) => parse_order_time(&value).map(Some).ok_or_else(|| {
            ServiceError::validation(format!(
                "{} must use the format {}",
                field, ORDER_TIME_FORMAT
            ))
        }),
    }
}

#[instrument(name = "submit_order", skip(state, request), fields(user_id = user.user_id))]
pub async fn submit_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Payload(request): Payload<SubmitOrderRequest>,
) -> HandlerResult<Order> {
    match state.orders.submit(&user, request).await {
        Ok(order) => {
            crate::info_with_trace!(
                "Order {} submitted for user {}, amount {}",
                order.number,
                user.user_id,
                order.amount
            );
            Ok(success(order))
        }
        Err(err) => {
            crate::warn_with_trace!("Order submission failed for user {}: {}", user.user_id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "user_order_page", skip(state), fields(user_id = user.user_id))]
pub async fn user_order_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Params(query): Params<PageQuery>,
) -> HandlerResult<Page<OrderView>> {
    state
        .orders
        .user_page(&user, &query)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "order_page", skip(state))]
pub async fn order_page(
    State(state): State<AppState>,
    Params(query): Params<OrderPageQuery>,
) -> HandlerResult<Page<Order>> {
    let filter = query.filter().map_err(service_error_to_response)?;
    state
        .orders
        .page(&query.paging(), filter)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "update_order_status", skip(state, request), fields(order_id = ?request.id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    Payload(request): Payload<UpdateOrderStatusRequest>,
) -> HandlerResult<Order> {
    state
        .orders
        .update_status(request)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_page_filter_parses_time_range() {
        let query = OrderPageQuery {
            number: Some(" 123 ".to_string()),
            begin_time: Some("2024-05-01 00:00:00".to_string()),
            end_time: Some("".to_string()),
            ..OrderPageQuery::default()
        };
        let filter = query.filter().unwrap();

        assert_eq!(filter.number.as_deref(), Some("123"));
        assert!(filter.begin_time.is_some());
        assert!(filter.end_time.is_none());
    }

    #[test]
    fn test_order_page_filter_rejects_bad_time() {
        let query = OrderPageQuery {
            begin_time: Some("May 1st".to_string()),
            ..OrderPageQuery::default()
        };
        assert!(matches!(
            query.filter(),
            Err(ServiceError::Validation { .. })
        ));
    }
}

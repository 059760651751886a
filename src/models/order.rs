use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{snowflake_id, OrderStatus, ShoppingCartItem};

/// Wire format of admin time-range filters
pub const ORDER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Order header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub number: String,
    pub status: OrderStatus,
    pub user_id: i64,
    pub address_book_id: Option<i64>,
    pub order_time: DateTime<Utc>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub pay_method: u8,
    pub amount: Decimal,
    pub remark: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub consignee: Option<String>,
}

/// One line of an order, copied from a cart line at submit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: i64,
    pub order_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub dish_id: Option<i64>,
    pub setmeal_id: Option<i64>,
    pub dish_flavor: Option<String>,
    pub number: u32,
    pub amount: Decimal,
}

/// Payload of `POST /order/submit`; delivery fields are stored as given
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    pub address_book_id: Option<i64>,
    #[serde(default = "default_pay_method")]
    pub pay_method: u8,
    pub remark: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub consignee: Option<String>,
}

fn default_pay_method() -> u8 {
    1
}

/// Payload of `PUT /order`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub id: Option<i64>,
    pub status: Option<OrderStatus>,
}

/// Order header with its detail lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub order_details: Vec<OrderDetail>,
}

/// Admin order query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub user_id: Option<i64>,
    pub number: Option<String>,
    pub begin_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(user_id: i64, request: &SubmitOrderRequest, amount: Decimal) -> Self {
        let id = snowflake_id();
        Self {
            id,
            number: id.to_string(),
            status: OrderStatus::PendingPayment,
            user_id,
            address_book_id: request.address_book_id,
            order_time: Utc::now(),
            checkout_time: None,
            pay_method: request.pay_method,
            amount,
            remark: request.remark.clone(),
            phone: request.phone.clone(),
            address: request.address.clone(),
            consignee: request.consignee.clone(),
        }
    }
}

impl OrderDetail {
    pub fn from_cart_item(order_id: i64, item: &ShoppingCartItem) -> Self {
        Self {
            id: snowflake_id(),
            order_id,
            name: item.name.clone(),
            image: item.image.clone(),
            dish_id: item.dish_id,
            setmeal_id: item.setmeal_id,
            dish_flavor: item.dish_flavor.clone(),
            number: item.number,
            amount: item.amount,
        }
    }
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |id| order.user_id == id)
            && self
                .number
                .as_deref()
                .map_or(true, |number| order.number.contains(number))
            && self.begin_time.map_or(true, |begin| order.order_time >= begin)
            && self.end_time.map_or(true, |end| order.order_time <= end)
    }
}

/// Parse `yyyy-MM-dd HH:mm:ss` as a UTC timestamp
pub fn parse_order_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), ORDER_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn order_at(time: DateTime<Utc>) -> Order {
        let mut order = Order::new(1, &SubmitOrderRequest::default(), dec!(10));
        order.order_time = time;
        order
    }

    #[test]
    fn test_new_order_is_pending_and_numbered_by_id() {
        let order = Order::new(5, &SubmitOrderRequest::default(), dec!(42.50));
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.number, order.id.to_string());
        assert_eq!(order.user_id, 5);
    }

    #[test]
    fn test_parse_order_time() {
        let parsed = parse_order_time("2024-05-01 12:30:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap());
        assert!(parse_order_time("2024-05-01").is_none());
    }

    #[test]
    fn test_filter_time_range_is_inclusive() {
        let begin = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = begin + Duration::hours(1);
        let filter = OrderFilter {
            begin_time: Some(begin),
            end_time: Some(end),
            ..OrderFilter::default()
        };

        assert!(filter.matches(&order_at(begin)));
        assert!(filter.matches(&order_at(end)));
        assert!(!filter.matches(&order_at(end + Duration::seconds(1))));
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::snowflake_id;

/// What a cart line refers to. A user holds at most one line per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartItemKey {
    Dish(i64),
    Setmeal(i64),
}

impl CartItemKey {
    /// Resolve the key from optional ids; a dish id wins when both are present
    pub fn from_ids(dish_id: Option<i64>, setmeal_id: Option<i64>) -> Option<Self> {
        match (dish_id, setmeal_id) {
            (Some(dish_id), _) => Some(CartItemKey::Dish(dish_id)),
            (None, Some(setmeal_id)) => Some(CartItemKey::Setmeal(setmeal_id)),
            (None, None) => None,
        }
    }

    /// Storage sort key, e.g. `dish#42`
    pub fn storage_key(&self) -> String {
        self.to_string()
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (kind, id) = raw.split_once('#')?;
        let id = id.parse().ok()?;
        match kind {
            "dish" => Some(CartItemKey::Dish(id)),
            "setmeal" => Some(CartItemKey::Setmeal(id)),
            _ => None,
        }
    }
}

impl fmt::Display for CartItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartItemKey::Dish(id) => write!(f, "dish#{}", id),
            CartItemKey::Setmeal(id) => write!(f, "setmeal#{}", id),
        }
    }
}

/// One line of a user's shopping cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCartItem {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub dish_id: Option<i64>,
    pub setmeal_id: Option<i64>,
    pub dish_flavor: Option<String>,
    pub number: u32,
    pub amount: Decimal,
    pub create_time: DateTime<Utc>,
}

/// Payload of `POST /shoppingCart/add` and `POST /shoppingCart/sub`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub dish_id: Option<i64>,
    pub setmeal_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    pub image: Option<String>,
    pub dish_flavor: Option<String>,
    #[serde(default)]
    pub amount: Decimal,
}

impl CartItemRequest {
    pub fn key(&self) -> Option<CartItemKey> {
        CartItemKey::from_ids(self.dish_id, self.setmeal_id)
    }
}

impl ShoppingCartItem {
    /// Create a fresh line with quantity 1
    pub fn new(user_id: i64, key: CartItemKey, request: &CartItemRequest) -> Self {
        let (dish_id, setmeal_id) = match key {
            CartItemKey::Dish(id) => (Some(id), None),
            CartItemKey::Setmeal(id) => (None, Some(id)),
        };
        Self {
            id: snowflake_id(),
            user_id,
            name: request.name.clone(),
            image: request.image.clone(),
            dish_id,
            setmeal_id,
            dish_flavor: if dish_id.is_some() {
                request.dish_flavor.clone()
            } else {
                None
            },
            number: 1,
            amount: request.amount,
            create_time: Utc::now(),
        }
    }

    pub fn key(&self) -> Option<CartItemKey> {
        CartItemKey::from_ids(self.dish_id, self.setmeal_id)
    }

    /// Line total: unit amount times quantity
    pub fn line_total(&self) -> Decimal {
        self.amount * Decimal::from(self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_key_prefers_dish() {
        assert_eq!(
            CartItemKey::from_ids(Some(1), Some(2)),
            Some(CartItemKey::Dish(1))
        );
        assert_eq!(
            CartItemKey::from_ids(None, Some(2)),
            Some(CartItemKey::Setmeal(2))
        );
        assert_eq!(CartItemKey::from_ids(None, None), None);
    }

    #[test]
    fn test_storage_key_parses_back() {
        let key = CartItemKey::Setmeal(77);
        assert_eq!(key.storage_key(), "setmeal#77");
        assert_eq!(CartItemKey::parse("setmeal#77"), Some(key));
        assert_eq!(CartItemKey::parse("drink#1"), None);
        assert_eq!(CartItemKey::parse("dish#abc"), None);
    }

    #[test]
    fn test_new_line_starts_at_one() {
        let request = CartItemRequest {
            setmeal_id: Some(5),
            name: "Family set".to_string(),
            dish_flavor: Some("hot".to_string()),
            amount: dec!(99.5),
            ..CartItemRequest::default()
        };

        let mut item = ShoppingCartItem::new(10, request.key().unwrap(), &request);
        assert_eq!(item.number, 1);
        assert_eq!(item.dish_flavor, None);

        item.number = 3;
        assert_eq!(item.line_total(), dec!(298.5));
    }
}

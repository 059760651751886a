use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{snowflake_id, SaleStatus};

/// A combo meal bundling several dishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setmeal {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub price: Decimal,
    pub status: SaleStatus,
    pub code: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Junction row: `copies` portions of a dish inside a combo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetmealDish {
    pub id: i64,
    pub setmeal_id: i64,
    pub dish_id: i64,
    pub name: String,
    pub price: Decimal,
    pub copies: u32,
    pub sort: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetmealDishRequest {
    pub dish_id: i64,
    pub name: String,
    pub price: Decimal,
    pub copies: u32,
    #[serde(default)]
    pub sort: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetmealRequest {
    pub category_id: i64,
    pub name: String,
    pub price: Decimal,
    pub status: Option<SaleStatus>,
    #[serde(default)]
    pub code: String,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub setmeal_dishes: Vec<SetmealDishRequest>,
}

/// Combo enriched with its dishes and category name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetmealView {
    #[serde(flatten)]
    pub setmeal: Setmeal,
    pub category_name: Option<String>,
    pub setmeal_dishes: Vec<SetmealDish>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetmealFilter {
    pub category_id: Option<i64>,
    pub status: Option<SaleStatus>,
    pub name: Option<String>,
}

impl Setmeal {
    pub fn new(request: &SetmealRequest) -> Self {
        let now = Utc::now();
        Self {
            id: snowflake_id(),
            category_id: request.category_id,
            name: request.name.trim().to_string(),
            price: request.price,
            status: request.status.unwrap_or_default(),
            code: request.code.clone(),
            description: request.description.clone(),
            image: request.image.clone(),
            create_time: now,
            update_time: now,
        }
    }

    pub fn set_status(&mut self, status: SaleStatus) {
        self.status = status;
        self.update_time = Utc::now();
    }
}

impl SetmealDish {
    pub fn from_request(setmeal_id: i64, request: &SetmealDishRequest) -> Self {
        Self {
            id: snowflake_id(),
            setmeal_id,
            dish_id: request.dish_id,
            name: request.name.trim().to_string(),
            price: request.price,
            copies: request.copies,
            sort: request.sort,
        }
    }
}

impl SetmealFilter {
    pub fn matches(&self, setmeal: &Setmeal) -> bool {
        self.category_id.map_or(true, |id| setmeal.category_id == id)
            && self.status.map_or(true, |status| setmeal.status == status)
            && self
                .name
                .as_deref()
                .map_or(true, |name| setmeal.name.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_junction_rows_carry_setmeal_id() {
        let request = SetmealRequest {
            category_id: 3,
            name: "Family set".to_string(),
            price: dec!(128),
            status: Some(SaleStatus::Stopped),
            code: String::new(),
            description: None,
            image: None,
            setmeal_dishes: vec![SetmealDishRequest {
                dish_id: 11,
                name: "Rice".to_string(),
                price: dec!(2),
                copies: 4,
                sort: 0,
            }],
        };

        let setmeal = Setmeal::new(&request);
        let rows: Vec<SetmealDish> = request
            .setmeal_dishes
            .iter()
            .map(|dish| SetmealDish::from_request(setmeal.id, dish))
            .collect();

        assert_eq!(setmeal.status, SaleStatus::Stopped);
        assert_eq!(rows[0].setmeal_id, setmeal.id);
        assert_eq!(rows[0].copies, 4);
    }

    #[test]
    fn test_request_accepts_camel_case_payload() {
        let json = r#"{
            "categoryId": 3,
            "name": "Solo set",
            "price": "25.50",
            "status": 1,
            "setmealDishes": [{"dishId": 9, "name": "Soup", "price": "6", "copies": 1}]
        }"#;

        let request: SetmealRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.status, Some(SaleStatus::OnSale));
        assert_eq!(request.setmeal_dishes[0].dish_id, 9);
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{snowflake_id, SaleStatus};

/// A single menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub price: Decimal,
    pub code: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub status: SaleStatus,
    pub sort: i32,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// A named flavor option of a dish, e.g. "spice" with values ["mild", "hot"]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishFlavor {
    pub id: i64,
    pub dish_id: i64,
    pub name: String,
    pub value: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorRequest {
    pub name: String,
    #[serde(default)]
    pub value: Vec<String>,
}

/// Payload of `POST /dish` and `PUT /dish`; `id` is only read on update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishRequest {
    pub id: Option<i64>,
    pub name: String,
    pub category_id: i64,
    pub price: Decimal,
    #[serde(default)]
    pub code: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub status: Option<SaleStatus>,
    #[serde(default)]
    pub sort: i32,
    #[serde(default)]
    pub flavors: Vec<FlavorRequest>,
}

/// Dish enriched with its flavors and category name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishView {
    #[serde(flatten)]
    pub dish: Dish,
    pub category_name: Option<String>,
    pub flavors: Vec<DishFlavor>,
}

/// Typed dish query; every set field must match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DishFilter {
    pub category_id: Option<i64>,
    pub status: Option<SaleStatus>,
    pub name: Option<String>,
}

impl Dish {
    pub fn new(request: &DishRequest) -> Self {
        let now = Utc::now();
        Self {
            id: snowflake_id(),
            name: request.name.trim().to_string(),
            category_id: request.category_id,
            price: request.price,
            code: request.code.clone(),
            image: request.image.clone(),
            description: request.description.clone(),
            status: request.status.unwrap_or_default(),
            sort: request.sort,
            create_time: now,
            update_time: now,
        }
    }

    /// Overwrite every editable field from the request
    pub fn apply(&mut self, request: &DishRequest) {
        self.name = request.name.trim().to_string();
        self.category_id = request.category_id;
        self.price = request.price;
        self.code = request.code.clone();
        self.image = request.image.clone();
        self.description = request.description.clone();
        if let Some(status) = request.status {
            self.status = status;
        }
        self.sort = request.sort;
        self.update_time = Utc::now();
    }

    pub fn set_status(&mut self, status: SaleStatus) {
        self.status = status;
        self.update_time = Utc::now();
    }
}

impl DishFlavor {
    pub fn from_request(dish_id: i64, request: &FlavorRequest) -> Self {
        Self {
            id: snowflake_id(),
            dish_id,
            name: request.name.trim().to_string(),
            value: request.value.clone(),
        }
    }
}

impl DishFilter {
    pub fn matches(&self, dish: &Dish) -> bool {
        if let Some(category_id) = self.category_id {
            if dish.category_id != category_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if dish.status != status {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !dish.name.contains(name.as_str()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> DishRequest {
        DishRequest {
            id: None,
            name: "Kung Pao Chicken".to_string(),
            category_id: 7,
            price: dec!(38.00),
            code: String::new(),
            image: Some("kungpao.jpg".to_string()),
            description: None,
            status: None,
            sort: 2,
            flavors: vec![FlavorRequest {
                name: "spice".to_string(),
                value: vec!["mild".to_string(), "hot".to_string()],
            }],
        }
    }

    #[test]
    fn test_new_dish_defaults_to_on_sale() {
        let dish = Dish::new(&request());
        assert_eq!(dish.status, SaleStatus::OnSale);
        assert_eq!(dish.category_id, 7);
    }

    #[test]
    fn test_filter_matches_all_set_fields() {
        let dish = Dish::new(&request());

        let filter = DishFilter {
            category_id: Some(7),
            status: Some(SaleStatus::OnSale),
            name: Some("Pao".to_string()),
        };
        assert!(filter.matches(&dish));

        let wrong_status = DishFilter {
            status: Some(SaleStatus::Stopped),
            ..DishFilter::default()
        };
        assert!(!wrong_status.matches(&dish));

        let wrong_category = DishFilter {
            category_id: Some(8),
            ..DishFilter::default()
        };
        assert!(!wrong_category.matches(&dish));
    }

    #[test]
    fn test_view_flattens_dish_fields() {
        let dish = Dish::new(&request());
        let flavor = DishFlavor::from_request(dish.id, &request().flavors[0]);
        let view = DishView {
            dish,
            category_name: Some("Sichuan".to_string()),
            flavors: vec![flavor],
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Kung Pao Chicken");
        assert_eq!(json["categoryName"], "Sichuan");
        assert_eq!(json["flavors"][0]["value"][1], "hot");
    }
}

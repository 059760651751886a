use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{snowflake_id, CategoryType};

/// Menu category grouping either dishes or combos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub name: String,
    pub sort: i32,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub name: String,
    #[serde(default)]
    pub sort: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub id: i64,
    pub name: Option<String>,
    pub sort: Option<i32>,
}

impl Category {
    pub fn new(request: CreateCategoryRequest) -> Self {
        let now = Utc::now();
        Self {
            id: snowflake_id(),
            category_type: request.category_type,
            name: request.name.trim().to_string(),
            sort: request.sort,
            create_time: now,
            update_time: now,
        }
    }

    pub fn update(&mut self, request: UpdateCategoryRequest) {
        if let Some(name) = request.name {
            self.name = name.trim().to_string();
        }
        if let Some(sort) = request.sort {
            self.sort = sort;
        }
        self.update_time = Utc::now();
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{snowflake_id, UserStatus};

/// Customer account, identified by phone number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub phone: String,
    pub name: Option<String>,
    pub status: UserStatus,
    pub create_time: DateTime<Utc>,
}

/// Identity of the logged-in customer, resolved from the session for every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCodeRequest {
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub code: String,
}

impl User {
    /// First-login registration
    pub fn register(phone: &str) -> Self {
        Self {
            id: snowflake_id(),
            phone: phone.to_string(),
            name: None,
            status: UserStatus::Normal,
            create_time: Utc::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status == UserStatus::Normal
    }
}

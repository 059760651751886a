use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sale status shared by dishes and combos. Serialized as `0` / `1` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SaleStatus {
    Stopped,
    OnSale,
}

impl SaleStatus {
    pub fn code(self) -> u8 {
        match self {
            SaleStatus::Stopped => 0,
            SaleStatus::OnSale => 1,
        }
    }

    pub fn is_on_sale(self) -> bool {
        self == SaleStatus::OnSale
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::OnSale
    }
}

impl TryFrom<u8> for SaleStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SaleStatus::Stopped),
            1 => Ok(SaleStatus::OnSale),
            _ => Err(format!("Invalid sale status: {}", value)),
        }
    }
}

impl From<SaleStatus> for u8 {
    fn from(status: SaleStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for SaleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid sale status: {}", s))?;
        SaleStatus::try_from(code)
    }
}

/// Category kind: `1` groups dishes, `2` groups combos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CategoryType {
    Dish,
    Setmeal,
}

impl CategoryType {
    pub fn code(self) -> u8 {
        match self {
            CategoryType::Dish => 1,
            CategoryType::Setmeal => 2,
        }
    }
}

impl TryFrom<u8> for CategoryType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CategoryType::Dish),
            2 => Ok(CategoryType::Setmeal),
            _ => Err(format!("Invalid category type: {}", value)),
        }
    }
}

impl From<CategoryType> for u8 {
    fn from(kind: CategoryType) -> Self {
        kind.code()
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Order lifecycle: pending payment, awaiting delivery, delivered, completed, cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderStatus {
    PendingPayment,
    AwaitingDelivery,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn code(self) -> u8 {
        match self {
            OrderStatus::PendingPayment => 1,
            OrderStatus::AwaitingDelivery => 2,
            OrderStatus::Delivered => 3,
            OrderStatus::Completed => 4,
            OrderStatus::Cancelled => 5,
        }
    }
}

impl TryFrom<u8> for OrderStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OrderStatus::PendingPayment),
            2 => Ok(OrderStatus::AwaitingDelivery),
            3 => Ok(OrderStatus::Delivered),
            4 => Ok(OrderStatus::Completed),
            5 => Ok(OrderStatus::Cancelled),
            _ => Err(format!("Invalid order status: {}", value)),
        }
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::PendingPayment => write!(f, "pending_payment"),
            OrderStatus::AwaitingDelivery => write!(f, "awaiting_delivery"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Account status of a customer. Disabled accounts cannot log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UserStatus {
    Disabled,
    Normal,
}

impl TryFrom<u8> for UserStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UserStatus::Disabled),
            1 => Ok(UserStatus::Normal),
            _ => Err(format!("Invalid user status: {}", value)),
        }
    }
}

impl From<UserStatus> for u8 {
    fn from(status: UserStatus) -> Self {
        match status {
            UserStatus::Disabled => 0,
            UserStatus::Normal => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_status_conversion() {
        assert_eq!(SaleStatus::OnSale.to_string(), "1");
        assert_eq!(SaleStatus::Stopped.to_string(), "0");

        assert_eq!("1".parse::<SaleStatus>().unwrap(), SaleStatus::OnSale);
        assert_eq!(" 0 ".parse::<SaleStatus>().unwrap(), SaleStatus::Stopped);

        assert!("2".parse::<SaleStatus>().is_err());
        assert!("on".parse::<SaleStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_numeric_codes() {
        let json = serde_json::to_string(&SaleStatus::OnSale).unwrap();
        assert_eq!(json, "1");

        let kind: CategoryType = serde_json::from_str("2").unwrap();
        assert_eq!(kind, CategoryType::Setmeal);

        let status: OrderStatus = serde_json::from_str("5").unwrap();
        assert_eq!(status, OrderStatus::Cancelled);

        assert!(serde_json::from_str::<OrderStatus>("0").is_err());
        assert!(serde_json::from_str::<UserStatus>("3").is_err());
    }
}

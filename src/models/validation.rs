use rust_decimal::Decimal;
use std::collections::HashSet;

use super::{
    CartItemRequest, CreateCategoryRequest, DishRequest, SetmealRequest, SubmitOrderRequest,
    UpdateCategoryRequest, ValidationError, ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_NAME_LENGTH: usize = 64;
pub const MAX_DESCRIPTION_LENGTH: usize = 400;
pub const MAX_IMAGE_LENGTH: usize = 500;
pub const MAX_FLAVORS_COUNT: usize = 10;
pub const MAX_SETMEAL_DISHES: usize = 50;
pub const MAX_COPIES: u32 = 99;
pub const MAX_PRICE: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 2); // 999999.99
pub const MAX_REMARK_LENGTH: usize = 100;
pub const MAX_ADDRESS_LENGTH: usize = 200;
pub const PHONE_LENGTH: usize = 11;

impl Validate for CreateCategoryRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)
    }
}

impl Validate for UpdateCategoryRequest {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        Ok(())
    }
}

impl Validate for DishRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_price("price", &self.price)?;
        validate_optional_text("image", &self.image, MAX_IMAGE_LENGTH)?;
        validate_optional_text("description", &self.description, MAX_DESCRIPTION_LENGTH)?;

        if self.flavors.len() > MAX_FLAVORS_COUNT {
            return Err(ValidationError::OutOfRange {
                field: "flavors".to_string(),
                min: "0".to_string(),
                max: MAX_FLAVORS_COUNT.to_string(),
                value: self.flavors.len().to_string(),
            });
        }

        let mut seen = HashSet::new();
        for (index, flavor) in self.flavors.iter().enumerate() {
            validate_name(&format!("flavors[{}].name", index), &flavor.name)?;
            if !seen.insert(flavor.name.trim().to_lowercase()) {
                return Err(ValidationError::InvalidValue {
                    field: "flavors".to_string(),
                    value: flavor.name.clone(),
                    reason: "Duplicate flavor name".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for SetmealRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_price("price", &self.price)?;
        validate_optional_text("image", &self.image, MAX_IMAGE_LENGTH)?;
        validate_optional_text("description", &self.description, MAX_DESCRIPTION_LENGTH)?;

        if self.setmeal_dishes.is_empty() {
            return Err(ValidationError::RequiredField {
                field: "setmealDishes".to_string(),
            });
        }
        if self.setmeal_dishes.len() > MAX_SETMEAL_DISHES {
            return Err(ValidationError::OutOfRange {
                field: "setmealDishes".to_string(),
                min: "1".to_string(),
                max: MAX_SETMEAL_DISHES.to_string(),
                value: self.setmeal_dishes.len().to_string(),
            });
        }

        let mut seen = HashSet::new();
        for (index, dish) in self.setmeal_dishes.iter().enumerate() {
            if dish.copies == 0 || dish.copies > MAX_COPIES {
                return Err(ValidationError::OutOfRange {
                    field: format!("setmealDishes[{}].copies", index),
                    min: "1".to_string(),
                    max: MAX_COPIES.to_string(),
                    value: dish.copies.to_string(),
                });
            }
            if !seen.insert(dish.dish_id) {
                return Err(ValidationError::InvalidValue {
                    field: "setmealDishes".to_string(),
                    value: dish.dish_id.to_string(),
                    reason: "Dish listed twice".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for CartItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        if self.key().is_none() {
            return Err(ValidationError::RequiredField {
                field: "dishId or setmealId".to_string(),
            });
        }
        validate_price("amount", &self.amount)?;
        validate_optional_text("image", &self.image, MAX_IMAGE_LENGTH)?;
        Ok(())
    }
}

impl Validate for SubmitOrderRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_optional_text("remark", &self.remark, MAX_REMARK_LENGTH)?;
        validate_optional_text("address", &self.address, MAX_ADDRESS_LENGTH)?;
        validate_optional_text("consignee", &self.consignee, MAX_NAME_LENGTH)?;
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        Ok(())
    }
}

/// Validate a display name (categories, dishes, combos, flavors)
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    let length = trimmed.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length: MAX_NAME_LENGTH,
            actual_length: length,
        });
    }

    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: name.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate a money amount: non-negative, at most two decimals
pub fn validate_price(field: &str, price: &Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() || *price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: MAX_PRICE.to_string(),
            value: price.to_string(),
        });
    }

    if price.scale() > 2 && price.normalize().scale() > 2 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: price.to_string(),
            reason: "Price cannot have more than 2 decimal places".to_string(),
        });
    }

    Ok(())
}

/// Validate a mainland mobile number: 11 digits starting with 1
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "phone".to_string(),
        });
    }

    if trimmed.len() != PHONE_LENGTH
        || !trimmed.starts_with('1')
        || !trimmed.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            expected: "11 digits starting with 1".to_string(),
        });
    }

    Ok(())
}

fn validate_optional_text(
    field: &str,
    value: &Option<String>,
    max_length: usize,
) -> ValidationResult<()> {
    if let Some(value) = value {
        let length = value.trim().chars().count();
        if length > max_length {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                max_length,
                actual_length: length,
            });
        }
    }
    Ok(())
}

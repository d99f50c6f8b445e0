use chrono::NaiveTime;
use rust_decimal::Decimal;

use super::{
    CreateMenuItemRequest, CreateRestaurantRequest, UpdateMenuItemRequest,
    UpdateRestaurantRequest, ValidationError, ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_ADDRESS_LENGTH: usize = 500;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_CONTACT_NUMBER_LENGTH: usize = 30;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01
pub const MAX_PRICE: Decimal = Decimal::from_parts(9999999, 0, 0, false, 2); // 99999.99

impl Validate for CreateRestaurantRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_required_text("name", &self.name, MAX_NAME_LENGTH)?;
        validate_email(&self.email)?;
        validate_optional_text("formattedAddress", &self.formatted_address, MAX_ADDRESS_LENGTH)?;
        validate_optional_text(
            "contactNumber",
            &self.contact_number,
            MAX_CONTACT_NUMBER_LENGTH,
        )?;
        validate_time("openingTime", &self.opening_time)?;
        validate_time("closingTime", &self.closing_time)?;
        Ok(())
    }
}

impl Validate for UpdateRestaurantRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_required_text("name", &self.name, MAX_NAME_LENGTH)?;
        validate_email(&self.email)?;
        validate_optional_text("formattedAddress", &self.formatted_address, MAX_ADDRESS_LENGTH)?;
        validate_optional_text(
            "contactNumber",
            &self.contact_number,
            MAX_CONTACT_NUMBER_LENGTH,
        )?;
        validate_time("openingTime", &self.opening_time)?;
        validate_time("closingTime", &self.closing_time)?;
        Ok(())
    }
}

impl Validate for CreateMenuItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_required_text("name", &self.name, MAX_NAME_LENGTH)?;
        validate_optional_text("description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        validate_price(&self.price)?;
        Ok(())
    }
}

impl Validate for UpdateMenuItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_required_text("name", name, MAX_NAME_LENGTH)?;
        }
        if let Some(description) = &self.description {
            validate_optional_text("description", description, MAX_DESCRIPTION_LENGTH)?;
        }
        if let Some(price) = &self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

/// Validate a mandatory, bounded text field
pub fn validate_required_text(field: &str, value: &str, max_length: usize) -> ValidationResult<()> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    validate_optional_text(field, trimmed, max_length)
}

/// Validate a bounded text field that may be empty
pub fn validate_optional_text(field: &str, value: &str, max_length: usize) -> ValidationResult<()> {
    let length = value.chars().count();
    if length > max_length {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length,
            actual_length: length,
        });
    }

    if value
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Minimal shape check; deliverability is not our concern
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let trimmed = email.trim();
    validate_required_text("email", trimmed, MAX_EMAIL_LENGTH)?;

    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            expected: "local@domain".to_string(),
        }),
    }
}

/// Opening/closing times are optional but must be `HH:MM` or `HH:MM:SS` when given
pub fn validate_time(field: &str, value: &str) -> ValidationResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    if NaiveTime::parse_from_str(trimmed, "%H:%M").is_ok()
        || NaiveTime::parse_from_str(trimmed, "%H:%M:%S").is_ok()
    {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            expected: "HH:MM".to_string(),
        })
    }
}

/// Validate menu item price
pub fn validate_price(price: &Decimal) -> ValidationResult<()> {
    if *price < MIN_PRICE || *price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: MIN_PRICE.to_string(),
            max: MAX_PRICE.to_string(),
            value: price.to_string(),
        });
    }

    if price.scale() > 2 {
        return Err(ValidationError::InvalidFormat {
            field: "price".to_string(),
            expected: "at most 2 decimal places".to_string(),
        });
    }

    Ok(())
}

//! Validation rules for the Retail Management Platform
//!
//! Pure boundary checks shared by the backend services. All rules return
//! `Result<(), &'static str>` so callers can wrap them in their own error
//! types.

use rust_decimal::Decimal;

// ============================================================================
// Identity validations
// ============================================================================

/// Validate username format (3-30 characters, alphanumeric plus underscore)
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 || username.len() > 30 {
        return Err("Username must be 3-30 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err("Username may only contain letters, digits and underscores");
    }
    Ok(())
}

/// Validate password strength (minimum 6 characters)
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

// ============================================================================
// Catalog validations
// ============================================================================

/// Validate product barcode (6-32 alphanumeric characters)
pub fn validate_barcode(barcode: &str) -> Result<(), &'static str> {
    if barcode.len() < 6 || barcode.len() > 32 {
        return Err("Barcode must be 6-32 characters");
    }
    if !barcode.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Barcode may only contain letters and digits");
    }
    Ok(())
}

/// Validate a price is non-negative
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Inventory validations
// ============================================================================

/// Validate the mandatory audit reason on manual stock adjustments
pub fn validate_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("Reason is required");
    }
    Ok(())
}

/// Validate a sale line quantity
pub fn validate_sale_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a sale line discount against the line gross amount
pub fn validate_discount(discount: Decimal, gross: Decimal) -> Result<(), &'static str> {
    if discount < Decimal::ZERO {
        return Err("Discount cannot be negative");
    }
    if discount > gross {
        return Err("Discount cannot exceed the line amount");
    }
    Ok(())
}

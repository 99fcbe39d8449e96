//! # Field Rules
//!
//! Checks on individual values that arrive from a register before any
//! pricing or storage work starts. Each function inspects one field and
//! names it in the returned [`ValidationError`].
//!
//! ```text
//!   cart line ──► validate_product_id ─► validate_quantity ─► validate_price_minor
//!   tender    ──► validate_tender_amount ─► validate_reference_id
//!   context   ──► validate_table_number          (dine-in only)
//!   catalog   ──► validate_sku, validate_product_name (seeding, admin)
//! ```
//!
//! SQLite still has the last word: `CHECK (stock >= 0)` and the
//! per-day queue number index are enforced by the schema, not here.
//!
//! ```rust
//! use smartpos_core::validation::{validate_quantity, validate_sku};
//!
//! assert!(validate_sku("KOPI-SUSU").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted tender reference (approval code, QR reference).
pub const MAX_REFERENCE_LEN: usize = 100;

/// Longest accepted table label.
pub const MAX_TABLE_NUMBER_LEN: usize = 20;

const MAX_SKU_LEN: usize = 50;
const MAX_NAME_LEN: usize = 200;
const MAX_PRODUCT_ID_LEN: usize = 64;

fn present<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Required {
            field: field.to_string(),
        })
    } else {
        Ok(value)
    }
}

fn at_most(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

fn non_negative(field: &str, minor: i64) -> ValidationResult<()> {
    if minor < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Catalog
// =============================================================================

/// Letters, digits, `-` and `_`; 1 to 50 characters.
///
/// ```rust
/// use smartpos_core::validation::validate_sku;
///
/// assert!(validate_sku("ES-TEH-01").is_ok());
/// assert!(validate_sku("es teh").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = present("sku", sku)?;
    at_most("sku", sku, MAX_SKU_LEN)?;

    if let Some(bad) = sku
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: format!("'{bad}' is not allowed"),
        });
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = present("name", name)?;
    at_most("name", name, MAX_NAME_LEN)
}

// =============================================================================
// Cart
// =============================================================================

pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    let id = present("product_id", id)?;
    at_most("product_id", id, MAX_PRODUCT_ID_LEN)
}

/// 1 to [`MAX_LINE_QUANTITY`] units per line.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Unit price in minor units. Free items (0) are fine.
pub fn validate_price_minor(minor: i64) -> ValidationResult<()> {
    non_negative("price", minor)
}

pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 1,
            max: MAX_CART_LINES as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Payment and context
// =============================================================================

/// Zero is accepted so a fully discounted order can still be tendered.
pub fn validate_tender_amount(minor: i64) -> ValidationResult<()> {
    non_negative("amount", minor)
}

pub fn validate_reference_id(reference: &str) -> ValidationResult<()> {
    at_most("reference_id", reference, MAX_REFERENCE_LEN)
}

/// Length only. A blank label means "no table" and is the caller's call.
pub fn validate_table_number(table: &str) -> ValidationResult<()> {
    at_most("table_number", table.trim(), MAX_TABLE_NUMBER_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_rules() {
        assert!(validate_sku("KOPI-SUSU").is_ok());
        assert!(validate_sku("menu_1").is_ok());
        assert!(validate_sku("  ").is_err());

        let err = validate_sku("NASI GORENG").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidFormat {
                field: "sku".to_string(),
                reason: "' ' is not allowed".to_string(),
            }
        );
        assert!(validate_sku(&"A".repeat(MAX_SKU_LEN + 1)).is_err());
    }

    #[test]
    fn test_product_fields() {
        assert!(validate_product_name("Nasi Goreng Spesial").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"é".repeat(MAX_NAME_LEN)).is_ok());

        assert!(validate_product_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert_eq!(
            validate_product_id(" ").unwrap_err(),
            ValidationError::Required {
                field: "product_id".to_string()
            }
        );
        assert!(validate_product_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_quantity(MAX_LINE_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_money_fields() {
        assert!(validate_price_minor(0).is_ok());
        assert!(validate_price_minor(-1).is_err());
        assert!(validate_tender_amount(0).is_ok());
        assert!(validate_tender_amount(-50).is_err());
    }

    #[test]
    fn test_cart_and_context_limits() {
        assert!(validate_cart_size(MAX_CART_LINES).is_ok());
        assert!(validate_cart_size(MAX_CART_LINES + 1).is_err());
        assert!(validate_table_number(" A12 ").is_ok());
        assert!(validate_table_number(&"9".repeat(21)).is_err());
        assert!(validate_reference_id("APPR-0042").is_ok());
        assert!(validate_reference_id(&"r".repeat(101)).is_err());
    }
}

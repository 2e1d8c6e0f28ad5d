//! # Validation Module
//!
//! Input validation utilities for Caja POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI forms                                                     │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any remote effect)                       │
//! │  ├── Business rule validation                                          │
//! │  └── Fail fast: a rejected input never reaches the document store      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Document store preconditions                                 │
//! │  └── Conditional decrement, status guards (authoritative)              │
//! │                                                                         │
//! │  Defense in depth: each layer catches different errors                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{DiscountType, Role};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a login/user name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Letters, numbers, dots, hyphens, underscores only
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (user, product, locale, task title).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a SKU (primary scan code).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Alphanumeric, hyphens, underscores only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a cancellation reason: mandatory, non-blank.
///
/// Rejected before any remote call - a blank reason never reaches the store.
pub fn validate_cancellation_reason(reason: &str) -> ValidationResult<()> {
    if reason.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "cancellation reason".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or cost in cents.
///
/// Zero is allowed (free items); negative is not.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a stock level or low-stock threshold.
pub fn validate_stock(field: &str, units: i64) -> ValidationResult<()> {
    if units < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a discount value for its type.
///
/// ## Rules
/// - FIXED: non-negative cents
/// - PERCENTAGE: 0 to 100 whole percent
pub fn validate_discount(value: i64, kind: DiscountType) -> ValidationResult<()> {
    match kind {
        DiscountType::Fixed => {
            if value < 0 {
                return Err(ValidationError::MustBeNonNegative {
                    field: "discount".to_string(),
                });
            }
        }
        DiscountType::Percentage => {
            if !(0..=100).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field: "discount".to_string(),
                    min: 0,
                    max: 100,
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use caja_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Role Invariants
// =============================================================================

/// Enforces the role/locale invariant:
/// ADMIN and SELLER must carry a locale id, SUPER_ADMIN must not.
pub fn validate_role_location(role: Role, local_id: Option<&str>) -> ValidationResult<()> {
    match (role.is_location_scoped(), local_id) {
        (true, None) => Err(ValidationError::RoleConstraint {
            role: role.to_string(),
            reason: "a locale id is required".to_string(),
        }),
        (true, Some(id)) if id.trim().is_empty() => Err(ValidationError::RoleConstraint {
            role: role.to_string(),
            reason: "a locale id is required".to_string(),
        }),
        (false, Some(_)) => Err(ValidationError::RoleConstraint {
            role: role.to_string(),
            reason: "must not be scoped to a locale".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("maria").is_ok());
        assert!(validate_username("maria.lopez_1").is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("COKE-330").is_ok());
        assert!(validate_sku("ABC123").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
    }

    #[test]
    fn test_validate_cancellation_reason() {
        assert!(validate_cancellation_reason("wrong item rung up").is_ok());
        assert!(validate_cancellation_reason("").is_err());
        assert!(validate_cancellation_reason("   ").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price_cents("price", 0).is_ok());
        assert!(validate_price_cents("price", 1099).is_ok());
        assert!(validate_price_cents("price", -1).is_err());

        assert!(validate_stock("stock", 0).is_ok());
        assert!(validate_stock("stock", -5).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(1500, DiscountType::Fixed).is_ok());
        assert!(validate_discount(-1, DiscountType::Fixed).is_err());

        assert!(validate_discount(0, DiscountType::Percentage).is_ok());
        assert!(validate_discount(100, DiscountType::Percentage).is_ok());
        assert!(validate_discount(101, DiscountType::Percentage).is_err());
        assert!(validate_discount(-5, DiscountType::Percentage).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_role_location() {
        assert!(validate_role_location(Role::Seller, Some("l1")).is_ok());
        assert!(validate_role_location(Role::Admin, Some("l1")).is_ok());
        assert!(validate_role_location(Role::SuperAdmin, None).is_ok());

        assert!(validate_role_location(Role::Seller, None).is_err());
        assert!(validate_role_location(Role::Admin, Some("  ")).is_err());
        assert!(validate_role_location(Role::SuperAdmin, Some("l1")).is_err());
    }
}

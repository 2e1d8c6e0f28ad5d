//! # caja-core: Pure Business Logic for Caja POS
//!
//! This crate is the **heart** of Caja POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Caja POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      UI Action Surface                          │   │
//! │  │    login ──► sell ──► cancel ──► manage inventory/users        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               caja-store (Synced Collection Store)              │   │
//! │  │    snapshots, auth gate, sale recording, cancellation flow     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │  lockout  │  │   │
//! │  │   │ User,Sale │  │ Discounts │  │ stock cap │  │ 3 strikes │  │   │
//! │  │   │ Product.. │  │  (cents)  │  │  merging  │  │ 5min lock │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (User, Local, Product, Sale, Task, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart with stock-capped quantities and price freezing
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`lockout`] - Failed-login counter with timed lockout
//! - [`cancellation`] - Sale cancellation transition rules
//! - [`reporting`] - Role-scoped sale visibility and totals
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::money::{apply_discount, Money};
//! use caja_core::types::DiscountType;
//!
//! // Create money from cents (never from floats!)
//! let total = Money::from_cents(10_000);
//!
//! // 15% off 10,000 cents leaves 8,500 cents
//! let final_total = apply_discount(total, 15, DiscountType::Percentage);
//! assert_eq!(final_total.cents(), 8_500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cancellation;
pub mod cart;
pub mod error;
pub mod lockout;
pub mod money;
pub mod reporting;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use caja_core::Money` instead of
// `use caja_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Fixed id of the well-known bootstrap super-admin.
///
/// ## Why a constant?
/// The users collection must never be empty: whenever the store observes an
/// empty collection it seeds this record. A fixed id keeps the bootstrap
/// idempotent - two concurrent observers both write the same document.
pub const SUPER_ADMIN_ID: &str = "super-admin-1";

/// Username of the bootstrap super-admin.
pub const SUPER_ADMIN_USERNAME: &str = "superadmin";

/// Initial password of the bootstrap super-admin.
///
/// Hashed before it is ever stored; the plaintext exists only so a fresh
/// deployment has a known way in. Operators are expected to rotate it.
pub const SUPER_ADMIN_INITIAL_PASSWORD: &str = "SuperSecurePassword123!";

/// Failed login attempts allowed before an identifier is locked out.
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// How long a locked-out identifier stays locked, in minutes.
pub const LOCKOUT_MINUTES: i64 = 5;

/// Maximum distinct items allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
/// Can be made configurable per-locale in future versions.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single item in cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
/// Configurable per-locale in future versions.
pub const MAX_ITEM_QUANTITY: i64 = 999;

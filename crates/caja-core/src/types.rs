//! # Domain Types
//!
//! Core domain types used throughout Caja POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │      Local      │   │     Product     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  username       │   │  name, address  │   │  sku, barcode   │       │
//! │  │  role           │   │  subscription   │   │  price_cents    │       │
//! │  │  local_id?      │   │  cash register  │   │  stock/minStock │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │  Notification   │   │      Task       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  items[]        │   │  LOW_STOCK /    │   │  assigned to/by │       │
//! │  │  totals, status │   │  SYSTEM         │   │  PENDING /      │       │
//! │  │  cancellation   │   │  read flag      │   │  COMPLETED      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Document Shape
//! Every entity serializes to camelCase JSON - the exact shape stored in the
//! remote document store and queried by `json_extract` paths. Renaming a
//! field here changes the on-disk document format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Roles
// =============================================================================

/// Access tier of a user.
///
/// ## Scoping Rules
/// - `SuperAdmin`: platform owner, sees every locale, has no `local_id`
/// - `Admin`: manages exactly one locale (must carry `local_id`)
/// - `Seller`: cashier in one locale (must carry `local_id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Seller,
}

impl Role {
    /// Whether this role is tied to a single locale.
    #[inline]
    pub const fn is_location_scoped(&self) -> bool {
        matches!(self, Role::Admin | Role::Seller)
    }

    /// Whether this role may cancel sales directly and approve requests.
    #[inline]
    pub const fn can_approve_cancellation(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::SuperAdmin => write!(f, "SUPER_ADMIN"),
            Role::Admin => write!(f, "ADMIN"),
            Role::Seller => write!(f, "SELLER"),
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A user account.
///
/// ## Password Storage
/// Only a salted argon2 hash is ever stored (`password_hash`). A user with
/// no hash (legacy import) authenticates with any secret until one is set.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier (UUID v4, or the fixed bootstrap id).
    pub id: String,

    /// Login name - unique, matched case-insensitively.
    pub username: String,

    /// Optional email, also usable as a login identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Salted argon2 hash of the password. Never the plaintext.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    /// Access tier.
    pub role: Role,

    /// Display name shown in the UI and on receipts.
    pub name: String,

    /// Owning locale. Required for ADMIN/SELLER, absent for SUPER_ADMIN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
}

impl User {
    /// Case-insensitive match against username or email.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        let needle = identifier.trim().to_lowercase();
        if self.username.to_lowercase() == needle {
            return true;
        }
        self.email
            .as_deref()
            .is_some_and(|email| email.to_lowercase() == needle)
    }
}

// =============================================================================
// Local (retail location)
// =============================================================================

/// Billing state of a locale's platform subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
}

/// A physical retail location ("local").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Local {
    pub id: String,
    pub name: String,
    pub address: String,

    /// Inactive locales are hidden from sellers but keep their history.
    pub is_active: bool,

    pub subscription_status: SubscriptionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub last_payment_date: Option<DateTime<Utc>>,

    /// Running cash balance of the register, in cents.
    /// Adjusted on cash sales and manual register counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_in_register_cents: Option<i64>,
}

// =============================================================================
// Product
// =============================================================================

/// How a product is measured when sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementUnit {
    #[default]
    Unit,
    Kg,
    Gram,
    Liter,
}

/// A product available for sale in one locale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Locale this product belongs to.
    pub local_id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Unit sale price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Current stock level. Never negative.
    pub stock: i64,

    /// Low-stock threshold: stock at or below this triggers an alert.
    pub min_stock: i64,

    /// Category label for filtering.
    pub category: String,

    /// Primary scan/lookup code.
    pub sku: String,

    /// Secondary barcode when the SKU is an internal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,

    /// Unit cost in cents (for margin calculations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_cents: Option<i64>,

    #[serde(default)]
    pub measurement_unit: MeasurementUnit,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether the product is at or below its low-stock threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Checks if the locally-known stock covers a requested quantity.
    ///
    /// This is the client-side pre-check only; the authoritative check is
    /// the conditional decrement at sale commit time.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}

// =============================================================================
// Cart Item (sale line snapshot)
// =============================================================================

/// A line item: a frozen product snapshot plus a quantity.
///
/// Uses the snapshot pattern - price, cost and name are copied at the time
/// the item enters the cart, so later product edits never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// The product this line refers to.
    pub product_id: String,

    /// SKU at time of sale (frozen).
    pub sku: String,

    /// Product name at time of sale (frozen).
    pub name: String,

    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,

    /// Unit cost in cents at time of sale (frozen).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost_cents: Option<i64>,

    #[serde(default)]
    pub measurement_unit: MeasurementUnit,

    /// Quantity sold.
    pub quantity: i64,
}

impl CartItem {
    /// Creates a cart item by freezing a product snapshot.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            unit_cost_cents: product.cost_cents,
            measurement_unit: product.measurement_unit,
            quantity,
        }
    }

    /// Line total (unit price × quantity).
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

// =============================================================================
// Sale
// =============================================================================

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

/// Discount shape applied to a sale total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `discount` is an amount in cents.
    Fixed,
    /// `discount` is a whole percent (0-100).
    Percentage,
}

/// Lifecycle status of a sale.
///
/// ## State Machine
/// ```text
/// COMPLETED ──request(SELLER)──► CANCELLATION_REQUESTED ──approve──► CANCELLED
///     ▲                                   │                             ▲
///     └────────────reject─────────────────┘       direct admin cancel ──┘
///
/// CANCELLED is terminal. A document with no status field is COMPLETED.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    #[default]
    Completed,
    CancellationRequested,
    Cancelled,
}

impl SaleStatus {
    /// Terminal states admit no further transitions.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Cancelled)
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleStatus::Completed => write!(f, "COMPLETED"),
            SaleStatus::CancellationRequested => write!(f, "CANCELLATION_REQUESTED"),
            SaleStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A completed sale transaction.
///
/// Line items are embedded snapshots: the sale document is self-contained
/// and renders a receipt without joining against the product collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub local_id: String,
    pub seller_id: String,
    pub items: Vec<CartItem>,

    /// Pre-discount total in cents.
    pub total_cents: i64,

    #[ts(as = "String")]
    pub date: DateTime<Utc>,

    pub payment_method: PaymentMethod,

    /// Discount value: cents for FIXED, whole percent for PERCENTAGE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,

    /// Post-discount total, floored at zero. Computed by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_total_cents: Option<i64>,

    /// Cash tendered by the customer (CASH sales only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tendered_cents: Option<i64>,

    /// Absent in older documents; absent means COMPLETED.
    #[serde(default)]
    pub status: SaleStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,

    /// User who asked for (or directly performed) the cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_requested_by: Option<String>,

    /// Admin who approved a requested cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_approved_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub cancellation_date: Option<DateTime<Utc>>,
}

impl Sale {
    /// The amount the customer actually owes: the discounted total when a
    /// discount was applied, the plain total otherwise.
    #[inline]
    pub fn effective_total_cents(&self) -> i64 {
        self.final_total_cents.unwrap_or(self.total_cents)
    }

    /// Total units across all line items.
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

// =============================================================================
// Notification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    LowStock,
    System,
}

/// An alert shown in a locale's notification tray.
///
/// Notifications are local-only state: they are derived from sales (low
/// stock) or raised by the system, never synced as a collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub local_id: String,

    #[serde(rename = "type")]
    pub kind: NotificationKind,

    pub title: String,
    pub message: String,

    #[ts(as = "String")]
    pub date: DateTime<Utc>,

    pub read: bool,

    /// Linked product for LOW_STOCK alerts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

// =============================================================================
// Task
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskFrequency {
    Daily,
}

/// A task an admin assigns to a seller.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub local_id: String,

    /// Seller the task is assigned to.
    pub assigned_to_id: String,

    /// Admin who assigned it.
    pub assigned_by_id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub is_recurring: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<TaskFrequency>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: "p1".to_string(),
            local_id: "l1".to_string(),
            name: "Coca-Cola 330ml".to_string(),
            price_cents: 150,
            stock: 10,
            min_stock: 3,
            category: "Beverages".to_string(),
            sku: "COKE-330".to_string(),
            barcode: None,
            cost_cents: Some(90),
            measurement_unit: MeasurementUnit::Unit,
        }
    }

    #[test]
    fn test_sale_status_default_is_completed() {
        assert_eq!(SaleStatus::default(), SaleStatus::Completed);
    }

    #[test]
    fn test_missing_status_decodes_as_completed() {
        // Documents written before the cancellation workflow have no status
        let json = r#"{
            "id": "s1", "localId": "l1", "sellerId": "u1", "items": [],
            "totalCents": 1000, "date": "2026-01-05T12:00:00Z",
            "paymentMethod": "CASH"
        }"#;
        let sale: Sale = serde_json::from_str(json).unwrap();
        assert_eq!(sale.status, SaleStatus::Completed);
        assert_eq!(sale.effective_total_cents(), 1000);
    }

    #[test]
    fn test_role_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"SUPER_ADMIN\"");
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"SELLER\"");
    }

    #[test]
    fn test_user_matches_identifier_case_insensitive() {
        let user = User {
            id: "u1".to_string(),
            username: "Maria".to_string(),
            email: Some("maria@example.com".to_string()),
            password_hash: None,
            role: Role::Seller,
            name: "Maria".to_string(),
            local_id: Some("l1".to_string()),
        };

        assert!(user.matches_identifier("maria"));
        assert!(user.matches_identifier("MARIA"));
        assert!(user.matches_identifier("Maria"));
        assert!(user.matches_identifier("MARIA@EXAMPLE.COM"));
        assert!(!user.matches_identifier("mario"));
    }

    #[test]
    fn test_cart_item_freezes_product_snapshot() {
        let mut p = product();
        let item = CartItem::from_product(&p, 2);

        // Later product edits must not affect the frozen line
        p.price_cents = 999;
        assert_eq!(item.unit_price_cents, 150);
        assert_eq!(item.line_total_cents(), 300);
    }

    #[test]
    fn test_product_low_stock_and_can_sell() {
        let p = product();
        assert!(!p.is_low_stock());
        assert!(p.can_sell(10));
        assert!(!p.can_sell(11));
        assert!(!p.can_sell(0));
    }

    #[test]
    fn test_notification_type_field_name() {
        let n = Notification {
            id: "n1".to_string(),
            local_id: "l1".to_string(),
            kind: NotificationKind::LowStock,
            title: "Low stock".to_string(),
            message: "Coca-Cola 330ml is down to 2".to_string(),
            date: Utc::now(),
            read: false,
            product_id: Some("p1".to_string()),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "LOW_STOCK");
    }
}

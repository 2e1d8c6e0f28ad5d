//! # Synced Collection Store
//!
//! The heart of the client: five collections mirrored from the document
//! store through a live subscription, with every mutation flowing remote-
//! first and coming back through the change stream.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Synced Store Data Flow                             │
//! │                                                                         │
//! │  UI action                                                             │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  SyncedStore op (validate → remote write, with retry/timeout)          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  DocumentStore ──commit──► ChangeEvent { collection }                  │
//! │     │                           │                                       │
//! │     │                           ▼                                       │
//! │     │                  subscription listener                            │
//! │     │                           │ fetch full collection                 │
//! │     │                           ▼                                       │
//! │     │                  SnapshotCache.replace_*()                        │
//! │     │                           │                                       │
//! │     ▼                           ▼                                       │
//! │  typed Result            dashboards & lists recompute                  │
//! │                                                                         │
//! │  Ops NEVER write the snapshot directly: local visibility of a write    │
//! │  always comes from the change stream, same as a write from another     │
//! │  terminal.                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use caja_core::money::apply_discount;
use caja_core::validation::{
    validate_discount, validate_name, validate_price_cents, validate_quantity,
    validate_role_location, validate_sku, validate_stock, validate_username,
};
use caja_core::{
    CartItem, CoreError, DiscountType, Local, MeasurementUnit, Money, Notification,
    NotificationKind, PaymentMethod, Product, Role, Sale, SaleStatus, SubscriptionStatus, Task,
    TaskFrequency, TaskStatus, User, ValidationError, SUPER_ADMIN_ID,
    SUPER_ADMIN_INITIAL_PASSWORD, SUPER_ADMIN_USERNAME,
};
use caja_db::{decode_doc, Collection, Database, DbError, DocumentStore};

use crate::auth::hash_password;
use crate::error::{StoreError, StoreResult};
use crate::retry::{with_retry, RetryPolicy};
use crate::snapshot::SnapshotCache;

// =============================================================================
// Input Shapes
// =============================================================================

/// Input for creating a user. Carries the plaintext password exactly once;
/// only its argon2 hash is ever stored or kept in memory afterwards.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Role,
    pub name: String,
    pub local_id: Option<String>,
}

/// Partial user update. `None` fields stay untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Plaintext; hashed before it leaves this process.
    pub password: Option<String>,
    pub role: Option<Role>,
    pub name: Option<String>,
    pub local_id: Option<String>,
}

/// Partial product update. `None` fields stay untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_unit: Option<MeasurementUnit>,
}

/// Partial locale update. `None` fields stay untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<chrono::DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_in_register_cents: Option<i64>,
}

/// Input for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub local_id: String,
    pub assigned_to_id: String,
    pub assigned_by_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<chrono::DateTime<Utc>>,
    pub is_recurring: bool,
    pub frequency: Option<TaskFrequency>,
}

/// Partial task update. `None` fields stay untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<chrono::DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<TaskFrequency>,
}

/// Input for recording a sale.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub local_id: String,
    pub seller_id: String,
    pub items: Vec<CartItem>,
    pub payment_method: PaymentMethod,
    /// Discount value: cents for FIXED, whole percent for PERCENTAGE.
    pub discount: Option<i64>,
    pub discount_type: Option<DiscountType>,
    pub tendered_cents: Option<i64>,
}

/// Result of a recorded sale: the persisted sale plus any low-stock alerts
/// it produced (exactly one per product at/below its threshold).
#[derive(Debug, Clone)]
pub struct RecordedSale {
    pub sale: Sale,
    pub low_stock: Vec<Notification>,
}

/// Everything a receipt renderer needs: the sale with the locale it
/// happened in and the user who rang it up. Locale and seller can be gone
/// by the time an old receipt is reprinted; the sale's own frozen line
/// items still render.
#[derive(Debug, Clone)]
pub struct ReceiptContext {
    pub sale: Sale,
    pub local: Option<Local>,
    pub seller: Option<User>,
}

// =============================================================================
// Subscription Handle
// =============================================================================

/// Deregistration handle for a live subscription.
///
/// Dropping (or calling [`unsubscribe`](SubscriptionHandle::unsubscribe))
/// stops the listener task; the snapshot is never mutated again afterwards.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Stops the listener.
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    /// Whether the listener is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Synced Store
// =============================================================================

/// The synced collection store.
///
/// Holds the snapshot cache, the notification tray, and the retry policy
/// applied to every remote write.
pub struct SyncedStore {
    pub(crate) docs: DocumentStore,
    pub(crate) cache: Arc<SnapshotCache>,
    notifications: RwLock<Vec<Notification>>,
    pub(crate) retry: RetryPolicy,
}

impl SyncedStore {
    pub fn new(db: &Database, retry: RetryPolicy) -> Self {
        SyncedStore {
            docs: db.documents(),
            cache: Arc::new(SnapshotCache::default()),
            notifications: RwLock::new(Vec::new()),
            retry,
        }
    }

    /// The snapshot cache handle, shared with the auth gate and any reader.
    pub fn cache(&self) -> Arc<SnapshotCache> {
        Arc::clone(&self.cache)
    }

    pub(crate) fn docs(&self) -> DocumentStore {
        self.docs.clone()
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Loads all five snapshots and spawns the listener that keeps them in
    /// lock-step with the document store.
    ///
    /// Whenever the users collection is observed empty - at initial load or
    /// on any later refresh - the fixed super-admin is seeded, so the system
    /// is never without an administrator.
    pub async fn subscribe(&self) -> StoreResult<SubscriptionHandle> {
        // Register for changes BEFORE the initial load: a write landing
        // between load and registration must not be missed.
        let mut rx = self.docs.changes();

        for collection in Collection::ALL {
            refresh_collection(&self.docs, &self.cache, collection).await?;
        }

        let docs = self.docs.clone();
        let cache = Arc::clone(&self.cache);

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) =
                            refresh_collection(&docs, &cache, event.collection).await
                        {
                            warn!(collection = %event.collection, error = %e, "Snapshot refresh failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed events are harmless as long as we resync
                        warn!(skipped, "Change stream lagged, full resync");
                        for collection in Collection::ALL {
                            if let Err(e) = refresh_collection(&docs, &cache, collection).await {
                                warn!(collection = %collection, error = %e, "Resync failed");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        info!("Collection subscriptions established");
        Ok(SubscriptionHandle { task })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Creates a user: validates, hashes the password, derives the
    /// normalized lookup fields, writes remotely.
    pub async fn add_user(&self, new: NewUser) -> StoreResult<User> {
        validate_username(&new.username)?;
        validate_name("name", &new.name)?;
        validate_role_location(new.role, new.local_id.as_deref())?;
        self.ensure_username_free(&new.username, None).await?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new.username.trim().to_string(),
            email: new.email,
            password_hash: match new.password.as_deref() {
                Some(plain) => Some(hash_password(plain)?),
                None => None,
            },
            role: new.role,
            name: new.name.trim().to_string(),
            local_id: new.local_id,
        };

        let body = user_doc(&user)?;
        with_retry(&self.retry, "add_user", || async {
            self.docs
                .put(Collection::Users, &user.id, &body)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// Applies a partial update to a user, re-deriving the normalized
    /// lookup fields for any identifier change.
    pub async fn update_user(&self, id: &str, patch: UserPatch) -> StoreResult<()> {
        let current: User = self.fetch_required(Collection::Users, id).await?;

        // The role/locale invariant holds on the merged result
        let role = patch.role.unwrap_or(current.role);
        let local_id = patch.local_id.clone().or(current.local_id);
        validate_role_location(role, local_id.as_deref())?;

        let mut merge = serde_json::Map::new();
        if let Some(username) = &patch.username {
            validate_username(username)?;
            self.ensure_username_free(username, Some(id)).await?;
            merge.insert("username".into(), json!(username.trim()));
            merge.insert("usernameLower".into(), json!(username.trim().to_lowercase()));
        }
        if let Some(email) = &patch.email {
            merge.insert("email".into(), json!(email));
            merge.insert("emailLower".into(), json!(email.to_lowercase()));
        }
        if let Some(plain) = &patch.password {
            merge.insert("passwordHash".into(), json!(hash_password(plain)?));
        }
        if let Some(role) = patch.role {
            merge.insert("role".into(), json!(role));
        }
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
            merge.insert("name".into(), json!(name.trim()));
        }
        if let Some(local_id) = &patch.local_id {
            merge.insert("localId".into(), json!(local_id));
        }
        if merge.is_empty() {
            return Ok(());
        }

        let merge = Value::Object(merge);
        with_retry(&self.retry, "update_user", || async {
            self.docs
                .patch(Collection::Users, id, &merge)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    pub async fn delete_user(&self, id: &str) -> StoreResult<()> {
        with_retry(&self.retry, "delete_user", || async {
            self.docs
                .delete(Collection::Users, id)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn ensure_username_free(&self, username: &str, except: Option<&str>) -> StoreResult<()> {
        let lower = username.trim().to_lowercase();
        let hits = self
            .docs
            .find_by_field(Collection::Users, "usernameLower", &lower)
            .await?;
        let taken = hits
            .iter()
            .filter_map(|body| body.get("id").and_then(Value::as_str))
            .any(|id| Some(id) != except);
        if taken {
            return Err(ValidationError::Duplicate {
                field: "username".to_string(),
                value: username.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    // =========================================================================
    // Locales
    // =========================================================================

    pub async fn add_local(&self, local: Local) -> StoreResult<Local> {
        validate_name("name", &local.name)?;
        validate_name("address", &local.address)?;

        let body = to_doc(&local)?;
        with_retry(&self.retry, "add_local", || async {
            self.docs
                .put(Collection::Locales, &local.id, &body)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        info!(local_id = %local.id, name = %local.name, "Locale created");
        Ok(local)
    }

    pub async fn update_local(&self, id: &str, patch: LocalPatch) -> StoreResult<()> {
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
        }
        let merge = to_doc(&patch)?;
        with_retry(&self.retry, "update_local", || async {
            self.docs
                .patch(Collection::Locales, id, &merge)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    pub async fn delete_local(&self, id: &str) -> StoreResult<()> {
        // No cascading delete: products and users of the locale survive and
        // must be reassigned or removed explicitly.
        with_retry(&self.retry, "delete_local", || async {
            self.docs
                .delete(Collection::Locales, id)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    /// Flips a locale's active flag.
    pub async fn toggle_local_status(&self, id: &str) -> StoreResult<bool> {
        let current: Local = self.fetch_required(Collection::Locales, id).await?;
        let next = !current.is_active;

        let merge = json!({ "isActive": next });
        with_retry(&self.retry, "toggle_local_status", || async {
            self.docs
                .patch(Collection::Locales, id, &merge)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        Ok(next)
    }

    /// Manual register count: adds a (possibly negative) delta to a
    /// locale's cash-in-register balance. Returns the new balance in cents.
    pub async fn adjust_cash_register(&self, id: &str, delta_cents: i64) -> StoreResult<i64> {
        with_retry(&self.retry, "adjust_cash_register", || async {
            self.docs
                .increment(Collection::Locales, id, "cashInRegisterCents", delta_cents)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn add_product(&self, product: Product) -> StoreResult<Product> {
        validate_name("name", &product.name)?;
        validate_sku(&product.sku)?;
        validate_price_cents("price", product.price_cents)?;
        if let Some(cost) = product.cost_cents {
            validate_price_cents("cost", cost)?;
        }
        validate_stock("stock", product.stock)?;
        validate_stock("minStock", product.min_stock)?;

        let body = to_doc(&product)?;
        with_retry(&self.retry, "add_product", || async {
            self.docs
                .put(Collection::Products, &product.id, &body)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        debug!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: &str, patch: ProductPatch) -> StoreResult<()> {
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
        }
        if let Some(sku) = &patch.sku {
            validate_sku(sku)?;
        }
        if let Some(price) = patch.price_cents {
            validate_price_cents("price", price)?;
        }
        if let Some(cost) = patch.cost_cents {
            validate_price_cents("cost", cost)?;
        }
        if let Some(stock) = patch.stock {
            validate_stock("stock", stock)?;
        }
        if let Some(min_stock) = patch.min_stock {
            validate_stock("minStock", min_stock)?;
        }

        let merge = to_doc(&patch)?;
        with_retry(&self.retry, "update_product", || async {
            self.docs
                .patch(Collection::Products, id, &merge)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    pub async fn delete_product(&self, id: &str) -> StoreResult<()> {
        with_retry(&self.retry, "delete_product", || async {
            self.docs
                .delete(Collection::Products, id)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale as ONE atomic unit of work:
    ///
    /// 1. Validation (fail fast, nothing remote happens on bad input)
    /// 2. Transaction: insert sale + conditionally decrement each product's
    ///    stock (`stock >= quantity` at commit time) + on CASH, add the
    ///    final total to the locale's register balance
    /// 3. After commit: one LOW_STOCK notification per product that ended
    ///    at or below its threshold
    ///
    /// If any decrement finds less stock than requested, the whole
    /// transaction rolls back: inventory and sales history never diverge,
    /// and two concurrent sales cannot oversell the same unit.
    pub async fn record_sale(&self, new: NewSale) -> StoreResult<RecordedSale> {
        if new.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }
        for item in &new.items {
            validate_quantity(item.quantity)?;
            validate_price_cents("unit price", item.unit_price_cents)?;
        }
        let mut seen = std::collections::HashSet::new();
        for item in &new.items {
            if !seen.insert(item.product_id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "sale line".to_string(),
                    value: item.product_id.clone(),
                }
                .into());
            }
        }
        match (new.discount, new.discount_type) {
            (Some(value), Some(kind)) => validate_discount(value, kind)?,
            (None, None) => {}
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: "discount".to_string(),
                    reason: "value and type must be given together".to_string(),
                }
                .into());
            }
        }

        let total_cents: i64 = new.items.iter().map(CartItem::line_total_cents).sum();
        // The store computes the discounted total; callers never supply it
        let final_total_cents = match (new.discount, new.discount_type) {
            (Some(value), Some(kind)) => {
                Some(apply_discount(Money::from_cents(total_cents), value, kind).cents())
            }
            _ => None,
        };

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            local_id: new.local_id,
            seller_id: new.seller_id,
            items: new.items,
            total_cents,
            date: Utc::now(),
            payment_method: new.payment_method,
            discount: new.discount,
            discount_type: new.discount_type,
            final_total_cents,
            tendered_cents: new.tendered_cents,
            status: SaleStatus::Completed,
            cancellation_reason: None,
            cancellation_requested_by: None,
            cancellation_approved_by: None,
            cancellation_date: None,
        };
        let body = to_doc(&sale)?;

        let products_after = with_retry(&self.retry, "record_sale", || async {
            let mut txn = self.docs.begin().await.map_err(StoreError::from)?;

            txn.put(Collection::Sales, &sale.id, &body)
                .await
                .map_err(StoreError::from)?;

            let mut after = Vec::with_capacity(sale.items.len());
            for item in &sale.items {
                match txn
                    .decrement_if_at_least(
                        Collection::Products,
                        &item.product_id,
                        "stock",
                        item.quantity,
                    )
                    .await
                {
                    Ok(_) => {}
                    Err(DbError::NotFound { .. }) => {
                        return Err(CoreError::ProductNotFound(item.product_id.clone()).into());
                    }
                    Err(DbError::PreconditionFailed {
                        available,
                        requested,
                        ..
                    }) => {
                        return Err(CoreError::InsufficientStock {
                            sku: item.sku.clone(),
                            available,
                            requested,
                        }
                        .into());
                    }
                    Err(e) => return Err(e.into()),
                }

                // Post-decrement state, read inside the transaction
                let body = txn
                    .get(Collection::Products, &item.product_id)
                    .await
                    .map_err(StoreError::from)?
                    .ok_or_else(|| DbError::not_found("products", &item.product_id))?;
                after.push(decode_doc::<Product>(
                    Collection::Products,
                    &item.product_id,
                    body,
                )?);
            }

            if sale.payment_method == PaymentMethod::Cash {
                txn.increment(
                    Collection::Locales,
                    &sale.local_id,
                    "cashInRegisterCents",
                    sale.effective_total_cents(),
                )
                .await
                .map_err(StoreError::from)?;
            }

            txn.commit().await.map_err(StoreError::from)?;
            Ok(after)
        })
        .await?;

        let low_stock: Vec<Notification> = products_after
            .iter()
            .filter(|product| product.is_low_stock())
            .map(|product| Notification {
                id: Uuid::new_v4().to_string(),
                local_id: product.local_id.clone(),
                kind: NotificationKind::LowStock,
                title: "Low stock".to_string(),
                message: format!(
                    "{} is down to {} (minimum {})",
                    product.name, product.stock, product.min_stock
                ),
                date: Utc::now(),
                read: false,
                product_id: Some(product.id.clone()),
            })
            .collect();

        self.notifications
            .write()
            .expect("notifications lock poisoned")
            .extend(low_stock.iter().cloned());

        info!(
            sale_id = %sale.id,
            total_cents = sale.effective_total_cents(),
            items = sale.items.len(),
            low_stock = low_stock.len(),
            "Sale recorded"
        );

        Ok(RecordedSale { sale, low_stock })
    }

    /// Assembles the sale/locale/seller triple for the receipt renderer
    /// from the current snapshots.
    pub fn receipt_context(&self, sale_id: &str) -> StoreResult<ReceiptContext> {
        let sale = self
            .cache
            .sale(sale_id)
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        let local = self.cache.locale(&sale.local_id);
        let seller = self
            .cache
            .users()
            .iter()
            .find(|u| u.id == sale.seller_id)
            .cloned();
        Ok(ReceiptContext { sale, local, seller })
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub async fn add_task(&self, new: NewTask) -> StoreResult<Task> {
        validate_name("title", &new.title)?;

        let task = Task {
            id: Uuid::new_v4().to_string(),
            local_id: new.local_id,
            assigned_to_id: new.assigned_to_id,
            assigned_by_id: new.assigned_by_id,
            title: new.title.trim().to_string(),
            description: new.description,
            due_date: new.due_date,
            status: TaskStatus::Pending,
            completed_at: None,
            created_at: Utc::now(),
            is_recurring: new.is_recurring,
            frequency: new.frequency,
        };

        let body = to_doc(&task)?;
        with_retry(&self.retry, "add_task", || async {
            self.docs
                .put(Collection::Tasks, &task.id, &body)
                .await
                .map_err(StoreError::from)
        })
        .await?;

        debug!(task_id = %task.id, assigned_to = %task.assigned_to_id, "Task created");
        Ok(task)
    }

    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> StoreResult<()> {
        if let Some(title) = &patch.title {
            validate_name("title", title)?;
        }
        let merge = to_doc(&patch)?;
        with_retry(&self.retry, "update_task", || async {
            self.docs
                .patch(Collection::Tasks, id, &merge)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    /// Marks a task completed, stamping the completion time. Completing an
    /// already-completed task is a no-op.
    pub async fn complete_task(&self, id: &str) -> StoreResult<()> {
        let current: Task = self.fetch_required(Collection::Tasks, id).await?;
        if current.status == TaskStatus::Completed {
            return Ok(());
        }

        let merge = json!({
            "status": TaskStatus::Completed,
            "completedAt": Utc::now(),
        });
        with_retry(&self.retry, "complete_task", || async {
            self.docs
                .patch(Collection::Tasks, id, &merge)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    pub async fn delete_task(&self, id: &str) -> StoreResult<()> {
        with_retry(&self.retry, "delete_task", || async {
            self.docs
                .delete(Collection::Tasks, id)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    // =========================================================================
    // Notifications (local-only)
    // =========================================================================

    /// Current notification tray, newest last.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .read()
            .expect("notifications lock poisoned")
            .clone()
    }

    /// Marks a notification read. Returns false when the id is unknown.
    pub fn mark_notification_read(&self, id: &str) -> bool {
        let mut tray = self
            .notifications
            .write()
            .expect("notifications lock poisoned");
        match tray.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    /// Drops read notifications, keeping unread ones.
    pub fn clear_read_notifications(&self) {
        self.notifications
            .write()
            .expect("notifications lock poisoned")
            .retain(|n| !n.read);
    }

    /// Raises a SYSTEM notification for a locale.
    pub fn push_system_notification(&self, local_id: &str, title: &str, message: &str) {
        self.notifications
            .write()
            .expect("notifications lock poisoned")
            .push(Notification {
                id: Uuid::new_v4().to_string(),
                local_id: local_id.to_string(),
                kind: NotificationKind::System,
                title: title.to_string(),
                message: message.to_string(),
                date: Utc::now(),
                read: false,
                product_id: None,
            });
    }

    // =========================================================================
    // Shared Helpers
    // =========================================================================

    /// Point read + decode, erroring on a missing document.
    pub(crate) async fn fetch_required<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> StoreResult<T> {
        let body = self
            .docs
            .get(collection, id)
            .await?
            .ok_or_else(|| DbError::not_found(collection.as_str(), id))?;
        Ok(decode_doc(collection, id, body)?)
    }
}

// =============================================================================
// Document Encoding
// =============================================================================

pub(crate) fn to_doc<T: Serialize>(value: &T) -> StoreResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::Remote(DbError::Internal(format!("encode failed: {e}"))))
}

/// Serializes a user and derives the normalized lookup fields the remote
/// store indexes (it only supports exact-match filters).
pub(crate) fn user_doc(user: &User) -> StoreResult<Value> {
    let mut body = to_doc(user)?;
    body["usernameLower"] = json!(user.username.to_lowercase());
    if let Some(email) = &user.email {
        body["emailLower"] = json!(email.to_lowercase());
    }
    Ok(body)
}

// =============================================================================
// Snapshot Refresh & Bootstrap
// =============================================================================

fn decode_all<T: DeserializeOwned>(collection: Collection, bodies: Vec<Value>) -> Vec<T> {
    bodies
        .into_iter()
        .filter_map(|body| {
            let id = body
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("<missing id>")
                .to_string();
            match decode_doc(collection, &id, body) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    // A corrupt foreign document must not wedge the whole
                    // collection; drop it from the snapshot and report
                    warn!(collection = %collection, id = %id, error = %e, "Skipping undecodable document");
                    None
                }
            }
        })
        .collect()
}

async fn refresh_collection(
    docs: &DocumentStore,
    cache: &SnapshotCache,
    collection: Collection,
) -> StoreResult<()> {
    let bodies = docs.fetch_collection(collection).await?;

    match collection {
        Collection::Users => {
            let users: Vec<User> = decode_all(collection, bodies);
            if users.is_empty() {
                let admin = bootstrap_super_admin(docs).await?;
                cache.replace_users(vec![admin]);
            } else {
                cache.replace_users(users);
            }
        }
        Collection::Locales => cache.replace_locales(decode_all(collection, bodies)),
        Collection::Products => cache.replace_products(decode_all(collection, bodies)),
        Collection::Sales => cache.replace_sales(decode_all(collection, bodies)),
        Collection::Tasks => cache.replace_tasks(decode_all(collection, bodies)),
    }

    Ok(())
}

/// Seeds the fixed well-known super-admin, locally and remotely.
///
/// The fixed id makes this idempotent: concurrent observers of an empty
/// collection all write the same document.
async fn bootstrap_super_admin(docs: &DocumentStore) -> StoreResult<User> {
    let admin = User {
        id: SUPER_ADMIN_ID.to_string(),
        username: SUPER_ADMIN_USERNAME.to_string(),
        email: None,
        password_hash: Some(hash_password(SUPER_ADMIN_INITIAL_PASSWORD)?),
        role: Role::SuperAdmin,
        name: "System Owner".to_string(),
        local_id: None,
    };

    let body = user_doc(&admin)?;
    docs.put(Collection::Users, &admin.id, &body).await?;

    info!(user_id = %admin.id, "Users collection was empty, seeded super-admin");
    Ok(admin)
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Sale Cancellation Workflow
//!
//! Executes the request/approve/reject state machine transactionally.
//!
//! ## Guarantee
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Stock is restored EXACTLY ONCE per cancelled sale, only on the        │
//! │  transition INTO CANCELLED:                                            │
//! │                                                                         │
//! │  COMPLETED ──seller request──► CANCELLATION_REQUESTED   (stock: -)     │
//! │  COMPLETED ──admin direct────► CANCELLED                (stock: +qty)  │
//! │  CANCELLATION_REQUESTED ──approve──► CANCELLED          (stock: +qty)  │
//! │  CANCELLATION_REQUESTED ──reject───► COMPLETED          (stock: -)     │
//! │  CANCELLED ──anything──► error                                          │
//! │                                                                         │
//! │  The status guard and the stock increments share one transaction, so   │
//! │  a sale can never be cancelled twice nor restore stock partially.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rejection keeps the reason/requester stamps as an audit trail of the
//! denied request.

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use caja_core::cancellation::{
    action_for_role, ensure_can_approve, ensure_can_request, ensure_can_resolve,
    CancellationAction,
};
use caja_core::validation::validate_cancellation_reason;
use caja_core::{CoreError, Sale, SaleStatus, User};
use caja_db::{decode_doc, Collection, DbError, DocumentTxn};

use crate::error::{StoreError, StoreResult};
use crate::retry::with_retry;
use crate::store::SyncedStore;

impl SyncedStore {
    /// Requests - or, for admins, directly performs - a sale cancellation.
    ///
    /// A blank reason is rejected before anything remote happens. Sellers
    /// park the sale as CANCELLATION_REQUESTED and touch no stock; admins
    /// transition straight to CANCELLED and restore stock in the same
    /// transaction.
    ///
    /// Returns the sale as it now stands.
    pub async fn request_cancellation(
        &self,
        sale_id: &str,
        reason: &str,
        actor: &User,
    ) -> StoreResult<Sale> {
        validate_cancellation_reason(reason)?;
        let reason = reason.trim();

        let sale = with_retry(&self.retry, "request_cancellation", || async {
            let mut txn = self.docs.begin().await.map_err(StoreError::from)?;
            let mut sale = fetch_sale(&mut txn, sale_id).await?;
            ensure_can_request(sale_id, sale.status)?;

            let now = Utc::now();
            match action_for_role(actor.role) {
                CancellationAction::Direct => {
                    txn.patch(
                        Collection::Sales,
                        sale_id,
                        &json!({
                            "status": SaleStatus::Cancelled,
                            "cancellationReason": reason,
                            "cancellationRequestedBy": actor.id,
                            "cancellationDate": now,
                        }),
                    )
                    .await
                    .map_err(StoreError::from)?;
                    restore_stock(&mut txn, &sale).await?;

                    sale.status = SaleStatus::Cancelled;
                    sale.cancellation_reason = Some(reason.to_string());
                    sale.cancellation_requested_by = Some(actor.id.clone());
                    sale.cancellation_date = Some(now);
                }
                CancellationAction::Request => {
                    txn.patch(
                        Collection::Sales,
                        sale_id,
                        &json!({
                            "status": SaleStatus::CancellationRequested,
                            "cancellationReason": reason,
                            "cancellationRequestedBy": actor.id,
                        }),
                    )
                    .await
                    .map_err(StoreError::from)?;

                    sale.status = SaleStatus::CancellationRequested;
                    sale.cancellation_reason = Some(reason.to_string());
                    sale.cancellation_requested_by = Some(actor.id.clone());
                }
            }

            txn.commit().await.map_err(StoreError::from)?;
            Ok(sale)
        })
        .await?;

        info!(
            sale_id = %sale_id,
            actor = %actor.id,
            status = %sale.status,
            "Cancellation {}",
            if sale.status == SaleStatus::Cancelled { "performed" } else { "requested" }
        );
        Ok(sale)
    }

    /// Approves a pending cancellation request: CANCELLATION_REQUESTED →
    /// CANCELLED, stamping the approver and date and restoring stock, all
    /// in one transaction.
    pub async fn approve_cancellation(&self, sale_id: &str, approver: &User) -> StoreResult<Sale> {
        ensure_can_approve(approver.role)?;

        let sale = with_retry(&self.retry, "approve_cancellation", || async {
            let mut txn = self.docs.begin().await.map_err(StoreError::from)?;
            let mut sale = fetch_sale(&mut txn, sale_id).await?;
            ensure_can_resolve(sale_id, sale.status)?;

            let now = Utc::now();
            txn.patch(
                Collection::Sales,
                sale_id,
                &json!({
                    "status": SaleStatus::Cancelled,
                    "cancellationApprovedBy": approver.id,
                    "cancellationDate": now,
                }),
            )
            .await
            .map_err(StoreError::from)?;
            restore_stock(&mut txn, &sale).await?;
            txn.commit().await.map_err(StoreError::from)?;

            sale.status = SaleStatus::Cancelled;
            sale.cancellation_approved_by = Some(approver.id.clone());
            sale.cancellation_date = Some(now);
            Ok(sale)
        })
        .await?;

        info!(sale_id = %sale_id, approver = %approver.id, "Cancellation approved");
        Ok(sale)
    }

    /// Rejects a pending cancellation request: back to COMPLETED, stock
    /// untouched, reason/requester stamps kept as the audit trail.
    pub async fn reject_cancellation(&self, sale_id: &str) -> StoreResult<Sale> {
        let sale = with_retry(&self.retry, "reject_cancellation", || async {
            let mut txn = self.docs.begin().await.map_err(StoreError::from)?;
            let mut sale = fetch_sale(&mut txn, sale_id).await?;
            ensure_can_resolve(sale_id, sale.status)?;

            txn.patch(
                Collection::Sales,
                sale_id,
                &json!({ "status": SaleStatus::Completed }),
            )
            .await
            .map_err(StoreError::from)?;
            txn.commit().await.map_err(StoreError::from)?;

            sale.status = SaleStatus::Completed;
            Ok(sale)
        })
        .await?;

        info!(sale_id = %sale_id, "Cancellation rejected");
        Ok(sale)
    }
}

async fn fetch_sale(txn: &mut DocumentTxn, sale_id: &str) -> StoreResult<Sale> {
    let body = txn
        .get(Collection::Sales, sale_id)
        .await
        .map_err(StoreError::from)?
        .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
    Ok(decode_doc(Collection::Sales, sale_id, body)?)
}

/// Adds each line item's quantity back to its product's stock.
///
/// A product deleted since the sale cannot receive its units back; that
/// line is skipped and reported, the rest of the reversal proceeds.
async fn restore_stock(txn: &mut DocumentTxn, sale: &Sale) -> StoreResult<()> {
    for item in &sale.items {
        match txn
            .increment(Collection::Products, &item.product_id, "stock", item.quantity)
            .await
        {
            Ok(_) => {}
            Err(DbError::NotFound { .. }) => {
                warn!(
                    sale_id = %sale.id,
                    product_id = %item.product_id,
                    "Product no longer exists, skipping stock restore for this line"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewSale, SyncedStore};
    use crate::testutil::test_store;
    use caja_core::{
        CartItem, Local, MeasurementUnit, PaymentMethod, Product, Role, SubscriptionStatus,
    };

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            email: None,
            password_hash: None,
            role,
            name: id.to_string(),
            local_id: match role {
                Role::SuperAdmin => None,
                _ => Some("l1".to_string()),
            },
        }
    }

    async fn sold_sale(store: &SyncedStore, quantity: i64) -> (Sale, String) {
        store
            .add_local(Local {
                id: "l1".to_string(),
                name: "Sucursal Centro".to_string(),
                address: "Av. Principal 123".to_string(),
                is_active: true,
                subscription_status: SubscriptionStatus::Active,
                last_payment_date: None,
                cash_in_register_cents: Some(0),
            })
            .await
            .unwrap();
        let product = store
            .add_product(Product {
                id: "p1".to_string(),
                local_id: "l1".to_string(),
                name: "Coca-Cola 330ml".to_string(),
                price_cents: 150,
                stock: 10,
                min_stock: 1,
                category: "Beverages".to_string(),
                sku: "COKE-330".to_string(),
                barcode: None,
                cost_cents: None,
                measurement_unit: MeasurementUnit::Unit,
            })
            .await
            .unwrap();

        let recorded = store
            .record_sale(NewSale {
                local_id: "l1".to_string(),
                seller_id: "seller-1".to_string(),
                items: vec![CartItem::from_product(&product, quantity)],
                payment_method: PaymentMethod::Card,
                discount: None,
                discount_type: None,
                tendered_cents: None,
            })
            .await
            .unwrap();
        let id = recorded.sale.id.clone();
        (recorded.sale, id)
    }

    async fn stock_of(store: &SyncedStore, id: &str) -> i64 {
        let body = store
            .docs()
            .get(Collection::Products, id)
            .await
            .unwrap()
            .unwrap();
        body["stock"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_seller_request_parks_sale_without_touching_stock() {
        let (_db, store) = test_store().await;
        let (_, sale_id) = sold_sale(&store, 3).await;
        assert_eq!(stock_of(&store, "p1").await, 7);

        let sale = store
            .request_cancellation(&sale_id, "customer changed their mind", &user("s1", Role::Seller))
            .await
            .unwrap();

        assert_eq!(sale.status, SaleStatus::CancellationRequested);
        assert_eq!(sale.cancellation_requested_by.as_deref(), Some("s1"));
        // Request alone never restores inventory
        assert_eq!(stock_of(&store, "p1").await, 7);
    }

    #[tokio::test]
    async fn test_admin_cancels_directly_and_restores_stock() {
        let (_db, store) = test_store().await;
        let (_, sale_id) = sold_sale(&store, 3).await;
        assert_eq!(stock_of(&store, "p1").await, 7);

        let sale = store
            .request_cancellation(&sale_id, "voided at the counter", &user("a1", Role::Admin))
            .await
            .unwrap();

        assert_eq!(sale.status, SaleStatus::Cancelled);
        assert!(sale.cancellation_date.is_some());
        assert_eq!(stock_of(&store, "p1").await, 10);
    }

    #[tokio::test]
    async fn test_approve_restores_stock_exactly_once() {
        let (_db, store) = test_store().await;
        let (_, sale_id) = sold_sale(&store, 3).await;

        store
            .request_cancellation(&sale_id, "wrong items", &user("s1", Role::Seller))
            .await
            .unwrap();
        let sale = store
            .approve_cancellation(&sale_id, &user("a1", Role::Admin))
            .await
            .unwrap();

        assert_eq!(sale.status, SaleStatus::Cancelled);
        assert_eq!(sale.cancellation_approved_by.as_deref(), Some("a1"));
        assert_eq!(stock_of(&store, "p1").await, 10);

        // CANCELLED is terminal: neither a second approval nor a new
        // request can run the reversal again
        let err = store
            .approve_cancellation(&sale_id, &user("a1", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::InvalidTransition { .. })));
        let err = store
            .request_cancellation(&sale_id, "again", &user("a1", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::InvalidTransition { .. })));
        assert_eq!(stock_of(&store, "p1").await, 10);
    }

    #[tokio::test]
    async fn test_reject_keeps_audit_stamps() {
        let (_db, store) = test_store().await;
        let (_, sale_id) = sold_sale(&store, 3).await;

        store
            .request_cancellation(&sale_id, "suspicious request", &user("s1", Role::Seller))
            .await
            .unwrap();
        let sale = store.reject_cancellation(&sale_id).await.unwrap();

        assert_eq!(sale.status, SaleStatus::Completed);
        // Decision pinned: the denied request stays visible in the audit trail
        let body = store
            .docs()
            .get(Collection::Sales, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body["status"], "COMPLETED");
        assert_eq!(body["cancellationReason"], "suspicious request");
        assert_eq!(body["cancellationRequestedBy"], "s1");
        // And stock stays sold
        assert_eq!(stock_of(&store, "p1").await, 7);
    }

    #[tokio::test]
    async fn test_reject_requires_a_pending_request() {
        let (_db, store) = test_store().await;
        let (_, sale_id) = sold_sale(&store, 1).await;

        let err = store.reject_cancellation(&sale_id).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_sellers_cannot_approve() {
        let (_db, store) = test_store().await;
        let (_, sale_id) = sold_sale(&store, 1).await;

        store
            .request_cancellation(&sale_id, "mis-scan", &user("s1", Role::Seller))
            .await
            .unwrap();
        let err = store
            .approve_cancellation(&sale_id, &user("s2", Role::Seller))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::NotPermitted { .. })));
    }

    #[tokio::test]
    async fn test_blank_reason_is_rejected_before_any_remote_call() {
        let (_db, store) = test_store().await;
        let (_, sale_id) = sold_sale(&store, 2).await;

        let err = store
            .request_cancellation(&sale_id, "   ", &user("a1", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        // Sale untouched
        let body = store
            .docs()
            .get(Collection::Sales, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body["status"], "COMPLETED");
    }

    #[tokio::test]
    async fn test_deleted_product_line_is_skipped_on_restore() {
        let (_db, store) = test_store().await;
        let (_, sale_id) = sold_sale(&store, 2).await;

        store.delete_product("p1").await.unwrap();
        let sale = store
            .request_cancellation(&sale_id, "refund", &user("a1", Role::Admin))
            .await
            .unwrap();

        // Cancellation still lands even though the product is gone
        assert_eq!(sale.status, SaleStatus::Cancelled);
    }
}

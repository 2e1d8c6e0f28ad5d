//! # Sale Cancellation Transition Rules
//!
//! Pure decision logic for the cancellation workflow. The store executes
//! these decisions transactionally; this module only answers "what may
//! happen next".
//!
//! ## Transitions
//! - `COMPLETED → CANCELLED` - direct, admins only, restores stock
//! - `COMPLETED → CANCELLATION_REQUESTED` - sellers, stock untouched
//! - `CANCELLATION_REQUESTED → CANCELLED` - approve, restores stock
//! - `CANCELLATION_REQUESTED → COMPLETED` - reject, stock untouched
//!
//! `CANCELLED` is terminal. Stock is restored exactly once, only on the
//! transition INTO `CANCELLED` - a pending request alone never touches
//! inventory.

use crate::error::{CoreError, CoreResult};
use crate::types::{Role, SaleStatus};

/// How a cancellation request by a given role proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationAction {
    /// ADMIN / SUPER_ADMIN: cancel immediately, restore stock now.
    Direct,
    /// SELLER: park the sale as CANCELLATION_REQUESTED, await approval.
    Request,
}

/// Picks the action a role's cancellation request takes.
#[inline]
pub fn action_for_role(role: Role) -> CancellationAction {
    if role.can_approve_cancellation() {
        CancellationAction::Direct
    } else {
        CancellationAction::Request
    }
}

/// Checks that a sale may enter the cancellation flow (request or direct).
///
/// Only COMPLETED sales qualify; a pending request cannot be re-requested
/// and CANCELLED is terminal.
pub fn ensure_can_request(sale_id: &str, status: SaleStatus) -> CoreResult<()> {
    if status == SaleStatus::Completed {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            sale_id: sale_id.to_string(),
            current_status: status.to_string(),
        })
    }
}

/// Checks that a pending request may be resolved (approved or rejected).
pub fn ensure_can_resolve(sale_id: &str, status: SaleStatus) -> CoreResult<()> {
    if status == SaleStatus::CancellationRequested {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            sale_id: sale_id.to_string(),
            current_status: status.to_string(),
        })
    }
}

/// Checks that a role may approve (or reject) a cancellation request.
pub fn ensure_can_approve(role: Role) -> CoreResult<()> {
    if role.can_approve_cancellation() {
        Ok(())
    } else {
        Err(CoreError::NotPermitted {
            role: role.to_string(),
            action: "approve sale cancellations".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_per_role() {
        assert_eq!(action_for_role(Role::SuperAdmin), CancellationAction::Direct);
        assert_eq!(action_for_role(Role::Admin), CancellationAction::Direct);
        assert_eq!(action_for_role(Role::Seller), CancellationAction::Request);
    }

    #[test]
    fn test_request_only_from_completed() {
        assert!(ensure_can_request("s1", SaleStatus::Completed).is_ok());
        assert!(ensure_can_request("s1", SaleStatus::CancellationRequested).is_err());
        assert!(ensure_can_request("s1", SaleStatus::Cancelled).is_err());
    }

    #[test]
    fn test_resolve_only_from_requested() {
        assert!(ensure_can_resolve("s1", SaleStatus::CancellationRequested).is_ok());
        assert!(ensure_can_resolve("s1", SaleStatus::Completed).is_err());
        assert!(ensure_can_resolve("s1", SaleStatus::Cancelled).is_err());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        // No rule admits a transition out of CANCELLED
        assert!(ensure_can_request("s1", SaleStatus::Cancelled).is_err());
        assert!(ensure_can_resolve("s1", SaleStatus::Cancelled).is_err());
        assert!(SaleStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_sellers_cannot_approve() {
        assert!(ensure_can_approve(Role::Admin).is_ok());
        assert!(ensure_can_approve(Role::SuperAdmin).is_ok());
        assert!(ensure_can_approve(Role::Seller).is_err());
    }
}

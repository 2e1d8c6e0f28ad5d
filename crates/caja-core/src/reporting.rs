//! # Role-Scoped Reporting
//!
//! The visibility filter and simple totals behind sales history and
//! dashboard views. SUPER_ADMIN sees everything, ADMIN their locale,
//! SELLER only their own sales.

use crate::types::{Product, Role, Sale, SaleStatus, User};

/// Filters sales down to what a user may see.
///
/// - SUPER_ADMIN: every sale
/// - ADMIN: sales of their locale
/// - SELLER: their own sales
pub fn sales_visible_to<'a>(user: &User, sales: &'a [Sale]) -> Vec<&'a Sale> {
    sales
        .iter()
        .filter(|sale| match user.role {
            Role::SuperAdmin => true,
            Role::Admin => user
                .local_id
                .as_deref()
                .is_some_and(|local| sale.local_id == local),
            Role::Seller => sale.seller_id == user.id,
        })
        .collect()
}

/// Revenue across sales, in cents. Cancelled sales don't count; a pending
/// cancellation request still does (the money is still in the drawer).
pub fn revenue_cents<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> i64 {
    sales
        .into_iter()
        .filter(|sale| sale.status != SaleStatus::Cancelled)
        .map(Sale::effective_total_cents)
        .sum()
}

/// Products at or below their low-stock threshold.
pub fn low_stock_products(products: &[Product]) -> Vec<&Product> {
    products.iter().filter(|p| p.is_low_stock()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartItem, MeasurementUnit, PaymentMethod};
    use chrono::Utc;

    fn user(id: &str, role: Role, local_id: Option<&str>) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            email: None,
            password_hash: None,
            role,
            name: id.to_string(),
            local_id: local_id.map(str::to_string),
        }
    }

    fn sale(id: &str, local_id: &str, seller_id: &str, total: i64, status: SaleStatus) -> Sale {
        Sale {
            id: id.to_string(),
            local_id: local_id.to_string(),
            seller_id: seller_id.to_string(),
            items: vec![CartItem {
                product_id: "p1".to_string(),
                sku: "SKU-1".to_string(),
                name: "Item".to_string(),
                unit_price_cents: total,
                unit_cost_cents: None,
                measurement_unit: MeasurementUnit::Unit,
                quantity: 1,
            }],
            total_cents: total,
            date: Utc::now(),
            payment_method: PaymentMethod::Cash,
            discount: None,
            discount_type: None,
            final_total_cents: None,
            tendered_cents: None,
            status,
            cancellation_reason: None,
            cancellation_requested_by: None,
            cancellation_approved_by: None,
            cancellation_date: None,
        }
    }

    #[test]
    fn test_visibility_by_role() {
        let sales = vec![
            sale("s1", "l1", "u1", 100, SaleStatus::Completed),
            sale("s2", "l1", "u2", 200, SaleStatus::Completed),
            sale("s3", "l2", "u3", 300, SaleStatus::Completed),
        ];

        let owner = user("root", Role::SuperAdmin, None);
        let admin = user("a1", Role::Admin, Some("l1"));
        let seller = user("u2", Role::Seller, Some("l1"));

        assert_eq!(sales_visible_to(&owner, &sales).len(), 3);
        assert_eq!(sales_visible_to(&admin, &sales).len(), 2);

        let mine = sales_visible_to(&seller, &sales);
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "s2");
    }

    #[test]
    fn test_revenue_skips_cancelled() {
        let sales = vec![
            sale("s1", "l1", "u1", 100, SaleStatus::Completed),
            sale("s2", "l1", "u1", 200, SaleStatus::Cancelled),
            sale("s3", "l1", "u1", 300, SaleStatus::CancellationRequested),
        ];
        assert_eq!(revenue_cents(&sales), 400);
    }
}

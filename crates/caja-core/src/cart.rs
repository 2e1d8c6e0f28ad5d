//! # Cart
//!
//! The in-progress sale: frozen product snapshots plus quantities.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Scan / click product ──► add_item() ────► merge or push, stock-capped │
//! │  Change quantity ───────► set_quantity() ► stock-capped, 0 removes     │
//! │  Remove line ───────────► remove_item()                                 │
//! │  Clear ─────────────────► clear()                                       │
//! │                                                                         │
//! │  The stock cap uses the LOCALLY-KNOWN stock only. Two terminals can    │
//! │  both pass this pre-check against the same units; the authoritative    │
//! │  check is the conditional decrement when the sale commits.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{CartItem, Product};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// The shopping cart for one in-progress sale.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product merges)
/// - Quantity is always > 0 (setting 0 removes the line)
/// - Quantity never exceeds the locally-known stock at time of addition
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Adds a product to the cart, merging with an existing line.
    ///
    /// ## Errors
    /// - [`CoreError::InsufficientStock`] when the merged quantity exceeds
    ///   the locally-known stock
    /// - [`CoreError::QuantityTooLarge`] when it exceeds [`MAX_ITEM_QUANTITY`]
    /// - [`CoreError::CartTooLarge`] when a new line would exceed [`MAX_CART_ITEMS`]
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        crate::validation::validate_quantity(quantity)?;

        let merged = self
            .items
            .iter()
            .find(|item| item.product_id == product.id)
            .map_or(0, |item| item.quantity)
            + quantity;

        if merged > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: merged,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if merged > product.stock {
            return Err(CoreError::InsufficientStock {
                sku: product.sku.clone(),
                available: product.stock,
                requested: merged,
            });
        }

        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.id)
        {
            item.quantity = merged;
        } else {
            if self.items.len() >= MAX_CART_ITEMS {
                return Err(CoreError::CartTooLarge {
                    max: MAX_CART_ITEMS,
                });
            }
            self.items.push(CartItem::from_product(product, quantity));
        }

        Ok(())
    }

    /// Sets a line's quantity directly; 0 removes the line.
    ///
    /// The cap still uses the product's locally-known stock, so the caller
    /// passes the current product, not just its id.
    pub fn set_quantity(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            self.remove_item(&product.id);
            return Ok(());
        }

        crate::validation::validate_quantity(quantity)?;

        if quantity > product.stock {
            return Err(CoreError::InsufficientStock {
                sku: product.sku.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.id)
        {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::ProductNotFound(product.id.clone())),
        }
    }

    /// Removes a line by product id. Missing lines are ignored.
    pub fn remove_item(&mut self, product_id: &str) {
        self.items.retain(|item| item.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pre-discount total across all lines, in cents.
    pub fn total_cents(&self) -> i64 {
        self.items.iter().map(CartItem::line_total_cents).sum()
    }

    /// Consumes the cart, yielding the frozen line items for a sale.
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeasurementUnit;

    fn product(id: &str, stock: i64, price_cents: i64) -> Product {
        Product {
            id: id.to_string(),
            local_id: "l1".to_string(),
            name: format!("Product {id}"),
            price_cents,
            stock,
            min_stock: 2,
            category: "General".to_string(),
            sku: format!("SKU-{id}"),
            barcode: None,
            cost_cents: None,
            measurement_unit: MeasurementUnit::Unit,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new();
        let p = product("p1", 10, 150);

        cart.add_item(&p, 2).unwrap();
        cart.add_item(&p, 3).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.total_cents(), 750);
    }

    #[test]
    fn test_add_caps_at_known_stock() {
        let mut cart = Cart::new();
        let p = product("p1", 4, 150);

        cart.add_item(&p, 3).unwrap();
        // Merged 3 + 2 = 5 exceeds stock of 4
        let err = cart.add_item(&p, 2).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 4, requested: 5, .. }));
        assert_eq!(cart.items[0].quantity, 3);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        let p = product("p1", 10, 150);

        cart.add_item(&p, 2).unwrap();
        cart.set_quantity(&p, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_total_spans_lines() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", 10, 150), 2).unwrap();
        cart.add_item(&product("p2", 10, 1000), 1).unwrap();
        assert_eq!(cart.total_cents(), 1300);
    }

    #[test]
    fn test_quantity_validation() {
        let mut cart = Cart::new();
        let p = product("p1", 10_000, 150);

        assert!(cart.add_item(&p, 0).is_err());
        assert!(cart.add_item(&p, -1).is_err());
        assert!(cart.add_item(&p, 1000).is_err());
    }
}

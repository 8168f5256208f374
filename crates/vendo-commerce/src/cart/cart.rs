//! Cart and cart item types.

use crate::ids::{CartId, CartItemId, ProductId, SessionId, StoreId, UserId, VariantId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use vendo_db::Record;

/// Default cart lifetime before the expiry sweep removes it.
pub const CART_TTL_SECS: i64 = 30 * 86_400;

/// Who a cart belongs to: an authenticated user or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartOwner {
    User(UserId),
    Session(SessionId),
}

/// A coupon discount applied to a cart.
///
/// The amount is computed by the coupon evaluator; the cart stores the
/// result and folds it into every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    /// The coupon code used.
    pub code: String,
    /// Discount amount taken off the total.
    pub discount: Money,
}

/// A mutable pre-order basket.
///
/// Items are embedded in the cart record, so every mutation plus its
/// recompute is a single atomic table update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    /// Owning store.
    pub store_id: StoreId,
    /// Cart owner (user or anonymous session).
    pub owner: CartOwner,
    /// Cart currency, taken from the store at creation.
    pub currency: Currency,
    /// Items in the cart.
    pub items: Vec<CartItem>,
    /// Applied coupon, if any.
    pub coupon: Option<AppliedCoupon>,
    /// Shipping cost set on the cart.
    pub shipping_total: Money,
    /// Tax computed at the last recompute.
    pub tax_total: Money,
    /// Grand total computed at the last recompute.
    pub grand_total: Money,
    /// Additional metadata.
    pub metadata: serde_json::Value,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
    /// Unix timestamp after which the sweep may purge this cart.
    pub expires_at: i64,
}

impl Record for Cart {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

impl Cart {
    /// Subtotal over current items. Derivable, so never stored.
    pub fn subtotal(&self) -> Money {
        let cents = self
            .items
            .iter()
            .map(|item| item.line_total().amount_cents)
            .fold(0_i64, i64::saturating_add);
        Money::new(cents, self.currency)
    }

    /// Recompute tax and grand total from current items, coupon, and
    /// shipping.
    ///
    /// This is the single source of truth for cart monetary state; every
    /// mutation that can change the subtotal, tax basis, shipping, or
    /// discount runs it before the cart is persisted.
    pub fn recompute(&mut self, tax_rate: f64) {
        let subtotal = self.subtotal();
        self.tax_total = subtotal.percentage(tax_rate);
        let discount_cents = self
            .coupon
            .as_ref()
            .map(|c| c.discount.amount_cents)
            .unwrap_or(0);
        let total_cents = subtotal
            .amount_cents
            .saturating_add(self.tax_total.amount_cents)
            .saturating_add(self.shipping_total.amount_cents)
            .saturating_sub(discount_cents);
        self.grand_total = Money::new(total_cents, self.currency);
        self.updated_at = current_timestamp();
    }

    /// Zero out every total directly (cart clear).
    pub fn reset_totals(&mut self) {
        self.shipping_total = Money::zero(self.currency);
        self.tax_total = Money::zero(self.currency);
        self.grand_total = Money::zero(self.currency);
        self.updated_at = current_timestamp();
    }

    /// Total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if the cart is past its expiry.
    pub fn is_expired(&self) -> bool {
        current_timestamp() > self.expires_at
    }

    /// Find an item by id.
    pub fn item(&self, item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    /// Find an item by product and variant.
    pub fn item_for(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|i| &i.product_id == product_id && i.variant_id.as_ref() == variant_id)
    }
}

/// A priced line in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Unique item identifier.
    pub id: CartItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Variant, when one was selected.
    pub variant_id: Option<VariantId>,
    /// Quantity, always at least 1.
    pub quantity: i64,
    /// Price snapshot taken when the item was (re-)added. Never refreshed
    /// from the catalog on read.
    pub unit_price: Money,
}

impl CartItem {
    /// Line total (unit price times quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart_with_items() -> Cart {
        Cart {
            id: CartId::generate(),
            store_id: StoreId::new("store-1"),
            owner: CartOwner::Session(SessionId::new("sess-1")),
            currency: Currency::USD,
            items: vec![
                CartItem {
                    id: CartItemId::generate(),
                    product_id: ProductId::new("p1"),
                    variant_id: None,
                    quantity: 2,
                    unit_price: Money::new(1000, Currency::USD),
                },
                CartItem {
                    id: CartItemId::generate(),
                    product_id: ProductId::new("p2"),
                    variant_id: None,
                    quantity: 1,
                    unit_price: Money::new(500, Currency::USD),
                },
            ],
            coupon: None,
            shipping_total: Money::zero(Currency::USD),
            tax_total: Money::zero(Currency::USD),
            grand_total: Money::zero(Currency::USD),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            created_at: 0,
            updated_at: 0,
            expires_at: i64::MAX,
        }
    }

    #[test]
    fn test_subtotal() {
        let cart = cart_with_items();
        assert_eq!(cart.subtotal().amount_cents, 2500);
    }

    #[test]
    fn test_recompute_total_identity() {
        let mut cart = cart_with_items();
        cart.shipping_total = Money::new(500, Currency::USD);
        cart.coupon = Some(AppliedCoupon {
            code: "SAVE3".into(),
            discount: Money::new(300, Currency::USD),
        });
        cart.recompute(10.0);

        // subtotal 25.00, tax 2.50, shipping 5.00, discount 3.00
        assert_eq!(cart.tax_total.amount_cents, 250);
        assert_eq!(cart.grand_total.amount_cents, 2500 + 250 + 500 - 300);
    }

    #[test]
    fn test_reset_totals() {
        let mut cart = cart_with_items();
        cart.recompute(10.0);
        cart.reset_totals();

        assert!(cart.tax_total.is_zero());
        assert!(cart.grand_total.is_zero());
        assert!(cart.shipping_total.is_zero());
    }
}

//! Order and order item types.

use crate::ids::{OrderId, OrderItemId, PaymentId, ProductId, StoreId, UserId, VariantId};
use crate::money::{Currency, Money};
use crate::order::{OrderStatus, PaymentState, ShippingState};
use serde::{Deserialize, Serialize};
use vendo_db::Record;

/// An immutable-after-creation transaction record.
///
/// Monetary fields are frozen at creation; no transition method touches
/// them. Items may be appended but never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Owning store.
    pub store_id: StoreId,
    /// Human-readable unique order number.
    pub order_number: String,
    /// Customer user ID (None for guest checkouts).
    pub user_id: Option<UserId>,
    /// Customer email.
    pub email: Option<String>,
    /// Overall status.
    pub status: OrderStatus,
    /// Payment dimension.
    pub payment_status: PaymentState,
    /// Shipping dimension.
    pub shipping_status: ShippingState,
    /// Order currency.
    pub currency: Currency,
    /// Subtotal frozen at creation.
    pub subtotal: Money,
    /// Tax frozen at creation.
    pub tax: Money,
    /// Shipping frozen at creation.
    pub shipping: Money,
    /// Discount frozen at creation.
    pub discount: Money,
    /// Grand total frozen at creation.
    pub total: Money,
    /// Frozen line items.
    pub items: Vec<OrderItem>,
    /// Payment that settled this order, once known.
    pub settled_payment_id: Option<PaymentId>,
    /// Customer note.
    pub note: Option<String>,
    /// Additional metadata.
    pub metadata: serde_json::Value,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
    /// Unix timestamp when cancelled, if ever.
    pub cancelled_at: Option<i64>,
}

impl Record for Order {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

impl Order {
    /// Allocate a human-readable order number, unique per process.
    pub fn generate_order_number() -> String {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        static SEQUENCE: AtomicU64 = AtomicU64::new(0);

        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let seq = SEQUENCE.fetch_add(1, Ordering::SeqCst);
        format!("VND-{}-{:04}", ts, seq)
    }

    /// Total item count.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if the order has settled payment.
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentState::Paid
    }
}

/// A frozen line item of an order.
///
/// Name and price are snapshots; later catalog edits never alter them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Unique item identifier.
    pub id: OrderItemId,
    /// Parent order.
    pub order_id: OrderId,
    /// Product purchased.
    pub product_id: ProductId,
    /// Variant, when one was selected.
    pub variant_id: Option<VariantId>,
    /// Product name at order time.
    pub product_name: String,
    /// SKU at order time.
    pub sku: Option<String>,
    /// Quantity ordered.
    pub quantity: i64,
    /// Unit price at order time.
    pub unit_price: Money,
    /// Line total (unit price times quantity).
    pub total: Money,
}

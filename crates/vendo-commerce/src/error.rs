//! Commerce error taxonomy.
//!
//! One error type spans the whole pipeline so the API boundary can map
//! every failure to a response without re-wrapping across crates.

use thiserror::Error;
use vendo_db::DbError;

/// Errors that can occur across the commerce pipeline.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Store not found.
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Variant not found.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// Category not found.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Cart not found.
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// Item not in cart.
    #[error("Cart item not found: {0}")]
    ItemNotInCart(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Payment method not found.
    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(String),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Refund not found.
    #[error("Refund not found: {0}")]
    RefundNotFound(String),

    /// Digital download not found.
    #[error("Digital download not found: {0}")]
    DownloadNotFound(String),

    /// Download link not found for the given token.
    #[error("Download link not found")]
    LinkNotFound,

    /// Download link past its expiration window.
    #[error("Download link expired")]
    LinkExpired,

    /// Download count exhausted for the link.
    #[error("Download limit reached")]
    DownloadLimitReached,

    /// No gateway registered for the requested type.
    #[error("No payment gateway registered for type: {0}")]
    GatewayNotConfigured(String),

    /// Opaque failure from an external payment processor.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Payment has no gateway transaction to refund against.
    #[error("Payment {0} has no gateway transaction id")]
    MissingTransactionId(String),

    /// Refund amount exceeds what is still refundable on the payment.
    #[error("Refund of {requested_cents} exceeds refundable {refundable_cents}")]
    RefundExceedsPayment {
        requested_cents: i64,
        refundable_cents: i64,
    },

    /// File bytes missing from the object store for an existing record.
    #[error("Stored object missing for key: {0}")]
    ObjectMissing(String),

    /// Disallowed status transition.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Not enough stock to fulfill the request.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// Quantity must be positive.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Slug already in use.
    #[error("Slug already in use: {0}")]
    DuplicateSlug(String),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Missing or inconsistent input at the API boundary.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Underlying store failure.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl CommerceError {
    /// Check if this is any of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CommerceError::StoreNotFound(_)
                | CommerceError::ProductNotFound(_)
                | CommerceError::VariantNotFound(_)
                | CommerceError::CategoryNotFound(_)
                | CommerceError::CartNotFound(_)
                | CommerceError::ItemNotInCart(_)
                | CommerceError::OrderNotFound(_)
                | CommerceError::PaymentMethodNotFound(_)
                | CommerceError::PaymentNotFound(_)
                | CommerceError::RefundNotFound(_)
                | CommerceError::DownloadNotFound(_)
                | CommerceError::LinkNotFound
                | CommerceError::ObjectMissing(_)
        )
    }
}

//! Payment engine for Vendo.
//!
//! Processes payments against pluggable gateways, tracks attempt status,
//! and drives refunds. Gateways implement the [`PaymentGateway`] trait
//! and are bound to a [`GatewayKind`] in a [`GatewayRegistry`] injected
//! at engine construction, so substitution in tests is explicit.
//!
//! Attempts are append-only audit rows: every `process_payment` call
//! leaves exactly one row in a terminal state, and a retry is a brand-new
//! call.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vendo_payments::prelude::*;
//!
//! let registry = GatewayRegistry::new()
//!     .with(GatewayKind::Stripe, Arc::new(MyStripeGateway::from_env()?));
//! let engine = PaymentEngine::new(registry);
//!
//! let payment = engine.process_payment(ProcessPayment {
//!     order_id,
//!     method_id,
//!     amount,
//!     metadata: None,
//! }).await?;
//! ```

pub mod engine;
pub mod gateway;
pub mod payment;

pub use engine::{NewPaymentMethod, PaymentEngine, ProcessPayment};
pub use gateway::{ChargeRequest, GatewayKind, GatewayRegistry, PaymentGateway};
pub use payment::{Payment, PaymentMethod, PaymentStatus, Refund, RefundStatus};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::engine::{NewPaymentMethod, PaymentEngine, ProcessPayment};
    pub use crate::gateway::{ChargeRequest, GatewayKind, GatewayRegistry, PaymentGateway};
    pub use crate::payment::{Payment, PaymentMethod, PaymentStatus, Refund, RefundStatus};
}

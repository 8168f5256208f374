//! Payment method, payment attempt, and refund types.

use crate::gateway::GatewayKind;
use serde::{Deserialize, Serialize};
use vendo_commerce::ids::{OrderId, PaymentId, PaymentMethodId, RefundId, StoreId};
use vendo_commerce::money::Money;
use vendo_db::Record;

/// A store's configured gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Unique method identifier.
    pub id: PaymentMethodId,
    /// Owning store.
    pub store_id: StoreId,
    /// Which gateway this method routes to.
    pub kind: GatewayKind,
    /// Display name shown at checkout.
    pub display_name: Option<String>,
    /// Gateway-specific configuration (keys, endpoints).
    pub config: serde_json::Value,
    /// Whether the method is offered at checkout.
    pub enabled: bool,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Record for PaymentMethod {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

/// Status of one payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// Row created, gateway not yet (successfully) invoked.
    #[default]
    Pending,
    /// Gateway accepted the charge.
    Completed,
    /// Gateway rejected the charge or was unreachable.
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    /// Check if the attempt reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }
}

/// One payment attempt against an order.
///
/// Attempts are append-only: a retry is a new row, never a mutation of a
/// failed one, so the rows are a complete audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique payment identifier.
    pub id: PaymentId,
    /// Order being paid.
    pub order_id: OrderId,
    /// Method used for this attempt.
    pub method_id: PaymentMethodId,
    /// Amount charged.
    pub amount: Money,
    /// Attempt status.
    pub status: PaymentStatus,
    /// Gateway transaction id, once the charge succeeded.
    pub transaction_id: Option<String>,
    /// Captured failure message, when the attempt failed.
    pub error_message: Option<String>,
    /// Opaque pass-through data.
    pub metadata: serde_json::Value,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Record for Payment {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

/// Status of a refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RefundStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Completed => "completed",
            RefundStatus::Failed => "failed",
        }
    }
}

/// A reversal against a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    /// Unique refund identifier.
    pub id: RefundId,
    /// Order the payment belonged to.
    pub order_id: OrderId,
    /// Payment being reversed.
    pub payment_id: PaymentId,
    /// Amount to return.
    pub amount: Money,
    /// Refund status.
    pub status: RefundStatus,
    /// Operator-supplied reason.
    pub reason: Option<String>,
    /// Gateway refund transaction id, once completed.
    pub transaction_id: Option<String>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Record for Refund {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

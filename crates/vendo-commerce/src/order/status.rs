//! Order status state machines.
//!
//! The order status and its two sub-statuses are tracked independently so
//! "payment failed but order still pending retry" is distinguishable from
//! "order cancelled". Transitions are validated; the free-form override
//! the pipeline also offers is a separate, explicit method.

use serde::{Deserialize, Serialize};

/// Overall order status.
///
/// `pending → paid → processing → shipped → delivered`, with `cancelled`
/// reachable from any pre-shipped state and `refunded` after payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Check if a transition to `to` is allowed.
    pub fn can_transition(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            Pending => matches!(to, Paid | Cancelled),
            Paid => matches!(to, Processing | Refunded | Cancelled),
            Processing => matches!(to, Shipped | Refunded | Cancelled),
            Shipped => matches!(to, Delivered | Refunded),
            Delivered => matches!(to, Refunded),
            Cancelled | Refunded => false,
        }
    }

    /// Check if the order can still be cancelled (pre-shipped states).
    pub fn can_cancel(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Paid | OrderStatus::Processing
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }
}

/// Payment dimension of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentState {
    #[default]
    Unpaid,
    Paid,
    Failed,
    Refunded,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Unpaid => "unpaid",
            PaymentState::Paid => "paid",
            PaymentState::Failed => "failed",
            PaymentState::Refunded => "refunded",
        }
    }

    /// Check if a transition to `to` is allowed.
    ///
    /// `Failed → Paid` covers the retried-attempt path: a later attempt
    /// settling the order after an earlier failure.
    pub fn can_transition(self, to: PaymentState) -> bool {
        use PaymentState::*;
        match self {
            Unpaid => matches!(to, Paid | Failed),
            Failed => matches!(to, Paid | Failed),
            Paid => matches!(to, Refunded),
            Refunded => false,
        }
    }
}

/// Shipping dimension of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShippingState {
    #[default]
    Unshipped,
    Shipped,
    Delivered,
    Returned,
}

impl ShippingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingState::Unshipped => "unshipped",
            ShippingState::Shipped => "shipped",
            ShippingState::Delivered => "delivered",
            ShippingState::Returned => "returned",
        }
    }

    /// Check if a transition to `to` is allowed.
    pub fn can_transition(self, to: ShippingState) -> bool {
        use ShippingState::*;
        match self {
            Unshipped => matches!(to, Shipped),
            Shipped => matches!(to, Delivered | Returned),
            Delivered => matches!(to, Returned),
            Returned => false,
        }
    }
}

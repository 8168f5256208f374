//! Coupon types and evaluation.
//!
//! Evaluation is a pure function from coupon rules and a cart subtotal to
//! a discount amount. The cart engine itself only stores the result, so
//! the rules have a single testable home.

use crate::error::CommerceError;
use crate::ids::{CouponId, StoreId};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use vendo_db::Record;

/// How a coupon discounts a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CouponValue {
    /// Percentage off the subtotal (0.0 - 100.0).
    Percentage(f64),
    /// Fixed amount off, capped at the subtotal.
    Fixed(Money),
}

/// A store-scoped discount code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// Owning store.
    pub store_id: StoreId,
    /// Code customers enter (e.g., "SAVE10").
    pub code: String,
    /// Discount value.
    pub value: CouponValue,
    /// Minimum subtotal required for the coupon to apply.
    pub min_subtotal: Option<Money>,
    /// Maximum number of redemptions (None = unlimited).
    pub usage_limit: Option<i64>,
    /// Redemptions so far.
    pub usage_count: i64,
    /// Unix timestamp the coupon becomes valid.
    pub starts_at: Option<i64>,
    /// Unix timestamp the coupon stops being valid.
    pub ends_at: Option<i64>,
    /// Whether the coupon is enabled at all.
    pub active: bool,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Record for Coupon {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

impl Coupon {
    /// Create an always-on percentage coupon.
    pub fn percentage(store_id: StoreId, code: impl Into<String>, percent: f64) -> Self {
        Self::new(store_id, code, CouponValue::Percentage(percent))
    }

    /// Create an always-on fixed-amount coupon.
    pub fn fixed(store_id: StoreId, code: impl Into<String>, amount: Money) -> Self {
        Self::new(store_id, code, CouponValue::Fixed(amount))
    }

    fn new(store_id: StoreId, code: impl Into<String>, value: CouponValue) -> Self {
        let now = current_timestamp();
        Self {
            id: CouponId::generate(),
            store_id,
            code: code.into(),
            value,
            min_subtotal: None,
            usage_limit: None,
            usage_count: 0,
            starts_at: None,
            ends_at: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a minimum purchase requirement.
    pub fn with_min_subtotal(mut self, amount: Money) -> Self {
        self.min_subtotal = Some(amount);
        self
    }

    /// Add a redemption cap.
    pub fn with_usage_limit(mut self, limit: i64) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    /// Bound the validity window.
    pub fn with_window(mut self, starts_at: Option<i64>, ends_at: Option<i64>) -> Self {
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        self
    }

    /// Check if the redemption cap has been hit.
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .map(|limit| self.usage_count >= limit)
            .unwrap_or(false)
    }

    /// Evaluate the discount this coupon grants against a subtotal.
    ///
    /// Pure: no clock reads besides validity-window checks, no mutation.
    /// Fails with a validation error naming the rule that was violated.
    pub fn evaluate(&self, subtotal: &Money) -> Result<Money, CommerceError> {
        if !self.active {
            return Err(CommerceError::Validation(format!(
                "coupon {} is not active",
                self.code
            )));
        }

        let now = current_timestamp();
        if let Some(starts) = self.starts_at {
            if now < starts {
                return Err(CommerceError::Validation(format!(
                    "coupon {} is not yet valid",
                    self.code
                )));
            }
        }
        if let Some(ends) = self.ends_at {
            if now > ends {
                return Err(CommerceError::Validation(format!(
                    "coupon {} has expired",
                    self.code
                )));
            }
        }
        if self.is_exhausted() {
            return Err(CommerceError::Validation(format!(
                "coupon {} usage limit reached",
                self.code
            )));
        }
        if let Some(min) = &self.min_subtotal {
            if subtotal.amount_cents < min.amount_cents {
                return Err(CommerceError::Validation(format!(
                    "coupon {} requires a minimum subtotal of {}",
                    self.code,
                    min.display_amount()
                )));
            }
        }

        let discount = match &self.value {
            CouponValue::Percentage(percent) => subtotal.percentage(*percent),
            CouponValue::Fixed(amount) => {
                // Never discount below zero.
                if amount.amount_cents > subtotal.amount_cents {
                    *subtotal
                } else {
                    *amount
                }
            }
        };
        Ok(discount)
    }

    /// Record a redemption.
    pub fn record_usage(&mut self) {
        self.usage_count += 1;
        self.updated_at = current_timestamp();
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

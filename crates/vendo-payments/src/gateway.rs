//! Payment gateway contract and registry.
//!
//! Gateways are registered once at engine construction and looked up per
//! call; the registry is read-only afterwards, so it needs no locking
//! beyond the `Arc` that publishes it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use vendo_commerce::ids::OrderId;
use vendo_commerce::money::Money;
use vendo_commerce::CommerceError;

/// Supported gateway types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayKind {
    Stripe,
    Paypal,
    Square,
    Custom,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Stripe => "stripe",
            GatewayKind::Paypal => "paypal",
            GatewayKind::Square => "square",
            GatewayKind::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stripe" => Some(GatewayKind::Stripe),
            "paypal" => Some(GatewayKind::Paypal),
            "square" => Some(GatewayKind::Square),
            "custom" => Some(GatewayKind::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A charge to process through a gateway.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Order being paid for.
    pub order_id: OrderId,
    /// Amount to charge (carries the currency).
    pub amount: Money,
    /// Opaque pass-through data for the processor.
    pub metadata: serde_json::Value,
}

/// The abstract capability every payment processor implements.
///
/// Failures are opaque: implementations wrap whatever the processor
/// reported into [`CommerceError::Gateway`] and the engine surfaces it
/// unchanged.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the given amount; returns the processor's transaction id.
    async fn process(&self, charge: ChargeRequest) -> Result<String, CommerceError>;

    /// Reverse a previous charge; returns the refund transaction id.
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> Result<String, CommerceError>;
}

/// Gateway handlers keyed by kind, assembled at startup.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<GatewayKind, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self {
            gateways: HashMap::new(),
        }
    }

    /// Bind a gateway implementation to a kind (builder form).
    pub fn with(mut self, kind: GatewayKind, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.register(kind, gateway);
        self
    }

    /// Bind a gateway implementation to a kind.
    pub fn register(&mut self, kind: GatewayKind, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(kind, gateway);
    }

    /// Resolve the gateway for a kind.
    pub fn resolve(&self, kind: GatewayKind) -> Result<Arc<dyn PaymentGateway>, CommerceError> {
        self.gateways
            .get(&kind)
            .cloned()
            .ok_or_else(|| CommerceError::GatewayNotConfigured(kind.to_string()))
    }

    /// Check whether a kind has a registered handler.
    pub fn is_registered(&self, kind: GatewayKind) -> bool {
        self.gateways.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendo_commerce::money::Currency;

    struct NullGateway;

    #[async_trait]
    impl PaymentGateway for NullGateway {
        async fn process(&self, _charge: ChargeRequest) -> Result<String, CommerceError> {
            Ok("txn-null".into())
        }

        async fn refund(
            &self,
            _transaction_id: &str,
            _amount: Money,
        ) -> Result<String, CommerceError> {
            Ok("ref-null".into())
        }
    }

    #[test]
    fn test_registry_resolution() {
        let registry = GatewayRegistry::new().with(GatewayKind::Stripe, Arc::new(NullGateway));

        assert!(registry.is_registered(GatewayKind::Stripe));
        assert!(registry.resolve(GatewayKind::Stripe).is_ok());
        assert!(matches!(
            registry.resolve(GatewayKind::Paypal),
            Err(CommerceError::GatewayNotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_gateway_contract() {
        let gateway = NullGateway;
        let txn = gateway
            .process(ChargeRequest {
                order_id: OrderId::new("o1"),
                amount: Money::new(1000, Currency::USD),
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(txn, "txn-null");
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(GatewayKind::from_str("stripe"), Some(GatewayKind::Stripe));
        assert_eq!(GatewayKind::from_str("STRIPE"), Some(GatewayKind::Stripe));
        assert_eq!(GatewayKind::from_str("venmo"), None);
        assert_eq!(GatewayKind::Paypal.as_str(), "paypal");
    }
}

//! Payment engine: attempts, refunds, and method configuration.

use crate::gateway::{ChargeRequest, GatewayKind, GatewayRegistry};
use crate::payment::{Payment, PaymentMethod, PaymentStatus, Refund, RefundStatus};
use serde::Deserialize;
use vendo_commerce::ids::{OrderId, PaymentId, PaymentMethodId, RefundId, StoreId};
use vendo_commerce::money::Money;
use vendo_commerce::CommerceError;
use vendo_db::Table;

/// Input for configuring a payment method.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaymentMethod {
    pub store_id: StoreId,
    pub kind: GatewayKind,
    pub display_name: Option<String>,
    pub config: serde_json::Value,
}

/// Input for one payment attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessPayment {
    pub order_id: OrderId,
    pub method_id: PaymentMethodId,
    pub amount: Money,
    pub metadata: Option<serde_json::Value>,
}

/// Processes payments against pluggable gateways and drives refunds.
///
/// The gateway registry is injected at construction; substituting
/// gateways in tests is just building a different registry.
pub struct PaymentEngine {
    registry: GatewayRegistry,
    methods: Table<PaymentMethod>,
    payments: Table<Payment>,
    refunds: Table<Refund>,
}

impl PaymentEngine {
    pub fn new(registry: GatewayRegistry) -> Self {
        Self {
            registry,
            methods: Table::new(),
            payments: Table::new(),
            refunds: Table::new(),
        }
    }

    // --- payment method configuration ---

    /// Configure a gateway for a store.
    pub fn create_payment_method(
        &self,
        input: NewPaymentMethod,
    ) -> Result<PaymentMethod, CommerceError> {
        let now = current_timestamp();
        let method = PaymentMethod {
            id: PaymentMethodId::generate(),
            store_id: input.store_id,
            kind: input.kind,
            display_name: input.display_name,
            config: input.config,
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        self.methods.insert(method.clone())?;
        Ok(method)
    }

    /// Look up a payment method.
    pub fn get_payment_method(
        &self,
        id: &PaymentMethodId,
    ) -> Result<PaymentMethod, CommerceError> {
        self.methods
            .get(id.as_str())
            .ok_or_else(|| CommerceError::PaymentMethodNotFound(id.to_string()))
    }

    /// All payment methods configured for a store.
    pub fn store_payment_methods(&self, store_id: &StoreId) -> Vec<PaymentMethod> {
        self.methods.find(|m| &m.store_id == store_id)
    }

    // --- payment attempts ---

    /// Insert a payment row in `pending` state.
    ///
    /// The row exists before any gateway call, so even an attempt that
    /// never reaches the processor leaves an audit record.
    pub fn create_payment(
        &self,
        order_id: &OrderId,
        method_id: &PaymentMethodId,
        amount: Money,
        metadata: Option<serde_json::Value>,
    ) -> Result<Payment, CommerceError> {
        let now = current_timestamp();
        let payment = Payment {
            id: PaymentId::generate(),
            order_id: order_id.clone(),
            method_id: method_id.clone(),
            amount,
            status: PaymentStatus::Pending,
            transaction_id: None,
            error_message: None,
            metadata: metadata
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
            created_at: now,
            updated_at: now,
        };
        self.payments.insert(payment.clone())?;
        Ok(payment)
    }

    /// Look up a payment.
    pub fn get_payment(&self, id: &PaymentId) -> Result<Payment, CommerceError> {
        self.payments
            .get(id.as_str())
            .ok_or_else(|| CommerceError::PaymentNotFound(id.to_string()))
    }

    /// All attempts recorded against an order.
    pub fn order_payments(&self, order_id: &OrderId) -> Vec<Payment> {
        self.payments.find(|p| &p.order_id == order_id)
    }

    /// Run one payment attempt.
    ///
    /// Creates the pending row, resolves the gateway by the method's
    /// kind, and invokes it exactly once. Success transitions the row to
    /// `completed` with the gateway's transaction id; any failure
    /// (including an unregistered gateway) transitions it to `failed`
    /// with the captured message and re-raises the error. Retries are a
    /// new call producing a new row.
    pub async fn process_payment(
        &self,
        input: ProcessPayment,
    ) -> Result<Payment, CommerceError> {
        let method = self.get_payment_method(&input.method_id)?;
        let payment = self.create_payment(
            &input.order_id,
            &input.method_id,
            input.amount,
            input.metadata.clone(),
        )?;

        let gateway = match self.registry.resolve(method.kind) {
            Ok(gateway) => gateway,
            Err(err) => {
                self.mark_payment_failed(&payment.id, &err)?;
                return Err(err);
            }
        };

        let charge = ChargeRequest {
            order_id: input.order_id.clone(),
            amount: input.amount,
            metadata: input
                .metadata
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
        };
        match gateway.process(charge).await {
            Ok(transaction_id) => {
                let completed = self.payments.update(payment.id.as_str(), |p| {
                    p.status = PaymentStatus::Completed;
                    p.transaction_id = Some(transaction_id.clone());
                    p.updated_at = current_timestamp();
                })?;
                tracing::info!(
                    payment = %completed.id,
                    order = %completed.order_id,
                    gateway = method.kind.as_str(),
                    "payment completed"
                );
                Ok(completed)
            }
            Err(err) => {
                self.mark_payment_failed(&payment.id, &err)?;
                Err(err)
            }
        }
    }

    fn mark_payment_failed(
        &self,
        payment_id: &PaymentId,
        err: &CommerceError,
    ) -> Result<(), CommerceError> {
        let message = err.to_string();
        let failed = self.payments.update(payment_id.as_str(), |p| {
            p.status = PaymentStatus::Failed;
            p.error_message = Some(message.clone());
            p.updated_at = current_timestamp();
        })?;
        tracing::warn!(
            payment = %failed.id,
            order = %failed.order_id,
            error = %message,
            "payment failed"
        );
        Ok(())
    }

    // --- refunds ---

    /// Insert a refund row in `pending` state.
    ///
    /// The refund may not exceed the payment amount minus refunds already
    /// completed against it.
    pub fn create_refund(
        &self,
        order_id: &OrderId,
        payment_id: &PaymentId,
        amount: Money,
        reason: Option<String>,
    ) -> Result<Refund, CommerceError> {
        let payment = self.get_payment(payment_id)?;
        if amount.amount_cents <= 0 {
            return Err(CommerceError::Validation(
                "refund amount must be positive".into(),
            ));
        }
        if amount.currency != payment.amount.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: payment.amount.currency.code().to_string(),
                got: amount.currency.code().to_string(),
            });
        }

        let refunded: i64 = self
            .refunds
            .find(|r| &r.payment_id == payment_id && r.status == RefundStatus::Completed)
            .iter()
            .map(|r| r.amount.amount_cents)
            .sum();
        let refundable = payment.amount.amount_cents - refunded;
        if amount.amount_cents > refundable {
            return Err(CommerceError::RefundExceedsPayment {
                requested_cents: amount.amount_cents,
                refundable_cents: refundable,
            });
        }

        let now = current_timestamp();
        let refund = Refund {
            id: RefundId::generate(),
            order_id: order_id.clone(),
            payment_id: payment_id.clone(),
            amount,
            status: RefundStatus::Pending,
            reason,
            transaction_id: None,
            created_at: now,
            updated_at: now,
        };
        self.refunds.insert(refund.clone())?;
        Ok(refund)
    }

    /// Look up a refund.
    pub fn get_refund(&self, id: &RefundId) -> Result<Refund, CommerceError> {
        self.refunds
            .get(id.as_str())
            .ok_or_else(|| CommerceError::RefundNotFound(id.to_string()))
    }

    /// Execute a pending refund through the originating payment's gateway.
    pub async fn process_refund(&self, refund_id: &RefundId) -> Result<Refund, CommerceError> {
        let refund = self.get_refund(refund_id)?;
        let payment = self.get_payment(&refund.payment_id)?;
        let transaction_id = payment
            .transaction_id
            .clone()
            .ok_or_else(|| CommerceError::MissingTransactionId(payment.id.to_string()))?;

        let method = self.get_payment_method(&payment.method_id)?;
        let gateway = match self.registry.resolve(method.kind) {
            Ok(gateway) => gateway,
            Err(err) => {
                self.mark_refund_failed(refund_id)?;
                return Err(err);
            }
        };

        match gateway.refund(&transaction_id, refund.amount).await {
            Ok(refund_txn) => {
                let completed = self.refunds.update(refund_id.as_str(), |r| {
                    r.status = RefundStatus::Completed;
                    r.transaction_id = Some(refund_txn.clone());
                    r.updated_at = current_timestamp();
                })?;
                tracing::info!(
                    refund = %completed.id,
                    payment = %completed.payment_id,
                    "refund completed"
                );
                Ok(completed)
            }
            Err(err) => {
                self.mark_refund_failed(refund_id)?;
                Err(err)
            }
        }
    }

    fn mark_refund_failed(&self, refund_id: &RefundId) -> Result<(), CommerceError> {
        let failed = self.refunds.update(refund_id.as_str(), |r| {
            r.status = RefundStatus::Failed;
            r.updated_at = current_timestamp();
        })?;
        tracing::warn!(refund = %failed.id, "refund failed");
        Ok(())
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
    use crate::gateway::PaymentGateway;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use vendo_commerce::money::Currency;

    struct HappyGateway {
        counter: AtomicU64,
    }

    impl HappyGateway {
        fn new() -> Self {
            Self {
                counter: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for HappyGateway {
        async fn process(&self, _charge: ChargeRequest) -> Result<String, CommerceError> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("txn-{}", n))
        }

        async fn refund(
            &self,
            transaction_id: &str,
            _amount: Money,
        ) -> Result<String, CommerceError> {
            Ok(format!("refund-of-{}", transaction_id))
        }
    }

    struct DecliningGateway;

    #[async_trait]
    impl PaymentGateway for DecliningGateway {
        async fn process(&self, _charge: ChargeRequest) -> Result<String, CommerceError> {
            Err(CommerceError::Gateway("card declined".into()))
        }

        async fn refund(
            &self,
            _transaction_id: &str,
            _amount: Money,
        ) -> Result<String, CommerceError> {
            Err(CommerceError::Gateway("refund rejected".into()))
        }
    }

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn engine_with(kind: GatewayKind, gateway: Arc<dyn PaymentGateway>) -> PaymentEngine {
        PaymentEngine::new(GatewayRegistry::new().with(kind, gateway))
    }

    fn method_for(engine: &PaymentEngine, kind: GatewayKind) -> PaymentMethod {
        engine
            .create_payment_method(NewPaymentMethod {
                store_id: StoreId::new("store-1"),
                kind,
                display_name: None,
                config: serde_json::json!({"api_key": "sk_test"}),
            })
            .unwrap()
    }

    fn attempt(method: &PaymentMethod, cents: i64) -> ProcessPayment {
        ProcessPayment {
            order_id: OrderId::new("order-1"),
            method_id: method.id.clone(),
            amount: usd(cents),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_successful_payment() {
        let engine = engine_with(GatewayKind::Stripe, Arc::new(HappyGateway::new()));
        let method = method_for(&engine, GatewayKind::Stripe);

        let payment = engine.process_payment(attempt(&method, 11800)).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.transaction_id.as_deref(), Some("txn-0"));
        assert!(payment.error_message.is_none());
    }

    #[tokio::test]
    async fn test_failed_payment_recorded_and_raised() {
        let engine = engine_with(GatewayKind::Stripe, Arc::new(DecliningGateway));
        let method = method_for(&engine, GatewayKind::Stripe);

        let err = engine.process_payment(attempt(&method, 500)).await.unwrap_err();
        assert!(matches!(err, CommerceError::Gateway(_)));

        let rows = engine.order_payments(&OrderId::new("order-1"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, PaymentStatus::Failed);
        assert_eq!(rows[0].error_message.as_deref(), Some("Payment gateway error: card declined"));
    }

    #[tokio::test]
    async fn test_unregistered_gateway_leaves_terminal_row() {
        // Method routes to PayPal, but only Stripe is registered.
        let engine = engine_with(GatewayKind::Stripe, Arc::new(HappyGateway::new()));
        let method = method_for(&engine, GatewayKind::Paypal);

        let err = engine.process_payment(attempt(&method, 500)).await.unwrap_err();
        assert!(matches!(err, CommerceError::GatewayNotConfigured(_)));

        // The attempt row exists and is terminal, so the audit property
        // holds even when the gateway lookup itself failed.
        let rows = engine.order_payments(&OrderId::new("order-1"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_attempt_audit_one_row_per_call() {
        let registry = GatewayRegistry::new()
            .with(GatewayKind::Stripe, Arc::new(HappyGateway::new()))
            .with(GatewayKind::Custom, Arc::new(DecliningGateway));
        let engine = PaymentEngine::new(registry);
        let good = method_for(&engine, GatewayKind::Stripe);
        let bad = method_for(&engine, GatewayKind::Custom);

        let _ = engine.process_payment(attempt(&bad, 100)).await;
        let _ = engine.process_payment(attempt(&good, 100)).await;
        let _ = engine.process_payment(attempt(&bad, 100)).await;
        let _ = engine.process_payment(attempt(&good, 100)).await;

        let rows = engine.order_payments(&OrderId::new("order-1"));
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|p| p.status.is_terminal()));
        assert_eq!(
            rows.iter()
                .filter(|p| p.status == PaymentStatus::Completed)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_refund_happy_path() {
        let engine = engine_with(GatewayKind::Stripe, Arc::new(HappyGateway::new()));
        let method = method_for(&engine, GatewayKind::Stripe);
        let payment = engine.process_payment(attempt(&method, 10000)).await.unwrap();

        let refund = engine
            .create_refund(&payment.order_id, &payment.id, usd(10000), Some("returned".into()))
            .unwrap();
        assert_eq!(refund.status, RefundStatus::Pending);

        let done = engine.process_refund(&refund.id).await.unwrap();
        assert_eq!(done.status, RefundStatus::Completed);
        assert_eq!(done.transaction_id.as_deref(), Some("refund-of-txn-0"));
    }

    #[tokio::test]
    async fn test_refund_cannot_exceed_payment() {
        let engine = engine_with(GatewayKind::Stripe, Arc::new(HappyGateway::new()));
        let method = method_for(&engine, GatewayKind::Stripe);
        let payment = engine.process_payment(attempt(&method, 5000)).await.unwrap();

        let err = engine
            .create_refund(&payment.order_id, &payment.id, usd(5001), None)
            .unwrap_err();
        assert!(matches!(err, CommerceError::RefundExceedsPayment { .. }));
    }

    #[tokio::test]
    async fn test_partial_refunds_capped_cumulatively() {
        let engine = engine_with(GatewayKind::Stripe, Arc::new(HappyGateway::new()));
        let method = method_for(&engine, GatewayKind::Stripe);
        let payment = engine.process_payment(attempt(&method, 5000)).await.unwrap();

        let first = engine
            .create_refund(&payment.order_id, &payment.id, usd(3000), None)
            .unwrap();
        engine.process_refund(&first.id).await.unwrap();

        // Only 2000 remains refundable.
        assert!(matches!(
            engine.create_refund(&payment.order_id, &payment.id, usd(2500), None),
            Err(CommerceError::RefundExceedsPayment { .. })
        ));
        let second = engine
            .create_refund(&payment.order_id, &payment.id, usd(2000), None)
            .unwrap();
        engine.process_refund(&second.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_refund_requires_transaction_id() {
        let engine = engine_with(GatewayKind::Stripe, Arc::new(HappyGateway::new()));
        let method = method_for(&engine, GatewayKind::Stripe);

        // A pending row that never reached the gateway has no txn id.
        let payment = engine
            .create_payment(&OrderId::new("order-1"), &method.id, usd(1000), None)
            .unwrap();
        let refund = engine
            .create_refund(&payment.order_id, &payment.id, usd(1000), None)
            .unwrap();

        let err = engine.process_refund(&refund.id).await.unwrap_err();
        assert!(matches!(err, CommerceError::MissingTransactionId(_)));
    }

    struct NoRefundsGateway;

    #[async_trait]
    impl PaymentGateway for NoRefundsGateway {
        async fn process(&self, _charge: ChargeRequest) -> Result<String, CommerceError> {
            Ok("txn-final-sale".into())
        }

        async fn refund(
            &self,
            _transaction_id: &str,
            _amount: Money,
        ) -> Result<String, CommerceError> {
            Err(CommerceError::Gateway("refunds disabled".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_refund_recorded_and_raised() {
        let engine = engine_with(GatewayKind::Custom, Arc::new(NoRefundsGateway));
        let method = method_for(&engine, GatewayKind::Custom);
        let payment = engine.process_payment(attempt(&method, 4000)).await.unwrap();

        let refund = engine
            .create_refund(&payment.order_id, &payment.id, usd(4000), None)
            .unwrap();
        let err = engine.process_refund(&refund.id).await.unwrap_err();
        assert!(matches!(err, CommerceError::Gateway(_)));

        // The failure is recorded as well as surfaced.
        assert_eq!(
            engine.get_refund(&refund.id).unwrap().status,
            RefundStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_missing_refund_and_payment_are_not_found() {
        let engine = engine_with(GatewayKind::Stripe, Arc::new(HappyGateway::new()));

        assert!(matches!(
            engine.process_refund(&RefundId::new("missing")).await,
            Err(CommerceError::RefundNotFound(_))
        ));
        assert!(matches!(
            engine.get_payment(&PaymentId::new("missing")),
            Err(CommerceError::PaymentNotFound(_))
        ));
    }

    #[test]
    fn test_store_payment_methods_scoped() {
        let engine = engine_with(GatewayKind::Stripe, Arc::new(HappyGateway::new()));
        engine
            .create_payment_method(NewPaymentMethod {
                store_id: StoreId::new("a"),
                kind: GatewayKind::Stripe,
                display_name: None,
                config: serde_json::Value::Null,
            })
            .unwrap();
        engine
            .create_payment_method(NewPaymentMethod {
                store_id: StoreId::new("b"),
                kind: GatewayKind::Stripe,
                display_name: None,
                config: serde_json::Value::Null,
            })
            .unwrap();

        assert_eq!(engine.store_payment_methods(&StoreId::new("a")).len(), 1);
    }
}

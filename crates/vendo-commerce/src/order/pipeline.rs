//! Order pipeline: creation, frozen snapshots, and status transitions.

use crate::error::CommerceError;
use crate::ids::{OrderId, OrderItemId, PaymentId, ProductId, StoreId, UserId, VariantId};
use crate::money::Money;
use crate::order::{Order, OrderItem, OrderStatus, PaymentState, ShippingState};
use crate::store::StoreRegistry;
use serde::Deserialize;
use std::sync::Arc;
use vendo_db::Table;

/// Input for one frozen order line.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Input for creating an order.
///
/// Monetary fields arrive already computed by the cart-to-order
/// conversion; the pipeline freezes them as supplied after checking the
/// total identity.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub store_id: StoreId,
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
    pub items: Vec<NewOrderItem>,
    pub note: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Partial update for an order's mutable, non-monetary fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    pub email: Option<String>,
    pub note: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Converts checkout intents into durable orders and owns their status
/// machines.
pub struct OrderPipeline {
    registry: Arc<StoreRegistry>,
    orders: Table<Order>,
}

impl OrderPipeline {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self {
            registry,
            orders: Table::new(),
        }
    }

    /// Create an order with a frozen monetary snapshot.
    ///
    /// Fails with a validation error when the snapshot is inconsistent
    /// (`total != subtotal + tax + shipping - discount`) or any component
    /// is negative.
    pub fn create_order(&self, input: NewOrder) -> Result<Order, CommerceError> {
        let store = self.registry.require_active(&input.store_id)?;

        for amount in [
            &input.subtotal,
            &input.tax,
            &input.shipping,
            &input.discount,
            &input.total,
        ] {
            if amount.is_negative() {
                return Err(CommerceError::Validation(
                    "order amounts must be non-negative".into(),
                ));
            }
            if amount.currency != store.currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: store.currency.code().to_string(),
                    got: amount.currency.code().to_string(),
                });
            }
        }
        let expected = input.subtotal.amount_cents + input.tax.amount_cents
            + input.shipping.amount_cents
            - input.discount.amount_cents;
        if input.total.amount_cents != expected {
            return Err(CommerceError::Validation(format!(
                "order total {} does not match subtotal + tax + shipping - discount = {}",
                input.total.amount_cents, expected
            )));
        }

        let order_id = OrderId::generate();
        let items = input
            .items
            .into_iter()
            .map(|item| Self::freeze_item(&order_id, item))
            .collect::<Result<Vec<_>, _>>()?;

        let now = current_timestamp();
        let order = Order {
            id: order_id,
            store_id: input.store_id,
            order_number: Order::generate_order_number(),
            user_id: input.user_id,
            email: input.email,
            status: OrderStatus::Pending,
            payment_status: PaymentState::Unpaid,
            shipping_status: ShippingState::Unshipped,
            currency: store.currency,
            subtotal: input.subtotal,
            tax: input.tax,
            shipping: input.shipping,
            discount: input.discount,
            total: input.total,
            items,
            settled_payment_id: None,
            note: input.note,
            metadata: input
                .metadata
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };
        self.orders.insert(order.clone())?;
        tracing::info!(order = %order.id, number = %order.order_number, "order created");
        Ok(order)
    }

    /// Append a frozen line item. Totals are never recomputed here; the
    /// caller is responsible for supplying totals consistent with the
    /// items it adds.
    pub fn add_item(
        &self,
        order_id: &OrderId,
        item: NewOrderItem,
    ) -> Result<Order, CommerceError> {
        let frozen = Self::freeze_item(order_id, item)?;
        self.orders
            .update(order_id.as_str(), |order| {
                order.items.push(frozen);
                order.updated_at = current_timestamp();
            })
            .map_err(|_| CommerceError::OrderNotFound(order_id.to_string()))
    }

    /// Look up an order by id.
    pub fn get_order(&self, id: &OrderId) -> Result<Order, CommerceError> {
        self.orders
            .get(id.as_str())
            .ok_or_else(|| CommerceError::OrderNotFound(id.to_string()))
    }

    /// Look up an order by its human-readable number.
    pub fn get_by_number(&self, number: &str) -> Result<Order, CommerceError> {
        self.orders
            .find_one(|o| o.order_number == number)
            .ok_or_else(|| CommerceError::OrderNotFound(number.to_string()))
    }

    /// All orders for a store.
    pub fn list_store_orders(&self, store_id: &StoreId) -> Vec<Order> {
        self.orders.find(|o| &o.store_id == store_id)
    }

    /// Update an order's mutable fields. Monetary fields and statuses
    /// have no path through here; the snapshot stays frozen.
    pub fn update_order(
        &self,
        id: &OrderId,
        update: OrderUpdate,
    ) -> Result<Order, CommerceError> {
        self.orders
            .update(id.as_str(), |order| {
                if let Some(email) = update.email {
                    order.email = Some(email);
                }
                if let Some(note) = update.note {
                    order.note = Some(note);
                }
                if let Some(metadata) = update.metadata {
                    order.metadata = metadata;
                }
                order.updated_at = current_timestamp();
            })
            .map_err(|_| CommerceError::OrderNotFound(id.to_string()))
    }

    /// Transition the overall status, validated against the transition
    /// table. Check and write are one atomic update.
    pub fn update_order_status(
        &self,
        id: &OrderId,
        to: OrderStatus,
    ) -> Result<Order, CommerceError> {
        let updated = self
            .orders
            .update_if(
                id.as_str(),
                |order| order.status.can_transition(to),
                |order| {
                    order.status = to;
                    if to == OrderStatus::Cancelled {
                        order.cancelled_at = Some(current_timestamp());
                    }
                    order.updated_at = current_timestamp();
                },
            )
            .map_err(|_| CommerceError::OrderNotFound(id.to_string()))?;
        match updated {
            Some(order) => {
                tracing::debug!(order = %order.id, status = order.status.as_str(), "order status updated");
                Ok(order)
            }
            None => {
                let current = self.get_order(id)?;
                Err(CommerceError::InvalidTransition {
                    from: current.status.as_str().to_string(),
                    to: to.as_str().to_string(),
                })
            }
        }
    }

    /// Transition the payment dimension, validated.
    pub fn update_payment_status(
        &self,
        id: &OrderId,
        to: PaymentState,
    ) -> Result<Order, CommerceError> {
        let updated = self
            .orders
            .update_if(
                id.as_str(),
                |order| order.payment_status.can_transition(to),
                |order| {
                    order.payment_status = to;
                    order.updated_at = current_timestamp();
                },
            )
            .map_err(|_| CommerceError::OrderNotFound(id.to_string()))?;
        match updated {
            Some(order) => Ok(order),
            None => {
                let current = self.get_order(id)?;
                Err(CommerceError::InvalidTransition {
                    from: current.payment_status.as_str().to_string(),
                    to: to.as_str().to_string(),
                })
            }
        }
    }

    /// Transition the shipping dimension, validated.
    pub fn update_shipping_status(
        &self,
        id: &OrderId,
        to: ShippingState,
    ) -> Result<Order, CommerceError> {
        let updated = self
            .orders
            .update_if(
                id.as_str(),
                |order| order.shipping_status.can_transition(to),
                |order| {
                    order.shipping_status = to;
                    order.updated_at = current_timestamp();
                },
            )
            .map_err(|_| CommerceError::OrderNotFound(id.to_string()))?;
        match updated {
            Some(order) => Ok(order),
            None => {
                let current = self.get_order(id)?;
                Err(CommerceError::InvalidTransition {
                    from: current.shipping_status.as_str().to_string(),
                    to: to.as_str().to_string(),
                })
            }
        }
    }

    /// Admin override: set the overall status without consulting the
    /// transition table. Logged loudly; the validated methods are the
    /// normal path.
    pub fn force_status(&self, id: &OrderId, to: OrderStatus) -> Result<Order, CommerceError> {
        let order = self
            .orders
            .update(id.as_str(), |order| {
                order.status = to;
                if to == OrderStatus::Cancelled && order.cancelled_at.is_none() {
                    order.cancelled_at = Some(current_timestamp());
                }
                order.updated_at = current_timestamp();
            })
            .map_err(|_| CommerceError::OrderNotFound(id.to_string()))?;
        tracing::warn!(order = %order.id, status = to.as_str(), "order status forced");
        Ok(order)
    }

    /// The specialized settle transition: mark payment as received and
    /// move the order into processing, atomically, optionally recording
    /// the settling payment.
    pub fn mark_as_paid(
        &self,
        id: &OrderId,
        payment_id: Option<PaymentId>,
    ) -> Result<Order, CommerceError> {
        let updated = self
            .orders
            .update_if(
                id.as_str(),
                |order| {
                    order.payment_status.can_transition(PaymentState::Paid)
                        && !order.status.is_terminal()
                },
                |order| {
                    order.payment_status = PaymentState::Paid;
                    order.status = OrderStatus::Processing;
                    if let Some(payment_id) = payment_id {
                        order.settled_payment_id = Some(payment_id);
                    }
                    order.updated_at = current_timestamp();
                },
            )
            .map_err(|_| CommerceError::OrderNotFound(id.to_string()))?;
        match updated {
            Some(order) => {
                tracing::info!(order = %order.id, "order marked as paid");
                Ok(order)
            }
            None => {
                let current = self.get_order(id)?;
                Err(CommerceError::InvalidTransition {
                    from: current.payment_status.as_str().to_string(),
                    to: PaymentState::Paid.as_str().to_string(),
                })
            }
        }
    }

    /// Cancel the order. Allowed from any pre-shipped state; never
    /// reverses payment (refunds are an explicit, separate step).
    pub fn cancel_order(&self, id: &OrderId) -> Result<Order, CommerceError> {
        let updated = self
            .orders
            .update_if(
                id.as_str(),
                |order| order.status.can_cancel(),
                |order| {
                    order.status = OrderStatus::Cancelled;
                    order.cancelled_at = Some(current_timestamp());
                    order.updated_at = current_timestamp();
                },
            )
            .map_err(|_| CommerceError::OrderNotFound(id.to_string()))?;
        match updated {
            Some(order) => Ok(order),
            None => {
                let current = self.get_order(id)?;
                Err(CommerceError::InvalidTransition {
                    from: current.status.as_str().to_string(),
                    to: OrderStatus::Cancelled.as_str().to_string(),
                })
            }
        }
    }

    fn freeze_item(order_id: &OrderId, item: NewOrderItem) -> Result<OrderItem, CommerceError> {
        if item.quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(item.quantity));
        }
        let total = item.unit_price.times(item.quantity);
        Ok(OrderItem {
            id: OrderItemId::generate(),
            order_id: order_id.clone(),
            product_id: item.product_id,
            variant_id: item.variant_id,
            product_name: item.product_name,
            sku: item.sku,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total,
        })
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

//! Orders: frozen snapshots and status state machines.

mod order;
mod pipeline;
mod status;

pub use order::{Order, OrderItem};
pub use pipeline::{NewOrder, NewOrderItem, OrderPipeline, OrderUpdate};
pub use status::{OrderStatus, PaymentState, ShippingState};

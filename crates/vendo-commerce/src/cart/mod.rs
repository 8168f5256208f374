//! Cart: basket state, coupons, and the total recompute.

mod cart;
mod coupon;
mod engine;

pub use cart::{AppliedCoupon, Cart, CartItem, CartOwner, CART_TTL_SECS};
pub use coupon::{Coupon, CouponValue};
pub use engine::{AddItem, CartEngine};

//! Commerce domain core for Vendo.
//!
//! Vendo is a multi-tenant commerce backend; this crate owns the tenant
//! registry and the first half of the transaction pipeline:
//!
//! - **Stores**: tenant identity, currency, flat tax rate, settings
//! - **Catalog**: products, variants, categories, stock
//! - **Cart**: basket mutations with a single-source-of-truth recompute
//! - **Orders**: frozen monetary snapshots and validated status machines
//!
//! Payments and digital fulfillment build on these types from their own
//! crates.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vendo_commerce::prelude::*;
//!
//! let registry = Arc::new(StoreRegistry::new());
//! let store = registry.create_store(NewStore {
//!     name: "Acme".into(),
//!     slug: "acme".into(),
//!     currency: Currency::USD,
//!     tax_rate: 10.0,
//!     settings: None,
//! })?;
//!
//! let carts = CartEngine::new(Arc::clone(&registry));
//! let cart = carts.create_cart(&store.id, CartOwner::Session(SessionId::generate()))?;
//! carts.add_item(&cart.id, AddItem {
//!     product_id: ProductId::new("p1"),
//!     variant_id: None,
//!     quantity: 2,
//!     unit_price: Money::new(1000, Currency::USD),
//! })?;
//! ```

pub mod cart;
pub mod catalog;
pub mod error;
pub mod ids;
pub mod money;
pub mod order;
pub mod store;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Stores
    pub use crate::store::{NewStore, Store, StoreRegistry, StoreUpdate};

    // Catalog
    pub use crate::catalog::{
        CatalogService, Category, NewCategory, NewProduct, NewVariant, Product, ProductKind,
        ProductStatus, ProductUpdate, ProductVariant,
    };

    // Cart
    pub use crate::cart::{
        AddItem, AppliedCoupon, Cart, CartEngine, CartItem, CartOwner, Coupon, CouponValue,
    };

    // Orders
    pub use crate::order::{
        NewOrder, NewOrderItem, Order, OrderItem, OrderPipeline, OrderStatus, OrderUpdate,
        PaymentState, ShippingState,
    };
}

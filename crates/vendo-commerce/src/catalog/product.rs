//! Product and variant types.

use crate::ids::{ProductId, StoreId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use vendo_db::Record;

/// Product visibility status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductStatus {
    /// Not yet visible to customers.
    Draft,
    /// Visible and purchasable.
    #[default]
    Active,
    /// Hidden, data preserved.
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }
}

/// Whether a product ships or is delivered as a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductKind {
    /// Stock-tracked, shipped goods.
    #[default]
    Physical,
    /// Digital goods fulfilled through download links; stock is not
    /// decremented for these.
    Digital,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Physical => "physical",
            ProductKind::Digital => "digital",
        }
    }
}

/// A catalog item, scoped to a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Owning store.
    pub store_id: StoreId,
    /// Stock keeping unit.
    pub sku: String,
    /// Product name.
    pub name: String,
    /// Full description.
    pub description: Option<String>,
    /// Physical or digital.
    pub kind: ProductKind,
    /// Visibility status.
    pub status: ProductStatus,
    /// Base price; variants may override it.
    pub price: Money,
    /// Units in stock.
    pub stock_quantity: i64,
    /// Additional metadata as JSON.
    pub metadata: serde_json::Value,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Record for Product {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

impl Product {
    /// Check if the product is available for purchase.
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Check if this is a digital product.
    pub fn is_digital(&self) -> bool {
        self.kind == ProductKind::Digital
    }
}

/// A priced sub-SKU of a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductVariant {
    /// Unique variant identifier.
    pub id: VariantId,
    /// Parent product.
    pub product_id: ProductId,
    /// SKU for this variant.
    pub sku: Option<String>,
    /// Variant name (e.g., "Large / Blue").
    pub name: Option<String>,
    /// Price override; `None` inherits the parent price.
    pub price: Option<Money>,
    /// Units in stock for this variant.
    pub stock_quantity: i64,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Record for ProductVariant {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

impl ProductVariant {
    /// Price for this variant, falling back to the parent's price.
    pub fn price_or(&self, parent_price: Money) -> Money {
        self.price.unwrap_or(parent_price)
    }
}

//! Catalog service: product, variant, and stock operations.

use crate::catalog::{Category, Product, ProductKind, ProductStatus, ProductVariant};
use crate::error::CommerceError;
use crate::ids::{CategoryId, ProductId, StoreId, VariantId};
use crate::money::Money;
use crate::store::StoreRegistry;
use serde::Deserialize;
use std::sync::Arc;
use vendo_db::Table;

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub store_id: StoreId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: ProductKind,
    pub price: Money,
    pub stock_quantity: i64,
    pub metadata: Option<serde_json::Value>,
}

/// Partial update for a product.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub status: Option<ProductStatus>,
    pub metadata: Option<serde_json::Value>,
}

/// Input for creating a variant.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock_quantity: i64,
}

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub store_id: StoreId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
}

/// Store-scoped catalog of products, variants, and categories.
pub struct CatalogService {
    registry: Arc<StoreRegistry>,
    products: Table<Product>,
    variants: Table<ProductVariant>,
    categories: Table<Category>,
}

impl CatalogService {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self {
            registry,
            products: Table::new(),
            variants: Table::new(),
            categories: Table::new(),
        }
    }

    /// Add a product to a store's catalog.
    pub fn create_product(&self, input: NewProduct) -> Result<Product, CommerceError> {
        let store = self.registry.require_active(&input.store_id)?;
        if input.price.is_negative() {
            return Err(CommerceError::Validation(
                "price must be non-negative".into(),
            ));
        }
        if input.price.currency != store.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: store.currency.code().to_string(),
                got: input.price.currency.code().to_string(),
            });
        }

        let now = current_timestamp();
        let product = Product {
            id: ProductId::generate(),
            store_id: input.store_id,
            sku: input.sku,
            name: input.name,
            description: input.description,
            kind: input.kind,
            status: ProductStatus::Active,
            price: input.price,
            stock_quantity: input.stock_quantity,
            metadata: input
                .metadata
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
            created_at: now,
            updated_at: now,
        };
        self.products.insert(product.clone())?;
        tracing::debug!(product = %product.id, store = %product.store_id, "product created");
        Ok(product)
    }

    /// Look up a product by id.
    pub fn get_product(&self, id: &ProductId) -> Result<Product, CommerceError> {
        self.products
            .get(id.as_str())
            .ok_or_else(|| CommerceError::ProductNotFound(id.to_string()))
    }

    /// All products for a store.
    pub fn list_products(&self, store_id: &StoreId) -> Vec<Product> {
        self.products.find(|p| &p.store_id == store_id)
    }

    /// Apply a partial update to a product.
    pub fn update_product(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Product, CommerceError> {
        if let Some(price) = &update.price {
            if price.is_negative() {
                return Err(CommerceError::Validation(
                    "price must be non-negative".into(),
                ));
            }
        }
        self.products
            .update(id.as_str(), |product| {
                if let Some(name) = update.name {
                    product.name = name;
                }
                if let Some(description) = update.description {
                    product.description = Some(description);
                }
                if let Some(price) = update.price {
                    product.price = price;
                }
                if let Some(status) = update.status {
                    product.status = status;
                }
                if let Some(metadata) = update.metadata {
                    product.metadata = metadata;
                }
                product.updated_at = current_timestamp();
            })
            .map_err(|_| CommerceError::ProductNotFound(id.to_string()))
    }

    /// Archive a product. Historical orders keep their snapshots.
    pub fn archive_product(&self, id: &ProductId) -> Result<Product, CommerceError> {
        self.update_product(
            id,
            ProductUpdate {
                status: Some(ProductStatus::Archived),
                ..Default::default()
            },
        )
    }

    /// Add a variant to a product.
    pub fn add_variant(&self, input: NewVariant) -> Result<ProductVariant, CommerceError> {
        // Parent must exist.
        self.get_product(&input.product_id)?;
        if let Some(price) = &input.price {
            if price.is_negative() {
                return Err(CommerceError::Validation(
                    "price must be non-negative".into(),
                ));
            }
        }

        let now = current_timestamp();
        let variant = ProductVariant {
            id: VariantId::generate(),
            product_id: input.product_id,
            sku: input.sku,
            name: input.name,
            price: input.price,
            stock_quantity: input.stock_quantity,
            created_at: now,
            updated_at: now,
        };
        self.variants.insert(variant.clone())?;
        Ok(variant)
    }

    /// Look up a variant by id.
    pub fn get_variant(&self, id: &VariantId) -> Result<ProductVariant, CommerceError> {
        self.variants
            .get(id.as_str())
            .ok_or_else(|| CommerceError::VariantNotFound(id.to_string()))
    }

    /// All variants of a product.
    pub fn product_variants(&self, product_id: &ProductId) -> Vec<ProductVariant> {
        self.variants.find(|v| &v.product_id == product_id)
    }

    /// Resolve the purchase price for a product or one of its variants.
    ///
    /// A variant price overrides the parent price when present.
    pub fn effective_price(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<Money, CommerceError> {
        let product = self.get_product(product_id)?;
        match variant_id {
            Some(variant_id) => {
                let variant = self.get_variant(variant_id)?;
                if &variant.product_id != product_id {
                    return Err(CommerceError::VariantNotFound(variant_id.to_string()));
                }
                Ok(variant.price_or(product.price))
            }
            None => Ok(product.price),
        }
    }

    /// Decrement stock for a purchase.
    ///
    /// Digital products bypass stock entirely. The check and the decrement
    /// run as one conditional update, so concurrent purchases cannot drive
    /// stock negative.
    pub fn decrease_stock(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: i64,
    ) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let product = self.get_product(product_id)?;
        if product.is_digital() {
            return Ok(());
        }

        match variant_id {
            Some(variant_id) => {
                let variant = self.get_variant(variant_id)?;
                let applied = self
                    .variants
                    .update_if(
                        variant_id.as_str(),
                        |v| v.stock_quantity >= quantity,
                        |v| {
                            v.stock_quantity -= quantity;
                            v.updated_at = current_timestamp();
                        },
                    )
                    .map_err(|_| CommerceError::VariantNotFound(variant_id.to_string()))?;
                if applied.is_none() {
                    return Err(CommerceError::InsufficientStock {
                        product_id: product_id.to_string(),
                        requested: quantity,
                        available: variant.stock_quantity,
                    });
                }
            }
            None => {
                let applied = self
                    .products
                    .update_if(
                        product_id.as_str(),
                        |p| p.stock_quantity >= quantity,
                        |p| {
                            p.stock_quantity -= quantity;
                            p.updated_at = current_timestamp();
                        },
                    )
                    .map_err(|_| CommerceError::ProductNotFound(product_id.to_string()))?;
                if applied.is_none() {
                    return Err(CommerceError::InsufficientStock {
                        product_id: product_id.to_string(),
                        requested: quantity,
                        available: product.stock_quantity,
                    });
                }
            }
        }
        Ok(())
    }

    /// Add stock back (restock or cancelled order).
    pub fn restock(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
        quantity: i64,
    ) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        match variant_id {
            Some(variant_id) => {
                self.variants
                    .update(variant_id.as_str(), |v| {
                        v.stock_quantity += quantity;
                        v.updated_at = current_timestamp();
                    })
                    .map_err(|_| CommerceError::VariantNotFound(variant_id.to_string()))?;
            }
            None => {
                self.products
                    .update(product_id.as_str(), |p| {
                        p.stock_quantity += quantity;
                        p.updated_at = current_timestamp();
                    })
                    .map_err(|_| CommerceError::ProductNotFound(product_id.to_string()))?;
            }
        }
        Ok(())
    }

    /// Create a category.
    pub fn create_category(&self, input: NewCategory) -> Result<Category, CommerceError> {
        self.registry.require_active(&input.store_id)?;
        let category = Category {
            id: CategoryId::generate(),
            store_id: input.store_id,
            name: input.name,
            slug: input.slug,
            parent_id: input.parent_id,
            created_at: current_timestamp(),
        };
        self.categories.insert(category.clone())?;
        Ok(category)
    }

    /// All categories for a store.
    pub fn list_categories(&self, store_id: &StoreId) -> Vec<Category> {
        self.categories.find(|c| &c.store_id == store_id)
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
    use crate::money::Currency;
    use crate::store::NewStore;

    fn setup() -> (Arc<StoreRegistry>, CatalogService, StoreId) {
        let registry = Arc::new(StoreRegistry::new());
        let store = registry
            .create_store(NewStore {
                name: "Shop".into(),
                slug: "shop".into(),
                currency: Currency::USD,
                tax_rate: 10.0,
                settings: None,
            })
            .unwrap();
        let catalog = CatalogService::new(Arc::clone(&registry));
        (registry, catalog, store.id)
    }

    fn physical(store_id: &StoreId, price_cents: i64, stock: i64) -> NewProduct {
        NewProduct {
            store_id: store_id.clone(),
            sku: "SKU-1".into(),
            name: "Widget".into(),
            description: None,
            kind: ProductKind::Physical,
            price: Money::new(price_cents, Currency::USD),
            stock_quantity: stock,
            metadata: None,
        }
    }

    #[test]
    fn test_create_and_list() {
        let (_registry, catalog, store_id) = setup();
        catalog.create_product(physical(&store_id, 1000, 5)).unwrap();

        assert_eq!(catalog.list_products(&store_id).len(), 1);
    }

    #[test]
    fn test_negative_price_rejected() {
        let (_registry, catalog, store_id) = setup();
        let err = catalog
            .create_product(physical(&store_id, -1, 5))
            .unwrap_err();
        assert!(matches!(err, CommerceError::Validation(_)));
    }

    #[test]
    fn test_effective_price_variant_override() {
        let (_registry, catalog, store_id) = setup();
        let product = catalog.create_product(physical(&store_id, 1000, 5)).unwrap();
        let variant = catalog
            .add_variant(NewVariant {
                product_id: product.id.clone(),
                sku: None,
                name: Some("Large".into()),
                price: Some(Money::new(1250, Currency::USD)),
                stock_quantity: 2,
            })
            .unwrap();

        let base = catalog.effective_price(&product.id, None).unwrap();
        assert_eq!(base.amount_cents, 1000);

        let overridden = catalog
            .effective_price(&product.id, Some(&variant.id))
            .unwrap();
        assert_eq!(overridden.amount_cents, 1250);
    }

    #[test]
    fn test_decrease_stock_conditional() {
        let (_registry, catalog, store_id) = setup();
        let product = catalog.create_product(physical(&store_id, 1000, 3)).unwrap();

        catalog.decrease_stock(&product.id, None, 2).unwrap();
        let err = catalog.decrease_stock(&product.id, None, 2).unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { .. }));
        assert_eq!(catalog.get_product(&product.id).unwrap().stock_quantity, 1);
    }

    #[test]
    fn test_digital_bypasses_stock() {
        let (_registry, catalog, store_id) = setup();
        let mut input = physical(&store_id, 1000, 0);
        input.kind = ProductKind::Digital;
        let product = catalog.create_product(input).unwrap();

        // No stock, but digital: decrement is a no-op success.
        catalog.decrease_stock(&product.id, None, 10).unwrap();
        assert_eq!(catalog.get_product(&product.id).unwrap().stock_quantity, 0);
    }

    #[test]
    fn test_concurrent_decrease_stock_never_oversells() {
        let (_registry, catalog, store_id) = setup();
        let catalog = Arc::new(catalog);
        let product = catalog.create_product(physical(&store_id, 1000, 5)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                let id = product.id.clone();
                std::thread::spawn(move || catalog.decrease_stock(&id, None, 1).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();

        assert_eq!(successes, 5);
        assert_eq!(catalog.get_product(&product.id).unwrap().stock_quantity, 0);
    }

    #[test]
    fn test_restock() {
        let (_registry, catalog, store_id) = setup();
        let product = catalog.create_product(physical(&store_id, 1000, 1)).unwrap();

        catalog.restock(&product.id, None, 4).unwrap();
        assert_eq!(catalog.get_product(&product.id).unwrap().stock_quantity, 5);
    }
}

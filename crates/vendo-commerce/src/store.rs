//! Store registry: tenant identity and per-tenant settings.
//!
//! Every other engine resolves a [`StoreId`] through this registry; all
//! catalog, cart, order, and payment state is partitioned by it.

use crate::error::CommerceError;
use crate::ids::StoreId;
use crate::money::Currency;
use serde::{Deserialize, Serialize};
use vendo_db::{Record, Table};

/// A tenant of the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Store {
    /// Unique store identifier.
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// URL-friendly slug, unique across the platform.
    pub slug: String,
    /// Currency all of this store's amounts are denominated in.
    pub currency: Currency,
    /// Flat tax rate applied to cart subtotals, in percent.
    pub tax_rate: f64,
    /// Whether the store is accepting traffic.
    pub is_active: bool,
    /// Per-tenant settings bag.
    pub settings: serde_json::Value,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Record for Store {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

/// Input for creating a store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStore {
    pub name: String,
    pub slug: String,
    pub currency: Currency,
    pub tax_rate: f64,
    pub settings: Option<serde_json::Value>,
}

/// Partial update for a store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreUpdate {
    pub name: Option<String>,
    pub tax_rate: Option<f64>,
    pub settings: Option<serde_json::Value>,
}

/// Owns tenant identity, currency, and tax configuration.
pub struct StoreRegistry {
    stores: Table<Store>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self {
            stores: Table::new(),
        }
    }

    /// Register a new store. Slugs are unique across the platform.
    pub fn create_store(&self, input: NewStore) -> Result<Store, CommerceError> {
        if input.tax_rate < 0.0 {
            return Err(CommerceError::Validation(format!(
                "tax rate must be non-negative, got {}",
                input.tax_rate
            )));
        }
        if input.slug.trim().is_empty() {
            return Err(CommerceError::Validation("slug must not be empty".into()));
        }
        if self.stores.find_one(|s| s.slug == input.slug).is_some() {
            return Err(CommerceError::DuplicateSlug(input.slug));
        }

        let now = current_timestamp();
        let store = Store {
            id: StoreId::generate(),
            name: input.name,
            slug: input.slug,
            currency: input.currency,
            tax_rate: input.tax_rate,
            is_active: true,
            settings: input
                .settings
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
            created_at: now,
            updated_at: now,
        };
        self.stores.insert(store.clone())?;
        tracing::info!(store = %store.id, slug = %store.slug, "store created");
        Ok(store)
    }

    /// Look up a store by id.
    pub fn get(&self, id: &StoreId) -> Result<Store, CommerceError> {
        self.stores
            .get(id.as_str())
            .ok_or_else(|| CommerceError::StoreNotFound(id.to_string()))
    }

    /// Look up a store by slug.
    pub fn get_by_slug(&self, slug: &str) -> Result<Store, CommerceError> {
        self.stores
            .find_one(|s| s.slug == slug)
            .ok_or_else(|| CommerceError::StoreNotFound(slug.to_string()))
    }

    /// Look up a store and require it to be active.
    pub fn require_active(&self, id: &StoreId) -> Result<Store, CommerceError> {
        let store = self.get(id)?;
        if !store.is_active {
            return Err(CommerceError::Validation(format!(
                "store {} is not active",
                store.id
            )));
        }
        Ok(store)
    }

    /// Apply a partial update to a store.
    pub fn update_store(&self, id: &StoreId, update: StoreUpdate) -> Result<Store, CommerceError> {
        if let Some(rate) = update.tax_rate {
            if rate < 0.0 {
                return Err(CommerceError::Validation(format!(
                    "tax rate must be non-negative, got {}",
                    rate
                )));
            }
        }
        self.stores
            .update(id.as_str(), |store| {
                if let Some(name) = update.name {
                    store.name = name;
                }
                if let Some(rate) = update.tax_rate {
                    store.tax_rate = rate;
                }
                if let Some(settings) = update.settings {
                    store.settings = settings;
                }
                store.updated_at = current_timestamp();
            })
            .map_err(|_| CommerceError::StoreNotFound(id.to_string()))
    }

    /// Take a store out of service. Existing data is retained.
    pub fn deactivate(&self, id: &StoreId) -> Result<Store, CommerceError> {
        self.stores
            .update(id.as_str(), |store| {
                store.is_active = false;
                store.updated_at = current_timestamp();
            })
            .map_err(|_| CommerceError::StoreNotFound(id.to_string()))
    }

    /// All registered stores.
    pub fn all(&self) -> Vec<Store> {
        self.stores.all()
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
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

    fn new_store(slug: &str) -> NewStore {
        NewStore {
            name: "Test Store".into(),
            slug: slug.into(),
            currency: Currency::USD,
            tax_rate: 10.0,
            settings: None,
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let registry = StoreRegistry::new();
        let store = registry.create_store(new_store("test-store")).unwrap();

        assert_eq!(registry.get(&store.id).unwrap().slug, "test-store");
        assert_eq!(registry.get_by_slug("test-store").unwrap().id, store.id);
    }

    #[test]
    fn test_slug_uniqueness() {
        let registry = StoreRegistry::new();
        registry.create_store(new_store("dup")).unwrap();

        let err = registry.create_store(new_store("dup")).unwrap_err();
        assert!(matches!(err, CommerceError::DuplicateSlug(_)));
    }

    #[test]
    fn test_negative_tax_rate_rejected() {
        let registry = StoreRegistry::new();
        let mut input = new_store("s");
        input.tax_rate = -1.0;
        assert!(matches!(
            registry.create_store(input),
            Err(CommerceError::Validation(_))
        ));
    }

    #[test]
    fn test_deactivate() {
        let registry = StoreRegistry::new();
        let store = registry.create_store(new_store("s")).unwrap();

        registry.deactivate(&store.id).unwrap();
        assert!(registry.require_active(&store.id).is_err());
        // Still resolvable by plain lookup.
        assert!(registry.get(&store.id).is_ok());
    }

    #[test]
    fn test_update_store() {
        let registry = StoreRegistry::new();
        let store = registry.create_store(new_store("s")).unwrap();

        let updated = registry
            .update_store(
                &store.id,
                StoreUpdate {
                    tax_rate: Some(7.5),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!((updated.tax_rate - 7.5).abs() < f64::EPSILON);
    }
}

//! Category types.

use crate::ids::{CategoryId, StoreId};
use serde::{Deserialize, Serialize};
use vendo_db::Record;

/// A product category, scoped to a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique category identifier.
    pub id: CategoryId,
    /// Owning store.
    pub store_id: StoreId,
    /// Display name.
    pub name: String,
    /// URL-friendly slug.
    pub slug: String,
    /// Parent category for nesting.
    pub parent_id: Option<CategoryId>,
    /// Unix timestamp of creation.
    pub created_at: i64,
}

impl Record for Category {
    fn key(&self) -> String {
        self.id.as_str().to_string()
    }
}

impl Category {
    /// Check if this is a top-level category.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

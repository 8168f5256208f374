//! Cart engine: mutations and the total recompute.

use crate::cart::{AppliedCoupon, Cart, CartItem, CartOwner, CART_TTL_SECS};
use crate::error::CommerceError;
use crate::ids::{CartId, CartItemId, ProductId, StoreId, VariantId};
use crate::money::Money;
use crate::store::StoreRegistry;
use serde::Deserialize;
use std::sync::Arc;
use vendo_db::Table;

/// Input for adding an item to a cart.
///
/// The unit price is caller-supplied: the API boundary resolves it from
/// the catalog before calling in, and the cart snapshots it.
#[derive(Debug, Clone, Deserialize)]
pub struct AddItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Accumulates line items per store and keeps totals consistent.
///
/// Every mutation runs its recompute inside the cart table's atomic
/// update, so concurrent edits against the same cart cannot lose each
/// other's totals.
pub struct CartEngine {
    registry: Arc<StoreRegistry>,
    carts: Table<Cart>,
}

impl CartEngine {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self {
            registry,
            carts: Table::new(),
        }
    }

    /// Create an empty cart with zeroed totals and a 30-day expiry.
    pub fn create_cart(
        &self,
        store_id: &StoreId,
        owner: CartOwner,
    ) -> Result<Cart, CommerceError> {
        let store = self.registry.require_active(store_id)?;
        let now = current_timestamp();
        let cart = Cart {
            id: CartId::generate(),
            store_id: store_id.clone(),
            owner,
            currency: store.currency,
            items: Vec::new(),
            coupon: None,
            shipping_total: Money::zero(store.currency),
            tax_total: Money::zero(store.currency),
            grand_total: Money::zero(store.currency),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            created_at: now,
            updated_at: now,
            expires_at: now + CART_TTL_SECS,
        };
        self.carts.insert(cart.clone())?;
        tracing::debug!(cart = %cart.id, store = %cart.store_id, "cart created");
        Ok(cart)
    }

    /// Look up a cart by id.
    pub fn get_cart(&self, id: &CartId) -> Result<Cart, CommerceError> {
        self.carts
            .get(id.as_str())
            .ok_or_else(|| CommerceError::CartNotFound(id.to_string()))
    }

    /// Find the current cart for an owner within a store.
    pub fn cart_for_owner(&self, store_id: &StoreId, owner: &CartOwner) -> Option<Cart> {
        self.carts
            .find_one(|c| &c.store_id == store_id && &c.owner == owner)
    }

    /// Insert an item at the given snapshot price, then recompute.
    ///
    /// Re-adding the same product/variant merges quantities and refreshes
    /// the snapshot price; the price is never refreshed any other way.
    pub fn add_item(&self, cart_id: &CartId, input: AddItem) -> Result<Cart, CommerceError> {
        if input.quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(input.quantity));
        }
        let tax_rate = self.tax_rate_for(cart_id)?;
        self.carts
            .update(cart_id.as_str(), |cart| {
                match cart
                    .items
                    .iter_mut()
                    .find(|i| {
                        i.product_id == input.product_id
                            && i.variant_id.as_ref() == input.variant_id.as_ref()
                    }) {
                    Some(existing) => {
                        existing.quantity = existing.quantity.saturating_add(input.quantity);
                        existing.unit_price = input.unit_price;
                    }
                    None => cart.items.push(CartItem {
                        id: CartItemId::generate(),
                        product_id: input.product_id,
                        variant_id: input.variant_id,
                        quantity: input.quantity,
                        unit_price: input.unit_price,
                    }),
                }
                cart.recompute(tax_rate);
            })
            .map_err(|_| CommerceError::CartNotFound(cart_id.to_string()))
    }

    /// Set an item's quantity; a quantity of zero or less removes it.
    pub fn update_item(
        &self,
        item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        if quantity <= 0 {
            return self.remove_item(item_id);
        }
        let cart = self.cart_containing(item_id)?;
        let tax_rate = self.tax_rate_for(&cart.id)?;
        self.carts
            .update(cart.id.as_str(), |cart| {
                if let Some(item) = cart.items.iter_mut().find(|i| &i.id == item_id) {
                    item.quantity = quantity;
                }
                cart.recompute(tax_rate);
            })
            .map_err(|_| CommerceError::CartNotFound(cart.id.to_string()))
    }

    /// Remove an item, then recompute.
    pub fn remove_item(&self, item_id: &CartItemId) -> Result<Cart, CommerceError> {
        let cart = self.cart_containing(item_id)?;
        let tax_rate = self.tax_rate_for(&cart.id)?;
        self.carts
            .update(cart.id.as_str(), |cart| {
                cart.items.retain(|i| &i.id != item_id);
                cart.recompute(tax_rate);
            })
            .map_err(|_| CommerceError::CartNotFound(cart.id.to_string()))
    }

    /// Remove every item and coupon and zero the totals directly.
    pub fn clear_cart(&self, cart_id: &CartId) -> Result<Cart, CommerceError> {
        self.carts
            .update(cart_id.as_str(), |cart| {
                cart.items.clear();
                cart.coupon = None;
                cart.reset_totals();
            })
            .map_err(|_| CommerceError::CartNotFound(cart_id.to_string()))
    }

    /// Store a coupon discount (already evaluated), then recompute.
    pub fn apply_coupon(
        &self,
        cart_id: &CartId,
        code: impl Into<String>,
        discount: Money,
    ) -> Result<Cart, CommerceError> {
        let tax_rate = self.tax_rate_for(cart_id)?;
        let code = code.into();
        self.carts
            .update(cart_id.as_str(), |cart| {
                cart.coupon = Some(AppliedCoupon { code, discount });
                cart.recompute(tax_rate);
            })
            .map_err(|_| CommerceError::CartNotFound(cart_id.to_string()))
    }

    /// Drop the coupon, then recompute.
    pub fn remove_coupon(&self, cart_id: &CartId) -> Result<Cart, CommerceError> {
        let tax_rate = self.tax_rate_for(cart_id)?;
        self.carts
            .update(cart_id.as_str(), |cart| {
                cart.coupon = None;
                cart.recompute(tax_rate);
            })
            .map_err(|_| CommerceError::CartNotFound(cart_id.to_string()))
    }

    /// Set the shipping cost, then recompute.
    pub fn set_shipping(&self, cart_id: &CartId, cost: Money) -> Result<Cart, CommerceError> {
        let tax_rate = self.tax_rate_for(cart_id)?;
        self.carts
            .update(cart_id.as_str(), |cart| {
                cart.shipping_total = cost;
                cart.recompute(tax_rate);
            })
            .map_err(|_| CommerceError::CartNotFound(cart_id.to_string()))
    }

    /// Purge carts whose expiry has passed. Items cascade with the cart.
    pub fn delete_expired_carts(&self) -> usize {
        let now = current_timestamp();
        let removed = self.carts.delete_where(|cart| now > cart.expires_at);
        if removed > 0 {
            tracing::info!(removed, "expired carts purged");
        }
        removed
    }

    fn cart_containing(&self, item_id: &CartItemId) -> Result<Cart, CommerceError> {
        self.carts
            .find_one(|c| c.items.iter().any(|i| &i.id == item_id))
            .ok_or_else(|| CommerceError::ItemNotInCart(item_id.to_string()))
    }

    fn tax_rate_for(&self, cart_id: &CartId) -> Result<f64, CommerceError> {
        let cart = self.get_cart(cart_id)?;
        Ok(self.registry.get(&cart.store_id)?.tax_rate)
    }

    #[cfg(test)]
    pub(crate) fn force_expire(&self, cart_id: &CartId) {
        let _ = self.carts.update(cart_id.as_str(), |cart| {
            cart.expires_at = 0;
        });
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
    use crate::ids::SessionId;
    use crate::money::Currency;
    use crate::store::NewStore;

    fn setup() -> (CartEngine, StoreId) {
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
        (CartEngine::new(registry), store.id)
    }

    fn session_owner() -> CartOwner {
        CartOwner::Session(SessionId::generate())
    }

    fn add(product: &str, quantity: i64, price_cents: i64) -> AddItem {
        AddItem {
            product_id: ProductId::new(product),
            variant_id: None,
            quantity,
            unit_price: Money::new(price_cents, Currency::USD),
        }
    }

    #[test]
    fn test_new_cart_has_zeroed_totals() {
        let (engine, store_id) = setup();
        let cart = engine.create_cart(&store_id, session_owner()).unwrap();

        assert!(cart.is_empty());
        assert!(cart.grand_total.is_zero());
        assert!(cart.expires_at > cart.created_at);
    }

    #[test]
    fn test_cart_lifecycle_totals() {
        let (engine, store_id) = setup();
        let cart = engine.create_cart(&store_id, session_owner()).unwrap();

        // Two items at a 10% store tax rate.
        engine.add_item(&cart.id, add("p1", 2, 1000)).unwrap();
        let cart_now = engine.add_item(&cart.id, add("p2", 1, 500)).unwrap();
        assert_eq!(cart_now.subtotal().amount_cents, 2500);
        assert_eq!(cart_now.tax_total.amount_cents, 250);
        assert_eq!(cart_now.grand_total.amount_cents, 2750);

        let cart_now = engine
            .set_shipping(&cart.id, Money::new(500, Currency::USD))
            .unwrap();
        assert_eq!(cart_now.grand_total.amount_cents, 3250);

        let cart_now = engine
            .apply_coupon(&cart.id, "SAVE3", Money::new(300, Currency::USD))
            .unwrap();
        assert_eq!(cart_now.grand_total.amount_cents, 2950);
    }

    #[test]
    fn test_total_identity_holds_after_any_sequence() {
        let (engine, store_id) = setup();
        let cart = engine.create_cart(&store_id, session_owner()).unwrap();

        engine.add_item(&cart.id, add("p1", 3, 700)).unwrap();
        let with_two = engine.add_item(&cart.id, add("p2", 2, 1200)).unwrap();
        let item = with_two.item_for(&ProductId::new("p1"), None).unwrap().clone();
        engine.update_item(&item.id, 1).unwrap();
        engine
            .set_shipping(&cart.id, Money::new(499, Currency::USD))
            .unwrap();
        let final_cart = engine
            .apply_coupon(&cart.id, "X", Money::new(150, Currency::USD))
            .unwrap();

        let subtotal = final_cart.subtotal();
        let expected = subtotal.amount_cents + subtotal.percentage(10.0).amount_cents
            + final_cart.shipping_total.amount_cents
            - 150;
        assert_eq!(final_cart.grand_total.amount_cents, expected);
    }

    #[test]
    fn test_re_add_merges_and_refreshes_price() {
        let (engine, store_id) = setup();
        let cart = engine.create_cart(&store_id, session_owner()).unwrap();

        engine.add_item(&cart.id, add("p1", 1, 1000)).unwrap();
        let cart_now = engine.add_item(&cart.id, add("p1", 2, 900)).unwrap();

        assert_eq!(cart_now.items.len(), 1);
        let item = &cart_now.items[0];
        assert_eq!(item.quantity, 3);
        // Explicit re-add refreshed the snapshot.
        assert_eq!(item.unit_price.amount_cents, 900);
    }

    #[test]
    fn test_update_item_to_zero_removes() {
        let (engine, store_id) = setup();
        let cart = engine.create_cart(&store_id, session_owner()).unwrap();
        let cart_now = engine.add_item(&cart.id, add("p1", 2, 1000)).unwrap();
        let item_id = cart_now.items[0].id.clone();

        let cart_now = engine.update_item(&item_id, 0).unwrap();
        assert!(cart_now.is_empty());
        assert!(cart_now.grand_total.is_zero());
    }

    #[test]
    fn test_update_missing_item_is_not_found() {
        let (engine, _store_id) = setup();
        let err = engine
            .update_item(&CartItemId::new("missing"), 2)
            .unwrap_err();
        assert!(matches!(err, CommerceError::ItemNotInCart(_)));
    }

    #[test]
    fn test_clear_cart_zeroes_totals() {
        let (engine, store_id) = setup();
        let cart = engine.create_cart(&store_id, session_owner()).unwrap();
        engine.add_item(&cart.id, add("p1", 2, 1000)).unwrap();
        engine
            .set_shipping(&cart.id, Money::new(500, Currency::USD))
            .unwrap();

        let cleared = engine.clear_cart(&cart.id).unwrap();
        assert!(cleared.is_empty());
        assert!(cleared.coupon.is_none());
        assert!(cleared.shipping_total.is_zero());
        assert!(cleared.grand_total.is_zero());
    }

    #[test]
    fn test_remove_coupon_recomputes() {
        let (engine, store_id) = setup();
        let cart = engine.create_cart(&store_id, session_owner()).unwrap();
        engine.add_item(&cart.id, add("p1", 1, 1000)).unwrap();
        engine
            .apply_coupon(&cart.id, "C", Money::new(200, Currency::USD))
            .unwrap();

        let cart_now = engine.remove_coupon(&cart.id).unwrap();
        assert_eq!(cart_now.grand_total.amount_cents, 1100);
    }

    #[test]
    fn test_missing_cart_is_not_found() {
        let (engine, _store_id) = setup();
        assert!(matches!(
            engine.get_cart(&CartId::new("missing")),
            Err(CommerceError::CartNotFound(_))
        ));
        assert!(matches!(
            engine.clear_cart(&CartId::new("missing")),
            Err(CommerceError::CartNotFound(_))
        ));
    }

    #[test]
    fn test_expiry_sweep() {
        let (engine, store_id) = setup();
        let kept = engine.create_cart(&store_id, session_owner()).unwrap();
        let doomed = engine.create_cart(&store_id, session_owner()).unwrap();
        engine.force_expire(&doomed.id);

        assert_eq!(engine.delete_expired_carts(), 1);
        assert!(engine.get_cart(&kept.id).is_ok());
        assert!(engine.get_cart(&doomed.id).is_err());
    }

    #[test]
    fn test_concurrent_adds_do_not_lose_updates() {
        let (engine, store_id) = setup();
        let engine = Arc::new(engine);
        let cart = engine.create_cart(&store_id, session_owner()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let engine = Arc::clone(&engine);
                let cart_id = cart.id.clone();
                std::thread::spawn(move || {
                    engine
                        .add_item(&cart_id, add(&format!("p{}", n), 1, 100))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let cart_now = engine.get_cart(&cart.id).unwrap();
        assert_eq!(cart_now.items.len(), 8);
        assert_eq!(cart_now.subtotal().amount_cents, 800);
        // Tax and total reflect all eight items, not a stale interleaving.
        assert_eq!(cart_now.grand_total.amount_cents, 880);
    }
}

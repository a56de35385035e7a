//! Locally persisted shopping cart.
//!
//! Lines are unique by product and kept in insertion order. Totals are derived
//! on every read. Checkout consumes the cart one seller at a time through
//! [`CartStore::group_by_seller`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tz_materials_core::{Money, Product, ProductId, SellerId};

use crate::storage::{Storage, StorageError, load_json, save_json};

/// Storage key of the cart record.
pub const CART_KEY: &str = "lmga-cart";

/// Cart failures.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Failed to persist cart: {0}")]
    Storage(#[from] StorageError),
}

/// One cart line: a product snapshot and a positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}

/// The cart lines belonging to one seller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerBucket {
    pub seller: SellerId,
    pub items: Vec<CartItem>,
}

impl SellerBucket {
    /// Sum of line totals in this bucket.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

/// The cart, mirrored to storage on every change.
pub struct CartStore {
    storage: Arc<dyn Storage>,
    items: Vec<CartItem>,
}

impl CartStore {
    /// Load the persisted cart. A missing or unreadable record yields an
    /// empty cart.
    #[must_use]
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let stored = match load_json::<Vec<CartItem>>(storage.as_ref(), CART_KEY) {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cart");
                Vec::new()
            }
        };

        // Re-establish the line invariants in case the record was edited.
        let mut items: Vec<CartItem> = Vec::with_capacity(stored.len());
        for item in stored.into_iter().filter(|item| item.quantity > 0) {
            match items.iter_mut().find(|line| line.product.id == item.product.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                None => items.push(item),
            }
        }

        Self { storage, items }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line for `product`, if present.
    #[must_use]
    pub fn get(&self, product: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product.id == product)
    }

    /// Add `quantity` units of `product`, merging with an existing line.
    /// A zero quantity is ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be persisted; the cart
    /// is then unchanged.
    pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Ok(());
        }
        let mut items = self.items.clone();
        match items.iter_mut().find(|item| item.product.id == product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => items.push(CartItem { product, quantity }),
        }
        self.commit(items)
    }

    /// Set a line's quantity. Zero or less removes the line; an unknown
    /// product is ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be persisted; the cart
    /// is then unchanged.
    pub fn update_item(&mut self, product: ProductId, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove_item(product);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let mut items = self.items.clone();
        if let Some(line) = items.iter_mut().find(|item| item.product.id == product) {
            line.quantity = quantity;
        }
        self.commit(items)
    }

    /// Drop a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be persisted; the cart
    /// is then unchanged.
    pub fn remove_item(&mut self, product: ProductId) -> Result<(), CartError> {
        let items = self
            .items
            .iter()
            .filter(|item| item.product.id != product)
            .cloned()
            .collect();
        self.commit(items)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be persisted; the cart
    /// is then unchanged.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.commit(Vec::new())
    }

    /// One bucket per seller, ordered by each seller's first appearance, with
    /// insertion order kept inside each bucket.
    #[must_use]
    pub fn group_by_seller(&self) -> Vec<SellerBucket> {
        let mut buckets: Vec<SellerBucket> = Vec::new();
        for item in &self.items {
            let seller = item.product.seller;
            match buckets.iter_mut().find(|bucket| bucket.seller == seller) {
                Some(bucket) => bucket.items.push(item.clone()),
                None => buckets.push(SellerBucket {
                    seller,
                    items: vec![item.clone()],
                }),
            }
        }
        buckets
    }

    /// Σ unit price × quantity.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Σ quantity.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Persist `items`, then make them the cart. A failed write leaves the
    /// cart as it was.
    fn commit(&mut self, items: Vec<CartItem>) -> Result<(), CartError> {
        save_json(self.storage.as_ref(), CART_KEY, &items)?;
        self.items = items;
        Ok(())
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items.len())
            .field("total_count", &self.total_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryStorage;

    pub(crate) fn product(name: &str, seller: SellerId, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::random(),
            name: name.to_string(),
            category: "cement".to_string(),
            brand: None,
            description: None,
            unit: "bag".to_string(),
            price: Money::new(Decimal::from(price)),
            stock: 100,
            images: Vec::new(),
            seller,
            created_at: now,
            updated_at: now,
        }
    }

    fn cart() -> (CartStore, Arc<dyn Storage>) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        (CartStore::load(Arc::clone(&storage)), storage)
    }

    #[test]
    fn test_add_merges_by_product() {
        let (mut cart, _) = cart();
        let p = product("Cement", SellerId::random(), 18_500);

        cart.add_item(p.clone(), 2).unwrap();
        cart.add_item(p.clone(), 3).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.get(p.id).unwrap().quantity, 5);
    }

    #[test]
    fn test_add_zero_is_ignored() {
        let (mut cart, storage) = cart();
        cart.add_item(product("Sand", SellerId::random(), 1), 0).unwrap();
        assert!(cart.is_empty());
        assert!(storage.get(CART_KEY).unwrap().is_none());
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let (mut cart, _) = cart();
        let p = product("Rebar", SellerId::random(), 25_000);
        cart.add_item(p.clone(), 1).unwrap();

        cart.update_item(p.id, 0).unwrap();
        assert!(cart.is_empty());

        cart.add_item(p.clone(), 1).unwrap();
        cart.update_item(p.id, -4).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_sets_quantity() {
        let (mut cart, _) = cart();
        let p = product("Nails", SellerId::random(), 3_000);
        cart.add_item(p.clone(), 4).unwrap();
        cart.update_item(p.id, 7).unwrap();
        assert_eq!(cart.get(p.id).unwrap().quantity, 7);

        // Unknown product: nothing added.
        cart.update_item(ProductId::random(), 3).unwrap();
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_group_by_seller_keeps_first_appearance_order() {
        let (mut cart, _) = cart();
        let seller_a = SellerId::random();
        let seller_b = SellerId::random();
        let item1 = product("Cement", seller_a, 18_500);
        let item2 = product("Tiles", seller_b, 40_000);
        let item3 = product("Sand", seller_a, 9_000);

        cart.add_item(item1.clone(), 1).unwrap();
        cart.add_item(item2.clone(), 1).unwrap();
        cart.add_item(item3.clone(), 1).unwrap();

        let buckets = cart.group_by_seller();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].seller, seller_a);
        let names: Vec<_> = buckets[0].items.iter().map(|i| i.product.name.as_str()).collect();
        assert_eq!(names, ["Cement", "Sand"]);
        assert_eq!(buckets[1].seller, seller_b);
        assert_eq!(buckets[1].items[0].product.id, item2.id);
    }

    #[test]
    fn test_totals_are_derived() {
        let (mut cart, _) = cart();
        let seller = SellerId::random();
        let cement = product("Cement", seller, 18_500);
        cart.add_item(cement.clone(), 2).unwrap();
        cart.add_item(product("Sand", seller, 9_000), 1).unwrap();

        assert_eq!(cart.total_count(), 3);
        assert_eq!(cart.total_amount().amount(), Decimal::from(46_000));

        cart.update_item(cement.id, 1).unwrap();
        assert_eq!(cart.total_amount().amount(), Decimal::from(27_500));
        assert_eq!(cart.group_by_seller()[0].total_amount(), cart.total_amount());
    }

    #[test]
    fn test_cart_survives_reload() {
        let (mut cart, storage) = cart();
        let p = product("Cement", SellerId::random(), 18_500);
        cart.add_item(p.clone(), 3).unwrap();

        let reloaded = CartStore::load(storage);
        assert_eq!(reloaded.items(), cart.items());
    }

    #[test]
    fn test_corrupt_cart_loads_empty() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set(CART_KEY, "{\"oops\":").unwrap();
        assert!(CartStore::load(storage).is_empty());
    }

    #[test]
    fn test_load_repairs_zero_and_duplicate_lines() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let p = product("Cement", SellerId::random(), 18_500);
        let q = product("Sand", SellerId::random(), 9_000);
        let stored = vec![
            CartItem { product: p.clone(), quantity: 2 },
            CartItem { product: q, quantity: 0 },
            CartItem { product: p.clone(), quantity: 1 },
        ];
        save_json(storage.as_ref(), CART_KEY, &stored).unwrap();

        let cart = CartStore::load(storage);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.get(p.id).unwrap().quantity, 3);
    }

    #[test]
    fn test_clear_persists_empty_list() {
        let (mut cart, storage) = cart();
        cart.add_item(product("Cement", SellerId::random(), 1), 1).unwrap();
        cart.clear().unwrap();
        assert_eq!(storage.get(CART_KEY).unwrap().as_deref(), Some("[]"));
    }

    /// Memory storage whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStorage {
        records: MemoryStorage,
        read_only: std::sync::atomic::AtomicBool,
    }

    impl Storage for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.records.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.read_only.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(std::io::Error::other("disk full").into());
            }
            self.records.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.records.remove(key)
        }
    }

    #[test]
    fn test_failed_write_leaves_cart_unchanged() {
        let storage = Arc::new(FlakyStorage::default());
        let mut cart = CartStore::load(Arc::clone(&storage) as Arc<dyn Storage>);
        let p = product("Cement", SellerId::random(), 18_500);
        cart.add_item(p.clone(), 2).unwrap();
        storage
            .read_only
            .store(true, std::sync::atomic::Ordering::SeqCst);

        assert!(cart.add_item(p.clone(), 3).is_err());
        assert!(cart.add_item(product("Sand", SellerId::random(), 9_000), 1).is_err());
        assert!(cart.update_item(p.id, 7).is_err());
        assert!(cart.remove_item(p.id).is_err());
        assert!(cart.clear().is_err());

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.get(p.id).unwrap().quantity, 2);
        let reloaded = CartStore::load(storage);
        assert_eq!(reloaded.items(), cart.items());
    }
}

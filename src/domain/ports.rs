use super::cart::Cart;
use super::catalog::{Category, Product, Sku};
use super::ids::{CartId, CategoryId, OrderId, ProductId, SkuId, UserId};
use super::money::Quantity;
use super::order::{Order, OrderStatus};
use super::wishlist::Wishlist;
use crate::error::{Record, Result, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Records written with an optimistic version check.
///
/// A save succeeds only if the stored version (0 when absent) equals the
/// version the caller read; the stored copy then carries `version + 1`.
pub trait Versioned {
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

impl Versioned for Sku {
    fn version(&self) -> u64 {
        self.version
    }
    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Versioned for Cart {
    fn version(&self) -> u64 {
        self.version
    }
    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Versioned for Wishlist {
    fn version(&self) -> u64 {
        self.version
    }
    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Shared by every backend so that they agree on what a stale write is.
pub fn ensure_version<T: Versioned>(stored: Option<&T>, incoming: &T, record: Record) -> Result<()> {
    let current = stored.map_or(0, Versioned::version);
    if current == incoming.version() {
        Ok(())
    } else {
        Err(StoreError::ConcurrentModification(record))
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn save_category(&self, category: Category) -> Result<()>;
    async fn category(&self, id: CategoryId) -> Result<Option<Category>>;
    async fn save_product(&self, product: Product) -> Result<()>;
    async fn product(&self, id: ProductId) -> Result<Option<Product>>;
    async fn products(&self) -> Result<Vec<Product>>;
    /// Versioned write; see [`Versioned`].
    async fn save_sku(&self, sku: Sku) -> Result<Sku>;
    /// Fresh read, including the version a later write must match.
    async fn sku(&self, id: SkuId) -> Result<Option<Sku>>;
    async fn skus(&self) -> Result<Vec<Sku>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart(&self, id: CartId) -> Result<Option<Cart>>;
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>>;
    /// Returns the user's cart, creating an empty one atomically if absent.
    /// The flag is `true` when this call created it.
    async fn find_or_create_cart(&self, user_id: UserId) -> Result<(Cart, bool)>;
    /// Versioned write; see [`Versioned`].
    async fn save_cart(&self, cart: Cart) -> Result<Cart>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
    /// Compare-and-set on the status: fails with `ConcurrentModification`
    /// unless the stored status is still `expected`.
    async fn replace_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order>;
}

#[async_trait]
pub trait WishlistStore: Send + Sync {
    async fn wishlist_for_user(&self, user_id: UserId) -> Result<Option<Wishlist>>;
    /// Returns the user's wishlist, creating an empty one atomically if absent.
    async fn find_or_create_wishlist(&self, user_id: UserId) -> Result<(Wishlist, bool)>;
    /// Versioned write; see [`Versioned`].
    async fn save_wishlist(&self, wishlist: Wishlist) -> Result<Wishlist>;
}

/// Stock to take from one SKU, valid only while the SKU is still at `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReservation {
    pub sku_id: SkuId,
    pub quantity: Quantity,
    pub expected_version: u64,
}

/// Everything a checkout writes, applied as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutCommit {
    pub cart_id: CartId,
    pub expected_cart_version: u64,
    pub reservations: Vec<StockReservation>,
    pub order: Order,
}

impl CheckoutCommit {
    /// Reservations merged per SKU, in ascending SKU order. Reservations of
    /// one SKU must agree on the expected version.
    pub fn stock_by_sku(&self) -> Result<BTreeMap<SkuId, (Quantity, u64)>> {
        let mut merged: BTreeMap<SkuId, (Quantity, u64)> = BTreeMap::new();
        for reservation in &self.reservations {
            match merged.get_mut(&reservation.sku_id) {
                Some((quantity, version)) => {
                    if *version != reservation.expected_version {
                        return Err(StoreError::ConcurrentModification(Record::Sku(
                            reservation.sku_id,
                        )));
                    }
                    *quantity = quantity.checked_add(reservation.quantity)?;
                }
                None => {
                    merged.insert(
                        reservation.sku_id,
                        (reservation.quantity, reservation.expected_version),
                    );
                }
            }
        }
        Ok(merged)
    }
}

#[async_trait]
pub trait CheckoutLedger: Send + Sync {
    /// Atomically takes the reserved stock, inserts the order and empties the
    /// cart. Either all of it is applied or none of it is. Several reservations
    /// of one SKU are checked and taken as their sum.
    ///
    /// Fails with `ConcurrentModification` if the cart or any SKU has moved
    /// past its expected version.
    async fn commit(&self, commit: CheckoutCommit) -> Result<()>;
}

pub type CatalogStoreRef = Arc<dyn CatalogStore>;
pub type CartStoreRef = Arc<dyn CartStore>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type WishlistStoreRef = Arc<dyn WishlistStore>;
pub type CheckoutLedgerRef = Arc<dyn CheckoutLedger>;

/// All ports, served by a single backend so that the ledger can write
/// across carts, SKUs and orders in one transaction.
#[derive(Clone)]
pub struct Stores {
    pub catalog: CatalogStoreRef,
    pub carts: CartStoreRef,
    pub orders: OrderStoreRef,
    pub wishlists: WishlistStoreRef,
    pub ledger: CheckoutLedgerRef,
}

impl Stores {
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: CatalogStore + CartStore + OrderStore + WishlistStore + CheckoutLedger + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            catalog: backend.clone(),
            carts: backend.clone(),
            orders: backend.clone(),
            wishlists: backend.clone(),
            ledger: backend,
        }
    }
}

use crate::domain::cart::Cart;
use crate::domain::catalog::{Category, Product, Sku};
use crate::domain::ids::{CartId, CategoryId, OrderId, ProductId, SkuId, UserId};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::ports::{
    CartStore, CatalogStore, CheckoutCommit, CheckoutLedger, OrderStore, Versioned, WishlistStore,
    ensure_version,
};
use crate::domain::wishlist::Wishlist;
use crate::error::{Record, Result, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, ErrorKind, IteratorMode, Options, Transaction,
    TransactionDB, TransactionDBOptions,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for categories, keyed by category id.
pub const CF_CATEGORIES: &str = "categories";
/// Column Family for products, keyed by product id.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for SKUs, keyed by SKU id.
pub const CF_SKUS: &str = "skus";
/// Column Family for carts, keyed by cart id.
pub const CF_CARTS: &str = "carts";
/// Column Family mapping a user id to the id of their cart.
pub const CF_CART_OWNERS: &str = "cart_owners";
/// Column Family for orders, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for wishlists, keyed by user id.
pub const CF_WISHLISTS: &str = "wishlists";

const COLUMN_FAMILIES: [&str; 7] = [
    CF_CATEGORIES,
    CF_PRODUCTS,
    CF_SKUS,
    CF_CARTS,
    CF_CART_OWNERS,
    CF_ORDERS,
    CF_WISHLISTS,
];

type Txn<'db> = Transaction<'db, TransactionDB>;

/// A persistent backend serving every store port, built on a RocksDB
/// `TransactionDB`.
///
/// Each table lives in its own Column Family with JSON values. Versioned
/// writes and checkout commits take pessimistic row locks
/// (`get_for_update_cf`) inside one RocksDB transaction, so concurrent
/// writers serialize per row and a failed commit leaves nothing behind.
/// Lock timeouts surface as `ConcurrentModification`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
}

impl RocksDBStore {
    /// Opens or creates a database at `path` with all column families present.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &TransactionDBOptions::default(),
            path,
            descriptors,
        )?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            StoreError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    fn save_versioned<T>(&self, cf_name: &str, key: &[u8], mut record: T, id: Record) -> Result<T>
    where
        T: Versioned + Serialize + DeserializeOwned,
    {
        let cf = self.cf(cf_name)?;
        let txn = self.db.transaction();
        let current: Option<T> = get_for_update(&txn, cf, key, id)?;
        ensure_version(current.as_ref(), &record, id)?;
        record.set_version(record.version() + 1);
        txn.put_cf(cf, key, serde_json::to_vec(&record)?)?;
        txn.commit().map_err(|e| contention(e, id))?;
        Ok(record)
    }

    fn find_or_create_cart_sync(&self, user_id: UserId) -> Result<(Cart, bool)> {
        let owners = self.cf(CF_CART_OWNERS)?;
        let carts = self.cf(CF_CARTS)?;
        let owner_key = user_id.to_be_bytes();

        let txn = self.db.transaction();
        let existing: Option<CartId> =
            get_for_update(&txn, owners, &owner_key, Record::CartOfUser(user_id))?;
        if let Some(cart_id) = existing {
            let cart = txn
                .get_cf(carts, cart_id.as_bytes())?
                .map(|bytes| serde_json::from_slice::<Cart>(&bytes))
                .transpose()?
                .ok_or(StoreError::CartNotFound(cart_id))?;
            return Ok((cart, false));
        }

        let mut cart = Cart::new(user_id);
        cart.version = 1;
        txn.put_cf(carts, cart.id.as_bytes(), serde_json::to_vec(&cart)?)?;
        txn.put_cf(owners, owner_key, serde_json::to_vec(&cart.id)?)?;
        txn.commit()
            .map_err(|e| contention(e, Record::CartOfUser(user_id)))?;
        Ok((cart, true))
    }

    fn find_or_create_wishlist_sync(&self, user_id: UserId) -> Result<(Wishlist, bool)> {
        let cf = self.cf(CF_WISHLISTS)?;
        let key = user_id.to_be_bytes();
        let id = Record::Wishlist(user_id);

        let txn = self.db.transaction();
        if let Some(wishlist) = get_for_update::<Wishlist>(&txn, cf, &key, id)? {
            return Ok((wishlist, false));
        }
        let mut wishlist = Wishlist::new(user_id);
        wishlist.version = 1;
        txn.put_cf(cf, key, serde_json::to_vec(&wishlist)?)?;
        txn.commit().map_err(|e| contention(e, id))?;
        Ok((wishlist, true))
    }

    fn replace_status_sync(&self, id: OrderId, expected: OrderStatus, next: OrderStatus) -> Result<Order> {
        let cf = self.cf(CF_ORDERS)?;
        let record = Record::Order(id);

        let txn = self.db.transaction();
        let mut order: Order =
            get_for_update(&txn, cf, id.as_bytes(), record)?.ok_or(StoreError::OrderNotFound(id))?;
        if order.status != expected {
            return Err(StoreError::ConcurrentModification(record));
        }
        order.transition(next)?;
        txn.put_cf(cf, id.as_bytes(), serde_json::to_vec(&order)?)?;
        txn.commit().map_err(|e| contention(e, record))?;
        Ok(order)
    }

    fn commit_sync(&self, commit: CheckoutCommit) -> Result<()> {
        let carts = self.cf(CF_CARTS)?;
        let skus = self.cf(CF_SKUS)?;
        let orders = self.cf(CF_ORDERS)?;
        let cart_record = Record::Cart(commit.cart_id);

        // Dropping `txn` on any early return rolls it back.
        let txn = self.db.transaction();

        let mut cart: Cart = get_for_update(&txn, carts, commit.cart_id.as_bytes(), cart_record)?
            .ok_or(StoreError::CartNotFound(commit.cart_id))?;
        if cart.version != commit.expected_cart_version {
            return Err(StoreError::ConcurrentModification(cart_record));
        }

        // Locks are taken in SKU id order so that two commits cannot deadlock.
        for (sku_id, (quantity, expected_version)) in commit.stock_by_sku()? {
            let key = sku_id.to_be_bytes();
            let sku_record = Record::Sku(sku_id);
            let mut sku: Sku = get_for_update(&txn, skus, &key, sku_record)?
                .ok_or(StoreError::SkuNotFound(sku_id))?;
            if sku.version != expected_version {
                return Err(StoreError::ConcurrentModification(sku_record));
            }
            sku.take(quantity)?;
            sku.version += 1;
            txn.put_cf(skus, key, serde_json::to_vec(&sku)?)?;
        }

        cart.clear();
        cart.version += 1;
        txn.put_cf(carts, commit.cart_id.as_bytes(), serde_json::to_vec(&cart)?)?;
        txn.put_cf(orders, commit.order.id.as_bytes(), serde_json::to_vec(&commit.order)?)?;

        txn.commit().map_err(|e| contention(e, cart_record))?;
        Ok(())
    }
}

fn get_for_update<T: DeserializeOwned>(
    txn: &Txn<'_>,
    cf: &ColumnFamily,
    key: &[u8],
    id: Record,
) -> Result<Option<T>> {
    let bytes = txn
        .get_for_update_cf(cf, key, true)
        .map_err(|e| contention(e, id))?;
    Ok(bytes.map(|b| serde_json::from_slice(&b)).transpose()?)
}

/// Lock waits that time out or abort are ordinary write conflicts.
fn contention(error: rocksdb::Error, id: Record) -> StoreError {
    match error.kind() {
        ErrorKind::Busy | ErrorKind::TimedOut | ErrorKind::TryAgain | ErrorKind::Aborted => {
            StoreError::ConcurrentModification(id)
        }
        _ => StoreError::RocksDBError(error),
    }
}

#[async_trait]
impl CatalogStore for RocksDBStore {
    async fn save_category(&self, category: Category) -> Result<()> {
        self.put(CF_CATEGORIES, &category.id.to_be_bytes(), &category)
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>> {
        self.get(CF_CATEGORIES, &id.to_be_bytes())
    }

    async fn save_product(&self, mut product: Product) -> Result<()> {
        product.updated_at = Utc::now();
        self.put(CF_PRODUCTS, &product.id.to_be_bytes(), &product)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        self.get(CF_PRODUCTS, &id.to_be_bytes())
    }

    async fn products(&self) -> Result<Vec<Product>> {
        self.scan(CF_PRODUCTS)
    }

    async fn save_sku(&self, sku: Sku) -> Result<Sku> {
        let id = sku.id;
        self.save_versioned(CF_SKUS, &id.to_be_bytes(), sku, Record::Sku(id))
    }

    async fn sku(&self, id: SkuId) -> Result<Option<Sku>> {
        self.get(CF_SKUS, &id.to_be_bytes())
    }

    async fn skus(&self) -> Result<Vec<Sku>> {
        self.scan(CF_SKUS)
    }
}

#[async_trait]
impl CartStore for RocksDBStore {
    async fn cart(&self, id: CartId) -> Result<Option<Cart>> {
        self.get(CF_CARTS, id.as_bytes())
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>> {
        let cart_id: Option<CartId> = self.get(CF_CART_OWNERS, &user_id.to_be_bytes())?;
        match cart_id {
            Some(cart_id) => self.get(CF_CARTS, cart_id.as_bytes()),
            None => Ok(None),
        }
    }

    async fn find_or_create_cart(&self, user_id: UserId) -> Result<(Cart, bool)> {
        self.find_or_create_cart_sync(user_id)
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart> {
        let id = cart.id;
        if self.get::<Cart>(CF_CARTS, id.as_bytes())?.is_none() {
            return Err(StoreError::CartNotFound(id));
        }
        self.save_versioned(CF_CARTS, id.as_bytes(), cart, Record::Cart(id))
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        self.get(CF_ORDERS, id.as_bytes())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS)?;
        Ok(orders
            .into_iter()
            .filter(|order| order.user_id == user_id)
            .collect())
    }

    async fn replace_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        self.replace_status_sync(id, expected, next)
    }
}

#[async_trait]
impl WishlistStore for RocksDBStore {
    async fn wishlist_for_user(&self, user_id: UserId) -> Result<Option<Wishlist>> {
        self.get(CF_WISHLISTS, &user_id.to_be_bytes())
    }

    async fn find_or_create_wishlist(&self, user_id: UserId) -> Result<(Wishlist, bool)> {
        self.find_or_create_wishlist_sync(user_id)
    }

    async fn save_wishlist(&self, wishlist: Wishlist) -> Result<Wishlist> {
        let user_id = wishlist.user_id;
        self.save_versioned(
            CF_WISHLISTS,
            &user_id.to_be_bytes(),
            wishlist,
            Record::Wishlist(user_id),
        )
    }
}

#[async_trait]
impl CheckoutLedger for RocksDBStore {
    async fn commit(&self, commit: CheckoutCommit) -> Result<()> {
        self.commit_sync(commit)
    }
}

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
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    skus: HashMap<SkuId, Sku>,
    carts: HashMap<CartId, Cart>,
    cart_owners: HashMap<UserId, CartId>,
    orders: HashMap<OrderId, Order>,
    wishlists: HashMap<UserId, Wishlist>,
}

/// A thread-safe in-memory backend serving every store port.
///
/// All tables sit behind one `Arc<RwLock<_>>`, so a checkout commit validates
/// and applies under a single write guard and readers never observe half of it.
/// Ideal for testing or for a single process where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn save_versioned<K, T>(table: &mut HashMap<K, T>, key: K, mut record: T, id: Record) -> Result<T>
where
    K: std::hash::Hash + Eq,
    T: Versioned + Clone,
{
    ensure_version(table.get(&key), &record, id)?;
    record.set_version(record.version() + 1);
    table.insert(key, record.clone());
    Ok(record)
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn save_category(&self, category: Category) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.categories.insert(category.id, category);
        Ok(())
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.get(&id).cloned())
    }

    async fn save_product(&self, mut product: Product) -> Result<()> {
        product.updated_at = Utc::now();
        let mut tables = self.tables.write().await;
        tables.products.insert(product.id, product);
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.get(&id).cloned())
    }

    async fn products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().cloned().collect())
    }

    async fn save_sku(&self, sku: Sku) -> Result<Sku> {
        let id = sku.id;
        let mut tables = self.tables.write().await;
        save_versioned(&mut tables.skus, id, sku, Record::Sku(id))
    }

    async fn sku(&self, id: SkuId) -> Result<Option<Sku>> {
        let tables = self.tables.read().await;
        Ok(tables.skus.get(&id).cloned())
    }

    async fn skus(&self) -> Result<Vec<Sku>> {
        let tables = self.tables.read().await;
        Ok(tables.skus.values().cloned().collect())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn cart(&self, id: CartId) -> Result<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables.carts.get(&id).cloned())
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart_owners
            .get(&user_id)
            .and_then(|id| tables.carts.get(id))
            .cloned())
    }

    async fn find_or_create_cart(&self, user_id: UserId) -> Result<(Cart, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(cart) = tables
            .cart_owners
            .get(&user_id)
            .and_then(|id| tables.carts.get(id))
        {
            return Ok((cart.clone(), false));
        }

        let cart = Cart::new(user_id);
        let id = cart.id;
        let cart = save_versioned(&mut tables.carts, id, cart, Record::Cart(id))?;
        tables.cart_owners.insert(user_id, cart.id);
        Ok((cart, true))
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart> {
        let id = cart.id;
        let mut tables = self.tables.write().await;
        if !tables.carts.contains_key(&id) {
            return Err(StoreError::CartNotFound(id));
        }
        save_versioned(&mut tables.carts, id, cart, Record::Cart(id))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn replace_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        if order.status != expected {
            return Err(StoreError::ConcurrentModification(Record::Order(id)));
        }
        order.transition(next)?;
        Ok(order.clone())
    }
}

#[async_trait]
impl WishlistStore for InMemoryStore {
    async fn wishlist_for_user(&self, user_id: UserId) -> Result<Option<Wishlist>> {
        let tables = self.tables.read().await;
        Ok(tables.wishlists.get(&user_id).cloned())
    }

    async fn find_or_create_wishlist(&self, user_id: UserId) -> Result<(Wishlist, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(wishlist) = tables.wishlists.get(&user_id) {
            return Ok((wishlist.clone(), false));
        }
        let wishlist = save_versioned(
            &mut tables.wishlists,
            user_id,
            Wishlist::new(user_id),
            Record::Wishlist(user_id),
        )?;
        Ok((wishlist, true))
    }

    async fn save_wishlist(&self, wishlist: Wishlist) -> Result<Wishlist> {
        let mut tables = self.tables.write().await;
        let user_id = wishlist.user_id;
        save_versioned(&mut tables.wishlists, user_id, wishlist, Record::Wishlist(user_id))
    }
}

#[async_trait]
impl CheckoutLedger for InMemoryStore {
    async fn commit(&self, commit: CheckoutCommit) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Validate everything before the first write.
        let stock = commit.stock_by_sku()?;
        let cart = tables
            .carts
            .get(&commit.cart_id)
            .ok_or(StoreError::CartNotFound(commit.cart_id))?;
        if cart.version != commit.expected_cart_version {
            return Err(StoreError::ConcurrentModification(Record::Cart(
                commit.cart_id,
            )));
        }
        for (sku_id, (quantity, expected_version)) in &stock {
            let sku = tables
                .skus
                .get(sku_id)
                .ok_or(StoreError::SkuNotFound(*sku_id))?;
            if sku.version != *expected_version {
                return Err(StoreError::ConcurrentModification(Record::Sku(sku.id)));
            }
            sku.ensure_available(*quantity)?;
        }

        for (sku_id, (quantity, _)) in &stock {
            if let Some(sku) = tables.skus.get_mut(sku_id) {
                sku.take(*quantity)?;
                sku.version += 1;
            }
        }
        if let Some(cart) = tables.carts.get_mut(&commit.cart_id) {
            cart.clear();
            cart.version += 1;
        }
        tables.orders.insert(commit.order.id, commit.order);
        Ok(())
    }
}

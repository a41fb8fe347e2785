use super::retry::{RetryPolicy, retry_on_conflict};
use crate::domain::catalog::Product;
use crate::domain::ids::{ProductId, UserId};
use crate::domain::ports::{CatalogStoreRef, Stores, WishlistStoreRef};
use crate::domain::wishlist::Wishlist;
use crate::error::{Result, StoreError};

/// Outcome of a wishlist toggle. `Unchanged` is a success, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistChange {
    Added,
    Removed,
    Unchanged,
}

pub struct WishlistService {
    wishlists: WishlistStoreRef,
    catalog: CatalogStoreRef,
    retry: RetryPolicy,
}

impl WishlistService {
    pub fn new(stores: &Stores, retry: RetryPolicy) -> Self {
        Self {
            wishlists: stores.wishlists.clone(),
            catalog: stores.catalog.clone(),
            retry,
        }
    }

    /// Returns the user's wishlist. Creates and persists an empty one on first access.
    pub async fn find_or_create(&self, user_id: UserId) -> Result<Wishlist> {
        let (wishlist, created) = self.wishlists.find_or_create_wishlist(user_id).await?;
        if created {
            tracing::info!(%user_id, wishlist_id = %wishlist.id, "created wishlist");
        }
        Ok(wishlist)
    }

    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<WishlistChange> {
        if self.catalog.product(product_id).await?.is_none() {
            return Err(StoreError::ProductNotFound(product_id));
        }

        retry_on_conflict(self.retry, "wishlist_add", move |_| async move {
            let mut wishlist = self.find_or_create(user_id).await?;
            if !wishlist.add(product_id) {
                return Ok(WishlistChange::Unchanged);
            }
            self.wishlists.save_wishlist(wishlist).await?;
            Ok(WishlistChange::Added)
        })
        .await
    }

    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<WishlistChange> {
        retry_on_conflict(self.retry, "wishlist_remove", move |_| async move {
            let mut wishlist = self.find_or_create(user_id).await?;
            if !wishlist.remove(product_id) {
                return Ok(WishlistChange::Unchanged);
            }
            self.wishlists.save_wishlist(wishlist).await?;
            Ok(WishlistChange::Removed)
        })
        .await
    }

    /// The saved products as they are in the catalog right now, in the order
    /// they were added. Products that no longer exist are skipped.
    pub async fn products(&self, user_id: UserId) -> Result<Vec<Product>> {
        let Some(wishlist) = self.wishlists.wishlist_for_user(user_id).await? else {
            return Ok(Vec::new());
        };

        let mut products = Vec::with_capacity(wishlist.products.len());
        for product_id in wishlist.products {
            if let Some(product) = self.catalog.product(product_id).await? {
                products.push(product);
            }
        }
        Ok(products)
    }
}

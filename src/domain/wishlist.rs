use super::ids::{ProductId, UserId, WishlistId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's saved products: a set, kept in the order entries were added.
///
/// Entries carry no price; they are always evaluated against the live catalog.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Wishlist {
    pub id: WishlistId,
    pub user_id: UserId,
    pub products: Vec<ProductId>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Wishlist {
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: WishlistId::new(),
            user_id,
            products: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.contains(&product_id)
    }

    /// Returns `false` if the product was already present.
    pub fn add(&mut self, product_id: ProductId) -> bool {
        if self.contains(product_id) {
            return false;
        }
        self.products.push(product_id);
        true
    }

    /// Returns `false` if the product was not present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.products.len();
        self.products.retain(|id| *id != product_id);
        self.products.len() != before
    }
}

//! Application layer containing the storefront use cases.
//!
//! Each service holds shared handles to the store ports it needs and nothing
//! else; all coordination between concurrent callers happens in the store.
//! [`Storefront`] wires every service to one set of [`Stores`].

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod retry;
pub mod wishlist;

use crate::config::Config;
use crate::domain::ports::Stores;
use cart::CartService;
use catalog::CatalogService;
use checkout::CheckoutEngine;
use orders::OrderService;
use wishlist::WishlistService;

pub struct Storefront {
    pub catalog: CatalogService,
    pub carts: CartService,
    pub wishlists: WishlistService,
    pub orders: OrderService,
    pub checkout: CheckoutEngine,
}

impl Storefront {
    pub fn new(stores: Stores, config: &Config) -> Self {
        let retry = config.checkout.retry_policy();
        Self {
            catalog: CatalogService::new(&stores, retry),
            carts: CartService::new(&stores, retry),
            wishlists: WishlistService::new(&stores, retry),
            orders: OrderService::new(&stores),
            checkout: CheckoutEngine::new(&stores, &config.checkout),
        }
    }
}

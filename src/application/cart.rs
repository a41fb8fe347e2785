use super::retry::{RetryPolicy, retry_on_conflict};
use crate::domain::cart::{Cart, CartLine};
use crate::domain::ids::{CartId, CartLineId, SkuId, UserId};
use crate::domain::money::{Price, Quantity};
use crate::domain::ports::{CartStoreRef, CatalogStoreRef, Stores};
use crate::error::{Result, StoreError};

/// A cart line priced against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub line_id: CartLineId,
    pub sku_id: SkuId,
    pub quantity: Quantity,
    pub unit_price: Price,
    pub line_total: Price,
}

/// What a shopper sees when opening the cart. Prices are live, not frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub lines: Vec<PricedLine>,
    pub total_price: Price,
}

/// Cart editing.
///
/// Stock is not checked while editing; checkout re-validates it. Every edit
/// is a versioned read-modify-write, retried when another edit got in first.
pub struct CartService {
    carts: CartStoreRef,
    catalog: CatalogStoreRef,
    retry: RetryPolicy,
}

impl CartService {
    pub fn new(stores: &Stores, retry: RetryPolicy) -> Self {
        Self {
            carts: stores.carts.clone(),
            catalog: stores.catalog.clone(),
            retry,
        }
    }

    /// Returns the user's cart. Creates and persists an empty one on first access.
    pub async fn find_or_create(&self, user_id: UserId) -> Result<Cart> {
        let (cart, created) = self.carts.find_or_create_cart(user_id).await?;
        if created {
            tracing::info!(%user_id, cart_id = %cart.id, "created cart");
        }
        Ok(cart)
    }

    async fn load(&self, cart_id: CartId) -> Result<Cart> {
        self.carts
            .cart(cart_id)
            .await?
            .ok_or(StoreError::CartNotFound(cart_id))
    }

    /// Adds `quantity` of `sku_id`. An existing line for the SKU grows by
    /// `quantity`; otherwise a new line is created.
    pub async fn add_line(&self, cart_id: CartId, sku_id: SkuId, quantity: u32) -> Result<CartLine> {
        let quantity = Quantity::new(quantity)?;
        if self.catalog.sku(sku_id).await?.is_none() {
            return Err(StoreError::SkuNotFound(sku_id));
        }

        retry_on_conflict(self.retry, "add_line", move |_| async move {
            let mut cart = self.load(cart_id).await?;
            let line = cart.add_line(sku_id, quantity)?;
            self.carts.save_cart(cart).await?;
            Ok(line)
        })
        .await
    }

    /// Replaces a line's quantity. Zero is rejected; use [`Self::remove_line`].
    pub async fn update_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<CartLine> {
        let quantity = Quantity::new(quantity)?;

        retry_on_conflict(self.retry, "update_line", move |_| async move {
            let mut cart = self.load(cart_id).await?;
            let line = cart.update_line(line_id, quantity)?;
            self.carts.save_cart(cart).await?;
            Ok(line)
        })
        .await
    }

    pub async fn remove_line(&self, cart_id: CartId, line_id: CartLineId) -> Result<CartLine> {
        retry_on_conflict(self.retry, "remove_line", move |_| async move {
            let mut cart = self.load(cart_id).await?;
            let line = cart.remove_line(line_id)?;
            self.carts.save_cart(cart).await?;
            Ok(line)
        })
        .await
    }

    /// Prices every line at the SKU's current price.
    pub async fn summary(&self, cart_id: CartId) -> Result<CartSummary> {
        let cart = self.load(cart_id).await?;

        let mut lines = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let sku = self
                .catalog
                .sku(line.sku_id)
                .await?
                .ok_or(StoreError::SkuNotFound(line.sku_id))?;
            lines.push(PricedLine {
                line_id: line.id,
                sku_id: line.sku_id,
                quantity: line.quantity,
                unit_price: sku.price,
                line_total: sku.price.times(line.quantity)?,
            });
        }

        Ok(CartSummary {
            cart_id: cart.id,
            user_id: cart.user_id,
            total_price: Price::total(lines.iter().map(|line| line.line_total))?,
            lines,
        })
    }
}

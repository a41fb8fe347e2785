use super::catalog_reader::CatalogRow;
use super::command_reader::Command;
use super::report_writer::{OrderRow, StockRow};
use crate::application::Storefront;
use crate::application::wishlist::WishlistChange;
use crate::domain::catalog::{Category, Product, Sku};
use crate::domain::ids::{CartId, CartLineId, CategoryId, OrderId, ProductId, SkuId, UserId};
use crate::domain::money::Price;
use crate::error::{Result, StoreError};
use std::collections::{BTreeMap, HashMap};

/// What a successfully applied command did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    LineChanged,
    LineRemoved,
    OrderPlaced(OrderId),
    Wishlist(WishlistChange),
    OrderCanceled(OrderId),
}

/// Drives a [`Storefront`] from catalog and command rows.
///
/// Remembers the orders placed during the run so that `cancel` rows can
/// refer to them by ordinal and the order report can list them.
pub struct BatchRunner {
    storefront: Storefront,
    categories: HashMap<String, CategoryId>,
    placed: BTreeMap<UserId, Vec<OrderId>>,
}

impl BatchRunner {
    pub fn new(storefront: Storefront) -> Self {
        Self {
            storefront,
            categories: HashMap::new(),
            placed: BTreeMap::new(),
        }
    }

    pub fn storefront(&self) -> &Storefront {
        &self.storefront
    }

    /// Upserts the row's category, product and SKU.
    ///
    /// The whole row is validated before anything is written, so a rejected
    /// row neither stores records nor takes a category id.
    pub async fn load_catalog_row(&mut self, row: CatalogRow) -> Result<Sku> {
        let category = self.category(&row.category)?;
        let product_id = ProductId(row.product);
        let product = Product::new(product_id, category.id, row.name, None)?;
        let price = Price::new(row.price)?;

        let sku_id = SkuId(row.sku);
        let catalog = &self.storefront.catalog;
        let existing = match catalog.sku(sku_id).await {
            Ok(existing) => Some(existing),
            Err(StoreError::SkuNotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let new_sku = match &existing {
            Some(existing) if existing.product_id != product_id => {
                return Err(StoreError::validation(format!(
                    "SKU {sku_id} belongs to product {}",
                    existing.product_id
                )));
            }
            Some(existing) if existing.size != row.size => {
                return Err(StoreError::validation(format!(
                    "SKU {sku_id} has size {:?}, not {:?}",
                    existing.size, row.size
                )));
            }
            Some(_) => None,
            None => Some(Sku::new(sku_id, product_id, row.size, price, row.available)?),
        };

        let category_id = category.id;
        catalog.save_category(category).await?;
        self.categories.insert(row.category, category_id);
        catalog.save_product(product).await?;
        match new_sku {
            Some(sku) => catalog.add_sku(sku).await,
            None => {
                catalog.reprice(sku_id, price.value()).await?;
                catalog.restock(sku_id, row.available).await
            }
        }
    }

    /// The category named `name`, with the id it has in this run or the next
    /// free one. The id is only taken once the category is saved.
    fn category(&self, name: &str) -> Result<Category> {
        let id = self
            .categories
            .get(name)
            .copied()
            .unwrap_or(CategoryId(self.categories.len() as u64 + 1));
        Category::new(id, name, None)
    }

    pub async fn apply(&mut self, command: Command) -> Result<Outcome> {
        let storefront = &self.storefront;
        match command {
            Command::AddLine {
                user,
                sku,
                quantity,
            } => {
                let cart = storefront.carts.find_or_create(user).await?;
                storefront.carts.add_line(cart.id, sku, quantity).await?;
                Ok(Outcome::LineChanged)
            }
            Command::UpdateLine {
                user,
                sku,
                quantity,
            } => {
                let (cart_id, line_id) = self.line_for_sku(user, sku).await?;
                storefront
                    .carts
                    .update_line(cart_id, line_id, quantity)
                    .await?;
                Ok(Outcome::LineChanged)
            }
            Command::RemoveLine { user, sku } => {
                let (cart_id, line_id) = self.line_for_sku(user, sku).await?;
                storefront.carts.remove_line(cart_id, line_id).await?;
                Ok(Outcome::LineRemoved)
            }
            Command::Checkout { user } => {
                let cart = storefront.carts.find_or_create(user).await?;
                let order = storefront.checkout.checkout(user, cart.id).await?;
                self.placed.entry(user).or_default().push(order.id);
                Ok(Outcome::OrderPlaced(order.id))
            }
            Command::Wish { user, product } => {
                let change = storefront.wishlists.add(user, product).await?;
                Ok(Outcome::Wishlist(change))
            }
            Command::Unwish { user, product } => {
                let change = storefront.wishlists.remove(user, product).await?;
                Ok(Outcome::Wishlist(change))
            }
            Command::Cancel { user, ordinal } => {
                let order_id = self
                    .placed
                    .get(&user)
                    .and_then(|orders| orders.get(ordinal.checked_sub(1)?))
                    .copied()
                    .ok_or_else(|| {
                        StoreError::validation(format!("user {user} has no order #{ordinal}"))
                    })?;
                storefront.orders.cancel(user, order_id).await?;
                Ok(Outcome::OrderCanceled(order_id))
            }
        }
    }

    async fn line_for_sku(
        &self,
        user: UserId,
        sku: SkuId,
    ) -> Result<(CartId, CartLineId)> {
        let cart = self.storefront.carts.find_or_create(user).await?;
        let line = cart.line_for_sku(sku).ok_or_else(|| {
            StoreError::validation(format!("SKU {sku} is not in the cart of user {user}"))
        })?;
        Ok((cart.id, line.id))
    }

    pub async fn stock_report(&self) -> Result<Vec<StockRow>> {
        Ok(self
            .storefront
            .catalog
            .skus()
            .await?
            .into_iter()
            .map(|sku| StockRow {
                sku: sku.id.0,
                product: sku.product_id.0,
                size: sku.size,
                price: sku.price.to_string(),
                available: sku.available,
            })
            .collect())
    }

    /// Orders placed in this run, by user and then by placement order, with
    /// their current status.
    pub async fn order_report(&self) -> Result<Vec<OrderRow>> {
        let mut rows = Vec::new();
        for (user, orders) in &self.placed {
            for (index, order_id) in orders.iter().enumerate() {
                let order = self.storefront.orders.order(*user, *order_id).await?;
                rows.push(OrderRow {
                    user: user.0,
                    order: index + 1,
                    status: order.status.to_string(),
                    total_price: order.total_price.to_string(),
                    lines: order.lines.len(),
                });
            }
        }
        Ok(rows)
    }
}

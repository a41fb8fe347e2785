use super::retry::{RetryPolicy, retry_on_conflict};
use crate::domain::catalog::{Category, Product, Sku};
use crate::domain::ids::{ProductId, SkuId};
use crate::domain::money::Price;
use crate::domain::ports::{CatalogStoreRef, Stores};
use crate::error::{Result, StoreError};
use rust_decimal::Decimal;

/// Admin-side catalog maintenance.
pub struct CatalogService {
    catalog: CatalogStoreRef,
    retry: RetryPolicy,
}

impl CatalogService {
    pub fn new(stores: &Stores, retry: RetryPolicy) -> Self {
        Self {
            catalog: stores.catalog.clone(),
            retry,
        }
    }

    pub async fn save_category(&self, category: Category) -> Result<()> {
        self.catalog.save_category(category).await
    }

    /// Inserts or replaces a product. Its category must exist.
    pub async fn save_product(&self, mut product: Product) -> Result<()> {
        if self.catalog.category(product.category_id).await?.is_none() {
            return Err(StoreError::CategoryNotFound(product.category_id));
        }
        if let Some(existing) = self.catalog.product(product.id).await? {
            product.created_at = existing.created_at;
        }
        self.catalog.save_product(product).await
    }

    /// Registers a new SKU. The product must exist and must not already have
    /// a SKU of the same size.
    pub async fn add_sku(&self, sku: Sku) -> Result<Sku> {
        if self.catalog.product(sku.product_id).await?.is_none() {
            return Err(StoreError::ProductNotFound(sku.product_id));
        }
        if self.catalog.sku(sku.id).await?.is_some() {
            return Err(StoreError::validation(format!("SKU {} already exists", sku.id)));
        }
        let duplicate_size = self
            .skus_for_product(sku.product_id)
            .await?
            .iter()
            .any(|existing| existing.size == sku.size);
        if duplicate_size {
            return Err(StoreError::validation(format!(
                "Product {} already has size {}",
                sku.product_id, sku.size
            )));
        }
        self.catalog.save_sku(Sku { version: 0, ..sku }).await
    }

    /// Sets the stock on hand. Checkouts that read the old stock will retry.
    pub async fn restock(&self, sku_id: SkuId, available: u32) -> Result<Sku> {
        retry_on_conflict(self.retry, "restock", move |_| async move {
            let mut sku = self.sku(sku_id).await?;
            sku.available = available;
            self.catalog.save_sku(sku).await
        })
        .await
    }

    /// Changes the price. Orders already placed keep their snapshot.
    pub async fn reprice(&self, sku_id: SkuId, price: Decimal) -> Result<Sku> {
        let price = Price::new(price)?;
        retry_on_conflict(self.retry, "reprice", move |_| async move {
            let mut sku = self.sku(sku_id).await?;
            sku.price = price;
            self.catalog.save_sku(sku).await
        })
        .await
    }

    pub async fn sku(&self, sku_id: SkuId) -> Result<Sku> {
        self.catalog
            .sku(sku_id)
            .await?
            .ok_or(StoreError::SkuNotFound(sku_id))
    }

    pub async fn product(&self, product_id: ProductId) -> Result<Product> {
        self.catalog
            .product(product_id)
            .await?
            .ok_or(StoreError::ProductNotFound(product_id))
    }

    pub async fn products(&self) -> Result<Vec<Product>> {
        let mut products = self.catalog.products().await?;
        products.sort_by_key(|product| product.id);
        Ok(products)
    }

    pub async fn skus(&self) -> Result<Vec<Sku>> {
        let mut skus = self.catalog.skus().await?;
        skus.sort_by_key(|sku| sku.id);
        Ok(skus)
    }

    pub async fn skus_for_product(&self, product_id: ProductId) -> Result<Vec<Sku>> {
        let mut skus: Vec<Sku> = self
            .catalog
            .skus()
            .await?
            .into_iter()
            .filter(|sku| sku.product_id == product_id)
            .collect();
        skus.sort_by_key(|sku| sku.id);
        Ok(skus)
    }
}

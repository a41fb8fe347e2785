#![allow(dead_code)]

use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use storefront::application::Storefront;
use storefront::config::Config;
use storefront::domain::catalog::{Category, Product, Sku};
use storefront::domain::ids::{CategoryId, ProductId, SkuId};
use storefront::domain::money::Price;
use storefront::domain::ports::Stores;
use storefront::infrastructure::in_memory::InMemoryStore;

pub fn stores() -> Stores {
    Stores::from_backend(InMemoryStore::new())
}

/// Config with enough retry headroom for heavily contended tests.
pub fn contended_config() -> Config {
    let mut config = Config::default();
    config.checkout.max_attempts = 100;
    config.checkout.initial_backoff_ms = 1;
    config.checkout.max_backoff_ms = 5;
    config
}

pub fn storefront(stores: &Stores) -> Storefront {
    Storefront::new(stores.clone(), &contended_config())
}

/// Seeds one category and product, then one SKU per `(id, price, available)`.
pub async fn seed(storefront: &Storefront, skus: &[(u64, Decimal, u32)]) {
    storefront
        .catalog
        .save_category(Category::new(CategoryId(1), "Shoes", None).unwrap())
        .await
        .unwrap();
    storefront
        .catalog
        .save_product(Product::new(ProductId(1), CategoryId(1), "Runner", None).unwrap())
        .await
        .unwrap();
    for (id, price, available) in skus {
        let sku = Sku::new(
            SkuId(*id),
            ProductId(1),
            format!("size-{id}"),
            Price::new(*price).unwrap(),
            *available,
        )
        .unwrap();
        storefront.catalog.add_sku(sku).await.unwrap();
    }
}

pub fn write_csv(path: &Path, header: &[&str], rows: &[&[&str]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(file);

    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(*row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub const CATALOG_HEADER: [&str; 7] = [
    "sku",
    "product",
    "category",
    "name",
    "size",
    "price",
    "available",
];

pub const COMMAND_HEADER: [&str; 4] = ["command", "user", "target", "quantity"];

use crate::error::{Result, StoreError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One SKU of the catalog, together with the product and category it belongs to.
///
/// `category` is the category name; categories get ids in order of first
/// appearance when the catalog is loaded.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CatalogRow {
    pub sku: u64,
    pub product: u64,
    pub category: String,
    pub name: String,
    pub size: String,
    pub price: Decimal,
    pub available: u32,
}

/// Reads catalog rows from a CSV source.
///
/// Same reader setup as the command file: trimmed fields, flexible record lengths.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes the rows. A malformed row yields an error and the
    /// iterator moves on to the next one.
    pub fn rows(self) -> impl Iterator<Item = Result<CatalogRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(StoreError::from))
    }
}

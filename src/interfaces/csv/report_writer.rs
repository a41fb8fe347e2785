use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Stock on hand for one SKU.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct StockRow {
    pub sku: u64,
    pub product: u64,
    pub size: String,
    pub price: String,
    pub available: u32,
}

/// One order placed during the run. `order` is the user's 1-based ordinal.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct OrderRow {
    pub user: u64,
    pub order: usize,
    pub status: String,
    pub total_price: String,
    pub lines: usize,
}

/// Writes report rows as CSV, header first.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_rows<T, I>(&mut self, rows: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

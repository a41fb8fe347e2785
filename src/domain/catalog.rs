use super::ids::{CategoryId, ProductId, SkuId};
use super::money::{Price, Quantity};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_CATEGORY_NAME: usize = 50;
pub const MAX_PRODUCT_NAME: usize = 200;

fn validate_name(field: &str, value: &str, max: usize) -> Result<(), StoreError> {
    let length = value.trim().chars().count();
    if length == 0 {
        Err(StoreError::validation(format!("{field} must not be empty")))
    } else if length > max {
        Err(StoreError::validation(format!(
            "{field} must be at most {max} characters"
        )))
    } else {
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

impl Category {
    pub fn new(
        id: CategoryId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, StoreError> {
        let name = name.into();
        validate_name("Category name", &name, MAX_CATEGORY_NAME)?;
        Ok(Self {
            id,
            name,
            description,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        id: ProductId,
        category_id: CategoryId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, StoreError> {
        let name = name.into();
        validate_name("Product name", &name, MAX_PRODUCT_NAME)?;
        let now = Utc::now();
        Ok(Self {
            id,
            category_id,
            name,
            description,
            created_at: now,
            updated_at: now,
        })
    }
}

/// One size of one product, with its own price and stock on hand.
///
/// `version` is bumped by the store on every write and is what checkout
/// compares to detect that stock moved underneath it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Sku {
    pub id: SkuId,
    pub product_id: ProductId,
    pub size: String,
    pub price: Price,
    pub available: u32,
    pub version: u64,
}

impl Sku {
    pub fn new(
        id: SkuId,
        product_id: ProductId,
        size: impl Into<String>,
        price: Price,
        available: u32,
    ) -> Result<Self, StoreError> {
        let size = size.into();
        if size.trim().is_empty() {
            return Err(StoreError::validation("Size must not be empty"));
        }
        Ok(Self {
            id,
            product_id,
            size,
            price,
            available,
            version: 0,
        })
    }

    pub fn is_in_stock(&self) -> bool {
        self.available > 0
    }

    /// Fails without touching the stock if fewer than `quantity` units are on hand.
    pub fn ensure_available(&self, quantity: Quantity) -> Result<(), StoreError> {
        if quantity.get() <= self.available {
            Ok(())
        } else {
            Err(StoreError::InsufficientStock {
                sku: self.id,
                requested: quantity.get(),
                available: self.available,
            })
        }
    }

    /// Removes `quantity` units from stock.
    pub fn take(&mut self, quantity: Quantity) -> Result<(), StoreError> {
        self.ensure_available(quantity)?;
        self.available -= quantity.get();
        Ok(())
    }
}

use crate::domain::ids::{CartId, CartLineId, CategoryId, OrderId, ProductId, SkuId, UserId};
use crate::domain::order::OrderStatus;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// The record a concurrent writer got to first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Sku(SkuId),
    Cart(CartId),
    CartOfUser(UserId),
    Order(OrderId),
    Wishlist(UserId),
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Sku(id) => write!(f, "sku {id}"),
            Record::Cart(id) => write!(f, "cart {id}"),
            Record::CartOfUser(user) => write!(f, "cart of user {user}"),
            Record::Order(id) => write!(f, "order {id}"),
            Record::Wishlist(user) => write!(f, "wishlist of user {user}"),
        }
    }
}

/// Coarse classification of a [`StoreError`], used by callers to decide
/// whether to retry and how to surface the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. Retrying the same call cannot succeed.
    Validation,
    /// A referenced cart, SKU, product, line or order does not exist.
    NotFound,
    /// Stock or version conflict. Safe to retry after re-reading state.
    Conflict,
    /// Storage or I/O failure.
    Internal,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Cart {0} is empty")]
    CartEmpty(CartId),
    #[error("Order status cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Cart {0} not found")]
    CartNotFound(CartId),
    #[error("SKU {0} not found")]
    SkuNotFound(SkuId),
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),
    #[error("Category {0} not found")]
    CategoryNotFound(CategoryId),
    #[error("Cart line {0} not found")]
    LineNotFound(CartLineId),
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Insufficient stock for SKU {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: SkuId,
        requested: u32,
        available: u32,
    },
    #[error("Concurrent modification of {0}")]
    ConcurrentModification(Record),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::ValidationError(_)
            | StoreError::CartEmpty(_)
            | StoreError::InvalidStatusTransition { .. } => ErrorKind::Validation,
            StoreError::CartNotFound(_)
            | StoreError::SkuNotFound(_)
            | StoreError::ProductNotFound(_)
            | StoreError::CategoryNotFound(_)
            | StoreError::LineNotFound(_)
            | StoreError::OrderNotFound(_) => ErrorKind::NotFound,
            StoreError::InsufficientStock { .. }
            | StoreError::ConcurrentModification(_)
            | StoreError::Timeout(_) => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }

    /// Conflicts are never partially applied, so the whole call can be re-issued.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        StoreError::ValidationError(message.into())
    }
}

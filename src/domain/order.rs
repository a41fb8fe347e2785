use super::catalog::Sku;
use super::ids::{OrderId, SkuId, UserId};
use super::money::{Price, Quantity};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    NotPaid,
    ReadyToShip,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Forward moves along the fulfilment chain, plus cancellation before shipping.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (NotPaid, ReadyToShip)
                | (ReadyToShip, Shipped)
                | (Shipped, Delivered)
                | (NotPaid, Canceled)
                | (ReadyToShip, Canceled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::NotPaid => "Not Paid",
            OrderStatus::ReadyToShip => "Ready to Ship",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Canceled => "Canceled",
        };
        f.write_str(label)
    }
}

/// A frozen copy of one purchased line.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct OrderLine {
    pub sku_id: SkuId,
    pub quantity: Quantity,
    /// SKU price at the moment of checkout.
    pub unit_price: Price,
    pub line_total: Price,
}

impl OrderLine {
    pub fn snapshot(sku: &Sku, quantity: Quantity) -> Result<Self, StoreError> {
        Ok(Self {
            sku_id: sku.id,
            quantity,
            unit_price: sku.price,
            line_total: sku.price.times(quantity)?,
        })
    }
}

/// The result of a successful checkout.
///
/// Only `status` (and `updated_at`) ever change after creation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_price: Price,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Fails if the line totals add up past the maximum price.
    pub fn place(user_id: UserId, lines: Vec<OrderLine>) -> Result<Self, StoreError> {
        let total_price = Price::total(lines.iter().map(|line| line.line_total))?;
        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::NotPaid,
            total_price,
            lines,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn transition(&mut self, next: OrderStatus) -> Result<(), StoreError> {
        if !self.status.can_transition_to(next) {
            return Err(StoreError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

use super::ids::{CartId, CartLineId, SkuId, UserId};
use super::money::Quantity;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct CartLine {
    pub id: CartLineId,
    pub sku_id: SkuId,
    pub quantity: Quantity,
}

/// A user's shopping cart.
///
/// Holds at most one line per SKU: adding a SKU that is already present
/// grows the existing line instead of appending a duplicate.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    /// Bumped by the store on every write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            lines: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, line_id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == line_id)
    }

    pub fn line_for_sku(&self, sku_id: SkuId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.sku_id == sku_id)
    }

    /// Adds `quantity` of `sku_id`, merging into an existing line if there is one.
    pub fn add_line(&mut self, sku_id: SkuId, quantity: Quantity) -> Result<CartLine, StoreError> {
        if let Some(line) = self.lines.iter_mut().find(|line| line.sku_id == sku_id) {
            line.quantity = line.quantity.checked_add(quantity)?;
            return Ok(line.clone());
        }

        let line = CartLine {
            id: CartLineId::new(),
            sku_id,
            quantity,
        };
        self.lines.push(line.clone());
        Ok(line)
    }

    /// Replaces the quantity of an existing line.
    pub fn update_line(
        &mut self,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<CartLine, StoreError> {
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or(StoreError::LineNotFound(line_id))?;
        line.quantity = quantity;
        Ok(line.clone())
    }

    pub fn remove_line(&mut self, line_id: CartLineId) -> Result<CartLine, StoreError> {
        let index = self
            .lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or(StoreError::LineNotFound(line_id))?;
        Ok(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(value: u32) -> Quantity {
        Quantity::new(value).unwrap()
    }

    #[test]
    fn test_add_line_merges_same_sku() {
        let mut cart = Cart::new(UserId(1));
        let first = cart.add_line(SkuId(7), qty(2)).unwrap();
        let second = cart.add_line(SkuId(7), qty(3)).unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(cart.lines[0].quantity, qty(5));
    }

    #[test]
    fn test_add_line_distinct_skus() {
        let mut cart = Cart::new(UserId(1));
        cart.add_line(SkuId(1), qty(1)).unwrap();
        cart.add_line(SkuId(2), qty(1)).unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert!(cart.line_for_sku(SkuId(2)).is_some());
    }

    #[test]
    fn test_update_line_replaces_quantity() {
        let mut cart = Cart::new(UserId(1));
        let line = cart.add_line(SkuId(1), qty(4)).unwrap();
        let updated = cart.update_line(line.id, qty(1)).unwrap();
        assert_eq!(updated.quantity, qty(1));
        assert_eq!(cart.line(line.id).unwrap().quantity, qty(1));
    }

    #[test]
    fn test_unknown_line() {
        let mut cart = Cart::new(UserId(1));
        let missing = CartLineId::new();
        assert!(matches!(
            cart.update_line(missing, qty(1)),
            Err(StoreError::LineNotFound(id)) if id == missing
        ));
        assert!(matches!(
            cart.remove_line(missing),
            Err(StoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new(UserId(1));
        let line = cart.add_line(SkuId(1), qty(1)).unwrap();
        cart.add_line(SkuId(2), qty(1)).unwrap();

        cart.remove_line(line.id).unwrap();
        assert_eq!(cart.lines.len(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }
}

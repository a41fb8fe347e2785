use super::retry::{RetryPolicy, retry_on_conflict};
use crate::config::CheckoutConfig;
use crate::domain::ids::{CartId, SkuId, UserId};
use crate::domain::money::Quantity;
use crate::domain::order::{Order, OrderLine};
use crate::domain::ports::{
    CartStoreRef, CatalogStoreRef, CheckoutCommit, CheckoutLedgerRef, StockReservation, Stores,
};
use crate::error::{Result, StoreError};
use std::collections::BTreeMap;
use std::time::Duration;

/// Turns a cart into an order.
///
/// Each attempt reads the cart and every SKU it references fresh, validates
/// stock, snapshots prices into order lines and hands the whole change to the
/// store's [`CheckoutLedger`](crate::domain::ports::CheckoutLedger) as one
/// commit. The ledger refuses the commit if anything it read has moved since;
/// the engine then starts over from a fresh read. No state survives a failed
/// attempt, so every error leaves stock, cart and orders untouched.
pub struct CheckoutEngine {
    catalog: CatalogStoreRef,
    carts: CartStoreRef,
    ledger: CheckoutLedgerRef,
    retry: RetryPolicy,
    timeout: Duration,
}

impl CheckoutEngine {
    pub fn new(stores: &Stores, config: &CheckoutConfig) -> Self {
        Self {
            catalog: stores.catalog.clone(),
            carts: stores.carts.clone(),
            ledger: stores.ledger.clone(),
            retry: config.retry_policy(),
            timeout: config.timeout(),
        }
    }

    /// Checks out `cart_id` on behalf of `user_id`.
    ///
    /// A cart owned by someone else is reported as `CartNotFound`.
    pub async fn checkout(&self, user_id: UserId, cart_id: CartId) -> Result<Order> {
        let attempts = retry_on_conflict(self.retry, "checkout", move |_| {
            self.try_checkout(user_id, cart_id)
        });

        match tokio::time::timeout(self.timeout, attempts).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%user_id, %cart_id, timeout = ?self.timeout, "checkout timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    async fn try_checkout(&self, user_id: UserId, cart_id: CartId) -> Result<Order> {
        let cart = self
            .carts
            .cart(cart_id)
            .await?
            .filter(|cart| cart.user_id == user_id)
            .ok_or(StoreError::CartNotFound(cart_id))?;

        if cart.is_empty() {
            return Err(StoreError::CartEmpty(cart_id));
        }

        // Grouped by SKU so that the ledger sees one reservation per row,
        // in a stable order.
        let mut requested: BTreeMap<SkuId, Quantity> = BTreeMap::new();
        for line in &cart.lines {
            let total = match requested.get(&line.sku_id) {
                Some(quantity) => quantity.checked_add(line.quantity)?,
                None => line.quantity,
            };
            requested.insert(line.sku_id, total);
        }

        let mut reservations = Vec::with_capacity(requested.len());
        let mut skus = BTreeMap::new();
        for (&sku_id, &quantity) in &requested {
            let sku = self
                .catalog
                .sku(sku_id)
                .await?
                .ok_or(StoreError::SkuNotFound(sku_id))?;
            sku.ensure_available(quantity)?;

            reservations.push(StockReservation {
                sku_id,
                quantity,
                expected_version: sku.version,
            });
            skus.insert(sku_id, sku);
        }

        let mut lines = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let sku = skus
                .get(&line.sku_id)
                .ok_or(StoreError::SkuNotFound(line.sku_id))?;
            lines.push(OrderLine::snapshot(sku, line.quantity)?);
        }
        let order = Order::place(user_id, lines)?;

        self.ledger
            .commit(CheckoutCommit {
                cart_id,
                expected_cart_version: cart.version,
                reservations,
                order: order.clone(),
            })
            .await?;

        tracing::info!(
            %user_id,
            %cart_id,
            order_id = %order.id,
            lines = order.lines.len(),
            total = %order.total_price,
            "checkout committed"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::Cart;
    use crate::domain::catalog::Sku;
    use crate::domain::ids::ProductId;
    use crate::domain::money::{MAX_PRICE, Price};
    use crate::domain::order::OrderStatus;
    use crate::domain::ports::CheckoutLedger;
    use crate::error::Record;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn setup(skus: &[(u64, rust_decimal::Decimal, u32)]) -> (Stores, CheckoutEngine) {
        let stores = Stores::from_backend(InMemoryStore::new());
        for &(id, price, available) in skus {
            let sku = Sku::new(SkuId(id), ProductId(id), "M", Price::new(price).unwrap(), available)
                .unwrap();
            stores.catalog.save_sku(sku).await.unwrap();
        }
        let engine = CheckoutEngine::new(&stores, &CheckoutConfig::default());
        (stores, engine)
    }

    async fn cart_with(stores: &Stores, user: UserId, lines: &[(u64, u32)]) -> Cart {
        let (mut cart, _) = stores.carts.find_or_create_cart(user).await.unwrap();
        for &(sku, quantity) in lines {
            cart.add_line(SkuId(sku), Quantity::new(quantity).unwrap())
                .unwrap();
        }
        stores.carts.save_cart(cart).await.unwrap()
    }

    #[tokio::test]
    async fn test_checkout_scenario() {
        let (stores, engine) = setup(&[(1, dec!(10.00), 5), (2, dec!(5.00), 3)]).await;
        let cart = cart_with(&stores, UserId(1), &[(1, 2), (2, 1)]).await;

        let order = engine.checkout(UserId(1), cart.id).await.unwrap();

        assert_eq!(order.total_price, Price::new(dec!(25.00)).unwrap());
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.status, OrderStatus::NotPaid);
        assert_eq!(stores.catalog.sku(SkuId(1)).await.unwrap().unwrap().available, 3);
        assert_eq!(stores.catalog.sku(SkuId(2)).await.unwrap().unwrap().available, 2);
        assert!(stores.carts.cart(cart.id).await.unwrap().unwrap().is_empty());
        assert_eq!(stores.orders.order(order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let (stores, engine) = setup(&[(1, dec!(10.00), 5), (2, dec!(5.00), 1)]).await;
        let cart = cart_with(&stores, UserId(1), &[(1, 2), (2, 2)]).await;

        let result = engine.checkout(UserId(1), cart.id).await;

        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock {
                sku: SkuId(2),
                requested: 2,
                available: 1
            })
        ));
        assert_eq!(stores.catalog.sku(SkuId(1)).await.unwrap().unwrap().available, 5);
        assert_eq!(stores.catalog.sku(SkuId(2)).await.unwrap().unwrap().available, 1);
        assert_eq!(stores.carts.cart(cart.id).await.unwrap().unwrap().lines.len(), 2);
        assert!(stores.orders.orders_for_user(UserId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_total_past_maximum_price_is_rejected() {
        let (stores, engine) = setup(&[(1, MAX_PRICE, 5)]).await;
        let cart = cart_with(&stores, UserId(1), &[(1, 2)]).await;

        let result = engine.checkout(UserId(1), cart.id).await;

        assert!(matches!(result, Err(StoreError::ValidationError(_))));
        assert_eq!(stores.catalog.sku(SkuId(1)).await.unwrap().unwrap().available, 5);
        assert_eq!(stores.carts.cart(cart.id).await.unwrap().unwrap().lines.len(), 1);
        assert!(stores.orders.orders_for_user(UserId(1)).await.unwrap().is_empty());
    }

    /// A ledger that loses every version check.
    struct ContendedLedger;

    #[async_trait::async_trait]
    impl CheckoutLedger for ContendedLedger {
        async fn commit(&self, commit: CheckoutCommit) -> Result<()> {
            Err(StoreError::ConcurrentModification(Record::Cart(commit.cart_id)))
        }
    }

    #[tokio::test]
    async fn test_endless_conflicts_time_out() {
        let (stores, _) = setup(&[(1, dec!(10.00), 5)]).await;
        let cart = cart_with(&stores, UserId(1), &[(1, 2)]).await;
        let contended = Stores {
            ledger: Arc::new(ContendedLedger),
            ..stores.clone()
        };
        let config = CheckoutConfig {
            max_attempts: u32::MAX,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            timeout_ms: 50,
        };
        let engine = CheckoutEngine::new(&contended, &config);

        let result = engine.checkout(UserId(1), cart.id).await;

        let Err(error) = result else {
            panic!("checkout should not succeed against a contended ledger");
        };
        assert!(matches!(error, StoreError::Timeout(d) if d == Duration::from_millis(50)));
        assert!(error.is_retryable());
        assert_eq!(stores.catalog.sku(SkuId(1)).await.unwrap().unwrap().available, 5);
        let stored = stores.carts.cart(cart.id).await.unwrap().unwrap();
        assert_eq!(stored.lines.len(), 1);
        assert_eq!(stored.version, cart.version);
        assert!(stores.orders.orders_for_user(UserId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let (stores, engine) = setup(&[]).await;
        let (cart, _) = stores.carts.find_or_create_cart(UserId(1)).await.unwrap();

        let result = engine.checkout(UserId(1), cart.id).await;
        assert!(matches!(result, Err(StoreError::CartEmpty(id)) if id == cart.id));
    }

    #[tokio::test]
    async fn test_foreign_or_missing_cart() {
        let (stores, engine) = setup(&[(1, dec!(1.00), 5)]).await;
        let cart = cart_with(&stores, UserId(1), &[(1, 1)]).await;

        let foreign = engine.checkout(UserId(2), cart.id).await;
        assert!(matches!(foreign, Err(StoreError::CartNotFound(_))));

        let missing = engine.checkout(UserId(1), CartId::new()).await;
        assert!(matches!(missing, Err(StoreError::CartNotFound(_))));
        assert_eq!(stores.catalog.sku(SkuId(1)).await.unwrap().unwrap().available, 5);
    }

    #[tokio::test]
    async fn test_missing_sku() {
        let (stores, engine) = setup(&[]).await;
        let cart = cart_with(&stores, UserId(1), &[(42, 1)]).await;

        let result = engine.checkout(UserId(1), cart.id).await;
        assert!(matches!(result, Err(StoreError::SkuNotFound(SkuId(42)))));
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_reprice() {
        let (stores, engine) = setup(&[(1, dec!(10.00), 5)]).await;
        let cart = cart_with(&stores, UserId(1), &[(1, 1)]).await;
        let order = engine.checkout(UserId(1), cart.id).await.unwrap();

        let mut sku = stores.catalog.sku(SkuId(1)).await.unwrap().unwrap();
        sku.price = Price::new(dec!(12.50)).unwrap();
        stores.catalog.save_sku(sku).await.unwrap();

        let stored = stores.orders.order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.lines[0].unit_price, Price::new(dec!(10.00)).unwrap());
        assert_eq!(stored.total_price, Price::new(dec!(10.00)).unwrap());
    }

    #[tokio::test]
    async fn test_cart_is_reusable_after_checkout() {
        let (stores, engine) = setup(&[(1, dec!(3.00), 10)]).await;
        let cart = cart_with(&stores, UserId(1), &[(1, 2)]).await;
        engine.checkout(UserId(1), cart.id).await.unwrap();

        let again = cart_with(&stores, UserId(1), &[(1, 1)]).await;
        assert_eq!(again.id, cart.id);
        engine.checkout(UserId(1), cart.id).await.unwrap();

        assert_eq!(stores.catalog.sku(SkuId(1)).await.unwrap().unwrap().available, 7);
        assert_eq!(stores.orders.orders_for_user(UserId(1)).await.unwrap().len(), 2);
    }
}

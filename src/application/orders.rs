use crate::domain::ids::{OrderId, UserId};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::ports::{OrderStoreRef, Stores};
use crate::error::{Result, StoreError};

/// Read access to placed orders and their status lifecycle.
pub struct OrderService {
    orders: OrderStoreRef,
}

impl OrderService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            orders: stores.orders.clone(),
        }
    }

    /// Newest first.
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders = self.orders.orders_for_user(user_id).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// An order owned by someone else is reported as `OrderNotFound`.
    pub async fn order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        self.orders
            .order(order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    pub async fn advance(&self, order_id: OrderId, next: OrderStatus) -> Result<Order> {
        let mut order = self
            .orders
            .order(order_id)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))?;
        let current = order.status;
        order.transition(next)?;

        let order = self.orders.replace_status(order_id, current, next).await?;
        tracing::info!(%order_id, from = %current, to = %next, "order status changed");
        Ok(order)
    }

    /// Cancels an order that has not shipped yet. Stock is not returned.
    pub async fn cancel(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        self.order(user_id, order_id).await?;
        self.advance(order_id, OrderStatus::Canceled).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CheckoutCommit;
    use crate::error::Record;
    use crate::infrastructure::in_memory::InMemoryStore;

    async fn placed(stores: &Stores, user_id: UserId) -> Order {
        let (cart, _) = stores.carts.find_or_create_cart(user_id).await.unwrap();
        let order = Order::place(user_id, Vec::new()).unwrap();
        stores
            .ledger
            .commit(CheckoutCommit {
                cart_id: cart.id,
                expected_cart_version: cart.version,
                reservations: Vec::new(),
                order: order.clone(),
            })
            .await
            .unwrap();
        order
    }

    #[tokio::test]
    async fn test_advance_through_fulfilment() {
        let stores = Stores::from_backend(InMemoryStore::new());
        let service = OrderService::new(&stores);
        let order = placed(&stores, UserId(1)).await;

        service.advance(order.id, OrderStatus::ReadyToShip).await.unwrap();
        let shipped = service.advance(order.id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        let result = service.cancel(UserId(1), order.id).await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidStatusTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Canceled
            })
        ));
    }

    #[tokio::test]
    async fn test_cancel_checks_ownership() {
        let stores = Stores::from_backend(InMemoryStore::new());
        let service = OrderService::new(&stores);
        let order = placed(&stores, UserId(1)).await;

        assert!(matches!(
            service.cancel(UserId(2), order.id).await,
            Err(StoreError::OrderNotFound(_))
        ));
        let canceled = service.cancel(UserId(1), order.id).await.unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled);
        assert_eq!(canceled.lines, order.lines);
        assert_eq!(canceled.total_price, order.total_price);
    }

    #[tokio::test]
    async fn test_stale_status_is_rejected_by_store() {
        let stores = Stores::from_backend(InMemoryStore::new());
        let order = placed(&stores, UserId(1)).await;

        stores
            .orders
            .replace_status(order.id, OrderStatus::NotPaid, OrderStatus::ReadyToShip)
            .await
            .unwrap();
        let result = stores
            .orders
            .replace_status(order.id, OrderStatus::NotPaid, OrderStatus::Canceled)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::ConcurrentModification(Record::Order(id))) if id == order.id
        ));
    }

    #[tokio::test]
    async fn test_orders_for_user() {
        let stores = Stores::from_backend(InMemoryStore::new());
        let service = OrderService::new(&stores);
        let first = placed(&stores, UserId(1)).await;
        let second = placed(&stores, UserId(1)).await;
        placed(&stores, UserId(2)).await;

        let orders = service.orders_for_user(UserId(1)).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().any(|o| o.id == first.id));
        assert!(orders.iter().any(|o| o.id == second.id));
        assert!(orders[0].created_at >= orders[1].created_at);
        assert!(matches!(
            service.order(UserId(1), OrderId::new()).await,
            Err(StoreError::OrderNotFound(_))
        ));
    }
}

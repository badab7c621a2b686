use crate::config::ServiceConfig;
use crate::domain::order::{Order, OrderId, OrderItem, OrderStatus, validate_user_id};
use crate::domain::ports::{OrderPage, OrderStoreRef};
use crate::domain::time::Timestamp;
use crate::error::{OrderError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Upper bound for every store call.
    pub store_timeout: Duration,
    pub max_page_size: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        (&ServiceConfig::default()).into()
    }
}

impl From<&ServiceConfig> for LifecycleSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            store_timeout: config.timeouts.store(),
            max_page_size: config.pagination.max_page_size,
        }
    }
}

/// The order state machine and its business rules.
///
/// `OrderLifecycle` is the only component that creates orders, stamps
/// timestamps and changes statuses. Every status change goes through
/// [`OrderLifecycle::apply_transition`], which validates the edge, checks the
/// expected prior status and persists with a conditional replace, so two
/// writers racing from the same status cannot both succeed.
pub struct OrderLifecycle {
    store: OrderStoreRef,
    settings: LifecycleSettings,
}

impl OrderLifecycle {
    pub fn new(store: OrderStoreRef, settings: LifecycleSettings) -> Self {
        Self { store, settings }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.settings.store_timeout, call).await?
    }

    /// Creates a `pending` order and persists it.
    pub async fn create_order(&self, user_id: &str, items: Vec<OrderItem>) -> Result<Order> {
        let order = Order::create(user_id, items, Timestamp::now())?;
        self.bounded(self.store.save(&order)).await?;

        info!(
            order_id = %order.id(),
            user_id = %order.user_id(),
            total = %order.total_amount(),
            items = order.items().len(),
            "Order created"
        );
        Ok(order)
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.bounded(self.store.find_by_id(id)).await
    }

    pub async fn list_orders(&self, user_id: &str, page: u32, page_size: u32) -> Result<OrderPage> {
        validate_user_id(user_id)?;
        if page < 1 {
            return Err(OrderError::invalid("page must be at least 1"));
        }
        if page_size < 1 {
            return Err(OrderError::invalid("page size must be at least 1"));
        }
        if page_size > self.settings.max_page_size {
            return Err(OrderError::invalid(format!(
                "page size must not exceed {}",
                self.settings.max_page_size
            )));
        }

        let result = self
            .bounded(self.store.find_by_user(user_id, page, page_size))
            .await?;
        debug!(
            user_id,
            page,
            page_size,
            returned = result.orders.len(),
            total = result.total,
            "Listed orders"
        );
        Ok(result)
    }

    /// Moves order `id` from `from` to `to`.
    ///
    /// `mutate` may adjust the order (for example attach a payment) before the
    /// status is changed and `updated_at` is stamped. Nothing is written unless
    /// the edge is allowed, the order is currently in `from`, and it is still
    /// in `from` at the moment of the write.
    pub async fn apply_transition<F>(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        mutate: F,
    ) -> Result<Order>
    where
        F: FnOnce(&mut Order) -> Result<()> + Send,
    {
        if !from.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from, to });
        }

        let current = self.get_order(id).await?;
        if current.status() != from {
            return Err(OrderError::StatusPrecondition {
                order_id: id,
                expected: from,
                actual: current.status(),
            });
        }

        let mut next = current;
        mutate(&mut next)?;
        next.transition_to(to, Timestamp::now())?;

        self.bounded(self.store.replace(&next, from)).await?;

        info!(order_id = %id, %from, %to, "Order transitioned");
        Ok(next)
    }

    /// Cancels a pending order. Orders are never physically removed.
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        self.apply_transition(id, OrderStatus::Pending, OrderStatus::Cancelled, |_| Ok(()))
            .await
    }

    pub async fn ping(&self) -> Result<()> {
        self.bounded(self.store.ping()).await
    }
}

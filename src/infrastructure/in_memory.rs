use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::ports::{OrderPage, OrderStore, page_offset};
use crate::error::{OrderError, Result};
use crate::infrastructure::record::OrderRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory order store.
///
/// Uses `Arc<RwLock<HashMap<OrderId, OrderRecord>>>` so clones share the same
/// data. The status check and the write of [`OrderStore::replace`] happen under
/// a single write guard. Ideal for testing or single-process runs.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id()) {
            return Err(OrderError::Conflict(format!(
                "order {} already exists",
                order.id()
            )));
        }
        orders.insert(order.id(), OrderRecord::from(order));
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Order> {
        let orders = self.orders.read().await;
        let record = orders
            .get(&id)
            .cloned()
            .ok_or_else(|| OrderError::NotFound(id.to_string()))?;
        Order::try_from(record)
    }

    async fn find_by_user(&self, user_id: &str, page: u32, page_size: u32) -> Result<OrderPage> {
        let orders = self.orders.read().await;
        let mut matching: Vec<&OrderRecord> =
            orders.values().filter(|r| r.user_id == user_id).collect();
        // Canonical timestamps sort lexically.
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(page_offset(page, page_size)).unwrap_or(usize::MAX);
        let orders = matching
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .map(Order::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderPage { orders, total })
    }

    async fn replace(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id())
            .ok_or_else(|| OrderError::NotFound(order.id().to_string()))?;

        let actual: OrderStatus = stored.status.parse()?;
        if actual != expected {
            return Err(OrderError::StatusPrecondition {
                order_id: order.id(),
                expected,
                actual,
            });
        }
        let record = OrderRecord::from(order);
        if stored.user_id != record.user_id || stored.created_at != record.created_at {
            return Err(OrderError::invalid(format!(
                "order {} owner and creation time are immutable",
                record.id
            )));
        }
        *stored = record;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

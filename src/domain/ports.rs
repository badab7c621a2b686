use super::order::{Order, OrderId, OrderStatus};
use super::payment::{Authorization, AuthorizationRequest};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One page of a user's orders plus the number of orders the user has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
}

/// Number of orders skipped before a 1-indexed page.
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(page_size)
}

/// Persistence contract for orders.
///
/// Implementations never create ids, timestamps or statuses; they store and
/// return what the lifecycle hands them.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order. Fails with `Conflict` if the id is taken.
    async fn save(&self, order: &Order) -> Result<()>;

    /// Fails with `NotFound` if no order has this id.
    async fn find_by_id(&self, id: OrderId) -> Result<Order>;

    /// Orders of `user_id`, newest first. `page` is 1-indexed; a page past the
    /// end is empty, not an error.
    async fn find_by_user(&self, user_id: &str, page: u32, page_size: u32) -> Result<OrderPage>;

    /// Atomically overwrites the stored order if, and only if, its stored
    /// status is still `expected`. Fails with `NotFound` for an unknown id and
    /// with `StatusPrecondition` when another writer got there first.
    async fn replace(&self, order: &Order, expected: OrderStatus) -> Result<()>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

/// External payment processor.
#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization>;
}

pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type PaymentAuthorizerRef = Arc<dyn PaymentAuthorizer>;

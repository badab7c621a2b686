#![allow(dead_code)]

use async_trait::async_trait;
use ordersvc::application::service::OrderService;
use ordersvc::config::ServiceConfig;
use ordersvc::domain::order::{Order, OrderId, OrderStatus};
use ordersvc::domain::payment::{Authorization, AuthorizationRequest};
use ordersvc::domain::ports::{OrderPage, OrderStore, PaymentAuthorizer};
use ordersvc::error::{OrderError, Result};
use ordersvc::infrastructure::in_memory::InMemoryOrderStore;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::NamedTempFile;

/// In-memory store that counts writes and can be told to fail or stall
/// `replace`.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryOrderStore,
    pub saves: AtomicUsize,
    pub replaces: AtomicUsize,
    pub fail_replace: AtomicBool,
    pub replace_delay_ms: AtomicU64,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_replace() -> Arc<Self> {
        let store = Self::default();
        store.fail_replace.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn slow_replace(delay: Duration) -> Arc<Self> {
        let store = Self::default();
        store
            .replace_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn replaces(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for CountingStore {
    async fn save(&self, order: &Order) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(order).await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Order> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_user(&self, user_id: &str, page: u32, page_size: u32) -> Result<OrderPage> {
        self.inner.find_by_user(user_id, page, page_size).await
    }

    async fn replace(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        let delay = self.replace_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(OrderError::Unavailable("store went away".to_string()));
        }
        self.inner.replace(order, expected).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Approve,
    Decline,
    Fail,
    Delay(Duration),
}

/// Authorizer with a fixed answer. Approvals reuse one reference per
/// idempotency key, like a real processor would.
pub struct ScriptedAuthorizer {
    behavior: Behavior,
    pub calls: AtomicUsize,
}

impl ScriptedAuthorizer {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentAuthorizer for ScriptedAuthorizer {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let approved = Authorization {
            authorized: true,
            reference: format!("ref-{}", request.idempotency_key),
        };
        match self.behavior {
            Behavior::Approve => Ok(approved),
            Behavior::Decline => Ok(Authorization {
                authorized: false,
                reference: "declined".to_string(),
            }),
            Behavior::Fail => Err(OrderError::Unavailable("processor offline".to_string())),
            Behavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(approved)
            }
        }
    }
}

pub fn service(store: Arc<CountingStore>, authorizer: Arc<ScriptedAuthorizer>) -> OrderService {
    OrderService::new(store, authorizer, &ServiceConfig::default())
}

pub fn service_with_config(
    store: Arc<CountingStore>,
    authorizer: Arc<ScriptedAuthorizer>,
    config: &ServiceConfig,
) -> OrderService {
    OrderService::new(store, authorizer, config)
}

/// Writes a JSON-lines request script to a temporary file.
pub fn write_script(lines: &[&str]) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    file.flush()?;
    Ok(file)
}

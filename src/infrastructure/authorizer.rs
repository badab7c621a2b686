use crate::domain::payment::{Authorization, AuthorizationRequest};
use crate::domain::ports::PaymentAuthorizer;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Stand-in for a payment processor that approves every request.
///
/// Answers are remembered per idempotency key, so a repeated request gets the
/// same reference back instead of a second authorization.
#[derive(Default, Clone)]
pub struct SimulatedAuthorizer {
    issued: Arc<Mutex<HashMap<String, Authorization>>>,
}

impl SimulatedAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct authorizations handed out.
    pub async fn issued(&self) -> usize {
        self.issued.lock().await.len()
    }
}

#[async_trait]
impl PaymentAuthorizer for SimulatedAuthorizer {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization> {
        let mut issued = self.issued.lock().await;
        let authorization = issued
            .entry(request.idempotency_key.clone())
            .or_insert_with(|| Authorization {
                authorized: true,
                reference: format!("auth_{}", Uuid::new_v4().simple()),
            })
            .clone();
        debug!(
            key = %request.idempotency_key,
            method = %request.method,
            card = %request.credentials.masked_card_number(),
            reference = %authorization.reference,
            "Simulated authorization"
        );
        Ok(authorization)
    }
}

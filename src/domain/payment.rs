use crate::domain::money::Money;
use crate::domain::order::OrderId;
use crate::domain::time::Timestamp;
use crate::error::{OrderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PAYMENT_SUCCESS: &str = "success";

/// Name of the payment instrument, e.g. `card`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentMethod(String);

impl PaymentMethod {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(OrderError::invalid("payment method must not be empty"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        method.0
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Method-specific secrets. Passed to the authorizer, never persisted.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaymentCredentials {
    pub card_number: String,
    pub card_holder: String,
    pub expiry_date: String,
    pub cvv: String,
}

impl PaymentCredentials {
    pub fn masked_card_number(&self) -> String {
        let digits: Vec<char> = self.card_number.chars().filter(|c| c.is_ascii_digit()).collect();
        let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
        format!("****{}", tail)
    }
}

impl fmt::Debug for PaymentCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentCredentials")
            .field("card_number", &self.masked_card_number())
            .field("card_holder", &self.card_holder)
            .field("expiry_date", &"**/**")
            .field("cvv", &"***")
            .finish()
    }
}

/// A request to pay for an order. Ephemeral; only the resulting
/// [`PaymentRecord`] is stored, on the order itself.
#[derive(Debug, Clone)]
pub struct Payment {
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub credentials: PaymentCredentials,
}

/// What the authorizer is asked to approve.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub idempotency_key: String,
    pub method: PaymentMethod,
    pub credentials: PaymentCredentials,
    pub amount: Money,
}

impl AuthorizationRequest {
    /// Builds the request for a payment. The key depends only on the order and
    /// the amount, so retries and racing attempts share it.
    pub fn for_payment(payment: &Payment) -> Self {
        Self {
            idempotency_key: format!("order-{}-{}", payment.order_id, payment.amount),
            method: payment.method.clone(),
            credentials: payment.credentials.clone(),
            amount: payment.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub authorized: bool,
    pub reference: String,
}

/// Settled payment attached to a paid order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub authorization_ref: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub paid_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub status: String,
}

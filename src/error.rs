use crate::domain::order::{OrderId, OrderStatus};
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrderError>;

#[derive(Error, Diagnostic, Debug)]
pub enum OrderError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(code(ordersvc::invalid_argument))]
    InvalidArgument(String),

    #[error("Order not found: {0}")]
    #[diagnostic(code(ordersvc::not_found))]
    NotFound(String),

    #[error("Conflict: {0}")]
    #[diagnostic(code(ordersvc::conflict), help("the request can be retried"))]
    Conflict(String),

    #[error("Invalid transition from {from} to {to}")]
    #[diagnostic(code(ordersvc::invalid_state))]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {order_id} is {actual}, expected {expected}")]
    #[diagnostic(code(ordersvc::invalid_state))]
    StatusPrecondition {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error("Payment declined by authorizer (reference {reference})")]
    #[diagnostic(code(ordersvc::payment_declined))]
    PaymentDeclined { reference: String },

    /// The authorizer captured funds but the order could not be marked paid.
    #[error(
        "Payment {payment_id} authorized ({authorization_ref}) but order {order_id} was not updated: {source}"
    )]
    #[diagnostic(
        code(ordersvc::post_authorization_persist_failure),
        severity(Error),
        help("reconcile the authorization manually; do not retry the payment")
    )]
    PostAuthorizationPersistFailure {
        order_id: OrderId,
        payment_id: String,
        authorization_ref: String,
        #[source]
        source: Box<OrderError>,
    },

    #[error("Unavailable: {0}")]
    #[diagnostic(code(ordersvc::unavailable), help("the request can be retried"))]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(ordersvc::config))]
    Config(String),

    #[error("CSV error: {0}")]
    #[diagnostic(code(ordersvc::csv))]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(ordersvc::io))]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(ordersvc::internal))]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

/// Closed classification of [`OrderError`] for transport adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    InvalidState,
    PaymentDeclined,
    PostAuthorizationPersistFailure,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::PaymentDeclined => "payment_declined",
            ErrorKind::PostAuthorizationPersistFailure => "post_authorization_persist_failure",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::PaymentDeclined => 402,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict | ErrorKind::InvalidState => 409,
            ErrorKind::PostAuthorizationPersistFailure | ErrorKind::Internal => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    /// gRPC status code name.
    pub fn rpc_code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "ABORTED",
            ErrorKind::InvalidState | ErrorKind::PaymentDeclined => "FAILED_PRECONDITION",
            ErrorKind::PostAuthorizationPersistFailure => "DATA_LOSS",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Unavailable | ErrorKind::Conflict)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::InvalidArgument(_) | OrderError::Config(_) => ErrorKind::InvalidArgument,
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::Conflict(_) => ErrorKind::Conflict,
            OrderError::InvalidTransition { .. } | OrderError::StatusPrecondition { .. } => {
                ErrorKind::InvalidState
            }
            OrderError::PaymentDeclined { .. } => ErrorKind::PaymentDeclined,
            OrderError::PostAuthorizationPersistFailure { .. } => {
                ErrorKind::PostAuthorizationPersistFailure
            }
            OrderError::Unavailable(_) => ErrorKind::Unavailable,
            OrderError::CsvError(_) | OrderError::IoError(_) | OrderError::InternalError(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        OrderError::InvalidArgument(message.into())
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        OrderError::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

impl From<tokio::time::error::Elapsed> for OrderError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        OrderError::Unavailable("operation timed out".to_string())
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(e: serde_json::Error) -> Self {
        OrderError::InternalError(Box::new(e))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for OrderError {
    fn from(e: rocksdb::Error) -> Self {
        OrderError::Unavailable(format!("RocksDB error: {}", e))
    }
}

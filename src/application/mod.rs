//! Application layer containing the order lifecycle orchestration.
//!
//! [`lifecycle::OrderLifecycle`] owns the state machine, [`payment::PaymentCoordinator`]
//! composes it with the external authorizer, and [`service::OrderService`] is
//! the façade transport adapters call.

pub mod lifecycle;
pub mod payment;
pub mod service;

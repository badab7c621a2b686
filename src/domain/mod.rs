//! Order entities, value objects and the ports the application layer talks to.

pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod time;

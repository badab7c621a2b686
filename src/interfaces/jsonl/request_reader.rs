use crate::application::service::{CreateOrderRequest, ListOrdersRequest, PaymentRequest};
use crate::error::{OrderError, Result};
use serde::Deserialize;
use std::io::BufRead;

/// One line of a request script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CreateOrder(CreateOrderRequest),
    GetOrder { order_id: String },
    ListOrders(ListOrdersRequest),
    ProcessPayment(PaymentRequest),
    CancelOrder { order_id: String },
}

/// Reads requests from a JSON-lines source.
///
/// Blank lines and lines starting with `#` are skipped. A line that does not
/// decode yields an `InvalidArgument` error naming the line, and reading
/// carries on with the next line.
pub struct RequestReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> RequestReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Lazily decodes requests, one per line.
    pub fn requests(self) -> impl Iterator<Item = Result<Request>> {
        self.source
            .lines()
            .enumerate()
            .filter_map(|(index, line)| match line {
                Err(e) => Some(Err(OrderError::from(e))),
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        return None;
                    }
                    Some(serde_json::from_str(trimmed).map_err(|e| {
                        OrderError::invalid(format!("line {}: {}", index + 1, e))
                    }))
                }
            })
    }
}

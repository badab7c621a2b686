use super::request_reader::Request;
use crate::application::service::OrderService;
use crate::error::{OrderError, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use tracing::warn;

/// Placeholder for the id of the most recently created order.
pub const LAST_ORDER: &str = "$last";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub code: &'static str,
    pub status: u16,
    pub message: String,
}

impl From<&OrderError> for ErrorBody {
    fn from(e: &OrderError) -> Self {
        let kind = e.kind();
        Self {
            kind: kind.as_str(),
            code: kind.rpc_code(),
            status: kind.http_status(),
            message: e.to_string(),
        }
    }
}

/// One line of output: `{"ok": ...}` or `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Ok(Value),
    Error(ErrorBody),
}

impl Response {
    fn from_result<T: Serialize>(result: Result<T>) -> Self {
        match result.and_then(|v| serde_json::to_value(v).map_err(OrderError::from)) {
            Ok(value) => Response::Ok(value),
            Err(e) => Response::Error(ErrorBody::from(&e)),
        }
    }
}

/// Feeds requests to an [`OrderService`] and writes one JSON line per request.
pub struct BatchRunner<'a> {
    service: &'a OrderService,
    last_order_id: Option<String>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(service: &'a OrderService) -> Self {
        Self {
            service,
            last_order_id: None,
        }
    }

    fn resolve(&self, order_id: String) -> String {
        match (&self.last_order_id, order_id.as_str()) {
            (Some(last), LAST_ORDER) => last.clone(),
            _ => order_id,
        }
    }

    pub async fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::CreateOrder(create) => {
                let result = self.service.create_order(create).await;
                if let Ok(view) = &result {
                    self.last_order_id = Some(view.id.clone());
                }
                Response::from_result(result)
            }
            Request::GetOrder { order_id } => {
                let order_id = self.resolve(order_id);
                Response::from_result(self.service.get_order(&order_id).await)
            }
            Request::ListOrders(list) => Response::from_result(self.service.list_orders(list).await),
            Request::ProcessPayment(mut payment) => {
                payment.order_id = self.resolve(payment.order_id);
                Response::from_result(self.service.process_payment(payment).await)
            }
            Request::CancelOrder { order_id } => {
                let order_id = self.resolve(order_id);
                Response::from_result(self.service.cancel_order(&order_id).await)
            }
        }
    }

    /// Processes every request, writing responses as they are produced.
    /// Undecodable lines become error responses; processing continues.
    pub async fn run<W: Write>(
        &mut self,
        requests: impl Iterator<Item = Result<Request>>,
        mut out: W,
    ) -> Result<usize> {
        let mut handled = 0;
        for request in requests {
            let response = match request {
                Ok(request) => self.handle(request).await,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable request");
                    Response::Error(ErrorBody::from(&e))
                }
            };
            serde_json::to_writer(&mut out, &response)?;
            writeln!(out)?;
            handled += 1;
        }
        out.flush()?;
        Ok(handled)
    }
}

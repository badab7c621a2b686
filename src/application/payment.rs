use crate::application::lifecycle::OrderLifecycle;
use crate::config::ServiceConfig;
use crate::domain::order::OrderStatus;
use crate::domain::payment::{
    AuthorizationRequest, PAYMENT_SUCCESS, Payment, PaymentReceipt, PaymentRecord,
};
use crate::domain::ports::PaymentAuthorizerRef;
use crate::domain::time::Timestamp;
use crate::error::{OrderError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Drives a payment: authorize externally, then mark the order paid.
///
/// Everything before the authorizer call is side-effect free, so any failure
/// up to and including a declined or unreachable authorizer leaves the order
/// `pending` and the caller may retry. Once the authorizer has approved, the
/// `pending -> paid` transition runs in its own task so it completes even if
/// the caller goes away; if it still fails, the error is
/// [`OrderError::PostAuthorizationPersistFailure`].
pub struct PaymentCoordinator {
    lifecycle: Arc<OrderLifecycle>,
    authorizer: PaymentAuthorizerRef,
    authorizer_timeout: Duration,
}

impl PaymentCoordinator {
    pub fn new(
        lifecycle: Arc<OrderLifecycle>,
        authorizer: PaymentAuthorizerRef,
        authorizer_timeout: Duration,
    ) -> Self {
        Self {
            lifecycle,
            authorizer,
            authorizer_timeout,
        }
    }

    pub fn from_config(
        lifecycle: Arc<OrderLifecycle>,
        authorizer: PaymentAuthorizerRef,
        config: &ServiceConfig,
    ) -> Self {
        Self::new(lifecycle, authorizer, config.timeouts.authorizer())
    }

    pub async fn process_payment(&self, payment: Payment) -> Result<PaymentReceipt> {
        let order = self.lifecycle.get_order(payment.order_id).await?;

        if payment.amount != order.total_amount() {
            return Err(OrderError::invalid(format!(
                "payment amount {} does not match order total {}",
                payment.amount,
                order.total_amount()
            )));
        }
        if order.status() != OrderStatus::Pending {
            return Err(OrderError::StatusPrecondition {
                order_id: order.id(),
                expected: OrderStatus::Pending,
                actual: order.status(),
            });
        }

        let payment_id = Uuid::new_v4().to_string();
        let request = AuthorizationRequest::for_payment(&payment);

        let authorization =
            match tokio::time::timeout(self.authorizer_timeout, self.authorizer.authorize(&request))
                .await
            {
                Ok(Ok(authorization)) => authorization,
                Ok(Err(e)) => {
                    warn!(order_id = %order.id(), error = %e, "Payment authorization failed");
                    return Err(e);
                }
                Err(_) => {
                    warn!(order_id = %order.id(), "Payment authorizer timed out");
                    return Err(OrderError::Unavailable(
                        "payment authorizer timed out".to_string(),
                    ));
                }
            };

        if !authorization.authorized {
            warn!(
                order_id = %order.id(),
                reference = %authorization.reference,
                "Payment declined"
            );
            return Err(OrderError::PaymentDeclined {
                reference: authorization.reference,
            });
        }

        let record = PaymentRecord {
            payment_id: payment_id.clone(),
            authorization_ref: authorization.reference.clone(),
            method: payment.method.clone(),
            amount: payment.amount,
            paid_at: Timestamp::now(),
        };
        let lifecycle = Arc::clone(&self.lifecycle);
        let order_id = order.id();

        // Detached from the caller: dropping this future must not cancel the write.
        let persist = tokio::spawn(async move {
            lifecycle
                .apply_transition(order_id, OrderStatus::Pending, OrderStatus::Paid, move |o| {
                    o.record_payment(record)
                })
                .await
        });
        let outcome = match persist.await {
            Ok(outcome) => outcome,
            Err(e) => Err(OrderError::internal(format!("persist task failed: {}", e))),
        };

        match outcome {
            Ok(_) => {
                info!(
                    order_id = %order_id,
                    payment_id = %payment_id,
                    reference = %authorization.reference,
                    "Payment processed"
                );
                Ok(PaymentReceipt {
                    payment_id,
                    status: PAYMENT_SUCCESS.to_string(),
                })
            }
            Err(source) => {
                error!(
                    order_id = %order_id,
                    payment_id = %payment_id,
                    reference = %authorization.reference,
                    error = %source,
                    "Payment authorized but order not marked paid; manual reconciliation required"
                );
                Err(OrderError::PostAuthorizationPersistFailure {
                    order_id,
                    payment_id,
                    authorization_ref: authorization.reference,
                    source: Box::new(source),
                })
            }
        }
    }
}

use ordersvc::application::service::{
    CreateOrderRequest, ItemRequest, OrderService, OrderView, PaymentRequest,
};
use ordersvc::config::ServiceConfig;
use ordersvc::domain::order::OrderStatus;
use ordersvc::domain::payment::PaymentCredentials;
use ordersvc::error::{ErrorKind, OrderError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{Behavior, CountingStore, ScriptedAuthorizer};

async fn pending_order(service: &OrderService) -> OrderView {
    service
        .create_order(CreateOrderRequest {
            user_id: "u1".to_string(),
            items: vec![ItemRequest {
                product_id: "p1".to_string(),
                quantity: 2,
                price: dec!(9.99),
            }],
        })
        .await
        .unwrap()
}

fn pay(order_id: &str, amount: Decimal) -> PaymentRequest {
    PaymentRequest {
        order_id: order_id.to_string(),
        amount,
        payment_method: "card".to_string(),
        credentials: PaymentCredentials {
            card_number: "4111111111111111".to_string(),
            card_holder: "A Buyer".to_string(),
            expiry_date: "12/30".to_string(),
            cvv: "123".to_string(),
        },
    }
}

#[tokio::test]
async fn test_create_then_pay() {
    let authorizer = ScriptedAuthorizer::new(Behavior::Approve);
    let service = common::service(CountingStore::new(), authorizer.clone());
    let order = pending_order(&service).await;
    assert_eq!(order.total_amount, dec!(19.98));

    let err = service
        .process_payment(pay(&order.id, dec!(20.00)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(authorizer.calls(), 0);

    let receipt = service
        .process_payment(pay(&order.id, dec!(19.98)))
        .await
        .unwrap();
    assert_eq!(receipt.status, "success");

    let paid = service.get_order(&order.id).await.unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.payment_id.as_deref(), Some(receipt.payment_id.as_str()));
    assert!(paid.updated_at >= order.updated_at);
    assert_eq!(paid.created_at, order.created_at);

    // Paid orders can no longer be cancelled.
    let err = service.cancel_order(&order.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_authorizer_problems_leave_order_pending() {
    let mut config = ServiceConfig::default();
    config.timeouts.authorizer_ms = 50;

    for (behavior, expected) in [
        (Behavior::Decline, ErrorKind::PaymentDeclined),
        (Behavior::Fail, ErrorKind::Unavailable),
        (
            Behavior::Delay(Duration::from_millis(500)),
            ErrorKind::Unavailable,
        ),
    ] {
        let store = CountingStore::new();
        let service =
            common::service_with_config(store.clone(), ScriptedAuthorizer::new(behavior), &config);
        let order = pending_order(&service).await;

        let err = service
            .process_payment(pay(&order.id, dec!(19.98)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), expected, "{:?}", behavior);

        let after = service.get_order(&order.id).await.unwrap();
        assert_eq!(after, order);
        assert_eq!(store.replaces(), 0);
    }
}

#[tokio::test]
async fn test_persist_failure_after_authorization() {
    let store = CountingStore::failing_replace();
    let authorizer = ScriptedAuthorizer::new(Behavior::Approve);
    let service = common::service(store.clone(), authorizer.clone());
    let order = pending_order(&service).await;

    let err = service
        .process_payment(pay(&order.id, dec!(19.98)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PostAuthorizationPersistFailure);
    assert!(!err.kind().is_retryable());
    assert_eq!(authorizer.calls(), 1);

    match err {
        OrderError::PostAuthorizationPersistFailure {
            authorization_ref,
            payment_id,
            source,
            ..
        } => {
            assert!(authorization_ref.starts_with("ref-order-"));
            assert!(!payment_id.is_empty());
            assert_eq!(source.kind(), ErrorKind::Unavailable);
        }
        other => panic!("unexpected error {:?}", other),
    }

    assert_eq!(
        service.get_order(&order.id).await.unwrap().status,
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn test_payment_completes_after_caller_goes_away() {
    let store = CountingStore::slow_replace(Duration::from_millis(200));
    let authorizer = ScriptedAuthorizer::new(Behavior::Approve);
    let service = Arc::new(common::service(store.clone(), authorizer.clone()));
    let order = pending_order(&service).await;

    let caller = {
        let service = Arc::clone(&service);
        let id = order.id.clone();
        tokio::spawn(async move { service.process_payment(pay(&id, dec!(19.98))).await })
    };

    // Wait until the authorizer has approved and the write is in flight.
    while store.replaces() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());
    assert_eq!(authorizer.calls(), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let paid = service.get_order(&order.id).await.unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert!(paid.payment_id.is_some());
}

#[tokio::test]
async fn test_concurrent_payments_settle_once() {
    let authorizer = ScriptedAuthorizer::new(Behavior::Delay(Duration::from_millis(50)));
    let service = Arc::new(common::service(CountingStore::new(), authorizer.clone()));
    let order = pending_order(&service).await;

    let first = {
        let service = Arc::clone(&service);
        let id = order.id.clone();
        tokio::spawn(async move { service.process_payment(pay(&id, dec!(19.98))).await })
    };
    let second = {
        let service = Arc::clone(&service);
        let id = order.id.clone();
        tokio::spawn(async move { service.process_payment(pay(&id, dec!(19.98))).await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    let receipts: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(receipts.len(), 1);
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(
                e.kind(),
                ErrorKind::InvalidState | ErrorKind::PostAuthorizationPersistFailure
            ));
        }
    }

    let paid = service.get_order(&order.id).await.unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.payment_id.as_deref(), Some(receipts[0].payment_id.as_str()));
}

#[tokio::test]
async fn test_payment_request_validation() {
    let authorizer = ScriptedAuthorizer::new(Behavior::Approve);
    let service = common::service(CountingStore::new(), authorizer.clone());
    let order = pending_order(&service).await;

    let mut blank_method = pay(&order.id, dec!(19.98));
    blank_method.payment_method = "  ".to_string();
    let err = service.process_payment(blank_method).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = service
        .process_payment(pay(&order.id, dec!(-19.98)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = service
        .process_payment(pay("not-an-id", dec!(19.98)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert_eq!(authorizer.calls(), 0);
}

use crate::application::lifecycle::{LifecycleSettings, OrderLifecycle};
use crate::application::payment::PaymentCoordinator;
use crate::config::ServiceConfig;
use crate::domain::money::Money;
use crate::domain::order::{Order, OrderId, OrderItem, OrderStatus, validate_user_id};
use crate::domain::payment::{Payment, PaymentCredentials, PaymentMethod, PaymentReceipt};
use crate::domain::ports::{OrderPage, OrderStoreRef, PaymentAuthorizerRef};
use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemRequest {
    pub product_id: String,
    pub quantity: i64,
    pub price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub items: Vec<ItemRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListOrdersRequest {
    pub user_id: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub order_id: String,
    pub amount: Decimal,
    pub payment_method: String,
    #[serde(flatten)]
    pub credentials: PaymentCredentials,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemView {
    pub product_id: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItemView>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPageView {
    pub orders: Vec<OrderView>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemView {
                    product_id: item.product_id().to_string(),
                    quantity: item.quantity(),
                    price: item.unit_price().value(),
                })
                .collect(),
            total_amount: order.total_amount().value(),
            status: order.status(),
            created_at: order.created_at().to_canonical(),
            updated_at: order.updated_at().to_canonical(),
            payment_id: order.payment().map(|p| p.payment_id.clone()),
        }
    }
}

fn to_page_param(name: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| OrderError::invalid(format!("{} must be a positive integer", name)))
}

fn to_items(items: Vec<ItemRequest>) -> Result<Vec<OrderItem>> {
    if items.is_empty() {
        return Err(OrderError::invalid("order must contain at least one item"));
    }
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let quantity = u32::try_from(item.quantity).map_err(|_| {
                OrderError::invalid(format!(
                    "item {}: quantity {} is out of range",
                    i, item.quantity
                ))
            })?;
            OrderItem::new(item.product_id, quantity, item.price)
        })
        .collect()
}

/// Entry point for transport adapters.
///
/// Checks the shape of decoded requests, hands them to the lifecycle or the
/// payment coordinator and converts results into serializable views. Holds no
/// state of its own beyond those two collaborators.
pub struct OrderService {
    lifecycle: Arc<OrderLifecycle>,
    payments: PaymentCoordinator,
}

impl OrderService {
    pub fn new(
        store: OrderStoreRef,
        authorizer: PaymentAuthorizerRef,
        config: &ServiceConfig,
    ) -> Self {
        let lifecycle = Arc::new(OrderLifecycle::new(
            store,
            LifecycleSettings::from(config),
        ));
        let payments = PaymentCoordinator::from_config(Arc::clone(&lifecycle), authorizer, config);
        Self {
            lifecycle,
            payments,
        }
    }

    /// Verifies the store is reachable before traffic is accepted.
    pub async fn check_ready(&self) -> Result<()> {
        self.lifecycle.ping().await
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderView> {
        validate_user_id(&request.user_id)?;
        let items = to_items(request.items)?;
        let order = self.lifecycle.create_order(&request.user_id, items).await?;
        Ok(OrderView::from(&order))
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: &str) -> Result<OrderView> {
        let id: OrderId = order_id.parse()?;
        let order = self.lifecycle.get_order(id).await?;
        Ok(OrderView::from(&order))
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn list_orders(&self, request: ListOrdersRequest) -> Result<OrderPageView> {
        validate_user_id(&request.user_id)?;
        let page = to_page_param("page", request.page)?;
        let page_size = to_page_param("page size", request.page_size)?;

        let OrderPage { orders, total } = self
            .lifecycle
            .list_orders(&request.user_id, page, page_size)
            .await?;
        Ok(OrderPageView {
            orders: orders.iter().map(OrderView::from).collect(),
            total,
            page,
            page_size,
        })
    }

    #[instrument(skip(self, request), fields(order_id = %request.order_id, method = %request.payment_method))]
    pub async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentReceipt> {
        let payment = Payment {
            order_id: request.order_id.parse()?,
            amount: Money::new(request.amount)?,
            method: PaymentMethod::new(request.payment_method)?,
            credentials: request.credentials,
        };

        self.payments.process_payment(payment).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str) -> Result<OrderView> {
        let id: OrderId = order_id.parse()?;
        let order = self.lifecycle.cancel_order(id).await?;
        Ok(OrderView::from(&order))
    }
}

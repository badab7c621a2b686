//! Persistence representation of an order.
//!
//! Stores keep `OrderRecord` values and turn them back into domain orders with
//! [`Order::restore`], which re-checks the invariants.

use crate::domain::money::Money;
use crate::domain::order::{Order, OrderId, OrderItem, OrderParts};
use crate::domain::payment::{PaymentMethod, PaymentRecord};
use crate::domain::time::Timestamp;
use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub product_id: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecordRow {
    pub payment_id: String,
    pub authorization_ref: String,
    pub method: String,
    pub amount: Decimal,
    pub paid_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItemRecord>,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentRecordRow>,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemRecord {
                    product_id: item.product_id().to_string(),
                    quantity: item.quantity(),
                    price: item.unit_price().value(),
                })
                .collect(),
            total_amount: order.total_amount().value(),
            status: order.status().to_string(),
            created_at: order.created_at().to_canonical(),
            updated_at: order.updated_at().to_canonical(),
            payment: order.payment().map(|p| PaymentRecordRow {
                payment_id: p.payment_id.clone(),
                authorization_ref: p.authorization_ref.clone(),
                method: p.method.to_string(),
                amount: p.amount.value(),
                paid_at: p.paid_at.to_canonical(),
            }),
        }
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = OrderError;

    fn try_from(record: OrderRecord) -> Result<Self> {
        let corrupt = |e: OrderError| {
            OrderError::internal(format!("corrupt order record {}: {}", record.id, e))
        };

        let items = record
            .items
            .iter()
            .map(|item| OrderItem::new(item.product_id.clone(), item.quantity, item.price))
            .collect::<Result<Vec<_>>>()
            .map_err(corrupt)?;

        let payment = record
            .payment
            .as_ref()
            .map(|p| -> Result<PaymentRecord> {
                Ok(PaymentRecord {
                    payment_id: p.payment_id.clone(),
                    authorization_ref: p.authorization_ref.clone(),
                    method: PaymentMethod::new(p.method.clone())?,
                    amount: Money::new(p.amount)?,
                    paid_at: Timestamp::parse(&p.paid_at)?,
                })
            })
            .transpose()
            .map_err(corrupt)?;

        let parts = OrderParts {
            id: record.id.parse::<OrderId>().map_err(corrupt)?,
            user_id: record.user_id.clone(),
            items,
            total_amount: Money::new(record.total_amount).map_err(corrupt)?,
            status: record.status.parse().map_err(corrupt)?,
            created_at: Timestamp::parse(&record.created_at).map_err(corrupt)?,
            updated_at: Timestamp::parse(&record.updated_at).map_err(corrupt)?,
            payment,
        };
        Order::restore(parts)
    }
}

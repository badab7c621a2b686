use crate::domain::money::Money;
use crate::domain::payment::PaymentRecord;
use crate::domain::time::Timestamp;
use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Globally unique order identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for OrderId {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| OrderError::invalid(format!("malformed order id '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const INITIAL: Self = OrderStatus::Pending;

    /// The edge set of the order state machine.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(OrderError::invalid(format!("unknown order status '{}'", other))),
        }
    }
}

/// A line of an order. Owned by its order, never addressed on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    product_id: String,
    quantity: u32,
    unit_price: Money,
}

impl OrderItem {
    pub fn new(product_id: impl Into<String>, quantity: u32, unit_price: Decimal) -> Result<Self> {
        let product_id = product_id.into();
        if product_id.trim().is_empty() {
            return Err(OrderError::invalid("product id must not be empty"));
        }
        if quantity < 1 {
            return Err(OrderError::invalid(format!(
                "quantity for product '{}' must be at least 1",
                product_id
            )));
        }
        let unit_price = Money::new(unit_price)?;
        Ok(Self {
            product_id,
            quantity,
            unit_price,
        })
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn line_total(&self) -> Result<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// User ids are non-blank and free of control characters. Stores use NUL as a
/// key separator, so it must never appear inside an id.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(OrderError::invalid("user id must not be empty"));
    }
    if user_id.chars().any(char::is_control) {
        return Err(OrderError::invalid(
            "user id must not contain control characters",
        ));
    }
    Ok(())
}

/// Exact sum of `unit_price * quantity` over all items.
pub fn compute_total(items: &[OrderItem]) -> Result<Money> {
    items
        .iter()
        .try_fold(Money::ZERO, |acc, item| acc.checked_add(item.line_total()?))
}

/// Plain field values used to rebuild an [`Order`] from storage.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub payment: Option<PaymentRecord>,
}

/// A user's order.
///
/// Fields are private: an `Order` can only come from [`Order::create`] or
/// [`Order::restore`], both of which enforce the non-empty item list and the
/// total invariant. Status changes go through the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    user_id: String,
    items: Vec<OrderItem>,
    total_amount: Money,
    status: OrderStatus,
    created_at: Timestamp,
    updated_at: Timestamp,
    payment: Option<PaymentRecord>,
}

impl Order {
    pub fn create(user_id: impl Into<String>, items: Vec<OrderItem>, now: Timestamp) -> Result<Self> {
        let user_id = user_id.into();
        validate_user_id(&user_id)?;
        if items.is_empty() {
            return Err(OrderError::invalid("order must contain at least one item"));
        }
        let total_amount = compute_total(&items)?;

        Ok(Self {
            id: OrderId::new(),
            user_id,
            items,
            total_amount,
            status: OrderStatus::INITIAL,
            created_at: now,
            updated_at: now,
            payment: None,
        })
    }

    pub fn restore(parts: OrderParts) -> Result<Self> {
        if parts.items.is_empty() {
            return Err(OrderError::internal(format!(
                "stored order {} has no items",
                parts.id
            )));
        }
        let computed = compute_total(&parts.items)?;
        if computed != parts.total_amount {
            return Err(OrderError::internal(format!(
                "stored order {} has total {} but its items sum to {}",
                parts.id, parts.total_amount, computed
            )));
        }
        if parts.updated_at < parts.created_at {
            return Err(OrderError::internal(format!(
                "stored order {} was updated before it was created",
                parts.id
            )));
        }

        Ok(Self {
            id: parts.id,
            user_id: parts.user_id,
            items: parts.items,
            total_amount: parts.total_amount,
            status: parts.status,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            payment: parts.payment,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn payment(&self) -> Option<&PaymentRecord> {
        self.payment.as_ref()
    }

    /// Attaches the settled payment. Only one payment can ever be recorded.
    pub(crate) fn record_payment(&mut self, record: PaymentRecord) -> Result<()> {
        if self.payment.is_some() {
            return Err(OrderError::StatusPrecondition {
                order_id: self.id,
                expected: OrderStatus::Pending,
                actual: self.status,
            });
        }
        if record.amount != self.total_amount {
            return Err(OrderError::invalid(format!(
                "payment amount {} does not match order total {}",
                record.amount, self.total_amount
            )));
        }
        self.payment = Some(record);
        Ok(())
    }

    /// Moves the order along one edge of the state machine. A recorded
    /// payment only travels with `paid` and `refunded`.
    pub(crate) fn transition_to(&mut self, to: OrderStatus, now: Timestamp) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        if self.payment.is_some() && !matches!(to, OrderStatus::Paid | OrderStatus::Refunded) {
            return Err(OrderError::invalid(format!(
                "order {} has a recorded payment and cannot become {}",
                self.id, to
            )));
        }
        self.status = to;
        self.updated_at = now.max(self.updated_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(product: &str, qty: u32, price: Decimal) -> OrderItem {
        OrderItem::new(product, qty, price).unwrap()
    }

    #[test]
    fn test_create_computes_exact_total() {
        let order = Order::create(
            "u1",
            vec![item("p1", 2, dec!(9.99)), item("p2", 3, dec!(0.01))],
            Timestamp::now(),
        )
        .unwrap();
        assert_eq!(order.total_amount().value(), dec!(20.01));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.created_at(), order.updated_at());
        assert!(order.payment().is_none());
    }

    #[test]
    fn test_create_rejects_empty_items() {
        let result = Order::create("u1", vec![], Timestamp::now());
        assert!(matches!(result, Err(OrderError::InvalidArgument(_))));
    }

    #[test]
    fn test_create_rejects_control_characters_in_user_id() {
        for user in ["", "  ", "u1\0x", "u1\nx"] {
            let result = Order::create(user, vec![item("p1", 1, dec!(1))], Timestamp::now());
            assert!(matches!(result, Err(OrderError::InvalidArgument(_))), "{:?}", user);
        }
    }

    #[test]
    fn test_paid_order_payment_cannot_be_cancelled_away() {
        let mut order =
            Order::create("u1", vec![item("p1", 1, dec!(1))], Timestamp::now()).unwrap();
        order
            .record_payment(PaymentRecord {
                payment_id: "pay-1".into(),
                authorization_ref: "auth-1".into(),
                method: crate::domain::payment::PaymentMethod::new("card").unwrap(),
                amount: order.total_amount(),
                paid_at: Timestamp::now(),
            })
            .unwrap();

        let mut cancelled = order.clone();
        assert!(matches!(
            cancelled.transition_to(OrderStatus::Cancelled, Timestamp::now()),
            Err(OrderError::InvalidArgument(_))
        ));
        assert_eq!(cancelled.status(), OrderStatus::Pending);

        order.transition_to(OrderStatus::Paid, Timestamp::now()).unwrap();
        assert_eq!(order.payment().unwrap().payment_id, "pay-1");
    }

    #[test]
    fn test_item_validation() {
        assert!(OrderItem::new("p1", 0, dec!(1)).is_err());
        assert!(OrderItem::new("p1", 1, dec!(-1)).is_err());
        assert!(OrderItem::new(" ", 1, dec!(1)).is_err());
        assert!(OrderItem::new("p1", 1, dec!(0)).is_ok());
    }

    #[test]
    fn test_state_machine_edges() {
        use OrderStatus::*;
        let all = [Pending, Paid, Cancelled, Refunded];
        let allowed = [(Pending, Paid), (Pending, Cancelled), (Paid, Refunded)];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
        assert!(Cancelled.is_terminal());
        assert!(Refunded.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_transition_keeps_updated_at_monotonic() {
        let created = Timestamp::now();
        let mut order = Order::create("u1", vec![item("p1", 1, dec!(1))], created).unwrap();
        let earlier = Timestamp::parse("2000-01-01T00:00:00Z").unwrap();

        order.transition_to(OrderStatus::Cancelled, earlier).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.updated_at(), created);
    }

    #[test]
    fn test_transition_rejects_invalid_edge() {
        let mut order =
            Order::create("u1", vec![item("p1", 1, dec!(1))], Timestamp::now()).unwrap();
        let result = order.transition_to(OrderStatus::Refunded, Timestamp::now());
        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Refunded
            })
        ));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_restore_rejects_inconsistent_total() {
        let order = Order::create("u1", vec![item("p1", 2, dec!(5))], Timestamp::now()).unwrap();
        let parts = OrderParts {
            id: order.id(),
            user_id: order.user_id().to_string(),
            items: order.items().to_vec(),
            total_amount: Money::new(dec!(11)).unwrap(),
            status: order.status(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            payment: None,
        };
        assert!(matches!(
            Order::restore(parts),
            Err(OrderError::InternalError(_))
        ));
    }

    #[test]
    fn test_order_id_parsing() {
        let id = OrderId::new();
        assert_eq!(id.to_string().parse::<OrderId>().unwrap(), id);
        assert!(matches!(
            "not-a-uuid".parse::<OrderId>(),
            Err(OrderError::InvalidArgument(_))
        ));
    }
}

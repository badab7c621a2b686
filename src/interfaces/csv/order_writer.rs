use crate::application::service::OrderView;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct OrderRow<'a> {
    id: &'a str,
    user_id: &'a str,
    status: &'a str,
    total_amount: Decimal,
    items: usize,
    created_at: &'a str,
    updated_at: &'a str,
}

const HEADER: [&str; 7] = [
    "id",
    "user_id",
    "status",
    "total_amount",
    "items",
    "created_at",
    "updated_at",
];

/// Writes order summaries as CSV, one row per order. The header is written
/// once, even when there are no orders.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(sink),
            header_written: false,
        }
    }

    pub fn write_orders(&mut self, orders: &[OrderView]) -> Result<()> {
        if !self.header_written {
            self.writer.write_record(HEADER)?;
            self.header_written = true;
        }
        for order in orders {
            self.writer.serialize(OrderRow {
                id: &order.id,
                user_id: &order.user_id,
                status: order.status.as_str(),
                total_amount: order.total_amount,
                items: order.items.len(),
                created_at: &order.created_at,
                updated_at: &order.updated_at,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

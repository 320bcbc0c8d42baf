use crate::domain::order::{Order, OrderStatus};
use crate::error::Result;
use std::io::Write;

/// Writes the final order book as CSV.
///
/// Header: `order,asset,seller,price,token,status`; the token column is empty
/// for native-currency orders.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Active => "active",
        OrderStatus::Cancelled => "cancelled",
        OrderStatus::Executed => "executed",
    }
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders(&mut self, orders: Vec<Order>) -> Result<()> {
        self.writer
            .write_record(["order", "asset", "seller", "price", "token", "status"])?;

        for order in orders {
            let token = order
                .payment_token
                .map(|address| address.to_string())
                .unwrap_or_default();
            self.writer.write_record([
                order.id.to_string(),
                order.asset_id.to_string(),
                order.seller.to_string(),
                order.price.value().to_string(),
                token,
                status_label(order.status).to_string(),
            ])?;
        }

        self.writer.flush()?;
        Ok(())
    }
}

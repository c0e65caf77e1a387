use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::dish::DishId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "preparing" => Some(Self::Preparing),
            "delivered" => Some(Self::Delivered),
            "completed" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub order_id: OrderId,
    pub dish_id: DishId,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl OrderLineItem {
    /// Saturates at `Decimal::MAX`; aggregation rejects lines that large.
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerOrder {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub order_date: NaiveDate,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub items: Vec<OrderLineItem>,
}

impl CustomerOrder {
    pub fn new(id: i64, customer_id: i64, order_date: NaiveDate) -> Self {
        Self {
            id: OrderId(id),
            customer_id: CustomerId(customer_id),
            order_date,
            status: OrderStatus::Pending,
            total_amount: Decimal::ZERO,
            items: Vec::new(),
        }
    }

    /// Appends a line and keeps `total_amount` equal to the sum of line totals.
    pub fn with_item(mut self, dish_id: i64, quantity: i64, unit_price: Decimal) -> Self {
        let item = OrderLineItem { order_id: self.id, dish_id: DishId(dish_id), quantity, unit_price };
        self.total_amount = self.total_amount.saturating_add(item.line_total());
        self.items.push(item);
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{CustomerOrder, OrderStatus};

    #[test]
    fn order_builder_accumulates_total_amount() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
        let order = CustomerOrder::new(1, 10, date)
            .with_item(1, 2, Decimal::new(1850, 2))
            .with_item(2, 1, Decimal::new(900, 2));

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total_amount, Decimal::new(4600, 2));
    }

    #[test]
    fn status_parse_round_trips_known_values() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("CANCELED"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse("lost"), None);
    }
}

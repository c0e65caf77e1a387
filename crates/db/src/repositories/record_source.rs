use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use mealdesk_core::analytics::{RecordSource, SourceError};
use mealdesk_core::domain::dish::{Dish, DishId, DishIngredientLink};
use mealdesk_core::domain::feedback::{ServiceFeedback, ServiceRecordId};
use mealdesk_core::domain::ingredient::{Ingredient, IngredientId};
use mealdesk_core::domain::order::{CustomerId, CustomerOrder, OrderId, OrderLineItem, OrderStatus};

use super::RepositoryError;
use crate::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads analysis records from the SQLite schema.
pub struct SqlRecordSource {
    pool: DbPool,
}

impl SqlRecordSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_orders(
        &self,
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
    ) -> Result<Vec<CustomerOrder>, RepositoryError> {
        let since = since.map(|date| date.format(DATE_FORMAT).to_string());
        let until = until.map(|date| date.format(DATE_FORMAT).to_string());

        // Orders and their items must come from the same snapshot.
        let mut tx = self.pool.begin().await?;

        let order_rows = sqlx::query(
            "SELECT id, customer_id, order_date, status, total_amount
             FROM customer_order
             WHERE (?1 IS NULL OR order_date >= ?1) AND (?2 IS NULL OR order_date <= ?2)
             ORDER BY order_date, id",
        )
        .bind(&since)
        .bind(&until)
        .fetch_all(&mut *tx)
        .await?;

        let item_rows = sqlx::query(
            "SELECT oi.order_id, oi.dish_id, oi.quantity, oi.unit_price
             FROM order_item oi
             JOIN customer_order co ON co.id = oi.order_id
             WHERE (?1 IS NULL OR co.order_date >= ?1) AND (?2 IS NULL OR co.order_date <= ?2)
             ORDER BY oi.order_id, oi.id",
        )
        .bind(&since)
        .bind(&until)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut orders = order_rows.iter().map(order_from_row).collect::<Result<Vec<_>, _>>()?;
        let positions: HashMap<OrderId, usize> =
            orders.iter().enumerate().map(|(position, order)| (order.id, position)).collect();

        for row in &item_rows {
            let item = line_item_from_row(row)?;
            let position = positions.get(&item.order_id).copied().ok_or_else(|| {
                RepositoryError::Decode(format!(
                    "order item references order {} outside the fetched set",
                    item.order_id.0
                ))
            })?;
            orders[position].items.push(item);
        }

        Ok(orders)
    }

    async fn load_dishes(&self) -> Result<Vec<Dish>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let dish_rows = sqlx::query(
            "SELECT d.id, d.name, c.name AS category_name
             FROM dish d
             LEFT JOIN menu_category c ON c.id = d.category_id
             ORDER BY d.id",
        )
        .fetch_all(&mut *tx)
        .await?;

        let link_rows = sqlx::query(
            "SELECT dish_id, ingredient_id, quantity, unit
             FROM dish_ingredient
             ORDER BY dish_id, ingredient_id",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut dishes = dish_rows
            .iter()
            .map(|row| -> Result<Dish, RepositoryError> {
                Ok(Dish {
                    id: DishId(row.try_get("id")?),
                    name: row.try_get("name")?,
                    category: row.try_get("category_name")?,
                    ingredients: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let positions: HashMap<DishId, usize> =
            dishes.iter().enumerate().map(|(position, dish)| (dish.id, position)).collect();

        for row in &link_rows {
            let link = DishIngredientLink {
                dish_id: DishId(row.try_get("dish_id")?),
                ingredient_id: IngredientId(row.try_get("ingredient_id")?),
                quantity: row.try_get("quantity")?,
                unit: row.try_get("unit")?,
            };
            let position = positions.get(&link.dish_id).copied().ok_or_else(|| {
                RepositoryError::Decode(format!("ingredient link for unknown dish {}", link.dish_id.0))
            })?;
            dishes[position].ingredients.push(link);
        }

        Ok(dishes)
    }

    async fn load_ingredients(&self) -> Result<Vec<Ingredient>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, stock, unit FROM ingredient ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<Ingredient, RepositoryError> {
                Ok(Ingredient {
                    id: IngredientId(row.try_get("id")?),
                    name: row.try_get("name")?,
                    stock: row.try_get("stock")?,
                    unit: row.try_get("unit")?,
                })
            })
            .collect()
    }

    async fn load_feedback(&self) -> Result<Vec<ServiceFeedback>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT service_record_id, customer_id, rating, comment
             FROM service_feedback
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(feedback_from_row).collect()
    }
}

#[async_trait]
impl RecordSource for SqlRecordSource {
    async fn fetch_orders(
        &self,
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
    ) -> Result<Vec<CustomerOrder>, SourceError> {
        let orders = self.load_orders(since, until).await?;
        tracing::debug!(
            event_name = "db.record_source.orders_fetched",
            order_count = orders.len(),
            "fetched orders"
        );
        Ok(orders)
    }

    async fn fetch_dishes(&self) -> Result<Vec<Dish>, SourceError> {
        Ok(self.load_dishes().await?)
    }

    async fn fetch_ingredients(&self) -> Result<Vec<Ingredient>, SourceError> {
        Ok(self.load_ingredients().await?)
    }

    async fn fetch_feedback(&self) -> Result<Vec<ServiceFeedback>, SourceError> {
        Ok(self.load_feedback().await?)
    }
}

fn order_from_row(row: &SqliteRow) -> Result<CustomerOrder, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status_raw}`")))?;

    Ok(CustomerOrder {
        id: OrderId(row.try_get("id")?),
        customer_id: CustomerId(row.try_get("customer_id")?),
        order_date: parse_date("order_date", row.try_get("order_date")?)?,
        status,
        total_amount: parse_decimal("total_amount", row.try_get("total_amount")?)?,
        items: Vec::new(),
    })
}

fn line_item_from_row(row: &SqliteRow) -> Result<OrderLineItem, RepositoryError> {
    Ok(OrderLineItem {
        order_id: OrderId(row.try_get("order_id")?),
        dish_id: DishId(row.try_get("dish_id")?),
        quantity: row.try_get("quantity")?,
        unit_price: parse_decimal("unit_price", row.try_get("unit_price")?)?,
    })
}

/// Ratings are range-checked only when feedback is attributed to a dish, so a
/// stored value that does not fit `u8` decodes as 0 (outside 1..=5) instead of
/// failing the whole fetch.
fn feedback_from_row(row: &SqliteRow) -> Result<ServiceFeedback, RepositoryError> {
    let rating = u8::try_from(row.try_get::<i64, _>("rating")?).unwrap_or(0);

    Ok(ServiceFeedback {
        service_record_id: ServiceRecordId(row.try_get("service_record_id")?),
        customer_id: CustomerId(row.try_get("customer_id")?),
        rating,
        comment: row.try_get("comment")?,
    })
}

fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

fn parse_decimal(column: &str, value: String) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value.trim()).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

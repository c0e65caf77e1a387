//! Folds raw records into per-entity running totals.
//!
//! Every aggregator is a pure function of a [`RecordSnapshot`]. Inconsistent
//! records abort the fold with `DataUnavailable`; nothing is partially
//! aggregated.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::dish::{Dish, DishId};
use crate::domain::feedback::ServiceFeedback;
use crate::domain::order::CustomerOrder;
use crate::errors::AnalysisError;

use super::source::RecordSnapshot;
use super::types::AnalysisWindow;

/// Keyed totals that remember the order in which keys first appeared.
#[derive(Clone, Debug)]
pub struct MetricTable<K, V> {
    index: HashMap<K, usize>,
    rows: Vec<(K, V)>,
}

impl<K, V> Default for MetricTable<K, V> {
    fn default() -> Self {
        Self { index: HashMap::new(), rows: Vec::new() }
    }
}

impl<K, V> MetricTable<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn entry(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let position = match self.index.get(&key) {
            Some(position) => *position,
            None => {
                self.index.insert(key.clone(), self.rows.len());
                self.rows.push((key, V::default()));
                self.rows.len() - 1
            }
        };
        &mut self.rows[position].1
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|position| &self.rows[*position].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let position = *self.index.get(key)?;
        Some(&mut self.rows[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.rows.iter().map(|(key, value)| (key, value))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Running totals for one dish.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DishMetrics {
    pub sales_count: i64,
    pub total_amount: Decimal,
    pub feedback_count: u32,
    pub total_rating: u32,
    pub total_cost: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SalesTotals {
    pub sales_count: i64,
    pub total_amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DailyTotals {
    pub order_count: usize,
    pub sales_count: i64,
    pub total_amount: Decimal,
}

#[derive(Clone, Debug, Default)]
pub struct SalesAggregate {
    pub dishes: MetricTable<DishId, DishMetrics>,
    pub categories: MetricTable<String, SalesTotals>,
    pub days: BTreeMap<NaiveDate, DailyTotals>,
    pub total_orders: usize,
    pub total_sales_amount: Decimal,
}

/// Maps a feedback record to the dish it rates.
pub trait FeedbackAttribution: Send + Sync {
    fn dish_for(&self, feedback: &ServiceFeedback) -> Option<DishId>;
}

/// Attributes no feedback to any dish, so every dish keeps the neutral rating.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFeedbackAttribution;

impl FeedbackAttribution for NoFeedbackAttribution {
    fn dish_for(&self, _feedback: &ServiceFeedback) -> Option<DishId> {
        None
    }
}

/// Sales by dish, by category and by day for orders inside `window`.
pub fn aggregate_sales(
    snapshot: &RecordSnapshot,
    window: &AnalysisWindow,
) -> Result<SalesAggregate, AnalysisError> {
    let dishes = snapshot.dish_index();
    let mut aggregate = SalesAggregate::default();

    for order in snapshot.orders.iter().filter(|order| window.contains(order.order_date)) {
        aggregate.total_orders += 1;
        aggregate.total_sales_amount = aggregate
            .total_sales_amount
            .checked_add(order.total_amount)
            .ok_or_else(|| totals_overflow(order))?;
        aggregate.days.entry(order.order_date).or_default().order_count += 1;

        for item in &order.items {
            let dish = lookup_dish(&dishes, order, item.dish_id)?;
            let (quantity, amount) = line_contribution(order, item.quantity, item.unit_price)?;

            let metrics = aggregate.dishes.entry(dish.id);
            accumulate(&mut metrics.sales_count, &mut metrics.total_amount, quantity, amount, order)?;

            if let Some(category) = dish.category_name() {
                let totals = aggregate.categories.entry(category.to_owned());
                accumulate(&mut totals.sales_count, &mut totals.total_amount, quantity, amount, order)?;
            }

            let day = aggregate.days.entry(order.order_date).or_default();
            accumulate(&mut day.sales_count, &mut day.total_amount, quantity, amount, order)?;
        }
    }

    Ok(aggregate)
}

/// Per-dish sales inside `window` plus attributed feedback ratings.
///
/// Feedback only lands on dishes that sold in the window; a rated dish
/// with no qualifying sale stays out of the table.
pub fn aggregate_quality(
    snapshot: &RecordSnapshot,
    window: &AnalysisWindow,
    attribution: &dyn FeedbackAttribution,
) -> Result<MetricTable<DishId, DishMetrics>, AnalysisError> {
    let dishes = snapshot.dish_index();
    let mut table = MetricTable::default();

    for order in snapshot.orders.iter().filter(|order| window.contains(order.order_date)) {
        fold_order_lines(&mut table, &dishes, order)?;
    }

    for feedback in &snapshot.feedback {
        let Some(dish_id) = attribution.dish_for(feedback) else {
            continue;
        };
        if !feedback.has_valid_rating() {
            return Err(AnalysisError::data_unavailable(format!(
                "feedback for service record {} has rating {} outside 1..=5",
                feedback.service_record_id.0, feedback.rating
            )));
        }
        if let Some(metrics) = table.get_mut(&dish_id) {
            metrics.feedback_count = metrics.feedback_count.saturating_add(1);
            metrics.total_rating = metrics.total_rating.saturating_add(u32::from(feedback.rating));
        }
    }

    Ok(table)
}

/// Ingredient cost proxy for every dish plus its all-time sales.
pub fn aggregate_costs(
    snapshot: &RecordSnapshot,
) -> Result<MetricTable<DishId, DishMetrics>, AnalysisError> {
    let dishes = snapshot.dish_index();
    let ingredients = snapshot.ingredient_index();
    let mut table: MetricTable<DishId, DishMetrics> = MetricTable::default();

    for dish in &snapshot.dishes {
        let mut total_cost = 0.0;
        for link in &dish.ingredients {
            let ingredient = ingredients.get(&link.ingredient_id).ok_or_else(|| {
                AnalysisError::data_unavailable(format!(
                    "dish {} links unknown ingredient {}",
                    dish.id.0, link.ingredient_id.0
                ))
            })?;
            if !link.quantity.is_finite() || link.quantity < 0.0 {
                return Err(AnalysisError::data_unavailable(format!(
                    "dish {} has invalid quantity {} for ingredient {}",
                    dish.id.0, link.quantity, link.ingredient_id.0
                )));
            }
            if !ingredient.stock.is_finite() || ingredient.stock < 0.0 {
                return Err(AnalysisError::data_unavailable(format!(
                    "ingredient {} has invalid stock {}",
                    ingredient.id.0, ingredient.stock
                )));
            }
            total_cost += ingredient.stock * link.quantity;
        }
        table.entry(dish.id).total_cost = total_cost;
    }

    for order in &snapshot.orders {
        fold_order_lines(&mut table, &dishes, order)?;
    }

    Ok(table)
}

fn fold_order_lines(
    table: &mut MetricTable<DishId, DishMetrics>,
    dishes: &HashMap<DishId, &Dish>,
    order: &CustomerOrder,
) -> Result<(), AnalysisError> {
    for item in &order.items {
        let dish = lookup_dish(dishes, order, item.dish_id)?;
        let (quantity, amount) = line_contribution(order, item.quantity, item.unit_price)?;
        let metrics = table.entry(dish.id);
        accumulate(&mut metrics.sales_count, &mut metrics.total_amount, quantity, amount, order)?;
    }
    Ok(())
}

/// Adds one line to a running pair of totals, leaving both untouched on overflow.
fn accumulate(
    sales_count: &mut i64,
    total_amount: &mut Decimal,
    quantity: i64,
    amount: Decimal,
    order: &CustomerOrder,
) -> Result<(), AnalysisError> {
    match (sales_count.checked_add(quantity), total_amount.checked_add(amount)) {
        (Some(count), Some(total)) => {
            *sales_count = count;
            *total_amount = total;
            Ok(())
        }
        _ => Err(totals_overflow(order)),
    }
}

fn totals_overflow(order: &CustomerOrder) -> AnalysisError {
    AnalysisError::data_unavailable(format!(
        "order {} pushes the running totals out of range",
        order.id.0
    ))
}

fn lookup_dish<'a>(
    dishes: &HashMap<DishId, &'a Dish>,
    order: &CustomerOrder,
    dish_id: DishId,
) -> Result<&'a Dish, AnalysisError> {
    dishes.get(&dish_id).copied().ok_or_else(|| {
        AnalysisError::data_unavailable(format!(
            "order {} references unknown dish {}",
            order.id.0, dish_id.0
        ))
    })
}

fn line_contribution(
    order: &CustomerOrder,
    quantity: i64,
    unit_price: Decimal,
) -> Result<(i64, Decimal), AnalysisError> {
    if quantity < 0 || unit_price < Decimal::ZERO {
        return Err(AnalysisError::data_unavailable(format!(
            "order {} has a line with negative quantity or price",
            order.id.0
        )));
    }
    let amount = unit_price.checked_mul(Decimal::from(quantity)).ok_or_else(|| {
        AnalysisError::data_unavailable(format!(
            "order {} has a line amount out of range",
            order.id.0
        ))
    })?;
    Ok((quantity, amount))
}

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::dish::{Dish, DishId};
use crate::domain::feedback::ServiceFeedback;
use crate::domain::ingredient::{Ingredient, IngredientId};
use crate::domain::order::CustomerOrder;
use crate::errors::AnalysisError;

use super::types::AnalysisWindow;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("record source unavailable: {0}")]
    Unavailable(String),
    #[error("record source returned inconsistent data: {0}")]
    Inconsistent(String),
}

impl From<SourceError> for AnalysisError {
    fn from(value: SourceError) -> Self {
        AnalysisError::data_unavailable(value.to_string())
    }
}

/// Read-only supplier of the records an analysis consumes.
///
/// Each call returns a point-in-time snapshot. `since`/`until` are inclusive
/// order-date bounds; `None` leaves that side open.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_orders(
        &self,
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
    ) -> Result<Vec<CustomerOrder>, SourceError>;
    async fn fetch_dishes(&self) -> Result<Vec<Dish>, SourceError>;
    async fn fetch_ingredients(&self) -> Result<Vec<Ingredient>, SourceError>;
    async fn fetch_feedback(&self) -> Result<Vec<ServiceFeedback>, SourceError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderScope {
    #[default]
    Skip,
    Window(AnalysisWindow),
    AllTime,
}

/// Which record kinds a profile needs. Dishes are always collected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectPlan {
    pub orders: OrderScope,
    pub ingredients: bool,
    pub feedback: bool,
}

/// Every record one run operates on, held in memory for the rest of the run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSnapshot {
    pub orders: Vec<CustomerOrder>,
    pub dishes: Vec<Dish>,
    pub ingredients: Vec<Ingredient>,
    pub feedback: Vec<ServiceFeedback>,
}

impl RecordSnapshot {
    pub fn dish_index(&self) -> HashMap<DishId, &Dish> {
        self.dishes.iter().map(|dish| (dish.id, dish)).collect()
    }

    pub fn ingredient_index(&self) -> HashMap<IngredientId, &Ingredient> {
        self.ingredients.iter().map(|ingredient| (ingredient.id, ingredient)).collect()
    }
}

pub async fn collect<S>(source: &S, plan: &CollectPlan) -> Result<RecordSnapshot, SourceError>
where
    S: RecordSource + ?Sized,
{
    let dishes = source.fetch_dishes().await?;
    let orders = match plan.orders {
        OrderScope::Skip => Vec::new(),
        OrderScope::Window(window) => {
            source.fetch_orders(Some(window.start), Some(window.end)).await?
        }
        OrderScope::AllTime => source.fetch_orders(None, None).await?,
    };
    let ingredients =
        if plan.ingredients { source.fetch_ingredients().await? } else { Vec::new() };
    let feedback = if plan.feedback { source.fetch_feedback().await? } else { Vec::new() };

    Ok(RecordSnapshot { orders, dishes, ingredients, feedback })
}

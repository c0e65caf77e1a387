use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::dish::DishId;
use crate::errors::AnalysisError;

use super::{
    DEFAULT_CATEGORY_COHORT_SIZE, DEFAULT_COHORT_SIZE, DEFAULT_RECOMMENDATION_SIZE,
    DEFAULT_WINDOW_DAYS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Quality,
    CostEffectiveness,
    SalesPerformance,
    NutritionalBalance,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::Quality,
        AnalysisKind::CostEffectiveness,
        AnalysisKind::SalesPerformance,
        AnalysisKind::NutritionalBalance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::CostEffectiveness => "cost_effectiveness",
            Self::SalesPerformance => "sales_performance",
            Self::NutritionalBalance => "nutritional_balance",
        }
    }

    /// Accepts the canonical tag or the short CLI alias.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "quality" => Some(Self::Quality),
            "cost" | "cost_effectiveness" => Some(Self::CostEffectiveness),
            "sales" | "sales_performance" => Some(Self::SalesPerformance),
            "nutrition" | "nutritional_balance" => Some(Self::NutritionalBalance),
            _ => None,
        }
    }

    pub fn is_windowed(&self) -> bool {
        matches!(self, Self::Quality | Self::SalesPerformance)
    }
}

/// Inclusive calendar range an analysis reads orders from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisWindow {
    pub fn trailing(today: NaiveDate, days: i64) -> Result<Self, AnalysisError> {
        if days <= 0 {
            return Err(AnalysisError::invalid_parameter(
                "days",
                format!("window must be at least one day, got {days}"),
            ));
        }

        let start = today.checked_sub_days(Days::new(days.unsigned_abs())).ok_or_else(|| {
            AnalysisError::invalid_parameter("days", format!("window of {days} days is out of range"))
        })?;

        Ok(Self { start, end: today })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Knobs shared by every analysis run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub default_window_days: u32,
    pub cohort_size: usize,
    pub recommendation_size: usize,
    pub category_cohort_size: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            default_window_days: DEFAULT_WINDOW_DAYS,
            cohort_size: DEFAULT_COHORT_SIZE,
            recommendation_size: DEFAULT_RECOMMENDATION_SIZE,
            category_cohort_size: DEFAULT_CATEGORY_COHORT_SIZE,
        }
    }
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.default_window_days == 0 {
            return Err(AnalysisError::invalid_parameter(
                "default_window_days",
                "must be greater than zero",
            ));
        }
        if self.cohort_size == 0 {
            return Err(AnalysisError::invalid_parameter("cohort_size", "must be greater than zero"));
        }
        if self.recommendation_size == 0 {
            return Err(AnalysisError::invalid_parameter(
                "recommendation_size",
                "must be greater than zero",
            ));
        }
        if self.category_cohort_size == 0 {
            return Err(AnalysisError::invalid_parameter(
                "category_cohort_size",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Finished output of one analysis run.
///
/// `top` and `bottom` are both in descending score order; `bottom` is the
/// tail of the ranking, so the worst entity is last.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport<E, X = ()> {
    pub analysis_type: AnalysisKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<AnalysisWindow>,
    pub total_dishes: usize,
    pub top: Vec<E>,
    pub bottom: Vec<E>,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<X>,
}

impl<E, X> AnalysisReport<E, X> {
    pub fn is_empty(&self) -> bool {
        self.total_dishes == 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityEntry {
    pub dish_id: DishId,
    pub dish_name: String,
    pub category: String,
    pub sales_count: i64,
    pub total_amount: Decimal,
    pub avg_rating: f64,
    pub quality_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    pub dish_id: DishId,
    pub dish_name: String,
    pub category: String,
    /// Sum of `ingredient stock on hand * link quantity` over the dish's
    /// ingredients. Stock level stands in for a purchase cost, so this is a
    /// proxy, not a price.
    pub total_cost: f64,
    pub total_revenue: Decimal,
    pub sales_count: i64,
    /// At most 1, unbounded below when the cost proxy exceeds revenue.
    pub profit_margin: f64,
    pub cost_effectiveness: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DishSales {
    pub dish_id: DishId,
    pub dish_name: String,
    pub category: String,
    pub sales_count: i64,
    pub total_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NutritionEntry {
    pub dish_id: DishId,
    pub dish_name: String,
    pub category: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub fiber: f64,
    pub balance_score: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySales {
    pub category_name: String,
    pub sales_count: i64,
    pub total_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub order_count: usize,
    pub sales_count: i64,
    pub total_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesBreakdown {
    pub total_orders: usize,
    pub total_sales_amount: Decimal,
    pub top_categories: Vec<CategorySales>,
    /// Ascending by date.
    pub sales_trend: Vec<DailySales>,
}

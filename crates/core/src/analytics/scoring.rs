//! Score formulas for the quality, cost-effectiveness and nutrition analyses

use rust_decimal::prelude::ToPrimitive;

use super::aggregate::DishMetrics;
use super::nutrition::NutritionFacts;

/// Both quality terms are on a 0..=5 scale; dividing by this maps the sum to 0..=1.
const QUALITY_SCALE: f64 = 5.0;

const IDEAL_PROTEIN_RATIO: f64 = 0.25;
const IDEAL_CARB_RATIO: f64 = 0.55;
const IDEAL_FAT_RATIO: f64 = 0.20;

const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
const KCAL_PER_GRAM_CARB: f64 = 4.0;
const KCAL_PER_GRAM_FAT: f64 = 9.0;

/// Weights for the quality composite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityWeights {
    /// Weight of the capped sales term (default: 0.6)
    pub sales_weight: f64,
    /// Weight of the average rating (default: 0.4)
    pub rating_weight: f64,
    /// Sales count that maps to one point of sales term (default: 10)
    pub sales_normalizer: f64,
    /// Upper bound of the sales term (default: 5)
    pub sales_cap: f64,
    /// Rating assumed when a dish has no feedback (default: 3.5)
    pub neutral_rating: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        super::DEFAULT_QUALITY_WEIGHTS
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScore {
    pub avg_rating: f64,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostScore {
    pub profit_margin: f64,
    pub cost_effectiveness: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreCalculator {
    weights: QualityWeights,
}

impl ScoreCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: QualityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &QualityWeights {
        &self.weights
    }

    /// Quality composite in [0, 1], rounded to two decimals.
    pub fn quality(&self, metrics: &DishMetrics) -> QualityScore {
        let weights = &self.weights;
        let sales_term = (metrics.sales_count as f64 / weights.sales_normalizer).min(weights.sales_cap);
        let avg_rating = if metrics.feedback_count > 0 {
            f64::from(metrics.total_rating) / f64::from(metrics.feedback_count)
        } else {
            weights.neutral_rating
        };

        let composite =
            (weights.sales_weight * sales_term + weights.rating_weight * avg_rating) / QUALITY_SCALE;

        QualityScore { avg_rating, quality_score: round2(clamp_unit(composite)) }
    }

    /// Margin and cost-effectiveness from the cost proxy and all-time revenue.
    ///
    /// A dish with zero cost proxy scores 0 on both.
    pub fn cost(&self, metrics: &DishMetrics) -> CostScore {
        if metrics.total_cost <= 0.0 {
            return CostScore { profit_margin: 0.0, cost_effectiveness: 0.0 };
        }

        let revenue = metrics.total_amount.to_f64().unwrap_or(0.0);
        let profit_margin =
            if revenue > 0.0 { (revenue - metrics.total_cost) / revenue } else { 0.0 };
        let sales = metrics.sales_count as f64;
        // 1 once the dish has sold, 0 otherwise
        let sales_factor = sales / sales.max(1.0);
        let cost_effectiveness = profit_margin * sales_factor;

        CostScore {
            profit_margin: round2(finite_or_zero(profit_margin)),
            cost_effectiveness: round2(finite_or_zero(cost_effectiveness)),
        }
    }

    /// Macro balance in [0, 1]; `None` for non-positive or non-finite calories.
    pub fn balance(&self, facts: &NutritionFacts) -> Option<f64> {
        if !facts.calories.is_finite() || facts.calories <= 0.0 {
            return None;
        }

        let protein_ratio = facts.protein * KCAL_PER_GRAM_PROTEIN / facts.calories;
        let carb_ratio = facts.carbohydrates * KCAL_PER_GRAM_CARB / facts.calories;
        let fat_ratio = facts.fat * KCAL_PER_GRAM_FAT / facts.calories;

        let deviation = (protein_ratio - IDEAL_PROTEIN_RATIO).abs()
            + (carb_ratio - IDEAL_CARB_RATIO).abs()
            + (fat_ratio - IDEAL_FAT_RATIO).abs();

        Some(round2(clamp_unit(finite_or_zero(1.0 - deviation))))
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

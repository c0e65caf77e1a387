//! The four parameterizations of the analysis pipeline

use rust_decimal::Decimal;

use crate::domain::dish::DishId;
use crate::errors::AnalysisError;

use super::aggregate::{
    aggregate_costs, aggregate_quality, aggregate_sales, DishMetrics, FeedbackAttribution,
    MetricTable, SalesAggregate,
};
use super::nutrition::NutritionProvider;
use super::pipeline::AnalysisProfile;
use super::ranking::Ranking;
use super::recommend::{
    cohort_recommendations, render_names, render_top_category, render_trend, sales_trend,
    COST_TEMPLATES, NUTRITION_TEMPLATES, QUALITY_TEMPLATES, SALES_TOP_DISHES_TEMPLATE,
};
use super::scoring::ScoreCalculator;
use super::source::{CollectPlan, OrderScope, RecordSnapshot};
use super::types::{
    AnalysisKind, AnalysisSettings, AnalysisWindow, CategorySales, CostEntry, DailySales,
    DishSales, NutritionEntry, QualityEntry, SalesBreakdown,
};
use super::UNKNOWN_CATEGORY;

pub struct QualityProfile<'a> {
    pub window: AnalysisWindow,
    pub calculator: &'a ScoreCalculator,
    pub attribution: &'a dyn FeedbackAttribution,
}

impl AnalysisProfile for QualityProfile<'_> {
    type Aggregate = MetricTable<DishId, DishMetrics>;
    type Entry = QualityEntry;
    type Key = f64;
    type Breakdown = ();

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Quality
    }

    fn window(&self) -> Option<AnalysisWindow> {
        Some(self.window)
    }

    fn collect_plan(&self) -> CollectPlan {
        CollectPlan { orders: OrderScope::Window(self.window), ingredients: false, feedback: true }
    }

    fn aggregate(&self, snapshot: &RecordSnapshot) -> Result<Self::Aggregate, AnalysisError> {
        aggregate_quality(snapshot, &self.window, self.attribution)
    }

    fn score(
        &self,
        snapshot: &RecordSnapshot,
        aggregate: &Self::Aggregate,
    ) -> Result<Vec<QualityEntry>, AnalysisError> {
        let dishes = snapshot.dish_index();
        aggregate
            .iter()
            .map(|(dish_id, metrics)| {
                let dish = dishes.get(dish_id).ok_or_else(|| missing_dish(*dish_id))?;
                let score = self.calculator.quality(metrics);
                Ok(QualityEntry {
                    dish_id: *dish_id,
                    dish_name: dish.name.clone(),
                    category: dish.category_label(UNKNOWN_CATEGORY).to_string(),
                    sales_count: metrics.sales_count,
                    total_amount: metrics.total_amount,
                    avg_rating: score.avg_rating,
                    quality_score: score.quality_score,
                })
            })
            .collect()
    }

    fn rank_key(&self, entry: &QualityEntry) -> f64 {
        entry.quality_score
    }

    fn recommend(
        &self,
        ranking: &Ranking<QualityEntry>,
        _breakdown: Option<&()>,
        settings: &AnalysisSettings,
    ) -> Vec<String> {
        let top = ranking.top(settings.recommendation_size);
        let bottom = ranking.bottom(settings.recommendation_size);
        cohort_recommendations(
            QUALITY_TEMPLATES,
            &names(&top, |entry| &entry.dish_name),
            &names(&bottom, |entry| &entry.dish_name),
        )
    }
}

pub struct CostProfile<'a> {
    pub calculator: &'a ScoreCalculator,
}

impl AnalysisProfile for CostProfile<'_> {
    type Aggregate = MetricTable<DishId, DishMetrics>;
    type Entry = CostEntry;
    type Key = f64;
    type Breakdown = ();

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::CostEffectiveness
    }

    fn collect_plan(&self) -> CollectPlan {
        CollectPlan { orders: OrderScope::AllTime, ingredients: true, feedback: false }
    }

    fn aggregate(&self, snapshot: &RecordSnapshot) -> Result<Self::Aggregate, AnalysisError> {
        aggregate_costs(snapshot)
    }

    fn score(
        &self,
        snapshot: &RecordSnapshot,
        aggregate: &Self::Aggregate,
    ) -> Result<Vec<CostEntry>, AnalysisError> {
        let dishes = snapshot.dish_index();
        aggregate
            .iter()
            .map(|(dish_id, metrics)| {
                let dish = dishes.get(dish_id).ok_or_else(|| missing_dish(*dish_id))?;
                let score = self.calculator.cost(metrics);
                Ok(CostEntry {
                    dish_id: *dish_id,
                    dish_name: dish.name.clone(),
                    category: dish.category_label(UNKNOWN_CATEGORY).to_string(),
                    total_cost: metrics.total_cost,
                    total_revenue: metrics.total_amount,
                    sales_count: metrics.sales_count,
                    profit_margin: score.profit_margin,
                    cost_effectiveness: score.cost_effectiveness,
                })
            })
            .collect()
    }

    fn rank_key(&self, entry: &CostEntry) -> f64 {
        entry.cost_effectiveness
    }

    fn recommend(
        &self,
        ranking: &Ranking<CostEntry>,
        _breakdown: Option<&()>,
        settings: &AnalysisSettings,
    ) -> Vec<String> {
        let top = ranking.top(settings.recommendation_size);
        let bottom = ranking.bottom(settings.recommendation_size);
        cohort_recommendations(
            COST_TEMPLATES,
            &names(&top, |entry| &entry.dish_name),
            &names(&bottom, |entry| &entry.dish_name),
        )
    }
}

pub struct SalesProfile {
    pub window: AnalysisWindow,
}

impl AnalysisProfile for SalesProfile {
    type Aggregate = SalesAggregate;
    type Entry = DishSales;
    type Key = Decimal;
    type Breakdown = SalesBreakdown;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::SalesPerformance
    }

    fn window(&self) -> Option<AnalysisWindow> {
        Some(self.window)
    }

    fn collect_plan(&self) -> CollectPlan {
        CollectPlan { orders: OrderScope::Window(self.window), ingredients: false, feedback: false }
    }

    fn aggregate(&self, snapshot: &RecordSnapshot) -> Result<SalesAggregate, AnalysisError> {
        aggregate_sales(snapshot, &self.window)
    }

    fn score(
        &self,
        snapshot: &RecordSnapshot,
        aggregate: &SalesAggregate,
    ) -> Result<Vec<DishSales>, AnalysisError> {
        let dishes = snapshot.dish_index();
        aggregate
            .dishes
            .iter()
            .map(|(dish_id, metrics)| {
                let dish = dishes.get(dish_id).ok_or_else(|| missing_dish(*dish_id))?;
                Ok(DishSales {
                    dish_id: *dish_id,
                    dish_name: dish.name.clone(),
                    category: dish.category_label(UNKNOWN_CATEGORY).to_string(),
                    sales_count: metrics.sales_count,
                    total_amount: metrics.total_amount,
                })
            })
            .collect()
    }

    fn rank_key(&self, entry: &DishSales) -> Decimal {
        entry.total_amount
    }

    fn breakdown(
        &self,
        aggregate: &SalesAggregate,
        settings: &AnalysisSettings,
    ) -> Option<SalesBreakdown> {
        let categories: Vec<CategorySales> = aggregate
            .categories
            .iter()
            .map(|(name, totals)| CategorySales {
                category_name: name.clone(),
                sales_count: totals.sales_count,
                total_amount: totals.total_amount,
            })
            .collect();
        let top_categories = Ranking::rank_by(&categories, |category| category.total_amount)
            .top(settings.category_cohort_size);

        let sales_trend = aggregate
            .days
            .iter()
            .map(|(date, totals)| DailySales {
                date: *date,
                order_count: totals.order_count,
                sales_count: totals.sales_count,
                total_amount: totals.total_amount,
            })
            .collect();

        Some(SalesBreakdown {
            total_orders: aggregate.total_orders,
            total_sales_amount: aggregate.total_sales_amount,
            top_categories,
            sales_trend,
        })
    }

    fn recommend(
        &self,
        ranking: &Ranking<DishSales>,
        breakdown: Option<&SalesBreakdown>,
        settings: &AnalysisSettings,
    ) -> Vec<String> {
        let top = ranking.top(settings.recommendation_size);
        let mut recommendations: Vec<String> =
            render_names(SALES_TOP_DISHES_TEMPLATE, &names(&top, |entry| &entry.dish_name))
                .into_iter()
                .collect();

        if let Some(breakdown) = breakdown {
            if let Some(category) = breakdown.top_categories.first() {
                recommendations.push(render_top_category(&category.category_name));
            }
            if let Some(trend) = sales_trend(&breakdown.sales_trend) {
                recommendations.push(render_trend(&trend));
            }
        }

        recommendations
    }
}

pub struct NutritionProfile<'a> {
    pub calculator: &'a ScoreCalculator,
    pub provider: &'a dyn NutritionProvider,
}

impl AnalysisProfile for NutritionProfile<'_> {
    type Aggregate = ();
    type Entry = NutritionEntry;
    type Key = f64;
    type Breakdown = ();

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::NutritionalBalance
    }

    fn collect_plan(&self) -> CollectPlan {
        CollectPlan::default()
    }

    // Nutrition has no running totals; every dish is scored on its own.
    fn aggregate(&self, _snapshot: &RecordSnapshot) -> Result<(), AnalysisError> {
        Ok(())
    }

    fn score(
        &self,
        snapshot: &RecordSnapshot,
        _aggregate: &(),
    ) -> Result<Vec<NutritionEntry>, AnalysisError> {
        snapshot
            .dishes
            .iter()
            .map(|dish| {
                let facts = self.provider.nutrition_for(dish).ok_or_else(|| {
                    AnalysisError::data_unavailable(format!(
                        "no nutrition data for dish {}",
                        dish.id.0
                    ))
                })?;
                let balance_score = self.calculator.balance(&facts).ok_or_else(|| {
                    AnalysisError::data_unavailable(format!(
                        "dish {} has invalid calories {}",
                        dish.id.0, facts.calories
                    ))
                })?;
                Ok(NutritionEntry {
                    dish_id: dish.id,
                    dish_name: dish.name.clone(),
                    category: dish.category_label(UNKNOWN_CATEGORY).to_string(),
                    calories: facts.calories,
                    protein: facts.protein,
                    carbohydrates: facts.carbohydrates,
                    fat: facts.fat,
                    fiber: facts.fiber,
                    balance_score,
                })
            })
            .collect()
    }

    fn rank_key(&self, entry: &NutritionEntry) -> f64 {
        entry.balance_score
    }

    fn recommend(
        &self,
        ranking: &Ranking<NutritionEntry>,
        _breakdown: Option<&()>,
        settings: &AnalysisSettings,
    ) -> Vec<String> {
        let top = ranking.top(settings.recommendation_size);
        let bottom = ranking.bottom(settings.recommendation_size);
        cohort_recommendations(
            NUTRITION_TEMPLATES,
            &names(&top, |entry| &entry.dish_name),
            &names(&bottom, |entry| &entry.dish_name),
        )
    }
}

fn names<'a, T>(entries: &'a [T], name: impl Fn(&'a T) -> &'a String) -> Vec<&'a str> {
    entries.iter().map(|entry| name(entry).as_str()).collect()
}

fn missing_dish(dish_id: DishId) -> AnalysisError {
    AnalysisError::data_unavailable(format!("aggregated dish {} is missing from the snapshot", dish_id.0))
}

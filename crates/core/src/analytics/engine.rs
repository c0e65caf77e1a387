use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::errors::AnalysisError;

use super::aggregate::{FeedbackAttribution, NoFeedbackAttribution};
use super::nutrition::{NutritionProvider, RandomNutritionProvider};
use super::pipeline;
use super::profiles::{CostProfile, NutritionProfile, QualityProfile, SalesProfile};
use super::scoring::{QualityWeights, ScoreCalculator};
use super::source::RecordSource;
use super::types::{
    AnalysisReport, AnalysisSettings, AnalysisWindow, CostEntry, DishSales, NutritionEntry,
    QualityEntry, SalesBreakdown,
};

pub type QualityReport = AnalysisReport<QualityEntry>;
pub type CostReport = AnalysisReport<CostEntry>;
pub type SalesReport = AnalysisReport<DishSales, SalesBreakdown>;
pub type NutritionReport = AnalysisReport<NutritionEntry>;

/// Entry points for the four analyses over one record source.
///
/// The engine holds no per-run state; every call collects a fresh snapshot
/// and builds its report from scratch.
pub struct AnalysisEngine<S> {
    source: S,
    settings: AnalysisSettings,
    calculator: ScoreCalculator,
    nutrition: Arc<dyn NutritionProvider>,
    attribution: Arc<dyn FeedbackAttribution>,
}

impl<S> AnalysisEngine<S>
where
    S: RecordSource,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            settings: AnalysisSettings::default(),
            calculator: ScoreCalculator::new(),
            nutrition: Arc::new(RandomNutritionProvider::from_entropy()),
            attribution: Arc::new(NoFeedbackAttribution),
        }
    }

    pub fn with_settings(mut self, settings: AnalysisSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_quality_weights(mut self, weights: QualityWeights) -> Self {
        self.calculator = ScoreCalculator::with_weights(weights);
        self
    }

    pub fn with_nutrition_provider(mut self, provider: Arc<dyn NutritionProvider>) -> Self {
        self.nutrition = provider;
        self
    }

    pub fn with_feedback_attribution(mut self, attribution: Arc<dyn FeedbackAttribution>) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Quality over the trailing `days` (default window when `None`).
    pub async fn analyze_quality(&self, days: Option<i64>) -> Result<QualityReport, AnalysisError> {
        self.analyze_quality_as_of(days, today()).await
    }

    pub async fn analyze_quality_as_of(
        &self,
        days: Option<i64>,
        today: NaiveDate,
    ) -> Result<QualityReport, AnalysisError> {
        let profile = QualityProfile {
            window: self.window(days, today)?,
            calculator: &self.calculator,
            attribution: self.attribution.as_ref(),
        };
        pipeline::run(&profile, &self.source, &self.settings).await
    }

    /// Cost-effectiveness over every dish and all recorded sales.
    pub async fn analyze_cost_effectiveness(&self) -> Result<CostReport, AnalysisError> {
        let profile = CostProfile { calculator: &self.calculator };
        pipeline::run(&profile, &self.source, &self.settings).await
    }

    pub async fn analyze_sales(&self, days: Option<i64>) -> Result<SalesReport, AnalysisError> {
        self.analyze_sales_as_of(days, today()).await
    }

    pub async fn analyze_sales_as_of(
        &self,
        days: Option<i64>,
        today: NaiveDate,
    ) -> Result<SalesReport, AnalysisError> {
        let profile = SalesProfile { window: self.window(days, today)? };
        pipeline::run(&profile, &self.source, &self.settings).await
    }

    pub async fn analyze_nutrition(&self) -> Result<NutritionReport, AnalysisError> {
        let profile =
            NutritionProfile { calculator: &self.calculator, provider: self.nutrition.as_ref() };
        pipeline::run(&profile, &self.source, &self.settings).await
    }

    fn window(&self, days: Option<i64>, today: NaiveDate) -> Result<AnalysisWindow, AnalysisError> {
        let days = days.unwrap_or_else(|| i64::from(self.settings.default_window_days));
        AnalysisWindow::trailing(today, days)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};
    use rust_decimal::Decimal;

    use super::AnalysisEngine;
    use crate::analytics::nutrition::{NutritionFacts, NutritionTable};
    use crate::analytics::source::{RecordSource, SourceError};
    use crate::analytics::types::{AnalysisKind, AnalysisSettings};
    use crate::domain::dish::{Dish, DishId};
    use crate::domain::feedback::ServiceFeedback;
    use crate::domain::ingredient::Ingredient;
    use crate::domain::order::CustomerOrder;
    use crate::errors::AnalysisError;

    #[derive(Default)]
    struct StaticSource {
        dishes: Vec<Dish>,
        orders: Vec<CustomerOrder>,
        ingredients: Vec<Ingredient>,
        unavailable: bool,
    }

    #[async_trait]
    impl RecordSource for StaticSource {
        async fn fetch_orders(
            &self,
            since: Option<NaiveDate>,
            until: Option<NaiveDate>,
        ) -> Result<Vec<CustomerOrder>, SourceError> {
            if self.unavailable {
                return Err(SourceError::Unavailable("connection refused".to_owned()));
            }
            Ok(self
                .orders
                .iter()
                .filter(|order| since.map_or(true, |since| order.order_date >= since))
                .filter(|order| until.map_or(true, |until| order.order_date <= until))
                .cloned()
                .collect())
        }

        async fn fetch_dishes(&self) -> Result<Vec<Dish>, SourceError> {
            Ok(self.dishes.clone())
        }

        async fn fetch_ingredients(&self) -> Result<Vec<Ingredient>, SourceError> {
            Ok(self.ingredients.clone())
        }

        async fn fetch_feedback(&self) -> Result<Vec<ServiceFeedback>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 30).expect("date")
    }

    fn days_ago(days: u64) -> NaiveDate {
        today().checked_sub_days(Days::new(days)).expect("date")
    }

    fn price(units: i64) -> Decimal {
        Decimal::new(units, 0)
    }

    #[tokio::test]
    async fn quality_ranks_capped_seller_above_small_seller() {
        let source = StaticSource {
            dishes: vec![Dish::new(1, "Dish A").with_category("Main"), Dish::new(2, "Dish B")],
            orders: vec![
                CustomerOrder::new(1, 1, days_ago(3)).with_item(2, 5, price(10)),
                CustomerOrder::new(2, 1, days_ago(2)).with_item(1, 50, price(20)),
            ],
            ..StaticSource::default()
        };
        let engine = AnalysisEngine::new(source);

        let report = engine.analyze_quality_as_of(Some(30), today()).await.expect("report");

        assert_eq!(report.analysis_type, AnalysisKind::Quality);
        assert_eq!(report.total_dishes, 2);
        assert_eq!(report.top[0].dish_name, "Dish A");
        assert_eq!(report.top[0].quality_score, 0.88);
        assert_eq!(report.top[1].quality_score, 0.34);
        assert_eq!(report.top[1].category, "unknown");
        assert_eq!(report.bottom.len(), 2, "bottom cohort is capped at the population");
        assert_eq!(report.recommendations.len(), 2);
        assert!(report.recommendations[0].contains("Dish A, Dish B"));
        let window = report.window.expect("windowed analysis");
        assert_eq!(window.start, days_ago(30));
        assert_eq!(window.end, today());
    }

    #[tokio::test]
    async fn empty_window_yields_empty_report_without_error() {
        let source = StaticSource {
            dishes: vec![Dish::new(1, "Dish A")],
            orders: vec![CustomerOrder::new(1, 1, days_ago(45)).with_item(1, 3, price(10))],
            ..StaticSource::default()
        };
        let engine = AnalysisEngine::new(source);

        let report = engine.analyze_quality_as_of(None, today()).await.expect("report");

        assert_eq!(report.total_dishes, 0);
        assert!(report.top.is_empty());
        assert!(report.bottom.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[tokio::test]
    async fn sales_over_an_empty_window_keeps_a_zeroed_breakdown() {
        let source = StaticSource {
            dishes: vec![Dish::new(1, "Dish A").with_category("Main")],
            orders: vec![CustomerOrder::new(1, 1, days_ago(45)).with_item(1, 3, price(10))],
            ..StaticSource::default()
        };
        let engine = AnalysisEngine::new(source);

        let report = engine.analyze_sales_as_of(Some(14), today()).await.expect("report");

        assert_eq!(report.total_dishes, 0);
        assert!(report.top.is_empty());
        assert!(report.bottom.is_empty());
        assert!(report.recommendations.is_empty());
        let breakdown = report.breakdown.expect("sales breakdown");
        assert_eq!(breakdown.total_orders, 0);
        assert_eq!(breakdown.total_sales_amount, Decimal::ZERO);
        assert!(breakdown.top_categories.is_empty());
        assert!(breakdown.sales_trend.is_empty());
    }

    #[tokio::test]
    async fn sales_totals_out_of_range_surface_as_data_unavailable() {
        let source = StaticSource {
            dishes: vec![Dish::new(1, "Dish A")],
            orders: vec![
                CustomerOrder::new(1, 1, days_ago(1)).with_item(1, i64::MAX, Decimal::ZERO),
                CustomerOrder::new(2, 1, days_ago(2)).with_item(1, i64::MAX, Decimal::ZERO),
            ],
            ..StaticSource::default()
        };
        let engine = AnalysisEngine::new(source);

        let error = engine.analyze_sales_as_of(Some(7), today()).await.expect_err("overflow");

        assert!(matches!(error, AnalysisError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn bottom_five_over_three_dishes_returns_all_three() {
        let source = StaticSource {
            dishes: (1..=3).map(|id| Dish::new(id, format!("Dish {id}"))).collect(),
            orders: (1..=3)
                .map(|id| CustomerOrder::new(id, 1, days_ago(1)).with_item(id, id * 10, price(5)))
                .collect(),
            ..StaticSource::default()
        };
        let engine = AnalysisEngine::new(source);

        let report = engine.analyze_quality_as_of(Some(7), today()).await.expect("report");

        let bottom: Vec<_> = report.bottom.iter().map(|entry| entry.dish_id).collect();
        assert_eq!(bottom, vec![DishId(3), DishId(2), DishId(1)]);
    }

    #[tokio::test]
    async fn non_positive_days_is_rejected_before_collecting() {
        let engine = AnalysisEngine::new(StaticSource { unavailable: true, ..StaticSource::default() });

        let error = engine.analyze_sales_as_of(Some(0), today()).await.expect_err("invalid");

        assert!(matches!(error, AnalysisError::InvalidParameter { name: "days", .. }));
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let engine = AnalysisEngine::new(StaticSource::default())
            .with_settings(AnalysisSettings { recommendation_size: 0, ..AnalysisSettings::default() });

        let error = engine.analyze_cost_effectiveness().await.expect_err("invalid");

        assert!(matches!(error, AnalysisError::InvalidParameter { name: "recommendation_size", .. }));
    }

    #[tokio::test]
    async fn unavailable_source_aborts_with_data_unavailable() {
        let engine = AnalysisEngine::new(StaticSource { unavailable: true, ..StaticSource::default() });

        let error = engine.analyze_sales_as_of(None, today()).await.expect_err("unavailable");

        assert!(matches!(
            error,
            AnalysisError::DataUnavailable { ref reason } if reason.contains("connection refused")
        ));
    }

    #[tokio::test]
    async fn sales_reports_breakdown_and_growth_trend() {
        let mut orders = Vec::new();
        for offset in 0..14_i64 {
            let amount = if offset < 7 { 100 } else { 80 };
            orders.push(
                CustomerOrder::new(offset + 1, 1, days_ago(offset as u64)).with_item(1, 1, price(amount)),
            );
        }
        orders.push(CustomerOrder::new(100, 2, days_ago(0)).with_item(2, 2, price(0)));
        let source = StaticSource {
            dishes: vec![
                Dish::new(1, "Pork Rib Soup").with_category("Soup"),
                Dish::new(2, "Plain Rice").with_category("Staple"),
            ],
            orders,
            ..StaticSource::default()
        };
        let engine = AnalysisEngine::new(source);

        let report = engine.analyze_sales_as_of(Some(30), today()).await.expect("report");

        let breakdown = report.breakdown.as_ref().expect("sales breakdown");
        assert_eq!(breakdown.total_orders, 15);
        assert_eq!(breakdown.total_sales_amount, price(1260));
        assert_eq!(breakdown.sales_trend.len(), 14);
        assert!(breakdown.sales_trend.windows(2).all(|pair| pair[0].date < pair[1].date));
        assert_eq!(breakdown.sales_trend[13].order_count, 2);
        assert_eq!(breakdown.top_categories[0].category_name, "Soup");
        assert_eq!(report.top[0].dish_name, "Pork Rib Soup");
        assert_eq!(
            report.recommendations,
            vec![
                "Increase supply of these best-selling dishes: Pork Rib Soup, Plain Rice. Demand for them is highest."
                    .to_string(),
                "Soup dishes sell best; consider broadening the choice in this category.".to_string(),
                "Sales grew 25.0% recently; consider more promotions to keep the momentum.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn cost_effectiveness_scores_every_dish() {
        let source = StaticSource {
            dishes: vec![
                Dish::new(1, "Braised Pork").with_ingredient(10, 0.5, "kg"),
                Dish::new(2, "Millet Congee"),
            ],
            ingredients: vec![Ingredient::new(10, "Pork belly", 40.0, "kg")],
            orders: vec![CustomerOrder::new(1, 1, days_ago(400)).with_item(1, 3, price(30))],
            ..StaticSource::default()
        };
        let engine = AnalysisEngine::new(source);

        let report = engine.analyze_cost_effectiveness().await.expect("report");

        assert_eq!(report.total_dishes, 2);
        assert!(report.window.is_none());
        assert_eq!(report.top[0].dish_name, "Braised Pork");
        assert_eq!(report.top[0].profit_margin, 0.78);
        assert_eq!(report.top[1].cost_effectiveness, 0.0);
    }

    #[tokio::test]
    async fn nutrition_uses_injected_provider() {
        let table = NutritionTable::new()
            .with_dish(DishId(1), NutritionFacts::new(300.0, 15.0, 30.0, 10.0, 3.0))
            .with_dish(DishId(2), NutritionFacts::new(400.0, 25.0, 55.0, 9.0, 4.0));
        let source = StaticSource {
            dishes: vec![Dish::new(1, "Fried Dough"), Dish::new(2, "Fish Congee")],
            ..StaticSource::default()
        };
        let engine = AnalysisEngine::new(source).with_nutrition_provider(Arc::new(table));

        let report = engine.analyze_nutrition().await.expect("report");

        let ranked: Vec<_> = report.top.iter().map(|entry| (entry.dish_id, entry.balance_score)).collect();
        assert_eq!(ranked, vec![(DishId(2), 1.0), (DishId(1), 0.7)]);
        assert!(report.recommendations[0].contains("Fish Congee, Fried Dough"));
    }

    #[tokio::test]
    async fn nutrition_with_missing_provider_data_is_data_unavailable() {
        let source = StaticSource { dishes: vec![Dish::new(1, "Fried Dough")], ..StaticSource::default() };
        let engine = AnalysisEngine::new(source).with_nutrition_provider(Arc::new(NutritionTable::new()));

        assert!(matches!(
            engine.analyze_nutrition().await,
            Err(AnalysisError::DataUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn repeated_runs_do_not_share_state() {
        let source = StaticSource {
            dishes: vec![Dish::new(1, "Dish A")],
            orders: vec![CustomerOrder::new(1, 1, days_ago(1)).with_item(1, 4, price(10))],
            ..StaticSource::default()
        };
        let engine = AnalysisEngine::new(source);

        let first = engine.analyze_quality_as_of(Some(30), today()).await.expect("first");
        let second = engine.analyze_quality_as_of(Some(30), today()).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(second.top[0].sales_count, 4);
    }
}

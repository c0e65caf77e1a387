use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use mealdesk_core::analytics::{AnalysisKind, RecordSnapshot, RecordSource, SourceError};
use mealdesk_core::domain::dish::Dish;
use mealdesk_core::domain::feedback::ServiceFeedback;
use mealdesk_core::domain::ingredient::Ingredient;
use mealdesk_core::domain::order::CustomerOrder;

use super::{AnalysisResultRecord, AnalysisResultRepository, RepositoryError};

/// Record source over plain vectors, for tests and offline runs.
#[derive(Default)]
pub struct InMemoryRecordSource {
    records: RwLock<RecordSnapshot>,
}

impl InMemoryRecordSource {
    pub fn from_snapshot(snapshot: RecordSnapshot) -> Self {
        Self { records: RwLock::new(snapshot) }
    }

    pub async fn insert_dish(&self, dish: Dish) {
        let mut records = self.records.write().await;
        records.dishes.retain(|existing| existing.id != dish.id);
        records.dishes.push(dish);
    }

    pub async fn insert_ingredient(&self, ingredient: Ingredient) {
        let mut records = self.records.write().await;
        records.ingredients.retain(|existing| existing.id != ingredient.id);
        records.ingredients.push(ingredient);
    }

    pub async fn insert_order(&self, order: CustomerOrder) {
        let mut records = self.records.write().await;
        records.orders.retain(|existing| existing.id != order.id);
        records.orders.push(order);
    }

    pub async fn insert_feedback(&self, feedback: ServiceFeedback) {
        self.records.write().await.feedback.push(feedback);
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn fetch_orders(
        &self,
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
    ) -> Result<Vec<CustomerOrder>, SourceError> {
        let records = self.records.read().await;
        let mut orders: Vec<CustomerOrder> = records
            .orders
            .iter()
            .filter(|order| since.map_or(true, |since| order.order_date >= since))
            .filter(|order| until.map_or(true, |until| order.order_date <= until))
            .cloned()
            .collect();
        orders.sort_by_key(|order| (order.order_date, order.id));
        Ok(orders)
    }

    async fn fetch_dishes(&self) -> Result<Vec<Dish>, SourceError> {
        let mut dishes = self.records.read().await.dishes.clone();
        dishes.sort_by_key(|dish| dish.id);
        Ok(dishes)
    }

    async fn fetch_ingredients(&self) -> Result<Vec<Ingredient>, SourceError> {
        let mut ingredients = self.records.read().await.ingredients.clone();
        ingredients.sort_by_key(|ingredient| ingredient.id);
        Ok(ingredients)
    }

    async fn fetch_feedback(&self) -> Result<Vec<ServiceFeedback>, SourceError> {
        Ok(self.records.read().await.feedback.clone())
    }
}

#[derive(Default)]
pub struct InMemoryAnalysisResultRepository {
    records: RwLock<Vec<AnalysisResultRecord>>,
}

#[async_trait]
impl AnalysisResultRepository for InMemoryAnalysisResultRepository {
    async fn save(&self, record: AnalysisResultRecord) -> Result<(), RepositoryError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn list_recent(
        &self,
        kind: Option<AnalysisKind>,
        limit: u32,
    ) -> Result<Vec<AnalysisResultRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut matching: Vec<(usize, &AnalysisResultRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| kind.map_or(true, |kind| record.analysis_type == kind))
            .collect();
        // Newest first; later inserts win ties.
        matching.sort_by(|(left_pos, left), (right_pos, right)| {
            right.created_at.cmp(&left.created_at).then(right_pos.cmp(left_pos))
        });

        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(matching.into_iter().take(limit).map(|(_, record)| record.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use mealdesk_core::analytics::{AnalysisEngine, AnalysisKind, AnalysisReport, RecordSource};
    use mealdesk_core::domain::dish::Dish;
    use mealdesk_core::domain::order::CustomerOrder;

    use crate::repositories::{
        AnalysisResultRecord, AnalysisResultRepository, InMemoryAnalysisResultRepository,
        InMemoryRecordSource,
    };

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, day).expect("valid date")
    }

    #[tokio::test]
    async fn in_memory_source_filters_orders_by_inclusive_bounds() {
        let source = InMemoryRecordSource::default();
        source.insert_order(CustomerOrder::new(2, 1, date(20))).await;
        source.insert_order(CustomerOrder::new(1, 1, date(10))).await;
        source.insert_order(CustomerOrder::new(3, 1, date(30))).await;

        let orders =
            source.fetch_orders(Some(date(10)), Some(date(20))).await.expect("fetch orders");

        let ids: Vec<i64> = orders.iter().map(|order| order.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn reinserting_a_dish_replaces_it() {
        let source = InMemoryRecordSource::default();
        source.insert_dish(Dish::new(1, "Pork Rib Soup")).await;
        source.insert_dish(Dish::new(1, "Pork Rib Soup").with_category("Soup")).await;

        let dishes = source.fetch_dishes().await.expect("fetch dishes");

        assert_eq!(dishes.len(), 1);
        assert_eq!(dishes[0].category.as_deref(), Some("Soup"));
    }

    #[tokio::test]
    async fn engine_runs_over_in_memory_source() {
        let source = InMemoryRecordSource::default();
        source.insert_dish(Dish::new(1, "Braised Pork Rice").with_category("Staple")).await;
        source.insert_dish(Dish::new(2, "Millet Congee")).await;
        source
            .insert_order(
                CustomerOrder::new(1, 1, date(28))
                    .with_item(1, 50, Decimal::new(2800, 2))
                    .with_item(2, 5, Decimal::new(600, 2)),
            )
            .await;

        let engine = AnalysisEngine::new(source);
        let report = engine.analyze_quality_as_of(Some(30), date(30)).await.expect("quality");

        assert_eq!(report.total_dishes, 2);
        assert_eq!(report.top[0].dish_name, "Braised Pork Rice");
        assert_eq!(report.top[0].quality_score, 0.88);
        assert_eq!(report.top[1].category, "unknown");
        assert_eq!(report.top[1].quality_score, 0.34);
    }

    #[tokio::test]
    async fn in_memory_results_list_newest_first() {
        let repo = InMemoryAnalysisResultRepository::default();
        for (kind, hour) in [
            (AnalysisKind::Quality, 8),
            (AnalysisKind::CostEffectiveness, 9),
            (AnalysisKind::Quality, 10),
        ] {
            let report: AnalysisReport<String> = AnalysisReport {
                analysis_type: kind,
                window: None,
                total_dishes: 0,
                top: Vec::new(),
                bottom: Vec::new(),
                recommendations: Vec::new(),
                breakdown: None,
            };
            let created_at = Utc.with_ymd_and_hms(2026, 6, 1, hour, 0, 0).single().expect("time");
            let record = AnalysisResultRecord::from_report(&report, json!({}), created_at)
                .expect("encode report");
            repo.save(record).await.expect("save record");
        }

        let quality = repo.list_recent(Some(AnalysisKind::Quality), 5).await.expect("list");
        let hours: Vec<String> =
            quality.iter().map(|record| record.created_at.format("%H").to_string()).collect();
        assert_eq!(hours, vec!["10", "08"]);
        assert_eq!(repo.list_recent(None, 1).await.expect("list").len(), 1);
    }
}

//! Analytics & recommendation engine
//!
//! Turns order history, dish compositions and service feedback into ranked
//! quality, cost-effectiveness, sales and nutrition reports. One generic
//! pipeline runs every analysis; the per-analysis differences live in the
//! profiles.

pub mod aggregate;
pub mod engine;
pub mod nutrition;
pub mod pipeline;
pub mod profiles;
pub mod ranking;
pub mod recommend;
pub mod scoring;
pub mod source;
pub mod types;

pub use aggregate::{FeedbackAttribution, MetricTable, NoFeedbackAttribution};
pub use engine::{AnalysisEngine, CostReport, NutritionReport, QualityReport, SalesReport};
pub use nutrition::{NutritionFacts, NutritionProvider, NutritionTable, RandomNutritionProvider};
pub use pipeline::{AnalysisProfile, PipelineRun, PipelineStage, PipelineTransitionError};
pub use ranking::{Ranking, SortKey};
pub use scoring::{QualityWeights, ScoreCalculator};
pub use source::{CollectPlan, OrderScope, RecordSnapshot, RecordSource, SourceError};
pub use types::*;

/// Default scoring weights for the quality analysis
pub const DEFAULT_QUALITY_WEIGHTS: QualityWeights = QualityWeights {
    sales_weight: 0.6,
    rating_weight: 0.4,
    sales_normalizer: 10.0,
    sales_cap: 5.0,
    neutral_rating: 3.5,
};

/// Trailing window used when the caller does not pass one
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Size of the top and bottom cohorts in a report
pub const DEFAULT_COHORT_SIZE: usize = 5;

/// Number of names quoted in each recommendation sentence
pub const DEFAULT_RECOMMENDATION_SIZE: usize = 3;

/// Number of categories surfaced by the sales analysis
pub const DEFAULT_CATEGORY_COHORT_SIZE: usize = 3;

/// Display label for dishes without a category
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Days per side of the sales trend comparison
pub const TREND_SPAN_DAYS: usize = 7;

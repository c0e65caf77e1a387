//! Recommendation templates and rendering
//!
//! Templates carry `{{names}}`, `{{category}}` and `{{percent}}`
//! placeholders. A sentence whose cohort is empty is omitted rather than
//! rendered with a blank.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::types::{AnalysisKind, DailySales};
use super::TREND_SPAN_DAYS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CohortTemplates {
    pub top: &'static str,
    pub bottom: &'static str,
}

pub const QUALITY_TEMPLATES: CohortTemplates = CohortTemplates {
    top: "Promote these dishes: {{names}}. They have the highest quality scores and are popular with customers.",
    bottom: "Review these dishes: {{names}}. Their quality scores are the lowest; consider adjusting the recipe or preparation.",
};

pub const COST_TEMPLATES: CohortTemplates = CohortTemplates {
    top: "Promote these cost-effective dishes: {{names}}. They carry the best profit margins and sell well.",
    bottom: "Optimize the cost structure of these dishes: {{names}}. Their cost-effectiveness is low; consider adjusting the recipe or pricing.",
};

pub const NUTRITION_TEMPLATES: CohortTemplates = CohortTemplates {
    top: "Promote these nutritionally balanced dishes: {{names}}. Their macronutrient mix is well proportioned.",
    bottom: "Improve the nutritional balance of these dishes: {{names}}. Their macronutrient mix needs adjusting.",
};

pub const SALES_TOP_DISHES_TEMPLATE: &str =
    "Increase supply of these best-selling dishes: {{names}}. Demand for them is highest.";
pub const SALES_TOP_CATEGORY_TEMPLATE: &str =
    "{{category}} dishes sell best; consider broadening the choice in this category.";
pub const SALES_GROWTH_TEMPLATE: &str =
    "Sales grew {{percent}}% recently; consider more promotions to keep the momentum.";
pub const SALES_DECLINE_TEMPLATE: &str =
    "Sales declined {{percent}}% recently; review the menu and promotion strategy.";

pub fn cohort_templates(kind: AnalysisKind) -> Option<CohortTemplates> {
    match kind {
        AnalysisKind::Quality => Some(QUALITY_TEMPLATES),
        AnalysisKind::CostEffectiveness => Some(COST_TEMPLATES),
        AnalysisKind::NutritionalBalance => Some(NUTRITION_TEMPLATES),
        AnalysisKind::SalesPerformance => None,
    }
}

pub fn render(template: &str, variables: &HashMap<&str, String>) -> String {
    let mut output = template.to_string();
    for (key, value) in variables {
        output = output.replace(&format!("{{{{{key}}}}}"), value);
    }
    output
}

/// Renders a `{{names}}` template, or nothing for an empty cohort.
pub fn render_names(template: &str, names: &[&str]) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let variables = HashMap::from([("names", names.join(", "))]);
    Some(render(template, &variables))
}

/// Praise for the best entities, then a review note for the worst.
pub fn cohort_recommendations(
    templates: CohortTemplates,
    top_names: &[&str],
    bottom_names: &[&str],
) -> Vec<String> {
    [render_names(templates.top, top_names), render_names(templates.bottom, bottom_names)]
        .into_iter()
        .flatten()
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SalesTrend {
    Growth(Decimal),
    Decline(Decimal),
}

impl SalesTrend {
    pub fn percent(&self) -> Decimal {
        match self {
            Self::Growth(percent) | Self::Decline(percent) => *percent,
        }
    }
}

/// Compares the mean of the latest seven daily totals with the seven before.
///
/// Needs at least two full spans of buckets and a non-zero earlier mean.
/// A change too large to represent yields no trend.
pub fn sales_trend(days: &[DailySales]) -> Option<SalesTrend> {
    if days.len() < TREND_SPAN_DAYS * 2 {
        return None;
    }

    let span = Decimal::from(TREND_SPAN_DAYS as u64);
    let recent_start = days.len() - TREND_SPAN_DAYS;
    let previous_start = recent_start - TREND_SPAN_DAYS;

    let recent_avg = span_total(&days[recent_start..])?.checked_div(span)?;
    let previous_avg = span_total(&days[previous_start..recent_start])?.checked_div(span)?;

    if previous_avg.is_zero() {
        return None;
    }

    let percent = recent_avg
        .checked_sub(previous_avg)?
        .abs()
        .checked_div(previous_avg)?
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp(2);
    if recent_avg >= previous_avg {
        Some(SalesTrend::Growth(percent))
    } else {
        Some(SalesTrend::Decline(percent))
    }
}

fn span_total(days: &[DailySales]) -> Option<Decimal> {
    days.iter().try_fold(Decimal::ZERO, |total, day| total.checked_add(day.total_amount))
}

pub fn render_trend(trend: &SalesTrend) -> String {
    let template = match trend {
        SalesTrend::Growth(_) => SALES_GROWTH_TEMPLATE,
        SalesTrend::Decline(_) => SALES_DECLINE_TEMPLATE,
    };
    let variables = HashMap::from([("percent", format_percent(trend.percent()))]);
    render(template, &variables)
}

pub fn render_top_category(category: &str) -> String {
    let variables = HashMap::from([("category", category.to_string())]);
    render(SALES_TOP_CATEGORY_TEMPLATE, &variables)
}

/// At most two decimals, at least one (`25.0`, `12.5`, `3.14`).
pub fn format_percent(percent: Decimal) -> String {
    let normalized = percent.round_dp(2).normalize();
    if normalized.scale() == 0 {
        format!("{normalized}.0")
    } else {
        normalized.to_string()
    }
}

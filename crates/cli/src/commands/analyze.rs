use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use mealdesk_core::access::{AccessPolicy, Action, Resource, Role};
use mealdesk_core::analytics::{
    AnalysisEngine, AnalysisKind, AnalysisReport, NutritionProvider, RandomNutritionProvider,
};
use mealdesk_core::config::AppConfig;
use mealdesk_core::errors::{AnalysisError, ApplicationError};
use mealdesk_db::repositories::{
    AnalysisResultRecord, AnalysisResultRepository, SqlAnalysisResultRepository, SqlRecordSource,
};
use mealdesk_db::DbPool;

use crate::commands::{build_runtime, load_config, open_database, CommandResult, Failure};

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[arg(help = "Analysis to run: quality, cost, sales or nutrition")]
    pub kind: String,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Trailing window in days (quality and sales only)"
    )]
    pub days: Option<i64>,
    #[arg(long, default_value = "admin", help = "Role of the caller, checked against the access policy")]
    pub role: String,
    #[arg(long, help = "Store the finished report in ai_analysis_result")]
    pub persist: bool,
}

pub fn run(args: AnalyzeArgs) -> CommandResult {
    run_with_policy(args, &AccessPolicy::standard())
}

/// Runs an analysis after the caller's role clears `read` on `ai_analysis`.
/// On success the output is the report JSON itself.
pub fn run_with_policy(args: AnalyzeArgs, policy: &AccessPolicy) -> CommandResult {
    let correlation_id = Uuid::new_v4().to_string();

    let Some(kind) = AnalysisKind::parse(&args.kind) else {
        let error = AnalysisError::invalid_parameter(
            "kind",
            format!("unknown analysis `{}` (expected quality|cost|sales|nutrition)", args.kind),
        );
        return application_failure(ApplicationError::Analysis(error), &correlation_id);
    };

    if let Err(error) = authorize(policy, &args.role) {
        return application_failure(error, &correlation_id);
    }

    let config = match load_config("analyze") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("analyze") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let outcome = execute(&pool, &config, kind, &args).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(output) => {
            tracing::info!(
                event_name = "system.cli.analyze",
                correlation_id = %correlation_id,
                analysis_type = kind.as_str(),
                role = %args.role,
                persisted = args.persist,
                "analysis report produced"
            );
            CommandResult { exit_code: 0, output }
        }
        Err(Outcome::Infrastructure((error_class, message, exit_code))) => {
            CommandResult::failure("analyze", error_class, message, exit_code)
        }
        Err(Outcome::Application(error)) => application_failure(error, &correlation_id),
    }
}

enum Outcome {
    Infrastructure(Failure),
    Application(ApplicationError),
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        Self::Infrastructure(failure)
    }
}

impl From<AnalysisError> for Outcome {
    fn from(error: AnalysisError) -> Self {
        Self::Application(ApplicationError::Analysis(error))
    }
}

fn authorize(policy: &AccessPolicy, raw_role: &str) -> Result<Role, ApplicationError> {
    let role = Role::parse(raw_role)
        .ok_or_else(|| ApplicationError::AccessDenied(format!("unknown role `{raw_role}`")))?;
    let decision = policy.check(role, Resource::AiAnalysis, Action::Read);
    if decision.allowed {
        Ok(role)
    } else {
        Err(ApplicationError::AccessDenied(decision.reason))
    }
}

async fn execute(
    pool: &DbPool,
    config: &AppConfig,
    kind: AnalysisKind,
    args: &AnalyzeArgs,
) -> Result<String, Outcome> {
    let engine = AnalysisEngine::new(SqlRecordSource::new(pool.clone()))
        .with_settings(config.analysis.settings())
        .with_nutrition_provider(nutrition_provider(config.analysis.nutrition_seed));

    // Window size only applies to the windowed analyses.
    let days = if kind.is_windowed() { args.days } else { None };
    let persist = args.persist.then(|| (pool, json!({ "days": days, "role": args.role })));

    match kind {
        AnalysisKind::Quality => finish(&engine.analyze_quality(days).await?, persist).await,
        AnalysisKind::CostEffectiveness => {
            finish(&engine.analyze_cost_effectiveness().await?, persist).await
        }
        AnalysisKind::SalesPerformance => finish(&engine.analyze_sales(days).await?, persist).await,
        AnalysisKind::NutritionalBalance => {
            finish(&engine.analyze_nutrition().await?, persist).await
        }
    }
}

fn nutrition_provider(seed: Option<u64>) -> Arc<dyn NutritionProvider> {
    match seed {
        Some(seed) => Arc::new(RandomNutritionProvider::seeded(seed)),
        None => Arc::new(RandomNutritionProvider::from_entropy()),
    }
}

async fn finish<E, X>(
    report: &AnalysisReport<E, X>,
    persist: Option<(&DbPool, serde_json::Value)>,
) -> Result<String, Outcome>
where
    E: Serialize,
    X: Serialize,
{
    if let Some((pool, parameters)) = persist {
        let record = AnalysisResultRecord::from_report(report, parameters, Utc::now())
            .map_err(|error| ApplicationError::Persistence(error.to_string()))
            .map_err(Outcome::Application)?;
        let record_id = record.id.clone();
        SqlAnalysisResultRepository::new(pool.clone())
            .save(record)
            .await
            .map_err(|error| Outcome::Application(ApplicationError::Persistence(error.to_string())))?;
        tracing::debug!(event_name = "system.cli.analyze.persisted", record_id = %record_id);
    }

    serde_json::to_string(report)
        .map_err(|error| Outcome::Infrastructure(("serialization", error.to_string(), 12u8)))
}

fn application_failure(error: ApplicationError, correlation_id: &str) -> CommandResult {
    let (error_class, exit_code) = classify(&error);
    let interface = error.into_interface(correlation_id);
    CommandResult::failure(
        "analyze",
        error_class,
        format!("{interface} (correlation_id: {})", interface.correlation_id()),
        exit_code,
    )
}

fn classify(error: &ApplicationError) -> (&'static str, u8) {
    match error {
        ApplicationError::AccessDenied(_) => ("access_denied", 7),
        ApplicationError::Analysis(error) => {
            let exit_code = match error {
                AnalysisError::InvalidParameter { .. } => 8,
                AnalysisError::DataUnavailable { .. } => 9,
                AnalysisError::Pipeline(_) => 10,
            };
            (error.class(), exit_code)
        }
        ApplicationError::Persistence(_) => ("persistence", 11),
    }
}

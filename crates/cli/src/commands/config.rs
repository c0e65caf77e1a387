use std::env;
use std::fs;
use std::path::Path;

use mealdesk_core::config::{resolve_config_path, AppConfig, LogFormat};
use toml::Value;

use crate::commands::{load_config, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::success("config", lines.join("\n"))
}

struct EffectiveField {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn effective_fields(config: &AppConfig) -> Vec<EffectiveField> {
    let analysis = &config.analysis;
    vec![
        EffectiveField {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["MEALDESK_DATABASE_URL"],
        },
        EffectiveField {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["MEALDESK_DATABASE_MAX_CONNECTIONS"],
        },
        EffectiveField {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["MEALDESK_DATABASE_TIMEOUT_SECS"],
        },
        EffectiveField {
            key: "analysis.default_window_days",
            value: analysis.default_window_days.to_string(),
            env_keys: &["MEALDESK_ANALYSIS_DEFAULT_WINDOW_DAYS"],
        },
        EffectiveField {
            key: "analysis.cohort_size",
            value: analysis.cohort_size.to_string(),
            env_keys: &["MEALDESK_ANALYSIS_COHORT_SIZE"],
        },
        EffectiveField {
            key: "analysis.recommendation_size",
            value: analysis.recommendation_size.to_string(),
            env_keys: &["MEALDESK_ANALYSIS_RECOMMENDATION_SIZE"],
        },
        EffectiveField {
            key: "analysis.category_cohort_size",
            value: analysis.category_cohort_size.to_string(),
            env_keys: &["MEALDESK_ANALYSIS_CATEGORY_COHORT_SIZE"],
        },
        EffectiveField {
            key: "analysis.nutrition_seed",
            value: analysis
                .nutrition_seed
                .map_or_else(|| "<unset>".to_string(), |seed| seed.to_string()),
            env_keys: &["MEALDESK_ANALYSIS_NUTRITION_SEED"],
        },
        EffectiveField {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["MEALDESK_LOGGING_LEVEL", "MEALDESK_LOG_LEVEL"],
        },
        EffectiveField {
            key: "logging.format",
            value: format_name(config.logging.format).to_string(),
            env_keys: &["MEALDESK_LOGGING_FORMAT", "MEALDESK_LOG_FORMAT"],
        },
    ]
}

fn format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let from_env = env_keys.iter().find(|key| {
        env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
    });
    if let Some(env_key) = from_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

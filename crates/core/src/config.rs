use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::types::AnalysisSettings;
use crate::analytics::{
    DEFAULT_CATEGORY_COHORT_SIZE, DEFAULT_COHORT_SIZE, DEFAULT_RECOMMENDATION_SIZE,
    DEFAULT_WINDOW_DAYS,
};

pub const DEFAULT_CONFIG_FILE: &str = "mealdesk.toml";
pub const NESTED_CONFIG_FILE: &str = "config/mealdesk.toml";

/// Upper bound on any analysis window or cohort knob.
const MAX_WINDOW_DAYS: u32 = 3_650;
const MAX_COHORT_SIZE: usize = 100;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub default_window_days: u32,
    pub cohort_size: usize,
    pub recommendation_size: usize,
    pub category_cohort_size: usize,
    /// Seeds the stand-in nutrition provider; `None` draws from entropy.
    pub nutrition_seed: Option<u64>,
}

impl AnalysisConfig {
    pub fn settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            default_window_days: self.default_window_days,
            cohort_size: self.cohort_size,
            recommendation_size: self.recommendation_size,
            category_cohort_size: self.category_cohort_size,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub default_window_days: Option<u32>,
    pub nutrition_seed: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://mealdesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            analysis: AnalysisConfig {
                default_window_days: DEFAULT_WINDOW_DAYS,
                cohort_size: DEFAULT_COHORT_SIZE,
                recommendation_size: DEFAULT_RECOMMENDATION_SIZE,
                category_cohort_size: DEFAULT_CATEGORY_COHORT_SIZE,
                nutrition_seed: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(analysis) = patch.analysis {
            if let Some(default_window_days) = analysis.default_window_days {
                self.analysis.default_window_days = default_window_days;
            }
            if let Some(cohort_size) = analysis.cohort_size {
                self.analysis.cohort_size = cohort_size;
            }
            if let Some(recommendation_size) = analysis.recommendation_size {
                self.analysis.recommendation_size = recommendation_size;
            }
            if let Some(category_cohort_size) = analysis.category_cohort_size {
                self.analysis.category_cohort_size = category_cohort_size;
            }
            if let Some(nutrition_seed) = analysis.nutrition_seed {
                self.analysis.nutrition_seed = Some(nutrition_seed);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("MEALDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("MEALDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("MEALDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("MEALDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("MEALDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MEALDESK_ANALYSIS_DEFAULT_WINDOW_DAYS") {
            self.analysis.default_window_days =
                parse_u32("MEALDESK_ANALYSIS_DEFAULT_WINDOW_DAYS", &value)?;
        }
        if let Some(value) = read_env("MEALDESK_ANALYSIS_COHORT_SIZE") {
            self.analysis.cohort_size = parse_usize("MEALDESK_ANALYSIS_COHORT_SIZE", &value)?;
        }
        if let Some(value) = read_env("MEALDESK_ANALYSIS_RECOMMENDATION_SIZE") {
            self.analysis.recommendation_size =
                parse_usize("MEALDESK_ANALYSIS_RECOMMENDATION_SIZE", &value)?;
        }
        if let Some(value) = read_env("MEALDESK_ANALYSIS_CATEGORY_COHORT_SIZE") {
            self.analysis.category_cohort_size =
                parse_usize("MEALDESK_ANALYSIS_CATEGORY_COHORT_SIZE", &value)?;
        }
        if let Some(value) = read_env("MEALDESK_ANALYSIS_NUTRITION_SEED") {
            self.analysis.nutrition_seed =
                Some(parse_u64("MEALDESK_ANALYSIS_NUTRITION_SEED", &value)?);
        }

        let log_level =
            read_env("MEALDESK_LOGGING_LEVEL").or_else(|| read_env("MEALDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MEALDESK_LOGGING_FORMAT").or_else(|| read_env("MEALDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(default_window_days) = overrides.default_window_days {
            self.analysis.default_window_days = default_window_days;
        }
        if let Some(nutrition_seed) = overrides.nutrition_seed {
            self.analysis.nutrition_seed = Some(nutrition_seed);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_analysis(&self.analysis)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file `load` would read for `explicit_path`, if it exists.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_analysis(analysis: &AnalysisConfig) -> Result<(), ConfigError> {
    if analysis.default_window_days == 0 || analysis.default_window_days > MAX_WINDOW_DAYS {
        return Err(ConfigError::Validation(format!(
            "analysis.default_window_days must be in range 1..={MAX_WINDOW_DAYS}"
        )));
    }

    let cohorts = [
        ("analysis.cohort_size", analysis.cohort_size),
        ("analysis.recommendation_size", analysis.recommendation_size),
        ("analysis.category_cohort_size", analysis.category_cohort_size),
    ];
    for (key, value) in cohorts {
        if value == 0 || value > MAX_COHORT_SIZE {
            return Err(ConfigError::Validation(format!(
                "{key} must be in range 1..={MAX_COHORT_SIZE}"
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    analysis: Option<AnalysisPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisPatch {
    default_window_days: Option<u32>,
    cohort_size: Option<usize>,
    recommendation_size: Option<usize>,
    category_cohort_size: Option<usize>,
    nutrition_seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_analysis_engine_defaults() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        let settings = config.analysis.settings();

        ensure(settings.default_window_days == 30, "default window should be 30 days")?;
        ensure(settings.cohort_size == 5, "default cohort should be 5")?;
        ensure(settings.recommendation_size == 3, "default recommendation cohort should be 3")?;
        ensure(settings.category_cohort_size == 3, "default category cohort should be 3")?;
        ensure(config.analysis.nutrition_seed.is_none(), "nutrition seed should default to unset")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_MEALDESK_DB_PATH", "/var/lib/mealdesk/analytics.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("mealdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://${TEST_MEALDESK_DB_PATH}"

[analysis]
cohort_size = 8
nutrition_seed = 42
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite:///var/lib/mealdesk/analytics.db",
                "database url should be interpolated from environment",
            )?;
            ensure(config.analysis.cohort_size == 8, "cohort size should come from file")?;
            ensure(config.analysis.nutrition_seed == Some(42), "seed should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_MEALDESK_DB_PATH"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("mealdesk.toml");
        fs::write(&path, "[database]\nurl = \"${TEST_MEALDESK_UNSET_VAR}\"\n")
            .map_err(|err| err.to_string())?;

        let error =
            match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
                Ok(_) => return Err("expected interpolation failure".to_string()),
                Err(error) => error,
            };

        ensure(
            matches!(error, ConfigError::MissingEnvInterpolation { ref var } if var == "TEST_MEALDESK_UNSET_VAR"),
            "interpolation failure should name the variable",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MEALDESK_LOG_LEVEL", "warn");
        env::set_var("MEALDESK_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["MEALDESK_LOG_LEVEL", "MEALDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MEALDESK_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("MEALDESK_ANALYSIS_DEFAULT_WINDOW_DAYS", "14");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("mealdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"
max_connections = 2

[analysis]
default_window_days = 60
recommendation_size = 4

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.database.max_connections == 2, "file value should beat the default")?;
            ensure(
                config.analysis.default_window_days == 14,
                "env window should win over file and defaults",
            )?;
            ensure(config.analysis.recommendation_size == 4, "file recommendation size should apply")?;
            Ok(())
        })();

        clear_vars(&["MEALDESK_DATABASE_URL", "MEALDESK_ANALYSIS_DEFAULT_WINDOW_DAYS"]);
        result
    }

    #[test]
    fn invalid_env_override_names_the_variable() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MEALDESK_ANALYSIS_COHORT_SIZE", "five");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. } if key == "MEALDESK_ANALYSIS_COHORT_SIZE"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["MEALDESK_ANALYSIS_COHORT_SIZE"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MEALDESK_ANALYSIS_RECOMMENDATION_SIZE", "0");
        env::set_var("MEALDESK_DATABASE_URL", "sqlite://ok.db");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("analysis.recommendation_size")
            );
            ensure(has_message, "validation failure should mention analysis.recommendation_size")
        })();

        clear_vars(&["MEALDESK_ANALYSIS_RECOMMENDATION_SIZE", "MEALDESK_DATABASE_URL"]);
        result
    }

    #[test]
    fn non_sqlite_database_url_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://localhost/mealdesk".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("database.url")),
            "validation failure should mention database.url",
        )
    }

    #[test]
    fn require_file_reports_missing_path() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected missing file error".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(error, ConfigError::MissingConfigFile(ref missing) if *missing == path),
            "missing file error should carry the requested path",
        )
    }
}

pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use mealdesk_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "mealdesk",
    about = "Mealdesk analytics CLI",
    long_about = "Inspect configuration, prepare the database, and run the quality, cost, sales and nutrition analyses.",
    after_help = "Examples:\n  mealdesk migrate\n  mealdesk seed\n  mealdesk analyze sales --days 14\n  mealdesk analyze quality --role chef --persist"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset and verify it")]
    Seed,
    #[command(about = "Run one analysis and print its report as JSON")]
    Analyze(commands::analyze::AnalyzeArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Analyze(args) => commands::analyze::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Stderr logging from the `[logging]` section. Invalid config falls back to
/// info/compact; the command itself reports the config error.
fn init_logging() {
    use tracing::Level;

    let (level, format) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => (config.logging.level, config.logging.format),
        Err(_) => ("info".to_string(), LogFormat::Compact),
    };
    let log_level = level.parse::<Level>().unwrap_or(Level::INFO);

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded; keep it.
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn analyze_accepts_kind_days_role_and_persist() {
        let cli = Cli::try_parse_from([
            "mealdesk", "analyze", "sales", "--days", "14", "--role", "chef", "--persist",
        ])
        .expect("parse analyze");

        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze command");
        };
        assert_eq!(args.kind, "sales");
        assert_eq!(args.days, Some(14));
        assert_eq!(args.role, "chef");
        assert!(args.persist);
    }

    #[test]
    fn analyze_defaults_to_admin_without_window_override() {
        let cli = Cli::try_parse_from(["mealdesk", "analyze", "quality"]).expect("parse analyze");

        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze command");
        };
        assert_eq!(args.days, None);
        assert_eq!(args.role, "admin");
        assert!(!args.persist);
    }

    #[test]
    fn negative_days_reach_the_engine_for_validation() {
        let cli = Cli::try_parse_from(["mealdesk", "analyze", "quality", "--days", "-3"])
            .expect("parse analyze");

        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze command");
        };
        assert_eq!(args.days, Some(-3));
    }
}

//! svws-rollover CLI - school-year rollover for SVWS MariaDB databases.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use svws_rollover::orchestrator::health_check;
use svws_rollover::{
    parse_step_list, Config, Orchestrator, RolloverError, RunOptions, RunReport, StepRegistry,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "svws-rollover")]
#[command(about = "Advance an SVWS school database by one school year")]
#[command(version)]
struct Cli {
    /// Path to the configuration file (JSON or YAML)
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Read connection settings from MARIADB_* environment variables
    #[arg(long, global = true)]
    from_env: bool,

    /// Output JSON result to stdout
    #[arg(long, global = true)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, global = true, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available rollover steps
    ListSteps,

    /// Run the rollover
    Run {
        /// Execute every step, then roll back instead of committing
        #[arg(long)]
        dry_run: bool,

        /// Comma-separated step keys to run (default: all; must not be empty)
        #[arg(long, value_name = "KEYS")]
        steps: Option<String>,

        /// Compare table checksums before and after a dry run
        #[arg(long, requires = "dry_run")]
        verify: bool,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, RolloverError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| RolloverError::Config(e.to_string()))?;

    match cli.command {
        Commands::ListSteps => {
            let registry = StepRegistry::standard();
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(registry.steps())?);
            } else {
                println!("Available steps (in execution order):");
                for (key, description) in registry.list_steps() {
                    println!("  {:<30} {}", key, description);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Run {
            dry_run,
            steps,
            verify,
        } => {
            // Unknown keys and an empty list fail before the config is even read
            let requested = steps.as_deref().map(parse_step_list);
            if let Some(keys) = &requested {
                StepRegistry::standard().resolve_all(Some(keys.as_slice()))?;
            }

            let config = load_config(&cli.config, cli.from_env)?;
            let keys = requested.or_else(|| config.rollover.default_steps().map(<[String]>::to_vec));

            let cancel_token = setup_signal_handler().await?;
            let mut options = RunOptions::from_config(&config.rollover)
                .dry_run(dry_run)
                .with_cancel(cancel_token);
            if verify {
                options.verify_dry_run = true;
            }

            let report = Orchestrator::new(options)
                .run_with_config(&config, keys.as_deref())
                .await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }

            Ok(ExitCode::from(report.exit_code()))
        }

        Commands::HealthCheck => {
            let config = load_config(&cli.config, cli.from_env)?;
            let result = health_check(&config.database).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  MariaDB ({}): {} ({}ms)",
                    result.endpoint,
                    if result.healthy { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref version) = result.server_version {
                    println!("  Server version: {}", version);
                }
                if let Some(rows) = result.segment_rows {
                    println!("  Schuljahresabschnitte: {} rows", rows);
                }
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
            }

            if !result.healthy {
                return Err(RolloverError::connection(
                    result.error.unwrap_or_default(),
                    "health check",
                ));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: &Path, from_env: bool) -> Result<Config, RolloverError> {
    if from_env {
        info!("Loading connection settings from environment");
        Config::from_env()
    } else {
        Config::load(path)
    }
}

fn print_report(report: &RunReport) {
    let status_msg = match (report.success, report.dry_run) {
        (true, true) => "Dry run completed, all changes rolled back.",
        (true, false) => "Rollover committed!",
        (false, _) => "Rollover failed, all changes rolled back.",
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", report.run_id);
    println!("  Duration: {:.2}s", report.duration_seconds);

    for step in &report.steps {
        let mark = if step.success { "✓" } else { "✗" };
        println!("  {} {:<30} {} rows", mark, step.key, step.rows_affected);
        for shift in &step.year_shifts {
            println!("      Jahr {} -> {}: {} rows", shift.from, shift.to, shift.rows);
        }
        for sample in &step.samples {
            println!("      {}: {} -> {}", sample.column, sample.old, sample.new);
        }
        if let Some(unmatched) = step.unmatched_values.filter(|n| *n > 0) {
            println!("      {} value(s) left unchanged (not D.M.YYYY)", unmatched);
        }
        if let Some(ref err) = step.error {
            println!("      Error: {}", err.message);
        }
    }

    println!("  Rows: {}", report.rows_affected());
    if let Some(verified) = report.dry_run_verified {
        println!(
            "  Checksums: {}",
            if verified { "unchanged" } else { "CHANGED" }
        );
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Cancel the run on SIGINT (Ctrl-C) or SIGTERM. The orchestrator checks
/// the token between steps and rolls back.
#[cfg(unix)]
async fn setup_signal_handler() -> Result<CancellationToken, RolloverError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        eprintln!("\nReceived {}. Rolling back after the current step...", name);
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
async fn setup_signal_handler() -> Result<CancellationToken, RolloverError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Rolling back after the current step...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}

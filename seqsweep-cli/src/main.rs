//! seqsweep CLI: runs the experiment sweep described by the settings in the
//! working directory and prints the results table.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use seqsweep_core::{
    ConfigurationSpace, FailedRun, SweepOutcome, SweepRunner, SweepSettings, load_configurations,
    load_settings,
};
use seqsweep_pipeline::{FileDataSource, ReferencePipelineBuilder, SyntheticSensorData};

/// Sweep phased sequence-classification experiments over every combination of
/// the configured axes.
///
/// Settings are read from `seqsweep.toml` in the working directory and
/// `SEQSWEEP_*` environment variables.
#[derive(Parser, Debug)]
#[command(name = "seqsweep", version, about, long_about = None)]
struct Cli {}

fn init_logging(verbosity: u8) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = match verbosity {
        0 => "warn,seqsweep_core=info",
        1 => "info",
        _ => "debug",
    };

    // Human-readable layer for stderr; RUST_LOG wins when set
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "seqsweep", "seqsweep")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "seqsweep.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

fn run_sweep(settings: &SweepSettings) -> anyhow::Result<SweepOutcome> {
    let structures = load_configurations(
        &settings.config_dir,
        settings.use_config_template,
        &settings.axes.num_categories,
    )?;
    let space = ConfigurationSpace::from_settings(settings, structures);
    tracing::info!(runs = space.len(), "Configuration space ready");

    let runner = SweepRunner::new(
        settings,
        Box::new(SyntheticSensorData::new(settings.sequence_length, settings.seed)),
        Box::new(FileDataSource),
        Box::new(ReferencePipelineBuilder::new(settings.seed)),
    );
    Ok(runner.run(&space)?)
}

fn print_outcome(outcome: &SweepOutcome, workspace: &Path) {
    let shown = |path: &Path| {
        path.strip_prefix(workspace)
            .unwrap_or(path)
            .display()
            .to_string()
    };

    println!("{}\n", outcome.report.table);
    for path in &outcome.report.trace_paths {
        println!("==> Trace saved to {}", shown(path));
    }
    println!("==> Results saved to {}", shown(&outcome.report.summary_path));
    println!("==> Summary JSON saved to {}", shown(&outcome.report.json_path));

    if !outcome.failures.is_empty() {
        eprintln!("\n{}", failure_report(&outcome.failures));
    }
}

/// One entry per failed run: its axis values, then the error.
fn failure_report(failures: &[FailedRun]) -> String {
    let mut out = format!("{} run(s) failed:", failures.len());
    for failed in failures {
        out.push_str(&format!("\n  - {}\n    {}", failed.descriptor, failed.error));
    }
    out
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let _cli = Cli::parse();

    let workspace = std::env::current_dir()?;
    let settings = load_settings(Some(&workspace))
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?
        .resolve_paths(&workspace);

    let _guard = init_logging(settings.verbosity);
    tracing::debug!(?settings, "Settings loaded");

    let outcome = run_sweep(&settings)?;
    print_outcome(&outcome, &workspace);

    if outcome.is_success() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} runs failed",
            outcome.failures.len(),
            outcome.failures.len() + outcome.report.rows.len()
        )
    }
}

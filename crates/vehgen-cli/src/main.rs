//! vehgen CLI: generate vehicle telemetry CSV batches and upload them.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vehgen_core::config::GeneratorConfig;
use vehgen_core::day::DayWindow;
use vehgen_exec::{plan_windows, DayOutcome, Pipeline};

#[derive(Parser)]
#[command(name = "vehgen")]
#[command(about = "Synthetic vehicle telemetry generator with windowed upload", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, upload, and clean up every configured day
    Run {
        /// Settings file, or a directory holding appsettings.json
        #[arg(short, long, default_value = ".")]
        settings: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Default filter when RUST_LOG is unset
        #[arg(long, default_value = "info")]
        log_level: String,

        #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
        log_format: LogFormat,
    },

    /// Load and validate settings, then print the parsed columns
    Validate {
        /// Settings file, or a directory holding appsettings.json
        #[arg(short, long, default_value = ".")]
        settings: PathBuf,
    },

    /// Show the window plan without generating anything
    Explain {
        /// Settings file, or a directory holding appsettings.json
        #[arg(short, long, default_value = ".")]
        settings: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Command-line overrides; applied after the settings file and environment.
#[derive(Args, Debug, Clone, Default)]
struct Overrides {
    /// Last generated day (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Number of days to generate, counting back from the end date
    #[arg(long)]
    days: Option<u32>,

    /// VIN pool size
    #[arg(long)]
    cars: Option<u32>,

    /// Rows per daily batch
    #[arg(long)]
    rows: Option<usize>,

    /// Days processed concurrently per window
    #[arg(long)]
    parallel: Option<usize>,

    /// Local staging directory
    #[arg(long)]
    output_dir: Option<String>,

    /// Upload sink (memory://, file:///path, azure://account/container)
    #[arg(long)]
    storage_uri: Option<String>,

    /// Seed for reproducible rows
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            settings,
            overrides,
            log_level,
            log_format,
        } => {
            if let Err(e) = init_logging(&log_level, log_format) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            if let Err(e) = run_generator(&settings, &overrides) {
                tracing::error!("{e}");
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { settings } => {
            if let Err(e) = validate_settings(&settings) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Explain {
            settings,
            overrides,
        } => {
            if let Err(e) = explain_plan(&settings, &overrides) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn init_logging(log_level: &str, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()?,
    }
    Ok(())
}

/// Settings file, then `VEHGEN_*` environment, then command-line flags.
fn load_config(
    settings: &Path,
    overrides: &Overrides,
) -> Result<GeneratorConfig, Box<dyn std::error::Error>> {
    let mut config = GeneratorConfig::load(settings)?;
    config.apply_env();
    apply_overrides(&mut config, overrides);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(cfg: &mut GeneratorConfig, overrides: &Overrides) {
    if let Some(date) = overrides.end_date {
        cfg.end_date = date;
    }
    if let Some(days) = overrides.days {
        cfg.count_of_days = days;
    }
    if let Some(cars) = overrides.cars {
        cfg.count_of_cars = cars;
    }
    if let Some(rows) = overrides.rows {
        cfg.rows_per_batch = rows;
    }
    if let Some(parallel) = overrides.parallel {
        cfg.parallel_task_count = parallel;
    }
    if let Some(dir) = &overrides.output_dir {
        cfg.output_dir = dir.clone();
    }
    if let Some(uri) = &overrides.storage_uri {
        cfg.storage_uri = Some(uri.clone());
    }
    if let Some(seed) = overrides.seed {
        cfg.seed = Some(seed);
    }
}

fn run_generator(settings: &Path, overrides: &Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(settings, overrides)?;
    tracing::info!(
        end_date = %config.end_date,
        days = config.count_of_days,
        parallel = config.parallel_task_count,
        rows = config.rows_per_batch,
        "starting generator"
    );

    let pipeline = Pipeline::from_config(config)?;
    let report = pipeline.run()?;

    println!("✓ Generator finished");
    println!("  Windows: {}", report.windows.len());
    println!("  Days uploaded: {}", report.count(DayOutcome::Uploaded));
    let failed = report.days.len() - report.count(DayOutcome::Uploaded);
    if failed > 0 {
        println!("  Days with failures: {}", failed);
        for day in report.days.iter().filter(|d| d.outcome != DayOutcome::Uploaded) {
            println!("    {} ({:?})", day.day, day.outcome);
        }
    }
    Ok(())
}

fn validate_settings(settings: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(settings, &Overrides::default())?;
    println!("✓ Settings are valid");
    println!("Columns:");
    for col in config.columns().iter() {
        println!(
            "  {} | {} -> {:?} / {:?}",
            col.name, col.declared_type, col.role, col.value_type
        );
    }
    Ok(())
}

fn explain_plan(settings: &Path, overrides: &Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(settings, overrides)?;
    let windows = plan_windows(config.count_of_days, config.parallel_task_count);

    println!("Generator Plan");
    println!("==============");
    println!();
    println!("End Date: {}", config.end_date);
    println!("Days: {}", config.count_of_days);
    println!("Rows per Day: {}", config.rows_per_batch);
    println!("VIN Pool: {} vehicles", config.count_of_cars);
    println!("Parallel: {} days per window", config.parallel_task_count);
    println!();
    println!("Windows:");
    for (i, window) in windows.into_iter().enumerate() {
        let days = window
            .map(|offset| {
                DayWindow::for_offset(config.end_date, offset)
                    .map(|d| format!("{} (offset {})", d.id, offset))
            })
            .collect::<Result<Vec<_>, _>>()?;
        println!("  {}. {}", i + 1, days.join(", "));
    }

    Ok(())
}

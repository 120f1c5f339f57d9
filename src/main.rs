mod config;
mod error;
mod estimator;
mod models;
mod pricing;
mod report;
mod ui;

use clap::{Parser, Subcommand};
use crate::config::{config_path, ensure_initialized, load_config};
use error::AppError;
use estimator::{estimate, validate_inputs};
use models::{CadencePreset, ProductUsage, Scenario};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};
use ui::run::run_tui;

#[derive(Debug, Parser)]
#[command(name = "pricing-estimator")]
#[command(about = "Estimate onboarding, platform and consulting costs for tiered model pricing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the default pricing configuration.
    Init,
    /// Compute an estimate for a set of products.
    Estimate {
        /// [NAME@]CADENCE[=UNITS], e.g. `1pw`, `Office@daily`, `Game@custom=120`.
        #[arg(long = "product", short = 'p')]
        products: Vec<String>,
        /// TOML scenario with `consulting_hours` and `[[products]]`.
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, allow_negative_numbers = true)]
        consulting_hours: Option<f64>,
        /// Reject negative or non-finite inputs instead of clamping them.
        #[arg(long)]
        strict: bool,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the active tier table and fees.
    Tiers,
    /// Open the interactive estimator.
    Tui,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn parse_format(input: &str) -> Result<OutputFormat, AppError> {
    match input.to_ascii_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        "csv" => Ok(OutputFormat::Csv),
        _ => Err(AppError::Config(
            "Unsupported output format. Use text, json, or csv.".into(),
        )),
    }
}

fn read_scenario(path: &Path) -> Result<Scenario, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

/// Merges the scenario file and `--product` flags into one snapshot. With no
/// products from either source the estimate starts from a single weekly
/// product.
fn collect_inputs(
    specs: &[String],
    file: Option<&Path>,
    consulting_hours: Option<f64>,
) -> Result<Scenario, AppError> {
    let mut scenario = match file {
        Some(path) => read_scenario(path)?,
        None => Scenario::default(),
    };
    let mut next_id = scenario.renumber(1);

    for spec in specs {
        scenario
            .products
            .push(ProductUsage::parse_spec(next_id, spec)?);
        next_id += 1;
    }

    if file.is_none() && scenario.products.is_empty() {
        scenario
            .products
            .push(ProductUsage::preset(next_id, CadencePreset::WeeklyOnce));
    }

    if let Some(hours) = consulting_hours {
        scenario.consulting_hours = hours;
    }
    Ok(scenario)
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Installs the stderr subscriber before any config is read. When `RUST_LOG`
/// is unset the returned handle lets the configured level replace the
/// bootstrap `warn` filter.
fn init_tracing() -> Option<FilterHandle> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_set = from_env.is_some();
    let (filter, handle) =
        reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new("warn")));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .ok()?;

    (!env_set).then_some(handle)
}

fn apply_log_level(handle: Option<&FilterHandle>, level: &str) {
    let Some(handle) = handle else {
        return;
    };
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(err) = handle.reload(filter) {
                tracing::warn!(%err, "could not apply configured log level");
            }
        }
        Err(err) => tracing::warn!(%err, level, "ignoring invalid log_level"),
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let log_handle = init_tracing();
    ensure_initialized()?;
    let cfg = load_config()?;
    apply_log_level(log_handle.as_ref(), &cfg.log_level);

    match cli.command {
        Commands::Init => {
            println!(
                "Initialized pricing-estimator config at {}",
                config_path()?.display()
            );
        }
        Commands::Estimate {
            products,
            file,
            consulting_hours,
            strict,
            format,
        } => {
            let format = parse_format(&format)?;
            let scenario = collect_inputs(&products, file.as_deref(), consulting_hours)?;

            if strict {
                validate_inputs(&scenario.products, scenario.consulting_hours)?;
            } else if let Err(err) =
                validate_inputs(&scenario.products, scenario.consulting_hours)
            {
                tracing::warn!(%err, "input clamped; pass --strict to reject it instead");
            }

            let result = estimate(&cfg.pricing, &scenario.products, scenario.consulting_hours);
            tracing::debug!(
                products = result.product_count,
                total_annual_units = result.total_annual_units,
                unit_price = result.selected_unit_price,
                minimum_applied = result.minimum_applied,
                year1_total = result.year1_total,
                "estimate computed"
            );

            match format {
                OutputFormat::Text => print!("{}", report::render_text(&result, &cfg.pricing)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Csv => print!("{}", report::render_csv(&result)),
            }
        }
        Commands::Tiers => {
            print!("{}", report::render_schedule(&cfg.pricing));
        }
        Commands::Tui => {
            run_tui(&cfg)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        tracing::error!(error = %err, "command failed");
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

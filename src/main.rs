use inventory_normalizer::{CandidateItem, EngineConfig, InventoryPipeline, Resolution};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "normalize")]
#[command(about = "Resolve item descriptions into a canonical, priced inventory")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs)]
struct EngineArgs {
    /// JSON config file (matcher thresholds, catalog and disallow paths)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Catalog file (.json or .csv); overrides config and INVENTORY_CATALOG_PATH
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Disallow-list file (.json or one term per line)
    #[arg(long)]
    disallow: Option<PathBuf>,

    /// Similarity threshold for the fuzzy steps
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a JSON array of candidate items
    Run {
        /// Candidate file; reads stdin when omitted or "-"
        input: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Show how a single name resolves
    Match {
        /// Item name as it would arrive from upstream
        name: String,

        /// Category used if the name has to be estimated
        #[arg(long, default_value = "Misc")]
        category: String,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Run { input, engine, pretty } => run(input, engine, pretty),
        Commands::Match { name, category, engine } => explain_match(name, category, engine),
    }
}

fn build_pipeline(engine: EngineArgs) -> Result<InventoryPipeline> {
    let mut config = match &engine.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => EngineConfig::default(),
    };
    config = config.with_env().context("Invalid environment configuration")?;

    if engine.catalog.is_some() {
        config.catalog_path = engine.catalog;
    }
    if engine.disallow.is_some() {
        config.disallow_path = engine.disallow;
    }
    if let Some(threshold) = engine.threshold {
        config.matcher.similarity_threshold = threshold;
    }

    config
        .build_pipeline()
        .context("Failed to initialize catalog and disallow-list")
}

fn run(input: Option<PathBuf>, engine: EngineArgs, pretty: bool) -> Result<()> {
    let pipeline = build_pipeline(engine)?;

    let raw = match input.as_ref().filter(|path| path.as_os_str() != "-") {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read candidates from {:?}", path))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read candidates from stdin")?;
            buffer
        }
    };

    // Records are converted one by one so a bad entry cannot sink the batch
    let records: Vec<serde_json::Value> =
        serde_json::from_str(&raw).context("Candidates must be a JSON array")?;
    info!("Read {} candidates", records.len());

    let output = pipeline.run_records(&records);
    info!(
        "Move totals: {:.1} cu ft, {:.1} lbs",
        output.report.total_volume_cu_ft, output.report.total_weight_lbs
    );

    let json = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}

fn explain_match(name: String, category: String, engine: EngineArgs) -> Result<()> {
    let pipeline = build_pipeline(engine)?;
    let candidate = CandidateItem::new(name.clone()).with_category(category);

    let valid = match candidate.validate() {
        Ok(valid) => valid,
        Err(kind) => {
            println!("'{}' is malformed: {}", name, kind);
            return Ok(());
        }
    };

    match pipeline.resolve(&valid) {
        Resolution::Matched { item, strategy, score } => {
            println!("'{}' -> '{}' via {} (score {:.3})", valid.name, item.name, strategy, score);
            println!("   volume: {} cu ft, weight: {} lbs", item.volume_cu_ft, item.weight_lbs);
        }
        Resolution::Estimated(item) => {
            println!("'{}' has no catalog match; estimated as '{}'", valid.name, item.name);
            println!("   volume: {} cu ft, weight: {} lbs", item.volume_cu_ft, item.weight_lbs);
        }
        Resolution::Forbidden { term } => {
            println!("'{}' is dropped: contains disallowed term '{}'", valid.name, term);
        }
    }

    Ok(())
}

//! Trendscope CLI
//!
//! Scores JSON signal dumps and estimates topic trends.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use trendscope_core::{EngineConfig, Taxonomy};
use trendscope_runtime::{JsonFileSource, Pipeline, PipelineConfig, SignalSource};

#[derive(Parser)]
#[command(name = "trendscope")]
#[command(author, version, about = "Trendscope: heuristic signal scoring and trend aggregation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Score, filter and rank a batch of signals
    Score {
        /// JSON array of signals
        #[arg(short, long)]
        input: PathBuf,

        /// Engine configuration (TOML)
        #[arg(short, long, env = "TRENDSCOPE_CONFIG")]
        config: Option<PathBuf>,

        /// Stop scoring after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Maximum concurrent scoring tasks
        #[arg(long)]
        workers: Option<usize>,

        /// Output file for the report (default: report_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Aggregate signals into trend metrics
    Trend {
        /// JSON array of signals
        #[arg(short, long)]
        input: PathBuf,

        /// Engine configuration (TOML)
        #[arg(short, long, env = "TRENDSCOPE_CONFIG")]
        config: Option<PathBuf>,

        /// Only signals mentioning this topic
        #[arg(short, long)]
        topic: Option<String>,

        /// Reference time (RFC 3339, default: now)
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },

    /// Print the default engine configuration
    Config {
        /// Include the built-in taxonomy tables
        #[arg(long)]
        with_taxonomy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Score {
            input,
            config,
            timeout_ms,
            workers,
            output,
        } => {
            run_score(input, config, timeout_ms, workers, output).await?;
        }
        Commands::Trend {
            input,
            config,
            topic,
            as_of,
        } => {
            run_trend(input, config, topic, as_of).await?;
        }
        Commands::Config { with_taxonomy } => {
            print_config(with_taxonomy)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            EngineConfig::load(&path)
                .with_context(|| format!("invalid configuration in {}", path.display()))
        }
        None => Ok(EngineConfig::default()),
    }
}

async fn run_score(
    input: PathBuf,
    config: Option<PathBuf>,
    timeout_ms: Option<u64>,
    workers: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let engine = load_config(config)?;

    let mut pipeline_config = PipelineConfig::default();
    if let Some(workers) = workers {
        pipeline_config = pipeline_config.with_workers(workers);
    }
    if let Some(ms) = timeout_ms {
        pipeline_config = pipeline_config.with_deadline(Duration::from_millis(ms));
    }
    let pipeline = Pipeline::new(&engine)?.with_config(pipeline_config);

    let signals = JsonFileSource::new(&input)
        .load()
        .await
        .with_context(|| format!("failed to read signals from {}", input.display()))?;

    println!("📥 Loaded {} signals from {}", signals.len(), input.display());

    let outcome = pipeline.run(signals).await;

    println!(
        "📊 Retained {}/{} ({:.1}%) | skipped {} | unscored {}",
        outcome.retention.retained,
        outcome.retention.input,
        outcome.retention.retention_rate * 100.0,
        outcome.skipped,
        outcome.unscored
    );

    let Some(report) = outcome.report else {
        println!("\n⚠️  No signal cleared the quality threshold.");
        return Ok(());
    };

    println!("\n{}", "=".repeat(60));
    for top in &report.top_signals {
        println!(
            "#{:<2} {:<14} quality {:.3} | potential {:.3} | confidence {:.3} | {}",
            top.rank,
            top.source.as_str(),
            top.quality_score,
            top.business_potential,
            top.confidence_level,
            top.market_timing
        );
        if !top.pain_point_indicators.is_empty() {
            println!("    pain: {}", top.pain_point_indicators.join(", "));
        }
    }

    let output_path = output.unwrap_or_else(|| {
        let timestamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
        PathBuf::from(format!("report_{}.json", timestamp))
    });
    fs::write(&output_path, serde_json::to_string_pretty(&report)?)?;
    println!("\n📄 Report saved to: {}", output_path.display());

    Ok(())
}

async fn run_trend(
    input: PathBuf,
    config: Option<PathBuf>,
    topic: Option<String>,
    as_of: Option<DateTime<Utc>>,
) -> Result<()> {
    let engine = load_config(config)?;
    let pipeline = Pipeline::new(&engine)?;

    let topic = topic.unwrap_or_default();
    let signals = JsonFileSource::new(&input)
        .fetch(&topic)
        .await
        .with_context(|| format!("failed to read signals from {}", input.display()))?;

    let name = if topic.is_empty() {
        "all".to_string()
    } else {
        topic
    };
    info!("Aggregating {} signals for topic {}", signals.len(), name);

    let mut topics = BTreeMap::new();
    topics.insert(name, signals);
    let metrics = pipeline
        .aggregate_topics(topics, as_of.unwrap_or_else(Utc::now))
        .await;

    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

fn print_config(with_taxonomy: bool) -> Result<()> {
    let mut config = EngineConfig::default();
    if with_taxonomy {
        config.taxonomy = Some(Taxonomy::embedded_spec()?);
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

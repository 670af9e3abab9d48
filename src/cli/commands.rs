//! CLI command definitions for event-fanout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::event::{load_batch, sample_batch, Event};
use crate::metrics::PrometheusReporter;
use crate::pipeline::{Coordinator, FanoutReporter, LogReporter, PipelineConfig, RunSummary};
use crate::startup;
use crate::storage::{EventCache, EventStore, MemoryCache, MemoryStore};

/// Fan a batch of events out to Redis and PostgreSQL with a worker pool.
#[derive(Parser, Debug)]
#[command(name = "event-fanout")]
#[command(about = "Fan a batch of events out to a Redis cache and a PostgreSQL store")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run one batch through the pipeline.
    Run(RunArgs),

    /// Create the events table if it does not exist.
    InitSchema(ConnectionArgs),
}

/// Connection overrides shared by every subcommand.
#[derive(Parser, Debug, Default)]
pub struct ConnectionArgs {
    /// Redis connection URL.
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Arguments for `event-fanout run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// JSON file with an array of {"id", "payload"} events. Uses the built-in sample batch if omitted.
    #[arg(short, long)]
    pub events: Option<PathBuf>,

    /// Number of workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Processing delay per event in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Use in-memory stores instead of Redis and PostgreSQL.
    #[arg(long)]
    pub dry_run: bool,

    /// Print Prometheus metrics for the run when it finishes.
    #[arg(long)]
    pub metrics: bool,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the CLI with already parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_command(args).await,
        Commands::InitSchema(args) => init_schema_command(args).await,
    }
}

/// Parses the command line and runs it.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

fn apply_connection(mut config: PipelineConfig, args: &ConnectionArgs) -> PipelineConfig {
    if let Some(url) = &args.redis_url {
        config = config.with_redis_url(url.clone());
    }
    if let Some(url) = &args.database_url {
        config = config.with_database_url(url.clone());
    }
    config
}

/// Merges environment configuration with the command-line overrides.
pub fn resolve_config(base: PipelineConfig, args: &RunArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = apply_connection(base, &args.connection);
    if let Some(workers) = args.workers {
        config = config.with_worker_count(workers);
    }
    if let Some(ms) = args.delay_ms {
        config = config.with_processing_delay(Duration::from_millis(ms));
    }
    config.validate()?;
    Ok(config)
}

fn load_events(args: &RunArgs) -> anyhow::Result<Vec<Event>> {
    match &args.events {
        Some(path) => {
            let events = load_batch(path)?;
            info!(path = %path.display(), count = events.len(), "Loaded events");
            Ok(events)
        }
        None => Ok(sample_batch()),
    }
}

async fn run_command(args: RunArgs) -> anyhow::Result<()> {
    let config = resolve_config(PipelineConfig::from_env()?, &args)?;
    let events = load_events(&args)?;

    let cache: Arc<dyn EventCache>;
    let store: Arc<dyn EventStore>;
    if args.dry_run {
        warn!("Dry run: writing to in-memory stores");
        cache = Arc::new(MemoryCache::new());
        store = Arc::new(MemoryStore::new());
    } else {
        let backends = startup::prepare(&config).await?;
        cache = Arc::new(backends.cache);
        store = Arc::new(backends.store);
    }

    let metrics = if args.metrics {
        Some(Arc::new(PrometheusReporter::new()?))
    } else {
        None
    };

    let mut reporter = FanoutReporter::new().with(Arc::new(LogReporter));
    if let Some(metrics) = &metrics {
        reporter = reporter.with(metrics.clone());
    }

    let coordinator =
        Coordinator::from_config(&config, cache, store).with_reporter(Arc::new(reporter));
    let summary = coordinator.run(events, config.worker_count).await?;

    print_summary(&summary, args.json)?;
    if let Some(metrics) = metrics {
        print!("{}", metrics.export());
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("Run {} finished in {:?}", summary.run_id, summary.elapsed);
    println!(
        "  dispatched={} processed={} cached={} stored={}",
        summary.dispatched, summary.processed, summary.cached, summary.stored
    );
    println!(
        "  cache_failures={} store_failures={} panicked={} workers_drained={}/{}",
        summary.cache_failures,
        summary.store_failures,
        summary.panicked,
        summary.workers_drained,
        summary.worker_count
    );
    Ok(())
}

async fn init_schema_command(args: ConnectionArgs) -> anyhow::Result<()> {
    let config = apply_connection(PipelineConfig::from_env()?, &args);
    startup::connect_store(&config).await?;
    println!("Schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_args() {
        let cli = Cli::try_parse_from([
            "event-fanout",
            "run",
            "--workers",
            "5",
            "--delay-ms",
            "0",
            "--dry-run",
            "--metrics",
        ])
        .expect("parse");

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.workers, Some(5));
        assert_eq!(args.delay_ms, Some(0));
        assert!(args.dry_run);
        assert!(args.metrics);
        assert!(args.events.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_resolve_config_applies_overrides() {
        let cli = Cli::try_parse_from([
            "event-fanout",
            "run",
            "--workers",
            "2",
            "--delay-ms",
            "5",
            "--redis-url",
            "redis://other:6379",
        ])
        .expect("parse");
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };

        let config = resolve_config(PipelineConfig::default(), &args).expect("config");
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.processing_delay, Duration::from_millis(5));
        assert_eq!(config.redis_url, "redis://other:6379");
    }

    #[test]
    fn test_resolve_config_rejects_zero_workers() {
        let cli = Cli::try_parse_from(["event-fanout", "run", "--workers", "0"]).expect("parse");
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(resolve_config(PipelineConfig::default(), &args).is_err());
    }

    #[test]
    fn test_parse_init_schema() {
        let cli = Cli::try_parse_from([
            "event-fanout",
            "init-schema",
            "--database-url",
            "postgres://db/events",
        ])
        .expect("parse");
        let Commands::InitSchema(args) = cli.command else {
            panic!("expected init-schema command");
        };
        assert_eq!(args.database_url.as_deref(), Some("postgres://db/events"));
    }
}

use std::net::IpAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use datafetch_mcp::cache::{CacheStore, DEFAULT_CLEANUP_AGE, DiskCache};
use datafetch_mcp::config::{self, ConfigBuilder, TransportMode};
use datafetch_mcp::observability::{init_observability, shutdown_observability};
use datafetch_mcp::transport::run_transport;
use datafetch_mcp::warmup::{DEFAULT_WARMUP_PAUSE_MS, WarmupOptions, run_warmup, weekly_due};
use datafetch_mcp::{Config, DataService};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Parser, Debug)]
#[command(name = "datafetch-mcp")]
#[command(
    about = "Cached, paginated MCP server over a catalog of remote data operations",
    long_about = None
)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DATAFETCH_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long, global = true)]
    json_logs: bool,

    /// Cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve MCP tools over stdio or HTTP (default)
    Serve(ServeArgs),
    /// Delete cache entries older than the given age
    Cleanup {
        /// Maximum entry age in days
        #[arg(long, default_value_t = DEFAULT_CLEANUP_AGE.as_secs() / SECS_PER_DAY)]
        days: u64,
    },
    /// Refresh the configured warm-up entries, then purge old cache entries
    Warm(WarmArgs),
}

#[derive(clap::Args, Debug)]
struct WarmArgs {
    /// Run weekly entries even when they are not due today
    #[arg(long)]
    all: bool,

    /// Maximum entry age in days for the cleanup sweep
    #[arg(long, default_value_t = DEFAULT_CLEANUP_AGE.as_secs() / SECS_PER_DAY)]
    days: u64,

    /// Pause between entries in milliseconds
    #[arg(long, default_value_t = DEFAULT_WARMUP_PAUSE_MS)]
    pause_ms: u64,
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Transport mode (stdio or http)
    #[arg(long)]
    transport: Option<TransportMode>,

    /// HTTP bind host (when transport=http)
    #[arg(long)]
    http_host: Option<IpAddr>,

    /// HTTP bind port (when transport=http)
    #[arg(long)]
    http_port: Option<u16>,

    /// Disable the result cache
    #[arg(long)]
    no_cache: bool,

    /// Concurrent remote calls
    #[arg(long)]
    workers: Option<usize>,

    /// Attempts per fetch, including the first
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Reject fetched tables larger than this many bytes
    #[arg(long)]
    max_payload_bytes: Option<usize>,
}

impl ServeArgs {
    fn apply(&self, mut builder: ConfigBuilder) -> ConfigBuilder {
        if let Some(mode) = self.transport {
            builder = builder.transport_mode(mode);
        }
        if let Some(host) = self.http_host {
            builder = builder.http_host(host);
        }
        if let Some(port) = self.http_port {
            builder = builder.http_port(port);
        }
        if self.no_cache {
            builder = builder.cache_enabled(false);
        }
        if let Some(workers) = self.workers.and_then(NonZeroUsize::new) {
            builder = builder.workers(workers);
        }
        if let Some(attempts) = self.max_attempts.and_then(NonZeroU32::new) {
            builder = builder.max_attempts(attempts);
        }
        if let Some(bytes) = self.max_payload_bytes {
            builder = builder.max_payload_bytes(bytes);
        }
        builder
    }
}

fn load(args: &Args, serve: &ServeArgs) -> anyhow::Result<Config> {
    // CLI values form the base; file and env layer on top
    let mut builder = serve.apply(ConfigBuilder::new());
    if let Some(ref dir) = args.cache_dir {
        builder = builder.cache_dir(dir);
    }

    builder = config::layer_config(builder, args.config.as_deref())?;

    if args.verbose {
        builder = builder.log_level("debug".to_string());
    }
    if args.json_logs {
        builder = builder.json_logs(true);
    }

    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let result = match args.command {
        Some(Command::Cleanup { days }) => {
            let config = load(&args, &ServeArgs::default())?;
            init_observability(&config.telemetry)?;
            cleanup(&config, days).await
        }
        Some(Command::Warm(ref warm_args)) => {
            let config = load(&args, &ServeArgs::default())?;
            init_observability(&config.telemetry)?;
            warm(&config, warm_args).await
        }
        Some(Command::Serve(ref serve)) => {
            let config = load(&args, serve)?;
            init_observability(&config.telemetry)?;
            serve_forever(config).await
        }
        None => {
            let config = load(&args, &ServeArgs::default())?;
            init_observability(&config.telemetry)?;
            serve_forever(config).await
        }
    };

    shutdown_observability();
    result
}

async fn serve_forever(config: Config) -> anyhow::Result<()> {
    let service = Arc::new(DataService::from_config(&config)?);

    tracing::info!("Starting datafetch MCP server");
    tracing::info!("Transport: {:?}", config.transport.mode);
    tracing::info!("Operations: {}", service.registry().len());
    tracing::info!(
        "Cache enabled: {}, root: {}",
        config.cache.enabled,
        config.cache.root.display()
    );
    tracing::info!(
        "Workers: {}, max attempts: {}, retry delay: {:?}",
        config.fetch.workers,
        config.fetch.max_attempts,
        config.fetch.retry_delay
    );
    tracing::info!("Max payload: {} bytes", config.fetch.max_payload_bytes);

    if service.registry().is_empty() {
        tracing::warn!("Operation catalog is empty; add [[operations]] to the config file");
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    run_transport(service, &config, shutdown)
        .await
        .map_err(Into::into)
}

async fn warm(config: &Config, args: &WarmArgs) -> anyhow::Result<()> {
    if !config.cache.enabled {
        anyhow::bail!("cache warm-up requires the cache to be enabled");
    }
    if config.warmup.is_empty() {
        tracing::warn!("No [[warmup]] entries configured; only the cleanup sweep will run");
    }

    let service = DataService::from_config(config)?;
    let options = WarmupOptions {
        include_weekly: args.all || weekly_due(chrono::Local::now().date_naive()),
        pause: Duration::from_millis(args.pause_ms),
        cleanup_age: Duration::from_secs(args.days.saturating_mul(SECS_PER_DAY)),
    };

    run_warmup(&service, &config.warmup, &options).await?;
    Ok(())
}

async fn cleanup(config: &Config, days: u64) -> anyhow::Result<()> {
    let age = Duration::from_secs(days.saturating_mul(SECS_PER_DAY));
    let cache = DiskCache::new(config.cache.root.clone());

    tracing::info!(
        root = %config.cache.root.display(),
        days,
        "Purging cache entries"
    );
    let removed = cache.purge_older_than(age).await?;
    tracing::info!(removed, "Cache cleanup complete");

    Ok(())
}

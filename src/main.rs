//! etl-connector — Binary Entrypoint
//! Loads configuration once, then runs the requested pipelines in sequence.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use etl_connector::{runner, AppConfig, PipelineKind};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "etl-connector", about = "Extract, normalize and store NewsAPI and DShield data")]
struct Cli {
    /// TOML override file (default: $ETL_CONFIG_PATH, then config/etl.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pipeline (or all of them, one after another)
    Run {
        #[arg(value_enum)]
        pipeline: PipelineArg,
        /// Country code for NewsAPI top headlines
        #[arg(long)]
        country: Option<String>,
    },
    /// Print the effective settings and fail if any pipeline could not run
    CheckConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum PipelineArg {
    Newsapi,
    Dshield,
    All,
}

impl PipelineArg {
    fn kinds(self) -> &'static [PipelineKind] {
        match self {
            PipelineArg::Newsapi => &[PipelineKind::NewsApi],
            PipelineArg::Dshield => &[PipelineKind::DShield],
            PipelineArg::All => &[PipelineKind::NewsApi, PipelineKind::DShield],
        }
    }
}

/// `RUST_LOG` drives the filter (default `info`); `ETL_LOG_FORMAT=json`
/// switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("ETL_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env when present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let mut cfg = match AppConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuration error");
            return Ok(ExitCode::FAILURE);
        }
    };

    match cli.command {
        Commands::CheckConfig => {
            println!("store:    {}/{}", cfg.store.uri, cfg.store.database);
            println!(
                "newsapi:  {} country={} -> {} (key {})",
                cfg.newsapi.base_url,
                cfg.newsapi.country,
                cfg.newsapi.collection,
                if cfg.newsapi.api_key.is_some() { "set" } else { "missing" }
            );
            println!(
                "dshield:  {} -> {} (attempts={}, backoff={}s, fallback={})",
                cfg.dshield.feed_url,
                cfg.dshield.collection,
                cfg.dshield.retry.max_attempts,
                cfg.dshield.retry.backoff_base.as_secs(),
                cfg.dshield.fallback_path.display()
            );
            for kind in PipelineArg::All.kinds() {
                cfg.validate_for(*kind)
                    .with_context(|| format!("{kind} pipeline is not runnable"))?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { pipeline, country } => {
            if let Some(c) = country {
                cfg.newsapi.country = c;
            }
            let ok = runner::run_all(pipeline.kinds(), &cfg).await;
            if ok {
                info!("all requested pipelines completed");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

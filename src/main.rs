//! news-sentiment-stream binary entrypoint.
//!
//! `run` replays the configured feed through the pipeline once;
//! `dashboard` serves the polling dashboard over the live feed.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use news_sentiment_stream::{app, config::PipelineConfig, telemetry};

#[derive(Debug, Parser)]
#[command(name = "news-sentiment-stream", version, about)]
struct Cli {
    /// TOML config file (defaults: $PIPELINE_CONFIG_PATH, then config/pipeline.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay the feed once: normalize, index, summarize, append to the live feed.
    Run {
        #[arg(long)]
        feed: Option<PathBuf>,
        #[arg(long)]
        live_feed: Option<PathBuf>,
        /// Pause between published items, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Also serve the dashboard (and /metrics) from this process.
        #[arg(long)]
        serve_dashboard: bool,
    },
    /// Serve the dashboard over an existing live feed.
    Dashboard {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        live_feed: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::load_from(p),
        None => PipelineConfig::load_default(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.as_ref())?;

    match cli.command.unwrap_or(Command::Run {
        feed: None,
        live_feed: None,
        delay_ms: None,
        serve_dashboard: false,
    }) {
        Command::Run {
            feed,
            live_feed,
            delay_ms,
            serve_dashboard,
        } => {
            if let Some(p) = feed {
                cfg.feed_path = p;
            }
            if let Some(p) = live_feed {
                cfg.live_feed_path = p;
            }
            if let Some(ms) = delay_ms {
                cfg.replay_delay_ms = ms;
            }

            let server = if serve_dashboard {
                let metrics = telemetry::Metrics::install()?;
                let server_cfg = cfg.clone();
                Some(tokio::spawn(async move {
                    app::serve_dashboard(&server_cfg, Some(metrics.handle)).await
                }))
            } else {
                None
            };

            let report = app::run_once(&cfg).await?;
            println!(
                "replay done: published={} handled={} failed={}",
                report.published, report.handled, report.failed
            );

            if let Some(server) = server {
                tracing::info!("replay finished; dashboard still serving (Ctrl-C to stop)");
                tokio::select! {
                    res = server => res??,
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
        }
        Command::Dashboard { bind, live_feed } => {
            if let Some(b) = bind {
                cfg.dashboard.bind = b;
            }
            if let Some(p) = live_feed {
                cfg.live_feed_path = p;
            }
            let metrics = telemetry::Metrics::install()?;
            tokio::select! {
                res = app::serve_dashboard(&cfg, Some(metrics.handle)) => res?,
                _ = tokio::signal::ctrl_c() => {}
            }
        }
    }

    Ok(())
}

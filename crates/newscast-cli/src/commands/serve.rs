//! Server command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use newscast_core::{Config, StaticTokenValidator};
use newscast_push::{FcmGateway, NotificationOrchestrator, PushDispatcher};
use newscast_redis::RedisStore;
use newscast_stream::{ChangeDetector, StreamBroadcaster};
use newscast_web::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path (with --log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let pool = newscast_redis::init_pool(&config.redis.url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis.url))?;
    let store = Arc::new(RedisStore::new(pool, &config.redis.key_prefix));

    let detector = ChangeDetector::bootstrap(store.clone())
        .await
        .context("Failed to load the initial news list")?;
    let feed = detector.feed();
    let broadcaster = StreamBroadcaster::new(feed.clone(), (&config.stream).into())?;

    let stop = CancellationToken::new();
    let detector_task = detector.spawn(
        broadcaster.clone(),
        config.stream.poll_interval(),
        stop.clone(),
    )?;

    let gateway = Arc::new(FcmGateway::new(&config.push)?);
    let dispatcher = Arc::new(PushDispatcher::with_batch_limit(gateway, config.push.batch_limit));
    let orchestrator = Arc::new(NotificationOrchestrator::new(
        store.clone(),
        dispatcher,
        config.push.active_window(),
    ));

    if config.auth.tokens.is_empty() {
        warn!("No bearer tokens configured, write endpoints will reject every request");
    }
    let validator = Arc::new(StaticTokenValidator::new(config.auth.tokens.clone()));

    let state = AppState {
        feed,
        broadcaster,
        orchestrator,
        news: store.clone(),
        devices: store,
        validator,
        client_buffer: config.stream.client_buffer,
    };

    let host = &config.server.host;
    let port = config.server.port;
    println!();
    println!("  {} {}", "Newscast".cyan().bold(), "Server".bold());
    println!();
    println!("  {}     http://{}:{}/api/news/stream", "Stream".green(), host, port);
    println!("  {}        http://{}:{}/api", "API".green(), host, port);
    println!("  {}     http://{}:{}/health", "Health".green(), host, port);
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    newscast_web::run_server(state, host, port, config.server.shutdown_grace(), stop).await?;

    if let Err(e) = detector_task.await {
        warn!(error = %e, "Change detector task ended abnormally");
    }
    info!("Newscast stopped");

    Ok(())
}

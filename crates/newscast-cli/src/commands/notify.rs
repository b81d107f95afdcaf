//! One-off push to a single device.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use newscast_core::{Config, NewsSource};
use newscast_push::{FcmGateway, NotificationOrchestrator, PushDispatcher};
use newscast_redis::RedisStore;
use std::sync::Arc;

#[derive(Args)]
pub struct NotifyArgs {
    /// Device to notify
    #[arg(long)]
    pub device: String,

    /// News item to send
    #[arg(long)]
    pub news: i64,
}

pub async fn execute(args: NotifyArgs, config: Config) -> Result<()> {
    let pool = newscast_redis::init_pool(&config.redis.url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", config.redis.url))?;
    let store = Arc::new(RedisStore::new(pool, &config.redis.key_prefix));

    let item = store
        .get_news(args.news)
        .await?
        .with_context(|| format!("News not found: {}", args.news))?;

    let gateway = Arc::new(FcmGateway::new(&config.push)?);
    let dispatcher = Arc::new(PushDispatcher::with_batch_limit(gateway, config.push.batch_limit));
    let orchestrator =
        NotificationOrchestrator::new(store, dispatcher, config.push.active_window());

    let message_id = orchestrator.send_to_device(&item, &args.device).await?;

    println!(
        "{} Sent \"{}\" to {}",
        "✓".green().bold(),
        item.title,
        args.device.cyan()
    );
    println!("  {}", message_id.dimmed());

    Ok(())
}

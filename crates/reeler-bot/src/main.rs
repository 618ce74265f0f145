//! Reeler — Telegram bot that fetches videos through durable work queues
//!
//! Chat requests are resolved against an external media source, downloaded
//! and cached exactly once, and delivered back to the requester. Fetch and
//! upload run as independent worker pools over two JetStream work queues,
//! so retrieval and delivery scale and recover independently of the chat
//! front end.

mod config;
mod dispatcher;
mod errors;
mod fetch;
mod fsm;
mod health;
mod resolver;
mod telegram;
#[cfg(test)]
mod testutil;
mod upload;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, StorageKind};
use crate::dispatcher::{Dispatcher, Options};
use crate::health::AppState;
use crate::resolver::HttpMediaResolver;
use crate::telegram::TelegramSender;

/// Reeler Bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/reeler.toml")]
    config: String,

    /// NATS URL (overrides config file)
    #[arg(long, env = "NATS_URL")]
    nats_url: Option<String>,

    /// Telegram bot token (overrides config file)
    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    bot_token: Option<String>,

    /// NATS prefix (overrides config file)
    #[arg(long, env = "REELER_PREFIX")]
    prefix: Option<String>,

    /// Health check server port
    #[arg(long, env = "HEALTH_CHECK_PORT", default_value = "3000")]
    health_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reeler_bot=debug,reeler_nats=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Reeler bot");

    let args = Args::parse();

    let config = if std::path::Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        let mut config = Config::from_file(&args.config)?;

        if let Some(nats_url) = args.nats_url {
            config.nats.servers = nats_url.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(bot_token) = args.bot_token {
            config.telegram.bot_token = bot_token;
        }
        if let Some(prefix) = args.prefix {
            config.nats.prefix = prefix;
        }

        config
    } else {
        info!("Config file not found, using environment variables");
        Config::from_env()?
    };

    info!("NATS servers: {:?}", config.nats.servers);
    info!("NATS prefix: {}", config.nats.prefix);

    info!("Connecting to NATS...");
    let nats_client = reeler_nats::connect(&config.nats).await?;

    let js = reeler_nats::nats::jetstream(&nats_client);
    reeler_nats::nats::setup_job_stream(
        &js,
        &config.nats.prefix,
        reeler_nats::subjects::QUEUE_FETCHING,
    )
    .await?;
    reeler_nats::nats::setup_job_stream(
        &js,
        &config.nats.prefix,
        reeler_nats::subjects::QUEUE_UPLOADING,
    )
    .await?;
    let kv = reeler_nats::nats::setup_session_kv(
        &js,
        &config.nats.prefix,
        Duration::from_secs(config.session.ttl_secs),
    )
    .await?;
    info!("JetStream setup complete");

    let metadata = reeler_db::PgMetadataStore::connect(&config.database).await?;
    metadata.ensure_schema().await?;
    info!("Metadata store ready");

    let storage: Arc<dyn reeler_storage::Blob> = match config.storage.kind {
        StorageKind::Fs => Arc::new(reeler_storage::FilesystemBlob::new(&config.storage.root)),
        StorageKind::Memory => Arc::new(reeler_storage::MemoryBlob::new()),
    };

    let resolver = HttpMediaResolver::new(
        url::Url::parse(&config.resolver.base_url)?,
        Duration::from_secs(config.resolver.timeout_secs),
    )?;

    info!("Initializing Telegram bot...");
    let bot = Bot::new(&config.telegram.bot_token);

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            let username = me.username().to_string();
            info!("Bot authenticated as: @{}", username);
            Some(username)
        }
        Err(e) => {
            error!("Failed to authenticate bot: {}", e);
            return Err(e.into());
        }
    };

    let health_state = AppState::new(bot_username);
    *health_state.nats_connected.write().await = true;

    let health_state_clone = health_state.clone();
    let health_port = args.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_state_clone, health_port).await {
            error!("Health check server error: {}", e);
        }
    });

    let queue = Arc::new(reeler_nats::NatsJobQueue::new(
        js.clone(),
        config.nats.prefix.clone(),
    ));
    let sessions = Arc::new(reeler_nats::KvSessionBackend::new(kv));
    let sender = Arc::new(TelegramSender::new(bot.clone()));

    let dispatcher = Arc::new(Dispatcher::new(
        Options {
            bucket: config.storage.bucket.clone(),
            polling_timeout: config.telegram.polling_timeout,
            chat_update_workers: config.workers.chat_updates,
            fetching_workers: config.workers.fetching,
            uploading_workers: config.workers.uploading,
        },
        Arc::new(resolver),
        Arc::new(metadata),
        storage,
        sender,
        queue,
        sessions,
        health_state,
    ));

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    info!("Bot initialized, starting dispatcher");
    dispatcher.run(js, &config.nats.prefix, bot, token).await?;

    info!("Reeler bot stopped");
    Ok(())
}

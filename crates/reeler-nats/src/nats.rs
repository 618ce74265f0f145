//! NATS connection and JetStream setup

use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::consumer::PullConsumer;
use async_nats::Client;
use tracing::{debug, info, warn};

use crate::config::NatsConfig;
use crate::error::{Error, Result};
use crate::subjects;

/// Connect to the NATS servers with reconnect handling.
pub async fn connect(config: &NatsConfig) -> Result<Client> {
    info!("Connecting to NATS servers: {:?}", config.servers);

    let mut opts = async_nats::ConnectOptions::new().name("reeler-bot");

    if let Some(ref creds_file) = config.credentials_file {
        debug!("Using credentials file: {}", creds_file);
        opts = opts
            .credentials_file(creds_file)
            .await
            .map_err(|e| Error::Connection(format!("Failed to load credentials: {}", e)))?;
    }

    opts = opts
        .event_callback(|event| async move {
            match event {
                async_nats::Event::Connected => info!("Connected to NATS"),
                async_nats::Event::Disconnected => warn!("Disconnected from NATS"),
                async_nats::Event::ClientError(e) => warn!("NATS client error: {}", e),
                _ => {}
            }
        })
        .retry_on_initial_connect()
        .max_reconnects(None);

    let servers: Vec<&str> = config.servers.iter().map(|s| s.as_str()).collect();
    let client = opts
        .connect(servers)
        .await
        .map_err(|e| Error::Connection(format!("Failed to connect to NATS: {}", e)))?;

    info!("Successfully connected to NATS");
    Ok(client)
}

/// Initialize JetStream for the given client.
pub fn jetstream(client: &Client) -> jetstream::Context {
    jetstream::new(client.clone())
}

fn stream_name(prefix: &str, queue: &str) -> String {
    format!("reeler_{}_{}", queue, prefix)
}

/// Create or look up the work-queue stream backing one job queue.
///
/// Work-queue retention removes a message once its consumer acknowledges
/// it, so each payload is worked exactly one time per queue.
pub async fn setup_job_stream(
    js: &jetstream::Context,
    prefix: &str,
    queue: &str,
) -> Result<()> {
    let name = stream_name(prefix, queue);
    info!("Setting up JetStream work-queue stream: {}", name);

    let stream_config = jetstream::stream::Config {
        name: name.clone(),
        subjects: vec![subjects::jobs::queue(prefix, queue)],
        retention: jetstream::stream::RetentionPolicy::WorkQueue,
        storage: jetstream::stream::StorageType::File,
        ..Default::default()
    };

    js.get_or_create_stream(stream_config)
        .await
        .map_err(|e| Error::Stream(format!("Failed to create stream {}: {}", name, e)))?;

    info!("JetStream stream {} ready", name);
    Ok(())
}

/// Create or look up the durable pull consumer for one job queue.
///
/// Workers share the durable, so payloads are load-balanced across a pool.
pub async fn create_job_consumer(
    js: &jetstream::Context,
    prefix: &str,
    queue: &str,
) -> Result<PullConsumer> {
    let name = stream_name(prefix, queue);
    let durable = format!("{}-workers", queue);

    let stream = js
        .get_stream(&name)
        .await
        .map_err(|e| Error::Stream(format!("Failed to get stream {}: {}", name, e)))?;

    stream
        .get_or_create_consumer(
            &durable,
            jetstream::consumer::pull::Config {
                durable_name: Some(durable.clone()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| Error::Consume(format!("Failed to create consumer {}: {}", durable, e)))
}

/// Create or look up the session KV bucket.
///
/// `ttl` is the session expiry: entries not rewritten within it disappear.
pub async fn setup_session_kv(
    js: &jetstream::Context,
    prefix: &str,
    ttl: Duration,
) -> Result<jetstream::kv::Store> {
    let bucket_name = format!("reeler_sessions_{}", prefix);
    info!("Setting up JetStream KV bucket: {}", bucket_name);

    let kv_config = jetstream::kv::Config {
        bucket: bucket_name.clone(),
        history: 1,
        max_age: ttl,
        storage: jetstream::stream::StorageType::File,
        ..Default::default()
    };

    match js.create_key_value(kv_config).await {
        Ok(kv) => {
            info!("JetStream KV bucket {} ready", bucket_name);
            Ok(kv)
        }
        Err(e) => match js.get_key_value(&bucket_name).await {
            Ok(kv) => {
                info!("Using existing JetStream KV bucket {}", bucket_name);
                Ok(kv)
            }
            Err(_) => Err(Error::Other(anyhow::anyhow!(
                "Failed to create or get KV bucket: {}",
                e
            ))),
        },
    }
}

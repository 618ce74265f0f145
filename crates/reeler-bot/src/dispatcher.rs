//! Job-dispatch pipeline
//!
//! The Dispatcher receives chat updates, drives the conversation FSM, and
//! runs the fetch/upload worker pools against the two durable queues. It
//! keeps an in-memory registry of dequeued-but-unfinished jobs solely so
//! that graceful shutdown can requeue accepted work; the queues stay the
//! source of truth.

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod dispatcher_tests;

use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::consumer::PullConsumer;
use futures::StreamExt;
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use teloxide::update_listeners::{AsUpdateStream, Polling};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use reeler_db::MetadataStore;
use reeler_nats::nats::create_job_consumer;
use reeler_nats::subjects::{QUEUE_FETCHING, QUEUE_UPLOADING};
use reeler_nats::{JobQueue, JobStream};
use reeler_state::{Session, SessionBackend};
use reeler_storage::Blob;
use reeler_types::{Job, JobKind, JobPayload};

use crate::errors::DispatchError;
use crate::fsm::{conversation_machine, ConvEvent, ConvState, ParseContext};
use crate::health::AppState;
use crate::resolver::MediaResolver;
use crate::telegram::ChatSender;

pub const SENDING_ERROR_MESSAGE: &str =
    "Oops, something went wrong, try sending the link again";
pub const DOWNLOAD_STARTED_MESSAGE: &str = "Starting to download the video";
pub const GREETING_MESSAGE: &str = "Hi! I am a bot for downloading videos.\n\n\
    Send me a link to a video and I will fetch it and deliver it right here.";

const START_COMMAND: &str = "start";

/// Pool sizes and per-run knobs.
#[derive(Debug, Clone)]
pub struct Options {
    /// Blob store bucket for fetched content.
    pub bucket: String,
    /// Telegram long-polling timeout, seconds.
    pub polling_timeout: u32,
    pub chat_update_workers: usize,
    pub fetching_workers: usize,
    pub uploading_workers: usize,
}

/// A text message lifted out of a Telegram update.
#[derive(Debug, Clone)]
pub struct ChatUpdate {
    pub user_id: i64,
    pub chat_id: i64,
    pub text: String,
}

pub struct Dispatcher {
    opts: Options,
    resolver: Arc<dyn MediaResolver>,
    metadata: Arc<dyn MetadataStore>,
    storage: Arc<dyn Blob>,
    sender: Arc<dyn ChatSender>,
    queue: Arc<dyn JobQueue>,
    sessions: Arc<dyn SessionBackend>,
    health: AppState,
    jobs: RwLock<Vec<Job>>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        opts: Options,
        resolver: Arc<dyn MediaResolver>,
        metadata: Arc<dyn MetadataStore>,
        storage: Arc<dyn Blob>,
        sender: Arc<dyn ChatSender>,
        queue: Arc<dyn JobQueue>,
        sessions: Arc<dyn SessionBackend>,
        health: AppState,
    ) -> Self {
        Self {
            opts,
            resolver,
            metadata,
            storage,
            sender,
            queue,
            sessions,
            health,
            jobs: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn options(&self) -> &Options {
        &self.opts
    }

    pub(crate) fn resolver(&self) -> &dyn MediaResolver {
        self.resolver.as_ref()
    }

    pub(crate) fn metadata(&self) -> &dyn MetadataStore {
        self.metadata.as_ref()
    }

    pub(crate) fn storage(&self) -> &dyn Blob {
        self.storage.as_ref()
    }

    pub(crate) fn sender(&self) -> &dyn ChatSender {
        self.sender.as_ref()
    }

    pub(crate) fn queue(&self) -> &dyn JobQueue {
        self.queue.as_ref()
    }

    /// Start all worker pools and the chat-update intake, block until
    /// shutdown, then requeue still-registered jobs.
    pub async fn run(
        self: Arc<Self>,
        js: jetstream::Context,
        prefix: &str,
        bot: Bot,
        token: CancellationToken,
    ) -> Result<(), DispatchError> {
        let fetch_consumer = create_job_consumer(&js, prefix, QUEUE_FETCHING).await?;
        let upload_consumer = create_job_consumer(&js, prefix, QUEUE_UPLOADING).await?;

        let (tx, rx) = mpsc::channel::<ChatUpdate>(256);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::new();

        for i in 0..self.opts.fetching_workers {
            let dispatcher = self.clone();
            let consumer = fetch_consumer.clone();
            let token = token.clone();
            workers.push(tokio::spawn(async move {
                if let Err(e) = dispatcher.consume_fetching(consumer, token.clone()).await {
                    error!("consume fetching (worker {}): {}", i, e);
                    token.cancel();
                }
            }));
        }

        for i in 0..self.opts.uploading_workers {
            let dispatcher = self.clone();
            let consumer = upload_consumer.clone();
            let token = token.clone();
            workers.push(tokio::spawn(async move {
                if let Err(e) = dispatcher.consume_uploading(consumer, token.clone()).await {
                    error!("consume uploading (worker {}): {}", i, e);
                    token.cancel();
                }
            }));
        }

        for i in 0..self.opts.chat_update_workers {
            let dispatcher = self.clone();
            let rx = rx.clone();
            let token = token.clone();
            workers.push(tokio::spawn(async move {
                dispatcher.dispatch_chat_updates(i, rx, token).await;
            }));
        }

        info!(
            "Dispatcher running: {} fetching, {} uploading, {} chat workers",
            self.opts.fetching_workers, self.opts.uploading_workers, self.opts.chat_update_workers
        );

        intake_updates(bot, self.opts.polling_timeout, tx, token.clone()).await;

        // Either the token fired or the update stream ended on its own; in
        // both cases the queue workers must stop before the drain.
        token.cancel();

        for worker in workers {
            let _ = worker.await;
        }

        let in_flight = self.jobs.read().await.len();
        info!("Workers stopped, requeueing {} in-flight jobs", in_flight);
        self.requeue_jobs().await
    }

    /// Handle one chat update. `/start` bypasses the FSM; any other text
    /// only enters the FSM while the session is in `Default`, so a request
    /// already in flight for that user is not re-parsed.
    pub(crate) async fn handle_chat_update(&self, update: ChatUpdate) -> Result<(), DispatchError> {
        let text = update.text.trim();

        if let Some(command) = command_name(text) {
            if command == START_COMMAND {
                self.sender.send_text(update.chat_id, GREETING_MESSAGE).await?;
            }
            return Ok(());
        }

        let mut session = Session::new(
            update.user_id.to_string(),
            self.sessions.clone(),
            conversation_machine(),
        );
        session.load().await?;

        if session.current() == ConvState::Default {
            let mut ctx = ParseContext {
                text: text.to_string(),
                chat_id: update.chat_id,
                resolver: self.resolver.clone(),
                queue: self.queue.clone(),
                sender: self.sender.clone(),
            };
            if let Err(e) = session.send_event(ConvEvent::Parse, &mut ctx).await {
                // Session unchanged; no user notice for a rejected event.
                warn!(
                    "conversation event rejected for {}: {}",
                    session.identity(),
                    e
                );
            }
        }

        session.flush().await?;
        Ok(())
    }

    async fn dispatch_chat_updates(
        &self,
        worker: usize,
        rx: Arc<Mutex<mpsc::Receiver<ChatUpdate>>>,
        token: CancellationToken,
    ) {
        loop {
            let update = {
                let mut rx = rx.lock().await;
                tokio::select! {
                    _ = token.cancelled() => return,
                    update = rx.recv() => match update {
                        Some(update) => update,
                        None => return,
                    },
                }
            };

            self.health.increment_updates_received().await;
            if let Err(e) = self.handle_chat_update(update).await {
                error!("handle chat update (worker {}): {}", worker, e);
                self.health.increment_errors().await;
            }
        }
    }

    async fn consume_fetching(
        &self,
        consumer: PullConsumer,
        token: CancellationToken,
    ) -> Result<(), DispatchError> {
        let mut stream = JobStream::<JobPayload>::new(&consumer).await?;

        loop {
            let next = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                next = stream.next() => next,
            };
            let Some(result) = next else { return Ok(()) };

            let payload = match result {
                Ok(payload) => payload,
                Err(reeler_nats::Error::Serialization(e)) => {
                    error!("decode fetching payload: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            self.register_job(JobKind::Fetching, &payload).await;

            match self.fetch(payload.clone()).await {
                Ok(()) => {
                    self.deregister_job(JobKind::Fetching, &payload.video_id).await;
                    self.health.increment_jobs_fetched().await;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("fetching video {}: {}", payload.video_id, e);
                    self.health.increment_errors().await;
                    if let Err(e) = self
                        .sender
                        .send_text(payload.chat_id, SENDING_ERROR_MESSAGE)
                        .await
                    {
                        error!("send message: {}", e);
                    }
                }
            }
        }
    }

    async fn consume_uploading(
        &self,
        consumer: PullConsumer,
        token: CancellationToken,
    ) -> Result<(), DispatchError> {
        let mut stream = JobStream::<JobPayload>::new(&consumer).await?;

        loop {
            let next = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                next = stream.next() => next,
            };
            let Some(result) = next else { return Ok(()) };

            let payload = match result {
                Ok(payload) => payload,
                Err(reeler_nats::Error::Serialization(e)) => {
                    error!("decode uploading payload: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            self.register_job(JobKind::Uploading, &payload).await;

            match self.upload(payload.clone()).await {
                Ok(()) => {
                    self.deregister_job(JobKind::Uploading, &payload.video_id).await;
                    self.health.increment_jobs_uploaded().await;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("uploading video {}: {}", payload.video_id, e);
                    self.health.increment_errors().await;
                    if let Err(e) = self
                        .sender
                        .send_text(payload.chat_id, SENDING_ERROR_MESSAGE)
                        .await
                    {
                        error!("send message: {}", e);
                    }
                }
            }
        }
    }

    /// Record a dequeued message before processing starts.
    pub(crate) async fn register_job(&self, kind: JobKind, payload: &JobPayload) {
        self.jobs.write().await.push(Job::new(kind, payload.minimal()));
    }

    /// Remove a job once its phase completed successfully.
    pub(crate) async fn deregister_job(&self, kind: JobKind, video_id: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(idx) = jobs
            .iter()
            .position(|job| job.kind == kind && job.payload.video_id == video_id)
        {
            jobs.remove(idx);
        }
    }

    #[cfg(test)]
    pub(crate) async fn registered_jobs(&self) -> Vec<Job> {
        self.jobs.read().await.clone()
    }

    /// Republish every still-registered job onto its originating queue so
    /// no accepted-but-unfinished work is silently lost.
    pub(crate) async fn requeue_jobs(&self) -> Result<(), DispatchError> {
        let drained: Vec<Job> = std::mem::take(&mut *self.jobs.write().await);
        if drained.is_empty() {
            return Ok(());
        }

        let mut failed = 0usize;
        for job in drained {
            let result = match job.kind {
                JobKind::Fetching => self.queue.publish_fetching(&job.payload).await,
                JobKind::Uploading => self.queue.publish_uploading(&job.payload).await,
            };
            match result {
                Ok(()) => {
                    debug!("requeued {:?} job {}", job.kind, job.payload.video_id);
                    self.health.increment_jobs_requeued().await;
                }
                Err(e) => {
                    failed += 1;
                    error!("requeue {:?} job {}: {}", job.kind, job.payload.video_id, e);
                }
            }
        }

        if failed > 0 {
            return Err(DispatchError::Queue(format!(
                "{} requeue publishes failed",
                failed
            )));
        }
        Ok(())
    }
}

/// `/start` → `start`; `/start@some_bot now` → `start`; plain text → None.
fn command_name(text: &str) -> Option<&str> {
    let command = text.strip_prefix('/')?;
    let name = command.split_whitespace().next()?;
    name.split('@').next()
}

/// Long-poll Telegram and feed text messages into the worker channel.
/// Returns when the cancellation token fires or the stream ends; dropping
/// the channel sender lets the chat workers drain out.
async fn intake_updates(
    bot: Bot,
    polling_timeout: u32,
    tx: mpsc::Sender<ChatUpdate>,
    token: CancellationToken,
) {
    let mut listener = Polling::builder(bot)
        .timeout(Duration::from_secs(u64::from(polling_timeout)))
        .build();
    let stream = listener.as_stream();
    tokio::pin!(stream);

    info!("Chat update intake started (polling)");
    loop {
        let update = tokio::select! {
            _ = token.cancelled() => break,
            update = stream.next() => update,
        };
        let Some(update) = update else { break };

        match update {
            Ok(update) => {
                if let Some(chat_update) = chat_update_from(update) {
                    if tx.send(chat_update).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => warn!("telegram update stream: {}", e),
        }
    }
    info!("Chat update intake stopped");
}

fn chat_update_from(update: Update) -> Option<ChatUpdate> {
    let UpdateKind::Message(message) = update.kind else {
        return None;
    };
    let text = message.text()?.to_string();
    let from = message.from.as_ref()?;

    Some(ChatUpdate {
        user_id: from.id.0 as i64,
        chat_id: message.chat.id.0,
        text,
    })
}

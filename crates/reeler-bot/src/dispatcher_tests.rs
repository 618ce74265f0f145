use serde_json::Value;

use reeler_state::SessionBackend;
use reeler_types::{JobKind, JobPayload};

use super::{command_name, ChatUpdate, GREETING_MESSAGE, SENDING_ERROR_MESSAGE};
use crate::dispatcher::DOWNLOAD_STARTED_MESSAGE;
use crate::testutil::*;

fn update(user_id: i64, chat_id: i64, text: &str) -> ChatUpdate {
    ChatUpdate {
        user_id,
        chat_id,
        text: text.to_string(),
    }
}

async fn flushed_state(sessions: &dyn SessionBackend, identity: &str) -> Option<String> {
    let bytes = sessions.get(identity).await.ok()?;
    let value: Value = serde_json::from_slice(&bytes).ok()?;
    Some(value.get("current")?.as_str()?.to_string())
}

// ── Command handling ──────────────────────────────────────────────────────

#[test]
fn test_command_name_parsing() {
    assert_eq!(command_name("/start"), Some("start"));
    assert_eq!(command_name("/start@reeler_bot"), Some("start"));
    assert_eq!(command_name("/start now"), Some("start"));
    assert_eq!(command_name("https://example.com/watch?v=abc"), None);
    assert_eq!(command_name("plain text"), None);
}

#[tokio::test]
async fn test_start_command_bypasses_fsm() {
    let h = harness(MockResolver::failing(), MockMetadataStore::new());

    h.dispatcher
        .handle_chat_update(update(7, 42, "/start"))
        .await
        .expect("handle");

    assert_eq!(h.sender.texts(), vec![(42, GREETING_MESSAGE.to_string())]);
    assert!(h.queue.fetching().is_empty());
    assert!(
        h.sessions.get("7").await.is_err(),
        "the greeting must not create a session"
    );
}

#[tokio::test]
async fn test_other_commands_are_ignored() {
    let h = harness(MockResolver::failing(), MockMetadataStore::new());

    h.dispatcher
        .handle_chat_update(update(7, 42, "/help"))
        .await
        .expect("handle");

    assert!(h.sender.texts().is_empty());
    assert!(h.queue.fetching().is_empty());
}

// ── FSM-gated parsing ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_text_message_creates_fetch_job() {
    let h = harness(
        MockResolver::with_info(sample_info("abc123")),
        MockMetadataStore::new(),
    );

    h.dispatcher
        .handle_chat_update(update(7, 42, "https://example.com/watch?v=abc123"))
        .await
        .expect("handle");

    assert_eq!(h.queue.fetching(), vec![JobPayload::new("abc123", 42)]);
    assert_eq!(
        h.sender.texts(),
        vec![(42, DOWNLOAD_STARTED_MESSAGE.to_string())]
    );
    assert_eq!(
        flushed_state(h.sessions.as_ref(), "7").await.as_deref(),
        Some("default"),
        "the parse cascade must land back in the default state"
    );
}

#[tokio::test]
async fn test_in_flight_session_is_not_reparsed() {
    let h = harness(
        MockResolver::with_info(sample_info("abc123")),
        MockMetadataStore::new(),
    );
    h.sessions
        .set(
            "7",
            br#"{"current":"parsing","previous":"default"}"#.to_vec(),
        )
        .await
        .expect("seed session");

    h.dispatcher
        .handle_chat_update(update(7, 42, "https://example.com/watch?v=abc123"))
        .await
        .expect("handle");

    assert!(
        h.queue.fetching().is_empty(),
        "a session already in parsing must not create another job"
    );
    assert_eq!(
        flushed_state(h.sessions.as_ref(), "7").await.as_deref(),
        Some("parsing")
    );
}

#[tokio::test]
async fn test_resolution_failure_notifies_and_returns_to_default() {
    let h = harness(MockResolver::failing(), MockMetadataStore::new());

    h.dispatcher
        .handle_chat_update(update(7, 42, "gibberish"))
        .await
        .expect("handle");

    assert_eq!(h.sender.texts(), vec![(42, SENDING_ERROR_MESSAGE.to_string())]);
    assert!(h.queue.fetching().is_empty());
    assert_eq!(
        flushed_state(h.sessions.as_ref(), "7").await.as_deref(),
        Some("default")
    );
}

#[tokio::test]
async fn test_corrupt_session_drops_message() {
    let h = harness(
        MockResolver::with_info(sample_info("abc123")),
        MockMetadataStore::new(),
    );
    h.sessions
        .set("7", b"not json".to_vec())
        .await
        .expect("seed session");

    let err = h
        .dispatcher
        .handle_chat_update(update(7, 42, "https://example.com/watch?v=abc123"))
        .await
        .expect_err("corrupt session must be fatal for this message");
    assert!(!err.is_fatal());
    assert!(h.queue.fetching().is_empty(), "no job may be created");
}

// ── Job registry & shutdown drain ─────────────────────────────────────────

#[tokio::test]
async fn test_registry_register_deregister() {
    let h = harness(MockResolver::failing(), MockMetadataStore::new());
    let payload = JobPayload::new("abc123", 42).with_rendition("video/mp4", "hd720");

    h.dispatcher.register_job(JobKind::Fetching, &payload).await;
    h.dispatcher.register_job(JobKind::Uploading, &payload).await;
    assert_eq!(h.dispatcher.registered_jobs().await.len(), 2);

    h.dispatcher.deregister_job(JobKind::Fetching, "abc123").await;
    let remaining = h.dispatcher.registered_jobs().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].kind, JobKind::Uploading);
}

#[tokio::test]
async fn test_shutdown_requeues_jobs_partitioned_by_kind() {
    let h = harness(MockResolver::failing(), MockMetadataStore::new());

    h.dispatcher
        .register_job(JobKind::Fetching, &JobPayload::new("vid-a", 1))
        .await;
    h.dispatcher
        .register_job(
            JobKind::Fetching,
            &JobPayload::new("vid-b", 2).with_rendition("video/mp4", "hd720"),
        )
        .await;
    h.dispatcher
        .register_job(JobKind::Uploading, &JobPayload::new("vid-c", 3))
        .await;

    h.dispatcher.requeue_jobs().await.expect("requeue");

    // Exactly N publishes, minimal payloads, partitioned by kind.
    assert_eq!(
        h.queue.fetching(),
        vec![JobPayload::new("vid-a", 1), JobPayload::new("vid-b", 2)]
    );
    assert_eq!(h.queue.uploading(), vec![JobPayload::new("vid-c", 3)]);
    assert!(h.dispatcher.registered_jobs().await.is_empty());
}

#[tokio::test]
async fn test_requeue_with_empty_registry_publishes_nothing() {
    let h = harness(MockResolver::failing(), MockMetadataStore::new());

    h.dispatcher.requeue_jobs().await.expect("requeue");

    assert!(h.queue.fetching().is_empty());
    assert!(h.queue.uploading().is_empty());
}

//! Hand-rolled recording mocks for the dispatcher's collaborators

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use reeler_db::{Error as DbError, MetadataRecord, MetadataStore};
use reeler_nats::{Error as NatsError, JobQueue};
use reeler_state::MemoryBackend;
use reeler_storage::{Blob, Error as StorageError, MemoryBlob, ObjectBody};
use reeler_types::{JobPayload, VideoParams};

use crate::dispatcher::{Dispatcher, Options};
use crate::health::AppState;
use crate::resolver::{MediaInfo, MediaResolver, Rendition, ResolveError};
use crate::telegram::{ChatError, ChatSender, VideoSource};

pub(crate) fn sample_info(id: &str) -> MediaInfo {
    MediaInfo {
        id: id.to_string(),
        title: "A clip".to_string(),
        thumbnail: "https://example.com/t.jpg".to_string(),
        renditions: vec![
            Rendition {
                mime: "video/mp4".to_string(),
                quality: "hd720".to_string(),
                width: 1280,
                height: 720,
                duration: 60,
                audio_channels: 2,
                url: String::new(),
            },
            Rendition {
                mime: "video/webm".to_string(),
                quality: "medium".to_string(),
                width: 640,
                height: 360,
                duration: 60,
                audio_channels: 2,
                url: String::new(),
            },
        ],
    }
}

pub(crate) struct MockResolver {
    info: Option<MediaInfo>,
    bytes: Bytes,
    fail_download: bool,
    downloads: Mutex<Vec<String>>,
}

impl MockResolver {
    pub(crate) fn with_info(info: MediaInfo) -> Self {
        Self {
            info: Some(info),
            bytes: Bytes::from_static(b"video-bytes"),
            fail_download: false,
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            info: None,
            bytes: Bytes::new(),
            fail_download: false,
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaResolver for MockResolver {
    async fn resolve(&self, _input: &str) -> Result<MediaInfo, ResolveError> {
        self.info
            .clone()
            .ok_or_else(|| ResolveError::Lookup("mock lookup failure".to_string()))
    }

    async fn download(&self, video_id: &str, _rendition: &Rendition) -> Result<Bytes, ResolveError> {
        if self.fail_download {
            return Err(ResolveError::Download("mock download failure".to_string()));
        }
        self.downloads.lock().unwrap().push(video_id.to_string());
        Ok(self.bytes.clone())
    }
}

#[derive(Default)]
pub(crate) struct MockMetadataStore {
    records: Mutex<HashMap<(String, String, String), MetadataRecord>>,
    upserts: Mutex<Vec<MetadataRecord>>,
    conflict_on_upsert: bool,
}

impl MockMetadataStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_record(record: MetadataRecord) -> Self {
        let store = Self::default();
        store.records.lock().unwrap().insert(
            (
                record.video_id.clone(),
                record.mime.clone(),
                record.quality.clone(),
            ),
            record,
        );
        store
    }

    pub(crate) fn with_record_conflicting(record: MetadataRecord) -> Self {
        let mut store = Self::with_record(record);
        store.conflict_on_upsert = true;
        store
    }

    pub(crate) fn upserts(&self) -> Vec<MetadataRecord> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataStore for MockMetadataStore {
    async fn fetch_by_key(
        &self,
        video_id: &str,
        mime: &str,
        quality: &str,
    ) -> reeler_db::Result<MetadataRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(video_id.to_string(), mime.to_string(), quality.to_string()))
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn upsert(&self, record: &MetadataRecord) -> reeler_db::Result<()> {
        if self.conflict_on_upsert {
            return Err(DbError::Conflict);
        }
        self.upserts.lock().unwrap().push(record.clone());

        let key = (
            record.video_id.clone(),
            record.mime.clone(),
            record.quality.clone(),
        );
        let mut records = self.records.lock().unwrap();
        let mut stored = record.clone();
        // Mirror the real store's one-way promotion.
        if stored.file_id.is_empty() {
            if let Some(existing) = records.get(&key) {
                stored.file_id = existing.file_id.clone();
            }
        }
        records.insert(key, stored);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MockQueue {
    fetching: Mutex<Vec<JobPayload>>,
    uploading: Mutex<Vec<JobPayload>>,
    fail: bool,
}

impl MockQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn fetching(&self) -> Vec<JobPayload> {
        self.fetching.lock().unwrap().clone()
    }

    pub(crate) fn uploading(&self) -> Vec<JobPayload> {
        self.uploading.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobQueue for MockQueue {
    async fn publish_fetching(&self, payload: &JobPayload) -> reeler_nats::Result<()> {
        if self.fail {
            return Err(NatsError::Publish("mock broker failure".to_string()));
        }
        self.fetching.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn publish_uploading(&self, payload: &JobPayload) -> reeler_nats::Result<()> {
        if self.fail {
            return Err(NatsError::Publish("mock broker failure".to_string()));
        }
        self.uploading.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSender {
    texts: Mutex<Vec<(i64, String)>>,
    references: Mutex<Vec<(i64, String)>>,
    uploads: Mutex<Vec<(i64, VideoParams)>>,
}

impl RecordingSender {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn texts(&self) -> Vec<(i64, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub(crate) fn references(&self) -> Vec<(i64, String)> {
        self.references.lock().unwrap().clone()
    }

    pub(crate) fn uploads(&self) -> Vec<(i64, VideoParams)> {
        self.uploads.lock().unwrap().clone()
    }
}

/// The delivery reference every mock upload returns.
pub(crate) const MOCK_FILE_ID: &str = "tg-file-ref-1";

#[async_trait]
impl ChatSender for RecordingSender {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        self.texts.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_by_reference(
        &self,
        chat_id: i64,
        file_id: &str,
        _caption: &str,
    ) -> Result<(), ChatError> {
        self.references
            .lock()
            .unwrap()
            .push((chat_id, file_id.to_string()));
        Ok(())
    }

    async fn upload_video(
        &self,
        chat_id: i64,
        _source: VideoSource,
        params: &VideoParams,
    ) -> Result<String, ChatError> {
        self.uploads.lock().unwrap().push((chat_id, params.clone()));
        Ok(MOCK_FILE_ID.to_string())
    }
}

/// MemoryBlob wrapper that counts operations, so tests can assert "zero
/// blob reads" style properties.
#[derive(Default)]
pub(crate) struct CountingBlob {
    inner: MemoryBlob,
    pub(crate) creates: AtomicUsize,
    pub(crate) opens: AtomicUsize,
    pub(crate) deletes: AtomicUsize,
}

impl CountingBlob {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Blob for CountingBlob {
    async fn create(&self, bucket: &str, key: &str, contents: Bytes) -> reeler_storage::Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(bucket, key, contents).await
    }

    async fn open(&self, bucket: &str, key: &str) -> reeler_storage::Result<ObjectBody> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(bucket, key).await
    }

    async fn exists(&self, bucket: &str, key: &str) -> reeler_storage::Result<bool> {
        self.inner.exists(bucket, key).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> reeler_storage::Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(bucket, key).await
    }
}

/// A failing blob store, for exercising the fatal path.
pub(crate) struct BrokenBlob;

#[async_trait]
impl Blob for BrokenBlob {
    async fn create(&self, _: &str, _: &str, _: Bytes) -> reeler_storage::Result<()> {
        Err(StorageError::Other("blob store unavailable".to_string()))
    }

    async fn open(&self, _: &str, _: &str) -> reeler_storage::Result<ObjectBody> {
        Err(StorageError::Other("blob store unavailable".to_string()))
    }

    async fn exists(&self, _: &str, _: &str) -> reeler_storage::Result<bool> {
        Err(StorageError::Other("blob store unavailable".to_string()))
    }

    async fn delete(&self, _: &str, _: &str) -> reeler_storage::Result<()> {
        Err(StorageError::Other("blob store unavailable".to_string()))
    }
}

pub(crate) const TEST_BUCKET: &str = "videos";

pub(crate) struct TestHarness {
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) resolver: Arc<MockResolver>,
    pub(crate) metadata: Arc<MockMetadataStore>,
    pub(crate) storage: Arc<CountingBlob>,
    pub(crate) sender: Arc<RecordingSender>,
    pub(crate) queue: Arc<MockQueue>,
    pub(crate) sessions: Arc<MemoryBackend>,
}

pub(crate) fn harness(resolver: MockResolver, metadata: MockMetadataStore) -> TestHarness {
    harness_with(resolver, metadata, MockQueue::new())
}

pub(crate) fn harness_with(
    resolver: MockResolver,
    metadata: MockMetadataStore,
    queue: MockQueue,
) -> TestHarness {
    let resolver = Arc::new(resolver);
    let metadata = Arc::new(metadata);
    let storage = Arc::new(CountingBlob::new());
    let sender = Arc::new(RecordingSender::new());
    let queue = Arc::new(queue);
    let sessions = Arc::new(MemoryBackend::new());

    let dispatcher = Arc::new(Dispatcher::new(
        Options {
            bucket: TEST_BUCKET.to_string(),
            polling_timeout: 1,
            chat_update_workers: 1,
            fetching_workers: 1,
            uploading_workers: 1,
        },
        resolver.clone(),
        metadata.clone(),
        storage.clone(),
        sender.clone(),
        queue.clone(),
        sessions.clone(),
        AppState::new(None),
    ));

    TestHarness {
        dispatcher,
        resolver,
        metadata,
        storage,
        sender,
        queue,
        sessions,
    }
}

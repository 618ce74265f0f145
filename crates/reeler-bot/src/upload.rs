//! Upload phase
//!
//! Delivers cached content to the chat. A record that already carries a
//! delivery reference is re-sent by reference with no blob I/O; otherwise
//! the blob is uploaded, the returned reference recorded (a one-way
//! promotion), and the now-redundant blob deleted. A missing record or
//! missing blob sends the payload back to the fetch queue.

#[cfg(test)]
#[path = "upload_tests.rs"]
mod upload_tests;

use chrono::Utc;
use tracing::{debug, info};

use reeler_storage::ObjectBody;
use reeler_types::JobPayload;

use crate::dispatcher::Dispatcher;
use crate::errors::DispatchError;
use crate::telegram::VideoSource;

impl Dispatcher {
    /// Run the upload algorithm for one consumed payload.
    pub(crate) async fn upload(&self, payload: JobPayload) -> Result<(), DispatchError> {
        let mut record = match self
            .metadata()
            .fetch_by_key(&payload.video_id, &payload.mime, &payload.quality)
            .await
        {
            Ok(record) => record,
            Err(reeler_db::Error::NotFound) => {
                // Nothing fetched under this key yet; send it back around.
                debug!("no metadata for video {}, requeueing fetch", payload.video_id);
                self.queue().publish_fetching(&payload.minimal()).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if record.has_delivery_reference() {
            self.sender()
                .send_by_reference(payload.chat_id, &record.file_id, &record.params.title)
                .await?;
            debug!("delivered video {} by reference", payload.video_id);
            return Ok(());
        }

        let body = match self
            .storage()
            .open(&self.options().bucket, &payload.video_id)
            .await
        {
            Ok(body) => body,
            Err(reeler_storage::Error::NotFound) => {
                // The blob vanished between fetch and upload; self-heal.
                debug!("blob missing for video {}, requeueing fetch", payload.video_id);
                self.queue().publish_fetching(&payload.minimal()).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let source = match body {
            ObjectBody::Inline(bytes) => VideoSource::Bytes(bytes),
            ObjectBody::Public(url) => VideoSource::Url(url),
        };

        let file_id = self
            .sender()
            .upload_video(payload.chat_id, source, &record.params)
            .await?;

        record.file_id = file_id;
        record.updated_at = Utc::now();
        self.metadata().upsert(&record).await?;

        self.storage()
            .delete(&self.options().bucket, &payload.video_id)
            .await?;

        info!("delivered and promoted video {}", payload.video_id);
        Ok(())
    }
}

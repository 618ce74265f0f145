//! Fetch phase
//!
//! Resolves content metadata, picks a rendition, and makes sure the bytes
//! exist in the blob store before handing the payload to the upload
//! queue. The decision tree below is the deduplication core: whatever the
//! cache already holds, every path converges on exactly one
//! upload-requests publish.

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod fetch_tests;

use tracing::{debug, info};

use reeler_db::MetadataRecord;
use reeler_types::{JobPayload, VideoParams};

use crate::dispatcher::Dispatcher;
use crate::errors::DispatchError;
use crate::resolver::{select_rendition, MediaInfo, Rendition, ResolveError};

impl Dispatcher {
    /// Run the fetch algorithm for one consumed payload.
    pub(crate) async fn fetch(&self, payload: JobPayload) -> Result<(), DispatchError> {
        let info = self.resolver().resolve(&payload.video_id).await?;
        let rendition = select_rendition(&info)
            .ok_or(DispatchError::Resolution(ResolveError::NoRendition))?;

        let payload = payload.with_rendition(&rendition.mime, &rendition.quality);

        match self
            .metadata()
            .fetch_by_key(&payload.video_id, &payload.mime, &payload.quality)
            .await
        {
            Err(reeler_db::Error::NotFound) => {
                self.download_into_store(&payload, rendition).await?;

                let record = MetadataRecord::new(
                    &payload.video_id,
                    &payload.mime,
                    &payload.quality,
                    rendition_params(&info, rendition),
                );
                self.metadata().upsert(&record).await?;
                info!("fetched and cached video {}", payload.video_id);
            }
            Ok(record) if !record.has_delivery_reference() => {
                // Fetched before but never delivered; the blob may have
                // been reclaimed or lost in the meantime.
                let present = self
                    .storage()
                    .exists(&self.options().bucket, &payload.video_id)
                    .await?;
                if !present {
                    self.download_into_store(&payload, rendition).await?;
                    info!("restored missing blob for video {}", payload.video_id);
                } else {
                    debug!("blob already present for video {}", payload.video_id);
                }
            }
            Ok(_) => {
                // Delivered before; the upload phase short-circuits to
                // reference-based delivery.
                debug!("video {} already delivered once", payload.video_id);
            }
            Err(e) => return Err(e.into()),
        }

        self.queue().publish_uploading(&payload).await?;
        Ok(())
    }

    async fn download_into_store(
        &self,
        payload: &JobPayload,
        rendition: &Rendition,
    ) -> Result<(), DispatchError> {
        let bytes = self
            .resolver()
            .download(&payload.video_id, rendition)
            .await?;
        self.storage()
            .create(&self.options().bucket, &payload.video_id, bytes)
            .await?;
        Ok(())
    }
}

fn rendition_params(info: &MediaInfo, rendition: &Rendition) -> VideoParams {
    VideoParams {
        title: info.title.clone(),
        width: rendition.width,
        height: rendition.height,
        duration: rendition.duration,
        thumb: info.thumbnail.clone(),
    }
}

//! Telegram chat transport adapter

use async_trait::async_trait;
use bytes::Bytes;
use teloxide::payloads::SendVideoSetters;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use thiserror::Error;
use tracing::debug;

use reeler_types::VideoParams;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("telegram request failed: {0}")]
    Request(String),

    #[error("upload response carried no file reference")]
    MissingReference,
}

/// What the upload phase hands to the transport: raw bytes from the blob
/// store, or a public locator the transport pulls from itself.
#[derive(Debug, Clone)]
pub enum VideoSource {
    Bytes(Bytes),
    Url(String),
}

/// Chat transport collaborator.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError>;

    /// Cheap re-delivery by a previously issued reference.
    async fn send_by_reference(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
    ) -> Result<(), ChatError>;

    /// Full upload. Returns the delivery reference issued by the
    /// transport, which makes future deliveries reference-based.
    async fn upload_video(
        &self,
        chat_id: i64,
        source: VideoSource,
        params: &VideoParams,
    ) -> Result<String, ChatError>;
}

/// Teloxide-backed sender.
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatSender for TelegramSender {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;
        Ok(())
    }

    async fn send_by_reference(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
    ) -> Result<(), ChatError> {
        debug!("Re-delivering to chat {} by reference", chat_id);
        self.bot
            .send_video(ChatId(chat_id), InputFile::file_id(file_id))
            .caption(caption.to_string())
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;
        Ok(())
    }

    async fn upload_video(
        &self,
        chat_id: i64,
        source: VideoSource,
        params: &VideoParams,
    ) -> Result<String, ChatError> {
        let input = match source {
            VideoSource::Bytes(bytes) => {
                InputFile::memory(bytes).file_name(format!("{}.mp4", params.title))
            }
            VideoSource::Url(url) => {
                let url = url::Url::parse(&url)
                    .map_err(|e| ChatError::Request(format!("bad public url: {}", e)))?;
                InputFile::url(url)
            }
        };

        let mut request = self
            .bot
            .send_video(ChatId(chat_id), input)
            .caption(params.title.clone())
            .disable_notification(true);
        if params.width > 0 {
            request = request.width(params.width as u32);
        }
        if params.height > 0 {
            request = request.height(params.height as u32);
        }
        if params.duration > 0 {
            request = request.duration(params.duration as u32);
        }

        let message = request
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        message
            .video()
            .map(|video| video.file.id.clone())
            .ok_or(ChatError::MissingReference)
    }
}

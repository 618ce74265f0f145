//! Media source resolution
//!
//! The pipeline never talks to the media source directly; it goes through
//! [`MediaResolver`], resolved here against an external resolver service
//! over HTTP.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Quality preference used to pick a rendition, best first.
pub const QUALITY_PREFERENCE: [&str; 4] = ["hd720", "hd1080", "medium", "small"];

/// One quality/encoding variant of a piece of content.
#[derive(Debug, Clone, Deserialize)]
pub struct Rendition {
    pub mime: String,
    pub quality: String,
    pub width: i32,
    pub height: i32,
    /// Duration in seconds.
    pub duration: i32,
    #[serde(default)]
    pub audio_channels: u8,
    /// Direct stream URL, when the resolver exposes one.
    #[serde(default)]
    pub url: String,
}

/// Resolved content metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    pub renditions: Vec<Rendition>,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("media lookup failed: {0}")]
    Lookup(String),

    #[error("no rendition matches the quality preference")]
    NoRendition,

    #[error("stream download failed: {0}")]
    Download(String),
}

/// External media source collaborator.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resolve a chat message (link or bare id) into content metadata.
    async fn resolve(&self, input: &str) -> Result<MediaInfo, ResolveError>;

    /// Download the full stream of one rendition.
    async fn download(&self, video_id: &str, rendition: &Rendition) -> Result<Bytes, ResolveError>;
}

/// Pick a rendition by the fixed quality preference. Only audio-bearing
/// renditions qualify.
pub fn select_rendition(info: &MediaInfo) -> Option<&Rendition> {
    QUALITY_PREFERENCE.iter().find_map(|quality| {
        info.renditions
            .iter()
            .find(|r| r.audio_channels > 0 && r.quality == *quality)
    })
}

/// HTTP client against the resolver service.
pub struct HttpMediaResolver {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpMediaResolver {
    pub fn new(base_url: Url, timeout: std::time::Duration) -> Result<Self, ResolveError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolveError::Lookup(format!("building http client: {}", e)))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ResolveError> {
        self.base_url
            .join(path)
            .map_err(|e| ResolveError::Lookup(format!("bad resolver url: {}", e)))
    }
}

#[async_trait]
impl MediaResolver for HttpMediaResolver {
    async fn resolve(&self, input: &str) -> Result<MediaInfo, ResolveError> {
        let url = self.endpoint("resolve")?;
        debug!("Resolving media input via {}", url);

        let response = self
            .http
            .get(url)
            .query(&[("input", input)])
            .send()
            .await
            .map_err(|e| ResolveError::Lookup(e.to_string()))?
            .error_for_status()
            .map_err(|e| ResolveError::Lookup(e.to_string()))?;

        response
            .json::<MediaInfo>()
            .await
            .map_err(|e| ResolveError::Lookup(format!("decoding media info: {}", e)))
    }

    async fn download(&self, video_id: &str, rendition: &Rendition) -> Result<Bytes, ResolveError> {
        let url = if rendition.url.is_empty() {
            let mut url = self.endpoint(&format!("stream/{}", video_id))?;
            url.query_pairs_mut()
                .append_pair("mime", &rendition.mime)
                .append_pair("quality", &rendition.quality);
            url
        } else {
            Url::parse(&rendition.url)
                .map_err(|e| ResolveError::Download(format!("bad stream url: {}", e)))?
        };
        debug!("Downloading rendition from {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ResolveError::Download(e.to_string()))?
            .error_for_status()
            .map_err(|e| ResolveError::Download(e.to_string()))?;

        response
            .bytes()
            .await
            .map_err(|e| ResolveError::Download(e.to_string()))
    }
}

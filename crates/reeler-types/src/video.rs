//! Rendition parameters

use serde::{Deserialize, Serialize};

/// Parameters of the rendition chosen during the fetch phase.
///
/// Stored inside the metadata record and used as upload metadata when the
/// content is delivered for the first time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoParams {
    pub title: String,
    pub width: i32,
    pub height: i32,
    /// Duration in seconds.
    pub duration: i32,
    /// Thumbnail locator.
    #[serde(default)]
    pub thumb: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let params = VideoParams {
            title: "Some clip".to_string(),
            width: 1280,
            height: 720,
            duration: 213,
            thumb: "https://example.com/t.jpg".to_string(),
        };
        let json = serde_json::to_string(&params).expect("serialize");
        let back: VideoParams = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, params);
    }

    #[test]
    fn test_thumb_defaults_to_empty() {
        let params: VideoParams = serde_json::from_str(
            r#"{"title":"t","width":1,"height":2,"duration":3}"#,
        )
        .expect("deserialize");
        assert!(params.thumb.is_empty());
    }
}

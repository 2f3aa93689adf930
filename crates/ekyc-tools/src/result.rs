//! Session output values.
//!
//! Every blob leaves the toolkit wrapped in a `CaptureResult` carrying a
//! generated content name (uuid + UTC timestamp + extension), so callers
//! can persist it without inventing filenames.

use crate::config::VideoMime;
use chrono::Utc;
use ekyc_camera::ImageMime;
use serde::Serialize;
use uuid::Uuid;

/// An encoded media blob plus upload metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    #[serde(skip_serializing)]
    pub blob: Vec<u8>,
    pub content_name: String,
    pub content_type: String,
    pub content_length: usize,
}

impl CaptureResult {
    pub fn image(blob: Vec<u8>, mime: ImageMime) -> Self {
        Self::new(blob, mime.mime_type(), mime.extension())
    }

    pub fn video(blob: Vec<u8>, mime: VideoMime) -> Self {
        Self::new(blob, mime.mime_type(), mime.extension())
    }

    fn new(blob: Vec<u8>, content_type: &str, extension: &str) -> Self {
        let content_length = blob.len();
        Self {
            blob,
            content_name: new_content_name(extension),
            content_type: content_type.to_string(),
            content_length,
        }
    }
}

/// Recording output: the video itself plus an optional still poster
/// taken from the first recorded frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResult {
    #[serde(flatten)]
    pub video: CaptureResult,
    pub poster: Option<CaptureResult>,
}

/// `{uuid}-{yyyymmddHHMMSS}.{ext}`, timestamp in UTC.
fn new_content_name(extension: &str) -> String {
    format!(
        "{}-{}.{}",
        Uuid::new_v4(),
        Utc::now().format("%Y%m%d%H%M%S"),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_name_shape() {
        let name = new_content_name("png");
        assert!(name.ends_with(".png"));
        // uuid (36 chars) + '-' + 14-digit timestamp + ".png"
        assert_eq!(name.len(), 36 + 1 + 14 + 4);
        let stamp = &name[37..51];
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_content_names_are_unique() {
        assert_ne!(new_content_name("jpg"), new_content_name("jpg"));
    }

    #[test]
    fn test_image_result_metadata() {
        let result = CaptureResult::image(vec![1, 2, 3], ImageMime::Jpeg);
        assert_eq!(result.content_type, "image/jpeg");
        assert_eq!(result.content_length, 3);
        assert!(result.content_name.ends_with(".jpg"));
    }

    #[test]
    fn test_video_result_metadata() {
        let result = CaptureResult::video(vec![0; 10], VideoMime::Webm);
        assert_eq!(result.content_type, "video/webm");
        assert_eq!(result.content_length, 10);
        assert!(result.content_name.ends_with(".webm"));
    }

    #[test]
    fn test_serialized_metadata_skips_blob() {
        let result = CaptureResult::image(vec![9; 4], ImageMime::Png);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("blob").is_none());
        assert_eq!(json["contentType"], "image/png");
        assert_eq!(json["contentLength"], 4);
    }
}

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Stable reference to a stored attachment blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

/// An uploaded file before it has been handed to an attachment store.
#[derive(Debug, Clone)]
pub struct RawAttachment {
    pub file_name: String,
    /// Declared MIME type, if the client sent one
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl RawAttachment {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            data: data.into(),
        }
    }

    /// Declared MIME type, falling back to one inferred from the file extension.
    pub fn media_type(&self) -> String {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|declared| !declared.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| infer_media_type(&self.file_name).to_string())
    }
}

pub fn infer_media_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "json" => "application/json",
        "zip" => "application/zip",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_prefers_declared_value() {
        let raw = RawAttachment::new("photo.png", Some("image/x-custom".into()), vec![1u8]);
        assert_eq!(raw.media_type(), "image/x-custom");
    }

    #[test]
    fn media_type_falls_back_to_extension() {
        let raw = RawAttachment::new("Report.PDF", Some("  ".into()), vec![1u8]);
        assert_eq!(raw.media_type(), "application/pdf");
        assert_eq!(infer_media_type("README"), "application/octet-stream");
    }

    #[test]
    fn reference_serializes_media_type_as_type() {
        let reference = AttachmentRef {
            url: "/uploads/x.png".into(),
            name: "x.png".into(),
            media_type: "image/png".into(),
        };
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["type"], "image/png");
    }
}

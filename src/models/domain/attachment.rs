use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::errors::{AppError, AppResult};

/// A file sent along with a user turn, already encoded for transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    /// Base64 (standard alphabet) file content.
    pub data: String,
}

impl Attachment {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Attachment {
            mime_type: mime_type.to_string(),
            data: BASE64_STANDARD.encode(bytes),
        }
    }

    /// Accepts data that is already base64, optionally as a `data:` URL.
    pub fn from_base64(mime_type: &str, data: &str) -> AppResult<Self> {
        let payload = match data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => data,
        }
        .trim();

        BASE64_STANDARD
            .decode(payload)
            .map_err(|e| AppError::ValidationError(format!("Attachment is not valid base64: {}", e)))?;

        if mime_type.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Attachment mime type cannot be empty".to_string(),
            ));
        }

        Ok(Attachment {
            mime_type: mime_type.trim().to_string(),
            data: payload.to_string(),
        })
    }

    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime_type = mime_type_for(path);

        log::debug!(
            "Encoded attachment {} ({} bytes, {})",
            path.display(),
            bytes.len(),
            mime_type
        );
        Ok(Attachment::from_bytes(mime_type, &bytes))
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        _ => "application/octet-stream",
    }
}

use axum::extract::Multipart;
use bytes::Bytes;

use crate::error::ApiError;

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024; // 20MB

/// Map an image content type to the extension used in object keys.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Pull the first file out of a multipart body, skipping plain text fields.
/// Returns the bytes, the key extension and the content type.
pub async fn read_image_field(
    multipart: &mut Multipart,
) -> Result<(Bytes, &'static str, String), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.file_name().is_none() {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let Some(ext) = extension_for(&content_type) else {
            return Err(ApiError::Validation("File format not supported.".into()));
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        return Ok((data, ext, content_type));
    }
    Err(ApiError::Validation("Please upload a file".into()))
}

//! Image encoding: raw upload bytes → base64 [`InlineData`].
//!
//! The model API takes images inline as base64 with a MIME type. Browsers
//! usually declare the type on upload; camera captures and CLI inputs often
//! do not, so the type is sniffed from the magic bytes when it is missing.

use crate::error::PageLensError;
use crate::model::InlineData;
use crate::pipeline::input::ImageUpload;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

const GENERIC_MIME: &str = "application/octet-stream";

/// Encode an uploaded image for the extraction request.
///
/// # Errors
/// [`PageLensError::InvalidInput`] when the upload is empty.
pub fn encode_image(upload: &ImageUpload) -> Result<InlineData, PageLensError> {
    if upload.bytes.is_empty() {
        return Err(PageLensError::invalid_input("No image file provided"));
    }

    let mime_type = resolve_mime_type(upload);
    let data = STANDARD.encode(&upload.bytes);
    debug!(
        "Encoded {} ({}) → {} bytes base64",
        upload.file_name.as_deref().unwrap_or("image"),
        mime_type,
        data.len()
    );

    Ok(InlineData { mime_type, data })
}

/// Declared type when it is specific, else sniffed, else generic.
fn resolve_mime_type(upload: &ImageUpload) -> String {
    if let Some(declared) = upload
        .mime_type
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty() && *m != GENERIC_MIME)
    {
        return declared.to_string();
    }

    image::guess_format(&upload.bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| GENERIC_MIME.to_string())
}

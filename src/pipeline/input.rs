//! Input resolution: turn a user-supplied path or URL into image bytes.
//!
//! The HTTP server receives uploads directly; this module serves the CLI,
//! which accepts either a local file or an HTTP(S) URL. Images are small
//! enough to keep in memory, so downloads never touch the file system.

use crate::error::PageLensError;
use std::path::PathBuf;
use tracing::{debug, info};

/// An image ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// MIME type declared by the sender, if any. Sniffed when absent.
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: None,
            file_name: None,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to image bytes.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn resolve_image(input: &str, timeout_secs: u64) -> Result<ImageUpload, PageLensError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<ImageUpload, PageLensError> {
    let path = PathBuf::from(path_str);
    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PageLensError::ImageNotFound { path: path.clone() },
        _ => PageLensError::invalid_input(format!("Cannot read '{}': {e}", path.display())),
    })?;

    debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
    let mut upload = ImageUpload::new(bytes);
    if let Some(name) = path.file_name() {
        upload = upload.with_file_name(name.to_string_lossy());
    }
    Ok(upload)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ImageUpload, PageLensError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PageLensError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PageLensError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PageLensError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PageLensError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| v.starts_with("image/"));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PageLensError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());

    Ok(ImageUpload {
        bytes: bytes.to_vec(),
        mime_type,
        file_name: Some(extract_filename(url)),
    })
}

/// Extract a reasonable filename from the URL.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded-image".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/page.jpg"));
        assert!(is_url("http://example.com/page.png"));
        assert!(!is_url("/tmp/page.png"));
        assert!(!is_url("page.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(extract_filename("https://x.org/scans/p12.jpg?dl=1"), "p12.jpg");
        assert_eq!(extract_filename("https://x.org/scans/"), "downloaded-image");
    }

    #[tokio::test]
    async fn reads_local_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"\x89PNG\r\n\x1a\nrest").unwrap();
        let upload = resolve_image(tmp.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(&upload.bytes[..4], b"\x89PNG");
        assert!(upload.mime_type.is_none());
        assert!(upload.file_name.is_some());
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found() {
        let err = resolve_image("/definitely/not/here.png", 5).await.unwrap_err();
        assert!(matches!(err, PageLensError::ImageNotFound { .. }));
    }
}

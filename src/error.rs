//! Error types for the pagelens library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PageLensError`]: **Fatal.** The request cannot be answered at all
//!   (no image, empty selection, the primary model call failed). Returned as
//!   `Err(PageLensError)` from every public entry point and mapped to an HTTP
//!   status by [`crate::server`].
//!
//! * [`OutputError`]: **Non-fatal.** A secondary enhancement (reformat pass,
//!   structured layout, JSON parsing of a knowledge tree) produced nothing
//!   usable. It is logged and the caller receives the best partial result;
//!   it never reaches an HTTP client.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagelens library.
#[derive(Debug, Error)]
pub enum PageLensError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Required text or image was missing or empty.
    #[error("{reason}")]
    InvalidInput { reason: String },

    /// Image file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    ImageNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Model errors ──────────────────────────────────────────────────────
    /// No API key (or otherwise unusable provider settings).
    #[error("Generative model provider is not configured.\n{hint}")]
    ProviderNotConfigured { hint: String },

    /// The model call failed: transport error, non-2xx status, or an error body.
    #[error("{message}")]
    UpstreamFailure { message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PageLensError {
    /// Shorthand for [`PageLensError::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`PageLensError::UpstreamFailure`].
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's request rather than by us or the model.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

/// A non-fatal problem with model output or a best-effort stage.
///
/// Always recovered locally: the OCR flow drops the affected fields and the
/// knowledge-tree handler substitutes a fallback payload.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum OutputError {
    /// Text that should have been JSON could not be parsed.
    #[error("{stage}: model output is not valid JSON: {detail}")]
    MalformedJson { stage: String, detail: String },

    /// Layout JSON parsed but had no `blocks` array.
    #[error("layout: model output has no `blocks` array")]
    MissingBlocks,

    /// A best-effort model call failed.
    #[error("{stage}: model call failed: {detail}")]
    StageFailed { stage: String, detail: String },
}

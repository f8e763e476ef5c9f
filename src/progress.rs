//! Progress-callback trait for per-stage OCR events.
//!
//! Inject an [`Arc<dyn OcrProgressCallback>`] via
//! [`crate::config::LensConfigBuilder::progress_callback`] to receive events
//! as [`crate::convert::convert_image`] walks through its three model calls.
//! The CLI uses this to drive a spinner; the HTTP server leaves it unset.
//!
//! # Example
//!
//! ```rust
//! use pagelens::{LensConfig, OcrProgressCallback, OcrStage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl OcrProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: OcrStage, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done ({output_len} chars)");
//!     }
//! }
//!
//! let config = LensConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The three sequential model calls of the OCR flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrStage {
    /// Faithful text + math extraction from the image. Fatal on failure.
    Extract,
    /// Readability reformat of the extraction. Best-effort.
    Reformat,
    /// Structured JSON block layout. Best-effort.
    Layout,
}

impl OcrStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrStage::Extract => "extract",
            OcrStage::Reformat => "reformat",
            OcrStage::Layout => "layout",
        }
    }
}

impl fmt::Display for OcrStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called by the OCR flow as it runs each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait OcrProgressCallback: Send + Sync {
    /// Called just before the model request for `stage` is sent.
    fn on_stage_start(&self, stage: OcrStage) {
        let _ = stage;
    }

    /// Called when a stage produced usable output.
    ///
    /// `output_len` is the byte length of the stage's text output.
    fn on_stage_complete(&self, stage: OcrStage, output_len: usize) {
        let _ = (stage, output_len);
    }

    /// Called when a stage failed. For best-effort stages the flow continues.
    fn on_stage_failed(&self, stage: OcrStage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl OcrProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::LensConfig`].
pub type ProgressCallback = Arc<dyn OcrProgressCallback>;

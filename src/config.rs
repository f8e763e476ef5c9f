//! Configuration for the model client, the OCR flow and the HTTP service.
//!
//! All behaviour is controlled through [`LensConfig`], built via its
//! [`LensConfigBuilder`]. The config is constructed once (from flags, the
//! environment, or code) and handed to [`crate::gemini::GeminiClient::new`]
//! and the server state; nothing in the library reads the environment on its
//! own, so the normaliser and handlers stay testable without touching
//! process-wide state.

use crate::error::PageLensError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default Gemini REST endpoint (model name and method are appended).
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for text-only calls, also used for vision unless overridden.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for pagelens.
///
/// # Example
/// ```rust
/// use pagelens::LensConfig;
///
/// let config = LensConfig::builder()
///     .api_key("test-key")
///     .text_model("gemini-2.5-flash")
///     .layout(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.vision_model(), "gemini-2.5-flash");
/// ```
#[derive(Clone)]
pub struct LensConfig {
    /// API key for the generative model service. Required by the Gemini client.
    pub api_key: Option<String>,

    /// Service base URL. Default: [`DEFAULT_BASE_URL`].
    ///
    /// Overriding it is mostly useful for pointing at a local stub server.
    pub base_url: String,

    /// Model used for reformatting, layout, and the text tools.
    pub text_model: String,

    /// Model used for the image extraction call. Falls back to `text_model`.
    pub vision_model: Option<String>,

    /// Per-call timeout in seconds. Default: None (transport default).
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL image inputs (CLI). Default: 120.
    pub download_timeout_secs: u64,

    /// Maximum accepted size of an uploaded image body. Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Run the readability reformat pass after extraction. Default: true.
    pub reformat: bool,

    /// Run the structured-layout (JSON blocks) pass. Default: true.
    pub layout: bool,

    /// Receives per-stage OCR events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: None,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            max_upload_bytes: 20 * 1024 * 1024,
            reformat: true,
            layout: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for LensConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LensConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("reformat", &self.reformat)
            .field("layout", &self.layout)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn OcrProgressCallback>"),
            )
            .finish()
    }
}

impl LensConfig {
    /// Create a new builder for `LensConfig`.
    pub fn builder() -> LensConfigBuilder {
        LensConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model used for the image extraction call.
    pub fn vision_model(&self) -> &str {
        self.vision_model.as_deref().unwrap_or(&self.text_model)
    }
}

/// Builder for [`LensConfig`].
#[derive(Debug)]
pub struct LensConfigBuilder {
    config: LensConfig,
}

impl LensConfigBuilder {
    /// Start from the process environment.
    ///
    /// Reads `GEMINI_API_KEY`, `GEMINI_TEXT_MODEL`, `GEMINI_VISION_MODEL` and
    /// `GEMINI_BASE_URL`. Empty values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Start from an arbitrary key lookup (the environment, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = LensConfig::builder();
        if let Some(key) = get("GEMINI_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(model) = get("GEMINI_TEXT_MODEL") {
            builder = builder.text_model(model);
        }
        if let Some(model) = get("GEMINI_VISION_MODEL") {
            builder = builder.vision_model(model);
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            builder = builder.base_url(url);
        }
        builder
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = Some(model.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn reformat(mut self, v: bool) -> Self {
        self.config.reformat = v;
        self
    }

    pub fn layout(mut self, v: bool) -> Self {
        self.config.layout = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<LensConfig, PageLensError> {
        let c = &self.config;
        if c.text_model.trim().is_empty() {
            return Err(PageLensError::InvalidConfig(
                "Text model name must not be empty".into(),
            ));
        }
        if matches!(c.vision_model.as_deref(), Some(m) if m.trim().is_empty()) {
            return Err(PageLensError::InvalidConfig(
                "Vision model name must not be empty".into(),
            ));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(PageLensError::InvalidConfig(format!(
                "Base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(PageLensError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

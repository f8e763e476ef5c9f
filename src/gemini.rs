//! Google Gemini REST client implementing [`GenerativeModel`].
//!
//! Calls `POST {base_url}/models/{model}:generateContent` with the API key in
//! the `x-goog-api-key` header. No retries and no timeout beyond the
//! transport default unless `api_timeout_secs` is configured.

use crate::config::LensConfig;
use crate::error::PageLensError;
use crate::model::{GenerateContentResponse, GenerateRequest, GenerativeModel, ModelKind};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Gemini generative model client.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    text_model: String,
    vision_model: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .finish_non_exhaustive()
    }
}

/// Error body returned by the API alongside a non-2xx status (or, rarely, a 200).
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    error: Option<ApiErrorBody>,
    #[serde(flatten)]
    response: GenerateContentResponse,
}

impl GeminiClient {
    /// Build a client from the configuration.
    ///
    /// # Errors
    /// [`PageLensError::ProviderNotConfigured`] when no API key is set.
    pub fn new(config: &LensConfig) -> Result<Self, PageLensError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| PageLensError::ProviderNotConfigured {
                hint: "Missing GEMINI_API_KEY. Set it in the environment or a .env file \
                       (get a key at https://ai.google.dev/)."
                    .to_string(),
            })?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| PageLensError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.clone(),
            text_model: config.text_model.clone(),
            vision_model: config.vision_model().to_string(),
        })
    }

    /// Model name used for `kind`.
    pub fn model_name(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Text => &self.text_model,
            ModelKind::Vision => &self.vision_model,
        }
    }

    fn endpoint(&self, kind: ModelKind) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model_name(kind)
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateContentResponse, PageLensError> {
        let url = self.endpoint(request.kind);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PageLensError::upstream(format!("Gemini request timed out: {e}"))
                } else {
                    PageLensError::upstream(format!("Gemini request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PageLensError::upstream(format!("Failed to read Gemini response: {e}")))?;

        if !status.is_success() {
            return Err(PageLensError::upstream(describe_error(status.as_u16(), &body)));
        }

        let raw: RawResponse = serde_json::from_str(&body)
            .map_err(|e| PageLensError::upstream(format!("Failed to parse Gemini response: {e}")))?;

        if let Some(err) = raw.error {
            let code = err.code.unwrap_or(status.as_u16());
            return Err(PageLensError::upstream(format!(
                "Gemini API error ({code}): {}",
                err.message
            )));
        }

        Ok(raw.response)
    }
}

/// Human-readable message for a non-2xx response.
fn describe_error(status: u16, body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: ApiErrorBody,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(env) if !env.error.message.is_empty() => {
            format!("Gemini API error ({status}): {}", env.error.message)
        }
        _ => format!("Gemini API error ({status}): {}", body.trim()),
    }
}

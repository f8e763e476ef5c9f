//! Model interaction: send one request and return its plain text.
//!
//! This module is intentionally thin. Prompts live in [`crate::prompts`]
//! and sampling choices live with each caller, so this is only the place
//! where timing and token usage get logged. There are no retries: a failed
//! call surfaces immediately and the caller decides whether it is fatal.

use crate::error::PageLensError;
use crate::model::{GenerateRequest, GenerativeModel};
use std::time::Instant;
use tracing::{debug, warn};

/// Run `request` against `model` and return the response text.
///
/// An empty response is not an error; callers treat `""` like any other
/// model output.
pub async fn generate_text(
    model: &dyn GenerativeModel,
    label: &str,
    request: GenerateRequest,
) -> Result<String, PageLensError> {
    let start = Instant::now();
    let prompt_len = request.prompt_text().len();

    match model.generate(request).await {
        Ok(response) => {
            let usage = response.usage_metadata.clone().unwrap_or_default();
            debug!(
                "{}: {} prompt chars, {:?} input tokens, {:?} output tokens, {:?}",
                label,
                prompt_len,
                usage.prompt_token_count,
                usage.candidates_token_count,
                start.elapsed()
            );
            Ok(response.text())
        }
        Err(e) => {
            warn!("{}: model call failed after {:?}: {}", label, start.elapsed(), e);
            Err(e)
        }
    }
}

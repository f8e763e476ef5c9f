//! OCR entry points: one page image in, every Markdown rendition out.
//!
//! ## Stages
//!
//! ```text
//! image ──▶ extract ──▶ reformat ──▶ polish ──▶ layout ──▶ render + polish
//!          (vision)    (text)                  (JSON)
//! ```
//!
//! Only extraction is fatal. Reformat and layout are enhancements: when
//! either fails the caller still gets the raw extraction, and the failure
//! is logged as an [`OutputError`].

use crate::config::LensConfig;
use crate::error::{OutputError, PageLensError};
use crate::layout::{self, Block};
use crate::model::{GenerateRequest, GenerationConfig, GenerativeModel, ModelKind};
use crate::output::OcrOutput;
use crate::pipeline::input::{self, ImageUpload};
use crate::pipeline::{encode, llm, postprocess, render};
use crate::progress::OcrStage;
use crate::prompts;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert one uploaded page image.
///
/// `highlighted` and `full_text` come from a previous scan of the same
/// page; they are passed to the extraction prompt as disambiguation context.
///
/// # Errors
/// * [`PageLensError::InvalidInput`] for an empty upload.
/// * [`PageLensError::UpstreamFailure`] when the extraction call fails.
pub async fn convert_image(
    model: &dyn GenerativeModel,
    config: &LensConfig,
    upload: &ImageUpload,
    highlighted: Option<&str>,
    full_text: Option<&str>,
) -> Result<OcrOutput, PageLensError> {
    let start = Instant::now();
    let image = encode::encode_image(upload)?;
    info!(
        "OCR: {} bytes ({})",
        upload.bytes.len(),
        image.mime_type
    );

    // ── Step 1: Extract (fatal) ──────────────────────────────────────────
    notify_start(config, OcrStage::Extract);
    let request = GenerateRequest::prompt(
        ModelKind::Vision,
        prompts::extract_prompt(highlighted, full_text),
    )
    .with_image(image)
    .with_config(GenerationConfig::deterministic());

    let extracted = match llm::generate_text(model, "extract", request).await {
        Ok(text) => {
            notify_complete(config, OcrStage::Extract, text.len());
            text
        }
        Err(e) => {
            notify_failed(config, OcrStage::Extract, &e.to_string());
            return Err(e);
        }
    };

    // ── Step 2: Reformat (best-effort) ───────────────────────────────────
    let formatted = if config.reformat {
        reformat(model, config, &extracted).await
    } else {
        String::new()
    };

    // ── Step 3: Polish ───────────────────────────────────────────────────
    let source = if formatted.is_empty() {
        &extracted
    } else {
        &formatted
    };
    let markdown = postprocess::polish_markdown(source);

    // ── Step 4: Layout (best-effort) ─────────────────────────────────────
    let blocks = if config.layout {
        structure(model, config, &markdown).await
    } else {
        None
    };
    let blocks_markdown = blocks
        .as_deref()
        .map(|b| postprocess::polish_markdown(&render::blocks_to_markdown(b)));

    info!(
        "OCR complete: {} chars, {} blocks, {:?}",
        markdown.len(),
        blocks.as_ref().map_or(0, Vec::len),
        start.elapsed()
    );

    Ok(OcrOutput {
        markdown,
        extracted_markdown: extracted,
        formatted_markdown: formatted,
        blocks,
        blocks_markdown,
    })
}

/// Resolve a local path or URL and convert it.
///
/// Used by the CLI; the server receives uploads directly.
pub async fn convert_path(
    model: &dyn GenerativeModel,
    config: &LensConfig,
    input_str: impl AsRef<str>,
) -> Result<OcrOutput, PageLensError> {
    let input_str = input_str.as_ref();
    info!("Starting OCR: {}", input_str);
    let upload = input::resolve_image(input_str, config.download_timeout_secs).await?;
    convert_image(model, config, &upload, None, None).await
}

/// Write Markdown to `path` atomically (temp file + rename).
pub async fn write_markdown(path: impl AsRef<Path>, markdown: &str) -> Result<(), PageLensError> {
    let path = path.as_ref();
    let write_err = |e| PageLensError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn reformat(model: &dyn GenerativeModel, config: &LensConfig, extracted: &str) -> String {
    notify_start(config, OcrStage::Reformat);
    let request = GenerateRequest::prompt(ModelKind::Text, prompts::reformat_prompt(extracted))
        .with_config(GenerationConfig::deterministic());

    match llm::generate_text(model, "reformat", request).await {
        Ok(text) => {
            notify_complete(config, OcrStage::Reformat, text.len());
            text
        }
        Err(e) => {
            let err = OutputError::StageFailed {
                stage: OcrStage::Reformat.to_string(),
                detail: e.to_string(),
            };
            warn!("{}; using raw extraction", err);
            notify_failed(config, OcrStage::Reformat, &err.to_string());
            String::new()
        }
    }
}

async fn structure(
    model: &dyn GenerativeModel,
    config: &LensConfig,
    markdown: &str,
) -> Option<Vec<Block>> {
    notify_start(config, OcrStage::Layout);
    let request = GenerateRequest::prompt(ModelKind::Text, prompts::layout_prompt(markdown))
        .with_config(GenerationConfig::deterministic().with_json_schema(layout::layout_schema()));

    let parsed = match llm::generate_text(model, "layout", request).await {
        Ok(text) => parse_blocks(&text),
        Err(e) => Err(OutputError::StageFailed {
            stage: OcrStage::Layout.to_string(),
            detail: e.to_string(),
        }),
    };

    match parsed {
        Ok(blocks) => {
            debug!("Layout: {} blocks", blocks.len());
            notify_complete(config, OcrStage::Layout, blocks.len());
            Some(blocks)
        }
        Err(err) => {
            warn!("{}; omitting blocks", err);
            notify_failed(config, OcrStage::Layout, &err.to_string());
            None
        }
    }
}

/// Parse the layout call's text into blocks.
fn parse_blocks(text: &str) -> Result<Vec<Block>, OutputError> {
    let value: serde_json::Value = serde_json::from_str(postprocess::strip_json_fence(text))
        .map_err(|e| OutputError::MalformedJson {
            stage: OcrStage::Layout.to_string(),
            detail: e.to_string(),
        })?;
    layout::parse_layout(&value).ok_or(OutputError::MissingBlocks)
}

fn notify_start(config: &LensConfig, stage: OcrStage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn notify_complete(config: &LensConfig, stage: OcrStage, output_len: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, output_len);
    }
}

fn notify_failed(config: &LensConfig, stage: OcrStage, error: &str) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_failed(stage, error);
    }
}

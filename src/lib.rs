//! # pagelens
//!
//! Turn a photographed textbook page into clean Markdown with LaTeX math,
//! then help the reader with any excerpt of it.
//!
//! ## Why this crate?
//!
//! Multimodal models read a textbook page well, but their Markdown is rarely
//! render-ready: displayed equations come back as lone `$...$` lines or as
//! `$$ ... $$` glued to a sentence, and structured output arrives as loosely
//! shaped JSON. This crate wraps the model calls with a deterministic
//! normaliser so the front end always receives well-fenced math and a typed
//! block layout.
//!
//! ## OCR Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Encode    sniff MIME type, base64 inline data
//!  ├─ 2. Extract   vision model, faithful transcription   (fatal on error)
//!  ├─ 3. Reformat  text model, readability pass           (best-effort)
//!  ├─ 4. Polish    promote standalone math, repair $$ fences
//!  ├─ 5. Layout    text model, JSON blocks under a schema (best-effort)
//!  └─ 6. Render    blocks → Markdown → polish
//! ```
//!
//! The reader tools ([`tools::simplify`], [`tools::explain`],
//! [`tools::knowledge_tree`]) are single text-model calls over a highlighted
//! excerpt, with the page text as optional context.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagelens::{convert_path, GeminiClient, LensConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY / GEMINI_TEXT_MODEL / GEMINI_VISION_MODEL.
//!     let config = LensConfigBuilder::from_env().build()?;
//!     let client = GeminiClient::new(&config)?;
//!     let output = convert_path(&client, &config, "page.jpg").await?;
//!     println!("{}", output.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagelens` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//!
//! The HTTP server ([`server`]) is part of the library and always available.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod gemini;
pub mod layout;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LensConfig, LensConfigBuilder};
pub use convert::{convert_image, convert_path, write_markdown};
pub use error::{OutputError, PageLensError};
pub use gemini::GeminiClient;
pub use layout::{Block, InlinePart, ListItem};
pub use model::{GenerateContentResponse, GenerateRequest, GenerativeModel, ModelKind};
pub use output::{KnowledgeTree, OcrOutput, Prerequisite};
pub use pipeline::input::ImageUpload;
pub use pipeline::postprocess::{normalize_block_math, polish_markdown, promote_standalone_inline_math};
pub use pipeline::render::blocks_to_markdown;
pub use progress::{NoopProgressCallback, OcrProgressCallback, OcrStage, ProgressCallback};
pub use tools::TextRequest;

//! Pipeline stages for page-image OCR.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ postprocess ──▶ render ──▶ postprocess
//! (path/URL) (base64)  (model)  (math repair)  (blocks)   (math repair)
//! ```
//!
//! 1. [`input`]: read a local file or download a URL (CLI only; the server
//!    receives uploads directly)
//! 2. [`encode`]: sniff the MIME type and base64-wrap the bytes
//! 3. [`llm`]: run one model request and return its text; the only stage
//!    with network I/O
//! 4. [`postprocess`]: deterministic math-fence repair and JSON fence stripping
//! 5. [`render`]: structured layout blocks to Markdown

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;

//! Post-processing: deterministic repair of model-generated Markdown math.
//!
//! ## Why is post-processing necessary?
//!
//! Markdown renderers with a math plugin only centre an equation when it is
//! written as a fenced display block:
//!
//! ```text
//! $$
//! E = mc^2
//! $$
//! ```
//!
//! Models regularly get this almost right: a displayed equation comes back as
//! a lone `$...$` line, as `$$ ... $$` on a single line, or with the fence
//! glued to the preceding sentence. Each of those renders as inline math or
//! raw dollars. The passes here fix those shapes without touching content.
//!
//! ## Pass Order
//!
//! [`polish_markdown`] runs promotion first, then fence repair. Fence repair
//! assumes any single-dollar display line has already become a `$$` block.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Promote standalone inline math, then repair `$$` fences.
///
/// This is the composition the OCR flow applies to both the free-form
/// Markdown and the Markdown rendered from structured blocks.
pub fn polish_markdown(input: &str) -> String {
    normalize_block_math(&promote_standalone_inline_math(input))
}

// ── Blank lines ──────────────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Collapse runs of 3+ newlines to exactly 2 (at most one blank line).
pub fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Pass 1: Promote standalone inline math ───────────────────────────────────

static RE_LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n").unwrap());

// A backslash or ^ _ = anywhere, a common LaTeX command, or any digit.
// Plain words in dollars (`$hello$`) stay as they are.
static RE_LATEXISH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\\^_=]|\\frac|\\sqrt|\\sum|\\int|\\left|\\right|[0-9]").unwrap()
});

/// Turn a line consisting solely of `$...$` into a `$$` display block.
///
/// A matching line is replaced by five lines: blank, `$$`, the trimmed inner
/// content, `$$`, blank. Other lines pass through unchanged. Blank-line runs
/// are collapsed afterwards; the result is not trimmed.
///
/// The digit test means `$5 dollars$` on its own line is promoted too. That
/// is a known limit of the heuristic.
pub fn promote_standalone_inline_math(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();

    for line in RE_LINE_BREAK.split(input) {
        let trimmed = line.trim();
        if is_standalone_inline_math(trimmed) {
            let inner = trimmed[1..trimmed.len() - 1].trim();
            out.extend(["", "$$", inner, "$$", ""]);
        } else {
            out.push(line);
        }
    }

    collapse_blank_lines(&out.join("\n"))
}

fn is_standalone_inline_math(trimmed: &str) -> bool {
    trimmed.len() >= 2
        && trimmed.starts_with('$')
        && trimmed.ends_with('$')
        && !trimmed.starts_with("$$")
        && !trimmed.ends_with("$$")
        && RE_LATEXISH.is_match(trimmed)
}

// ── Pass 2: Repair $$ fences ─────────────────────────────────────────────────

static RE_SINGLE_LINE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$\s*([^\n]+?)\s*\$\$").unwrap());
static RE_FENCE_AFTER_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^\n])\$\$").unwrap());
static RE_FENCE_BEFORE_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\$([^\n])").unwrap());

/// Put every `$$` fence on its own line.
///
/// 1. `$$ formula $$` on one line becomes a padded three-line block.
/// 2. A `$$` glued to text on either side gets a line break on that side.
/// 3. Blank-line runs are collapsed.
///
/// Already well-formed input comes back unchanged, so applying this twice
/// equals applying it once.
pub fn normalize_block_math(input: &str) -> String {
    let s = RE_SINGLE_LINE_BLOCK.replace_all(input, |caps: &Captures<'_>| {
        format!("\n\n$$\n{}\n$$\n\n", caps[1].trim())
    });
    let s = RE_FENCE_AFTER_TEXT.replace_all(&s, |caps: &Captures<'_>| format!("{}\n$$", &caps[1]));
    let s = RE_FENCE_BEFORE_TEXT.replace_all(&s, |caps: &Captures<'_>| format!("$$\n{}", &caps[1]));
    collapse_blank_lines(&s)
}

// ── JSON fences ──────────────────────────────────────────────────────────────

static RE_JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());
static RE_ANY_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap());

/// Return the body of the first ```` ```json ```` block, else of the first
/// plain ```` ``` ```` block, else the input unchanged.
pub fn strip_json_fence(input: &str) -> &str {
    RE_JSON_FENCE
        .captures(input)
        .or_else(|| RE_ANY_FENCE.captures(input))
        .and_then(|caps| caps.get(1))
        .map_or(input, |m| m.as_str())
}

// ── Tests ────────────────────────────────────────────────────────────────────

//! Block rendering: structured layout → Markdown.
//!
//! The output of [`blocks_to_markdown`] is a pure function of the blocks, so
//! the `blocksMarkdown` field of an OCR result is reproducible from `blocks`
//! alone. Each block contributes its lines plus one blank separator line;
//! lists get a single blank line after the whole list, not one per item.

use crate::layout::{Block, InlinePart, ListItem};
use crate::pipeline::postprocess::collapse_blank_lines;

/// Render a block sequence as Markdown.
///
/// Empty headings, paragraphs, equations and list items render nothing.
/// The joined output has no runs of more than one blank line and no
/// leading/trailing whitespace.
pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut out: Vec<String> = Vec::new();

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let level = (*level).clamp(1, 6) as usize;
                let text = text.trim();
                if !text.is_empty() {
                    out.push(format!("{} {}", "#".repeat(level), text));
                    out.push(String::new());
                }
            }
            Block::RichText { parts } => {
                let text = render_inline_parts(parts);
                let text = text.trim();
                if !text.is_empty() {
                    out.push(text.to_string());
                    out.push(String::new());
                }
            }
            Block::Paragraph { text } => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push(text.to_string());
                    out.push(String::new());
                }
            }
            Block::Equation { latex, display } => {
                let latex = latex.trim();
                if latex.is_empty() {
                    continue;
                }
                if *display {
                    out.push("$$".to_string());
                    out.push(latex.to_string());
                    out.push("$$".to_string());
                } else {
                    out.push(format!("${latex}$"));
                }
                out.push(String::new());
            }
            Block::List { ordered, items } => {
                for (idx, item) in items.iter().enumerate() {
                    let text = match item {
                        ListItem::Plain(s) => s.trim().to_string(),
                        ListItem::Rich { parts } => render_inline_parts(parts).trim().to_string(),
                    };
                    if text.is_empty() {
                        continue;
                    }
                    if *ordered {
                        out.push(format!("{}. {}", idx + 1, text));
                    } else {
                        out.push(format!("- {text}"));
                    }
                }
                out.push(String::new());
            }
        }
    }

    tidy(&out.join("\n"))
}

/// Concatenate inline parts; math parts become `$latex$`.
pub fn render_inline_parts(parts: &[InlinePart]) -> String {
    parts
        .iter()
        .map(|part| match part {
            InlinePart::Text { text } => text.clone(),
            InlinePart::Var { latex } | InlinePart::InlineMath { latex } => {
                format!("${}$", latex.trim())
            }
        })
        .collect()
}

/// Final pass of [`blocks_to_markdown`]: collapse blank-line runs, then trim.
///
/// Idempotent: `tidy(tidy(s)) == tidy(s)`.
pub fn tidy(markdown: &str) -> String {
    collapse_blank_lines(markdown).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> InlinePart {
        InlinePart::Text { text: s.into() }
    }

    fn var(s: &str) -> InlinePart {
        InlinePart::Var { latex: s.into() }
    }

    #[test]
    fn heading_level_clamps_to_six() {
        let blocks = [Block::Heading { level: 7, text: "Title".into() }];
        assert_eq!(blocks_to_markdown(&blocks), "###### Title");
    }

    #[test]
    fn heading_level_clamps_to_one() {
        let blocks = [Block::Heading { level: -3, text: "  Top  ".into() }];
        assert_eq!(blocks_to_markdown(&blocks), "# Top");
    }

    #[test]
    fn empty_heading_emits_nothing() {
        let blocks = [Block::Heading { level: 2, text: "   ".into() }];
        assert_eq!(blocks_to_markdown(&blocks), "");
    }

    #[test]
    fn display_equation_is_fenced() {
        let blocks = [Block::Equation { latex: "x^2".into(), display: true }];
        assert_eq!(blocks_to_markdown(&blocks), "$$\nx^2\n$$");
    }

    #[test]
    fn inline_equation_uses_single_dollars() {
        let blocks = [Block::Equation { latex: " a+b ".into(), display: false }];
        assert_eq!(blocks_to_markdown(&blocks), "$a+b$");
    }

    #[test]
    fn empty_equation_is_skipped() {
        let blocks = [Block::Equation { latex: "".into(), display: true }];
        assert_eq!(blocks_to_markdown(&blocks), "");
    }

    #[test]
    fn rich_text_wraps_vars_in_dollars() {
        let blocks = [Block::RichText {
            parts: vec![text("Let "), var(" y_i "), text(" be the output.")],
        }];
        assert_eq!(blocks_to_markdown(&blocks), "Let $y_i$ be the output.");
    }

    #[test]
    fn ordered_list_numbers_by_position() {
        let blocks = [Block::List {
            ordered: true,
            items: vec![
                ListItem::Plain("first".into()),
                ListItem::Plain("  ".into()),
                ListItem::Rich { parts: vec![text("third "), var("z")] },
            ],
        }];
        assert_eq!(blocks_to_markdown(&blocks), "1. first\n3. third $z$");
    }

    #[test]
    fn unordered_list_then_paragraph() {
        let blocks = [
            Block::List {
                ordered: false,
                items: vec![ListItem::Plain("a".into()), ListItem::Plain("b".into())],
            },
            Block::Paragraph { text: "after".into() },
        ];
        assert_eq!(blocks_to_markdown(&blocks), "- a\n- b\n\nafter");
    }

    #[test]
    fn blocks_are_separated_by_one_blank_line() {
        let blocks = [
            Block::Heading { level: 1, text: "Derivatives".into() },
            Block::Paragraph { text: "".into() },
            Block::Paragraph { text: "The slope is".into() },
            Block::Equation { latex: "f'(x)".into(), display: true },
        ];
        assert_eq!(
            blocks_to_markdown(&blocks),
            "# Derivatives\n\nThe slope is\n\n$$\nf'(x)\n$$"
        );
    }

    #[test]
    fn tidy_is_idempotent() {
        let blocks = [
            Block::Paragraph { text: "a".into() },
            Block::List { ordered: false, items: vec![] },
            Block::Equation { latex: "b".into(), display: true },
        ];
        let once = blocks_to_markdown(&blocks);
        assert_eq!(tidy(&once), once);
        assert_eq!(tidy("\n\n\nx\n\n\n\ny\n\n"), "x\n\ny");
    }
}

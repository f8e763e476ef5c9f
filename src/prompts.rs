//! Prompts for every model call.
//!
//! All prompt text lives here so unit tests can inspect it without calling
//! a model.
//!
//! The OCR prompts prioritise fidelity: wording, order and content of the
//! page must survive every pass unchanged. Only the three reader tools are
//! allowed to rephrase.

/// Shown in place of page context when the caller sent none.
pub const NO_CONTEXT: &str = "(no additional context provided)";

/// Step 1 of OCR: faithful extraction from the page image.
pub const EXTRACT_PROMPT: &str = r#"
Extract all text and mathematical equations from this textbook page.

REQUIREMENTS:
- Preserve the exact wording, order, and content. Do NOT paraphrase.
- Do NOT add any explanations, examples, summaries, or interpretation.
- Do NOT remove content.
- Keep line breaks only when they appear to exist in the source (avoid "pretty" reflow).

MATH:
- Use $ for inline math and $$ for block math.
- Keep equations exactly as they appear.
- If an equation is displayed / set apart from a sentence in the source, output it as $$...$$ on its own lines.

OUTPUT:
- Return ONLY Markdown (no fences, no commentary).
"#;

/// A single-line liveness probe for the text model.
pub const PING_PROMPT: &str = "Reply with the word OK.";

/// Build the extraction prompt, appending re-scan context when supplied.
///
/// Context only helps the model disambiguate smudged symbols; the prompt
/// still asks for a transcription of the image alone.
pub fn extract_prompt(highlighted: Option<&str>, full_text: Option<&str>) -> String {
    let highlighted = non_empty(highlighted);
    let full_text = non_empty(full_text);
    if highlighted.is_none() && full_text.is_none() {
        return EXTRACT_PROMPT.to_string();
    }

    let mut prompt = String::from(EXTRACT_PROMPT);
    prompt.push_str(
        "\nCONTEXT (from a previous scan of this page; use for disambiguation only, \
         transcribe what the image shows):\n",
    );
    if let Some(full) = full_text {
        prompt.push_str(&format!("\nPREVIOUS EXTRACTION:\n{full}\n"));
    }
    if let Some(sel) = highlighted {
        prompt.push_str(&format!("\nREGION OF INTEREST:\n{sel}\n"));
    }
    prompt
}

/// Step 2 of OCR: readability reformat without changing wording.
pub fn reformat_prompt(extracted: &str) -> String {
    format!(
        r#"
You are given raw extracted textbook text.

TASK:
Reformat the text to be easier to read and more accessible, without changing the meaning or wording.

RULES:
- Do NOT paraphrase.
- Do NOT remove content.
- Do NOT add explanations.
- You MAY merge lines into paragraphs.
- You MAY improve spacing and layout.
- For any equation, use display math with $$ ... $$ and blank lines around it.

FORMAT:
- Output Markdown.
- Use clear paragraphs.
- Keep equations properly formatted using LaTeX.

INPUT MARKDOWN:
{extracted}
"#
    )
}

/// Step 3 of OCR: structured JSON layout (sent with a response schema).
pub fn layout_prompt(markdown: &str) -> String {
    format!(
        r#"
Convert the following textbook content into a JSON layout so the frontend can render it consistently.

CRITICAL RULES:
- Preserve the exact wording. Do NOT paraphrase or summarize.
- Do NOT add explanations.
- Do NOT remove content.
- Keep the original reading order as best as possible.

BLOCK TYPES (use only these):
- heading: {{ "type":"heading", "level":1-6, "text":"..." }}
- paragraph: {{ "type":"paragraph", "text":"..." }}
- rich_text: {{ "type":"rich_text", "parts":[ {{ "type":"text","text":"..." }}, {{ "type":"var","latex":"y" }} ] }}
- equation: {{ "type":"equation", "latex":"...", "display":true|false }}
- list: {{ "type":"list", "ordered":true|false, "items":["..."] }}

MATH RULES:
- For inline variable names in a sentence (x, y, y_i, f(x), etc.), prefer rich_text parts with {{type:"var", latex:"..."}}.
- For other inline math inside a sentence, you may use {{type:"inline_math", latex:"..."}} in rich_text parts.
- Do NOT create a separate equation block for single-letter variables that appear inline in a sentence.
- Inline math that is part of a sentence must remain inline (rich_text), not display.
- Standalone/display equation => equation block with display=true.
- Put ONLY LaTeX in latex (no $ or $$ delimiters).

OUTPUT:
- Return ONLY JSON matching the provided schema. No markdown fences, no commentary.

INPUT:
{markdown}
"#
    )
}

/// Simplify a highlighted excerpt for a student.
pub fn simplify_prompt(selection: &str, full_text: Option<&str>) -> String {
    let mut prompt = String::from(
        "Simplify the following text to make it easier to understand for a student.\n\
         Keep the mathematical notation and equations intact, but explain concepts in simpler terms.\n\
         Return the simplified explanation as Markdown with proper formatting.\n",
    );
    push_context(&mut prompt, full_text);
    prompt.push_str(&format!("\nText to simplify:\n{selection}"));
    prompt
}

/// Explain a highlighted excerpt without rewriting it.
pub fn explain_prompt(selection: &str, full_text: Option<&str>) -> String {
    let mut prompt = String::from(
        r#"
Explain the following highlighted textbook text in a way that is easy to understand.

REQUIREMENTS:
- Keep the meaning the same.
- Do NOT change or rewrite the original quoted text; instead, explain it.
- Use simple language and short paragraphs.
- If there is math, explain what each symbol/term represents and what the equation is saying.
- If helpful, include a tiny example (only if it does not change the meaning).

OUTPUT:
- Return Markdown only (no code fences, no commentary).
"#,
    );
    push_context(&mut prompt, full_text);
    prompt.push_str(&format!("\nHIGHLIGHTED TEXT:\n{selection}\n"));
    prompt
}

/// Build a prerequisite knowledge tree for a highlighted excerpt.
pub fn knowledge_tree_prompt(selection: &str, full_text: Option<&str>) -> String {
    let context = non_empty(full_text).unwrap_or(NO_CONTEXT);
    format!(
        r#"You are given a highlighted excerpt from a textbook page. Create a prerequisite knowledge tree showing what concepts a student needs BEFORE they can understand the highlighted excerpt.

CONTEXT (entire extracted page(s); use for disambiguation only):
{context}

Return the response as a JSON object with the following structure:
{{
  "root": "main concept name",
  "prerequisites": [
    {{
      "concept": "prerequisite concept name",
      "description": "brief description",
      "subPrerequisites": [
        {{
          "concept": "sub-concept name",
          "description": "brief description"
        }}
      ]
    }}
  ]
}}

HIGHLIGHTED TEXT TO ANALYZE:
{selection}"#
    )
}

fn push_context(prompt: &mut String, full_text: Option<&str>) {
    if let Some(full) = non_empty(full_text) {
        prompt.push_str(&format!(
            "\nCONTEXT (entire extracted page(s); use for disambiguation only):\n{full}\n"
        ));
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_prompt_without_context_is_the_constant() {
        assert_eq!(extract_prompt(None, Some("  ")), EXTRACT_PROMPT);
    }

    #[test]
    fn extract_prompt_appends_context() {
        let p = extract_prompt(Some("the integral"), Some("Page text"));
        assert!(p.starts_with(EXTRACT_PROMPT));
        assert!(p.contains("PREVIOUS EXTRACTION:\nPage text"));
        assert!(p.contains("REGION OF INTEREST:\nthe integral"));
    }

    #[test]
    fn reformat_and_layout_embed_input() {
        assert!(reformat_prompt("RAW $x$").contains("INPUT MARKDOWN:\nRAW $x$"));
        let layout = layout_prompt("# H");
        assert!(layout.ends_with("INPUT:\n# H\n"));
        // Escaped braces render as literal JSON examples.
        assert!(layout.contains(r#"{ "type":"heading", "level":1-6, "text":"..." }"#));
    }

    #[test]
    fn knowledge_tree_prompt_uses_placeholder_without_context() {
        let p = knowledge_tree_prompt("chain rule", None);
        assert!(p.contains(NO_CONTEXT));
        assert!(p.contains("\"subPrerequisites\""));
        assert!(p.ends_with("chain rule"));
    }

    #[test]
    fn simplify_and_explain_include_context_only_when_given() {
        assert!(!simplify_prompt("x", None).contains("CONTEXT"));
        assert!(simplify_prompt("x", Some("page")).contains("CONTEXT"));
        let e = explain_prompt("E = mc^2", Some("relativity"));
        assert!(e.contains("HIGHLIGHTED TEXT:\nE = mc^2"));
        assert!(e.contains("relativity"));
    }
}

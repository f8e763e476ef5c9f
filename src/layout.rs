//! Structured page layout: the closed block model the layout pass returns.
//!
//! A page is a reading-ordered `Vec<Block>`. Rendering lives in
//! [`crate::pipeline::render`]; this module owns the types, the lenient
//! parser for model-produced JSON, and the JSON schema sent with the layout
//! request.
//!
//! Parsing is deliberately forgiving. The model is constrained by a schema,
//! but what comes back is still treated as untrusted: entries that are not
//! objects, or whose `type` is missing or unknown, are skipped one by one
//! instead of rejecting the whole page.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One semantic unit of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: i64,
        text: String,
    },
    Paragraph {
        text: String,
    },
    RichText {
        parts: Vec<InlinePart>,
    },
    Equation {
        latex: String,
        display: bool,
    },
    List {
        ordered: bool,
        items: Vec<ListItem>,
    },
}

/// An inline span inside `rich_text` blocks and rich list items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlinePart {
    Text { text: String },
    Var { latex: String },
    InlineMath { latex: String },
}

/// A list entry: either a plain string or a sequence of inline parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListItem {
    Plain(String),
    Rich { parts: Vec<InlinePart> },
}

impl Block {
    /// Parse one block from model JSON. `None` means "skip this entry".
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let block = match obj.get("type")?.as_str()? {
            "heading" => Block::Heading {
                level: obj.get("level").and_then(level_of).unwrap_or(2),
                text: string_field(obj, "text"),
            },
            "paragraph" => Block::Paragraph {
                text: string_field(obj, "text"),
            },
            "rich_text" => Block::RichText {
                parts: parts_field(obj),
            },
            "equation" => Block::Equation {
                latex: string_field(obj, "latex"),
                display: !matches!(obj.get("display"), Some(Value::Bool(false))),
            },
            "list" => Block::List {
                ordered: matches!(obj.get("ordered"), Some(Value::Bool(true))),
                items: obj
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(ListItem::from_json).collect())
                    .unwrap_or_default(),
            },
            _ => return None,
        };
        Some(block)
    }
}

impl InlinePart {
    /// Parse one inline part. Unknown shapes are dropped (they render empty).
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        match obj.get("type")?.as_str()? {
            "text" => Some(InlinePart::Text {
                text: string_field(obj, "text"),
            }),
            "var" => Some(InlinePart::Var {
                latex: string_field(obj, "latex"),
            }),
            "inline_math" => Some(InlinePart::InlineMath {
                latex: string_field(obj, "latex"),
            }),
            _ => None,
        }
    }
}

impl ListItem {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ListItem::Plain(s.clone())),
            Value::Object(obj) if obj.get("parts").is_some_and(Value::is_array) => {
                Some(ListItem::Rich {
                    parts: parts_field(obj),
                })
            }
            _ => None,
        }
    }
}

/// Extract the block list from a parsed layout response (`{"blocks": [...]}`).
///
/// Returns `None` when there is no `blocks` array at all; an array whose
/// entries are all invalid yields `Some(vec![])`.
pub fn parse_layout(value: &Value) -> Option<Vec<Block>> {
    let blocks = value.get("blocks")?.as_array()?;
    Some(blocks.iter().filter_map(Block::from_json).collect())
}

/// JSON schema sent with the layout request to constrain the model output.
pub fn layout_schema() -> Value {
    let inline_part = json!({
        "type": "object",
        "required": ["type"],
        "properties": {
            "type": { "type": "string", "enum": ["text", "var", "inline_math"] },
            "text": { "type": "string" },
            "latex": { "type": "string" }
        },
        "additionalProperties": false
    });

    json!({
        "type": "object",
        "required": ["blocks"],
        "properties": {
            "blocks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["type"],
                    "properties": {
                        "type": {
                            "type": "string",
                            "enum": ["heading", "paragraph", "rich_text", "equation", "list"]
                        },
                        "level": { "type": "integer", "minimum": 1, "maximum": 6 },
                        "text": { "type": "string" },
                        "parts": { "type": "array", "items": inline_part.clone() },
                        "latex": { "type": "string" },
                        "display": { "type": "boolean" },
                        "ordered": { "type": "boolean" },
                        "items": {
                            "type": "array",
                            "items": {
                                "anyOf": [
                                    { "type": "string" },
                                    {
                                        "type": "object",
                                        "required": ["parts"],
                                        "properties": {
                                            "parts": { "type": "array", "items": inline_part }
                                        },
                                        "additionalProperties": false
                                    }
                                ]
                            }
                        }
                    },
                    "additionalProperties": false
                }
            }
        },
        "additionalProperties": false
    })
}

// ── Field helpers ────────────────────────────────────────────────────────

/// Missing/null → "", scalars are stringified, containers → "".
fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn parts_field(obj: &Map<String, Value>) -> Vec<InlinePart> {
    obj.get("parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(InlinePart::from_json).collect())
        .unwrap_or_default()
}

fn level_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_block_kind() {
        let v = json!({ "blocks": [
            { "type": "heading", "level": 2, "text": "Limits" },
            { "type": "paragraph", "text": "Consider" },
            { "type": "rich_text", "parts": [
                { "type": "text", "text": "Let " },
                { "type": "var", "latex": "x" }
            ]},
            { "type": "equation", "latex": "x^2", "display": false },
            { "type": "list", "ordered": true, "items": ["a", { "parts": [{ "type": "inline_math", "latex": "b" }] }] }
        ]});
        let blocks = parse_layout(&v).unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(
            blocks[0],
            Block::Heading { level: 2, text: "Limits".into() }
        );
        assert_eq!(
            blocks[3],
            Block::Equation { latex: "x^2".into(), display: false }
        );
        match &blocks[4] {
            Block::List { ordered, items } => {
                assert!(ordered);
                assert_eq!(items[0], ListItem::Plain("a".into()));
                assert!(matches!(items[1], ListItem::Rich { .. }));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn skips_non_objects_and_unknown_types() {
        let v = json!({ "blocks": [
            "stray string",
            42,
            { "text": "no type" },
            { "type": "table", "rows": [] },
            { "type": "paragraph", "text": "kept" }
        ]});
        let blocks = parse_layout(&v).unwrap();
        assert_eq!(blocks, vec![Block::Paragraph { text: "kept".into() }]);
    }

    #[test]
    fn applies_field_defaults() {
        let v = json!({ "blocks": [
            { "type": "heading", "text": "T" },
            { "type": "equation", "latex": "y" },
            { "type": "list", "items": ["i", 7, { "nope": true }] },
            { "type": "paragraph", "text": 12 },
            { "type": "heading", "level": 0, "text": "Z" }
        ]});
        let blocks = parse_layout(&v).unwrap();
        assert_eq!(blocks[0], Block::Heading { level: 2, text: "T".into() });
        assert_eq!(blocks[1], Block::Equation { latex: "y".into(), display: true });
        assert_eq!(
            blocks[2],
            Block::List { ordered: false, items: vec![ListItem::Plain("i".into())] }
        );
        assert_eq!(blocks[3], Block::Paragraph { text: "12".into() });
        // An explicit 0 is kept here and clamped to `#` when rendered.
        assert_eq!(blocks[4], Block::Heading { level: 0, text: "Z".into() });
        assert_eq!(crate::pipeline::render::blocks_to_markdown(&blocks[4..]), "# Z");
    }

    #[test]
    fn unknown_inline_parts_are_dropped() {
        let v = json!({ "type": "rich_text", "parts": [
            { "type": "text", "text": "a" },
            { "type": "image", "src": "x.png" },
            null
        ]});
        assert_eq!(
            Block::from_json(&v),
            Some(Block::RichText { parts: vec![InlinePart::Text { text: "a".into() }] })
        );
    }

    #[test]
    fn missing_blocks_array_is_none() {
        assert!(parse_layout(&json!({ "page": [] })).is_none());
        assert!(parse_layout(&json!({ "blocks": "nope" })).is_none());
        assert_eq!(parse_layout(&json!({ "blocks": [] })), Some(vec![]));
    }

    #[test]
    fn serialises_with_type_tags() {
        let b = Block::RichText {
            parts: vec![InlinePart::InlineMath { latex: "a+b".into() }],
        };
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v["type"], "rich_text");
        assert_eq!(v["parts"][0]["type"], "inline_math");

        let list = Block::List {
            ordered: false,
            items: vec![ListItem::Plain("x".into())],
        };
        assert_eq!(serde_json::to_value(&list).unwrap()["items"][0], "x");
    }

    #[test]
    fn schema_lists_all_block_types() {
        let schema = layout_schema();
        let kinds = &schema["properties"]["blocks"]["items"]["properties"]["type"]["enum"];
        assert_eq!(kinds.as_array().unwrap().len(), 5);
    }
}

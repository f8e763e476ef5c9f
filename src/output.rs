//! Result types returned by the OCR flow and the reader tools.

use crate::layout::Block;
use serde::{Deserialize, Deserializer, Serialize};

/// Every representation of one scanned page, derived from one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrOutput {
    /// Polished Markdown: the reformatted text, or the raw extraction when
    /// reformatting failed, after math-fence repair.
    pub markdown: String,

    /// Raw output of the extraction call, untouched.
    pub extracted_markdown: String,

    /// Raw output of the reformat call; empty when that call failed or was skipped.
    pub formatted_markdown: String,

    /// Structured layout, when the layout call produced a `blocks` array.
    pub blocks: Option<Vec<Block>>,

    /// Polished Markdown rendered from `blocks`; present iff `blocks` is.
    pub blocks_markdown: Option<String>,
}

/// A prerequisite knowledge tree for a highlighted excerpt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeTree {
    #[serde(default, deserialize_with = "null_as_default")]
    pub root: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub prerequisites: Vec<Prerequisite>,

    /// The model's raw text, kept only when it could not be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// One concept the reader needs first; may nest further prerequisites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prerequisite {
    #[serde(default, deserialize_with = "null_as_default")]
    pub concept: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sub_prerequisites: Vec<Prerequisite>,
}

impl KnowledgeTree {
    /// Root label used when the model's answer could not be parsed.
    pub const UNPARSEABLE_ROOT: &'static str = "Unable to parse";

    /// Fallback returned instead of an error for unparseable model output.
    pub fn unparseable(raw_response: impl Into<String>) -> Self {
        Self {
            root: Self::UNPARSEABLE_ROOT.to_string(),
            prerequisites: Vec::new(),
            raw_response: Some(raw_response.into()),
        }
    }
}

/// Model output sometimes carries `null` where a value belongs; read it as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

//! Reader tools over a highlighted excerpt: simplify, explain, and the
//! prerequisite knowledge tree. Plus a one-line probe for the text model.
//!
//! Each tool is one text-model call. Unlike the OCR flow these are allowed
//! to rephrase; the page text only ever appears as context.

use crate::error::{OutputError, PageLensError};
use crate::model::{GenerateRequest, GenerationConfig, GenerativeModel, ModelKind};
use crate::output::KnowledgeTree;
use crate::pipeline::{llm, postprocess};
use crate::prompts;
use serde::Deserialize;
use tracing::{info, warn};

/// Body accepted by the simplify, explain and knowledge-tree operations.
///
/// Older clients send `{text}`; the reader sends `{highlightedText, fullText}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub highlighted_text: Option<String>,
    #[serde(default)]
    pub full_text: Option<String>,
}

impl TextRequest {
    /// A request carrying only `text`.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// The excerpt to operate on: `highlightedText`, else `text`.
    ///
    /// # Errors
    /// [`PageLensError::InvalidInput`] when both are missing or blank.
    pub fn selection(&self) -> Result<&str, PageLensError> {
        [&self.highlighted_text, &self.text]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .find(|s| !s.trim().is_empty())
            .ok_or_else(|| PageLensError::invalid_input("No text provided"))
    }

    /// Page context, when present and non-blank.
    pub fn context(&self) -> Option<&str> {
        self.full_text.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Rewrite the excerpt in simpler terms. Default sampling.
pub async fn simplify(
    model: &dyn GenerativeModel,
    request: &TextRequest,
) -> Result<String, PageLensError> {
    let selection = request.selection()?;
    info!("Simplify: {} chars", selection.len());
    let req = GenerateRequest::prompt(
        ModelKind::Text,
        prompts::simplify_prompt(selection, request.context()),
    );
    llm::generate_text(model, "simplify", req).await
}

/// Explain the excerpt without rewriting it.
pub async fn explain(
    model: &dyn GenerativeModel,
    request: &TextRequest,
) -> Result<String, PageLensError> {
    let selection = request.selection()?;
    info!("Explain: {} chars", selection.len());
    let req = GenerateRequest::prompt(
        ModelKind::Text,
        prompts::explain_prompt(selection, request.context()),
    )
    .with_config(GenerationConfig::sampled(0.2, 1.0));
    llm::generate_text(model, "explain", req).await
}

/// Build a prerequisite tree for the excerpt.
///
/// Unparseable model output is not an error: the caller gets
/// [`KnowledgeTree::unparseable`] carrying the raw text.
pub async fn knowledge_tree(
    model: &dyn GenerativeModel,
    request: &TextRequest,
) -> Result<KnowledgeTree, PageLensError> {
    let selection = request.selection()?;
    info!("Knowledge tree: {} chars", selection.len());
    let req = GenerateRequest::prompt(
        ModelKind::Text,
        prompts::knowledge_tree_prompt(selection, request.context()),
    );
    let text = llm::generate_text(model, "knowledge-tree", req).await?;
    Ok(parse_knowledge_tree(&text))
}

/// Parse model text into a tree, unwrapping a Markdown code fence first.
pub fn parse_knowledge_tree(text: &str) -> KnowledgeTree {
    match serde_json::from_str::<KnowledgeTree>(postprocess::strip_json_fence(text)) {
        Ok(tree) => tree,
        Err(e) => {
            let err = OutputError::MalformedJson {
                stage: "knowledge-tree".to_string(),
                detail: e.to_string(),
            };
            warn!("{}", err);
            KnowledgeTree::unparseable(text)
        }
    }
}

/// Ask the text model for a one-word reply. Verifies key and model name.
pub async fn ping(model: &dyn GenerativeModel) -> Result<String, PageLensError> {
    let req = GenerateRequest::prompt(ModelKind::Text, prompts::PING_PROMPT);
    llm::generate_text(model, "ping", req).await
}

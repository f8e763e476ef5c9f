//! The generative-model boundary: request/response types and the
//! [`GenerativeModel`] trait every handler talks to.
//!
//! The wire types follow the Gemini `generateContent` REST shape (camelCase
//! JSON, role-tagged contents made of text and inline-image parts). The
//! concrete HTTP client lives in [`crate::gemini`]; tests substitute a
//! scripted implementation of the trait.

use crate::error::PageLensError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which configured model a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Text-only calls: reformat, layout, simplify, explain, knowledge tree.
    Text,
    /// The image extraction call.
    Vision,
}

/// A base64 image payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// One content part: text or an inline image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// A role-tagged list of parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }
}

/// Sampling and output constraints for one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_json_schema: Option<Value>,
}

impl GenerationConfig {
    /// Temperature 0, top-p 1: transcription-style output.
    pub fn deterministic() -> Self {
        Self::sampled(0.0, 1.0)
    }

    pub fn sampled(temperature: f32, top_p: f32) -> Self {
        Self {
            temperature: Some(temperature),
            top_p: Some(top_p),
            ..Default::default()
        }
    }

    /// Ask for `application/json` output matching `schema`.
    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.response_mime_type = Some("application/json".to_string());
        self.response_json_schema = Some(schema);
        self
    }
}

/// A single-turn generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(skip)]
    pub kind: ModelKind,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    /// A text-only user turn.
    pub fn prompt(kind: ModelKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            contents: vec![Content::user(vec![Part::Text {
                text: prompt.into(),
            }])],
            generation_config: None,
        }
    }

    /// Append an inline image to the user turn.
    pub fn with_image(mut self, image: InlineData) -> Self {
        if let Some(content) = self.contents.last_mut() {
            content.parts.push(Part::InlineData { inline_data: image });
        }
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    /// Concatenated text of all text parts (used for logging and tests).
    pub fn prompt_text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect()
    }

    pub fn has_image(&self) -> bool {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .any(|p| matches!(p, Part::InlineData { .. }))
    }
}

/// Model response: either a direct `text` or a list of candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: Option<u64>,
    #[serde(default)]
    pub candidates_token_count: Option<u64>,
}

impl GenerateContentResponse {
    /// A response carrying only a direct text field.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Plain text of the response.
    ///
    /// Prefers the direct `text` field, then the concatenated text parts of
    /// the first candidate, then `""`.
    pub fn text(&self) -> String {
        if let Some(ref text) = self.text {
            return text.clone();
        }
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A text/vision completion service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run one generation request.
    ///
    /// Any transport error, non-2xx status or error body is returned as
    /// [`PageLensError::UpstreamFailure`].
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateContentResponse, PageLensError>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! A scripted model for unit tests: replies are consumed in order and
    //! every request is recorded.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub(crate) enum Reply {
        Text(&'static str),
        Fail(&'static str),
    }

    #[derive(Default)]
    pub(crate) struct ScriptedModel {
        replies: Mutex<VecDeque<Reply>>,
        pub(crate) requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn request(&self, idx: usize) -> GenerateRequest {
            self.requests.lock().unwrap()[idx].clone()
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(
            &self,
            request: GenerateRequest,
        ) -> Result<GenerateContentResponse, PageLensError> {
            self.requests.lock().unwrap().push(request);
            match self.replies.lock().unwrap().pop_front() {
                Some(Reply::Text(t)) => Ok(GenerateContentResponse::from_text(t)),
                Some(Reply::Fail(msg)) => Err(PageLensError::upstream(msg)),
                None => Err(PageLensError::upstream("no scripted reply left")),
            }
        }
    }
}

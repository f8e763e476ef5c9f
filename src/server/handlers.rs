//! Request handlers and the error → response mapping.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use super::AppState;
use crate::convert;
use crate::error::PageLensError;
use crate::output::{KnowledgeTree, OcrOutput};
use crate::pipeline::input::ImageUpload;
use crate::tools::{self, TextRequest};

const NO_IMAGE: &str = "No image file provided";

// ── Errors ───────────────────────────────────────────────────────────────

/// An error response: `400 {error}` or `500 {error, details}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
            details: None,
        }
    }

    /// Map a library error. Caller mistakes become 400 with their own
    /// message; everything else becomes 500 with `context` as the message.
    pub fn from_error(context: &str, err: PageLensError) -> Self {
        if err.is_client_error() {
            return Self::bad_request(err.to_string());
        }
        error!("{}: {}", context, err);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: context.to_string(),
            details: Some(err.to_string()),
        }
    }

    fn from_multipart(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            error: err.body_text(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// ── Response bodies ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TestTextResponse {
    pub output: String,
}

#[derive(Debug, Serialize)]
pub struct SimplifyResponse {
    pub simplified: String,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub explanation: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeTreeResponse {
    pub knowledge_tree: KnowledgeTree,
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// Liveness check; never touches the model.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// One-line probe of the text model.
pub async fn test_text(State(state): State<AppState>) -> Result<Json<TestTextResponse>, ApiError> {
    let output = tools::ping(state.model.as_ref())
        .await
        .map_err(|e| ApiError::from_error("Failed to reach text model", e))?;
    Ok(Json(TestTextResponse { output }))
}

/// `multipart/form-data` with an `image` file and optional re-scan context.
pub async fn ocr(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrOutput>, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::bad_request(NO_IMAGE))?;
    let form = read_ocr_form(&mut multipart).await?;
    let upload = form.image.ok_or_else(|| ApiError::bad_request(NO_IMAGE))?;

    let output = convert::convert_image(
        state.model.as_ref(),
        &state.config,
        &upload,
        form.highlighted_text.as_deref(),
        form.full_text.as_deref(),
    )
    .await
    .map_err(|e| ApiError::from_error("Failed to process image", e))?;

    Ok(Json(output))
}

pub async fn simplify(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<SimplifyResponse>, ApiError> {
    let Json(request) = body.map_err(reject_json)?;
    let simplified = tools::simplify(state.model.as_ref(), &request)
        .await
        .map_err(|e| ApiError::from_error("Failed to simplify text", e))?;
    Ok(Json(SimplifyResponse { simplified }))
}

pub async fn explain(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let Json(request) = body.map_err(reject_json)?;
    let explanation = tools::explain(state.model.as_ref(), &request)
        .await
        .map_err(|e| ApiError::from_error("Failed to explain text", e))?;
    Ok(Json(ExplainResponse { explanation }))
}

pub async fn knowledge_tree(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<KnowledgeTreeResponse>, ApiError> {
    let Json(request) = body.map_err(reject_json)?;
    let knowledge_tree = tools::knowledge_tree(state.model.as_ref(), &request)
        .await
        .map_err(|e| ApiError::from_error("Failed to generate knowledge tree", e))?;
    Ok(Json(KnowledgeTreeResponse { knowledge_tree }))
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn reject_json(rejection: JsonRejection) -> ApiError {
    debug!("Rejected JSON body: {}", rejection);
    ApiError::bad_request(rejection.body_text())
}

#[derive(Debug, Default)]
struct OcrForm {
    image: Option<ImageUpload>,
    highlighted_text: Option<String>,
    full_text: Option<String>,
}

async fn read_ocr_form(multipart: &mut Multipart) -> Result<OcrForm, ApiError> {
    let mut form = OcrForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let mime_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(ApiError::from_multipart)?;
                debug!("Received image field: {} bytes", bytes.len());
                form.image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    mime_type,
                    file_name,
                });
            }
            "highlightedText" => {
                form.highlighted_text = Some(field.text().await.map_err(ApiError::from_multipart)?);
            }
            "fullText" => {
                form.full_text = Some(field.text().await.map_err(ApiError::from_multipart)?);
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(form)
}

//! HTTP-level tests: drive the router with `oneshot` against a scripted model.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use pagelens::server::{create_router, AppState};
use pagelens::{GenerateContentResponse, GenerateRequest, GenerativeModel, LensConfig, PageLensError};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replies are consumed in order; `Err` strings become upstream failures.
struct MockModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockModel {
    fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateContentResponse, PageLensError> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(GenerateContentResponse::from_text(text)),
            Some(Err(msg)) => Err(PageLensError::upstream(msg)),
            None => Err(PageLensError::upstream("no reply scripted")),
        }
    }
}

fn app(model: Arc<MockModel>, config: LensConfig) -> axum::Router {
    create_router(AppState::with_model(model, config))
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const BOUNDARY: &str = "XpagelensBoundaryX";

/// Build a `multipart/form-data` request by hand.
fn post_multipart(uri: &str, image: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    if let Some((content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"page.png\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

// ── Text endpoints ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_simplify_requires_text() {
    let model = MockModel::new(vec![]);
    let (status, body) = send(
        app(model.clone(), LensConfig::default()),
        post_json("/simplify", r#"{"text":""}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No text provided" }));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let model = MockModel::new(vec![]);
    let (status, body) = send(
        app(model, LensConfig::default()),
        post_json("/api/explain", "{not json"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_explain_upstream_failure_is_500_with_details() {
    let model = MockModel::new(vec![Err("Gemini API error (503): overloaded")]);
    let (status, body) = send(
        app(model, LensConfig::default()),
        post_json("/explain", r#"{"text":"E = mc^2"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to explain text");
    assert_eq!(body["details"], "Gemini API error (503): overloaded");
}

#[tokio::test]
async fn test_knowledge_tree_fenced_and_fallback() {
    let model = MockModel::new(vec![Ok("```json\n{\"root\":\"A\",\"prerequisites\":[]}\n```")]);
    let (status, body) = send(
        app(model, LensConfig::default()),
        post_json("/api/knowledge-tree", r#"{"highlightedText":"A"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "knowledgeTree": { "root": "A", "prerequisites": [] } }));

    let model = MockModel::new(vec![Ok("not json")]);
    let (status, body) = send(
        app(model, LensConfig::default()),
        post_json("/knowledge-tree", r#"{"text":"A"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "knowledgeTree": { "root": "Unable to parse", "prerequisites": [], "rawResponse": "not json" } })
    );
}

#[tokio::test]
async fn test_text_probe() {
    let model = MockModel::new(vec![Ok("OK")]);
    let (status, body) = send(
        app(model, LensConfig::default()),
        Request::builder().uri("/api/test-text").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "output": "OK" }));

    let model = MockModel::new(vec![Err("bad key")]);
    let (status, body) = send(
        app(model, LensConfig::default()),
        Request::builder().uri("/test-text").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to reach text model");
}

// ── OCR ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ocr_full_response() {
    let model = MockModel::new(vec![
        Ok("Energy $E=mc^2$"),
        Ok("Energy\n$E = mc^2$"),
        Ok(r#"{"blocks":[{"type":"paragraph","text":"Energy"},{"type":"equation","latex":"E = mc^2"}]}"#),
    ]);
    let (status, body) = send(
        app(model.clone(), LensConfig::default()),
        post_multipart("/api/ocr", Some(("image/png", PNG)), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["extractedMarkdown"], "Energy $E=mc^2$");
    assert_eq!(body["formattedMarkdown"], "Energy\n$E = mc^2$");
    assert_eq!(body["markdown"], "Energy\n\n$$\nE = mc^2\n$$\n\n");
    assert_eq!(body["blocks"][1], json!({ "type": "equation", "latex": "E = mc^2", "display": true }));
    assert_eq!(body["blocksMarkdown"], "Energy\n\n$$\nE = mc^2\n$$\n\n");
    assert_eq!(model.calls(), 3);
}

#[tokio::test]
async fn test_ocr_layout_failure_gives_null_blocks() {
    let model = MockModel::new(vec![Ok("Plain text"), Ok("Plain text"), Err("timeout")]);
    let (status, body) = send(
        app(model, LensConfig::default()),
        post_multipart("/ocr", Some(("image/png", PNG)), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["markdown"], "Plain text");
    assert!(body["blocks"].is_null());
    assert!(body["blocksMarkdown"].is_null());
}

#[tokio::test]
async fn test_ocr_missing_image() {
    let model = MockModel::new(vec![]);
    let (status, body) = send(
        app(model.clone(), LensConfig::default()),
        post_multipart("/ocr", None, &[("fullText", "page")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No image file provided" }));

    // Not multipart at all.
    let (status, _) = send(
        app(model.clone(), LensConfig::default()),
        post_json("/ocr", "{}"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Empty file part.
    let (status, _) = send(
        app(model.clone(), LensConfig::default()),
        post_multipart("/ocr", Some(("image/png", &b""[..])), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_ocr_extraction_failure_is_500() {
    let model = MockModel::new(vec![Err("Gemini API error (400): API key not valid")]);
    let (status, body) = send(
        app(model, LensConfig::default()),
        post_multipart("/ocr", Some(("image/png", PNG)), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to process image");
    assert_eq!(body["details"], "Gemini API error (400): API key not valid");
}

#[tokio::test]
async fn test_ocr_rescan_context_fields() {
    let model = MockModel::new(vec![Ok("x")]);
    let config = LensConfig::builder().reformat(false).layout(false).build().unwrap();
    let (status, _) = send(
        app(model.clone(), config),
        post_multipart(
            "/ocr",
            Some(("application/octet-stream", PNG)),
            &[("highlightedText", "the sum"), ("fullText", "earlier scan")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let request = model.requests.lock().unwrap()[0].clone();
    let prompt = request.prompt_text();
    assert!(prompt.contains("REGION OF INTEREST:\nthe sum"));
    assert!(prompt.contains("PREVIOUS EXTRACTION:\nearlier scan"));
    let wire = serde_json::to_value(&request).unwrap();
    assert_eq!(wire["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
}

#[tokio::test]
async fn test_ocr_upload_limit() {
    let model = MockModel::new(vec![]);
    let config = LensConfig::builder().max_upload_bytes(64).build().unwrap();
    let big = vec![0u8; 4096];
    let (status, _) = send(
        app(model.clone(), config),
        post_multipart("/ocr", Some(("image/png", big.as_slice())), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(model.calls(), 0);
}

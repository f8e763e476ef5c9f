//! HTTP service for the reader front end.
//!
//! Exposes the OCR flow and the three reader tools as JSON endpoints, plus a
//! health check and a model probe. Every route is served both at the root
//! and under `/api`.

mod handlers;
mod routes;

pub use handlers::ApiError;
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::LensConfig;
use crate::error::PageLensError;
use crate::gemini::GeminiClient;
use crate::model::GenerativeModel;

/// Shared state for the web server. Read-only once built.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn GenerativeModel>,
    pub config: Arc<LensConfig>,
}

impl AppState {
    /// Build state backed by the Gemini client.
    ///
    /// Fails when no API key is configured, so a misconfigured server never
    /// starts accepting requests.
    pub fn new(config: LensConfig) -> Result<Self, PageLensError> {
        let client = GeminiClient::new(&config)?;
        Ok(Self::with_model(Arc::new(client), config))
    }

    /// Build state around any model implementation.
    pub fn with_model(model: Arc<dyn GenerativeModel>, config: LensConfig) -> Self {
        Self {
            model,
            config: Arc::new(config),
        }
    }
}

/// Start the web server and run until the listener fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), PageLensError> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PageLensError::Internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("Starting server at http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| PageLensError::Internal(format!("Server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock::{Reply, ScriptedModel};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn setup_test_app(replies: Vec<Reply>) -> (axum::Router, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(replies));
        let state = AppState::with_model(model.clone(), LensConfig::default());
        (create_router(state), model)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn new_requires_api_key() {
        assert!(matches!(
            AppState::new(LensConfig::default()),
            Err(PageLensError::ProviderNotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_at_root_and_api() {
        for uri in ["/health", "/api/health"] {
            let (app, _) = setup_test_app(vec![]);
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["status"], "ok");
        }
    }

    #[tokio::test]
    async fn test_simplify_roundtrip() {
        let (app, model) = setup_test_app(vec![Reply::Text("Easier words.")]);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/simplify")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"highlightedText":"Let x be real.","fullText":"Ch. 1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["simplified"], "Easier words.");
        assert!(model.request(0).prompt_text().contains("Let x be real."));
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let (app, _) = setup_test_app(vec![]);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}

//! # HTTP routes
//!
//! `POST /` with `{"sentences": [...], "tokenize": bool}` returns
//! `{"tags": [...]}` or `{"tags": [...], "labels": [...]}`. The handler
//! sits behind a mutex so requests are served one at a time to completion;
//! the embedding model and tokenizer make no thread-safety promises.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use seqtag_core::Sentence;

use crate::error::ServerError;
use crate::handler::{PredictResponse, PredictionHandler};

/// Shared server state: one handler, one request at a time.
pub type SharedHandler = Arc<Mutex<PredictionHandler>>;

/// Request body for the prediction endpoint.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub sentences: Sentences,
    #[serde(default)]
    pub tokenize: bool,
}

/// Sentences arrive either raw (to be tokenized server-side) or as
/// pre-tokenized per-token field records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Sentences {
    Raw(Vec<String>),
    Records(Vec<Sentence>),
}

/// Build the application router.
pub fn router(handler: SharedHandler) -> Router {
    Router::new()
        .route("/", post(predict))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

async fn predict(
    State(handler): State<SharedHandler>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ServerError> {
    let handler = handler.lock().await;

    let records = match request.sentences {
        Sentences::Raw(sentences) => {
            if !request.tokenize {
                return Err(anyhow::anyhow!(
                    "raw string sentences require \"tokenize\": true"
                )
                .into());
            }
            handler.tokenize(&sentences)?
        }
        Sentences::Records(records) => records,
    };

    let response = handler.predict(records)?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::tests::{StubModel, template};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::util::ServiceExt;

    fn app(labels: bool) -> Router {
        let handler = PredictionHandler::new(Box::new(StubModel { labels }), template(), "pl");
        router(Arc::new(Mutex::new(handler)))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn predicts_pre_tokenized_records() {
        let body = r#"{"sentences": [[{"value": "The"}, {"value": "cat"}]], "tokenize": false}"#;
        let response = app(false).oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["tags"][0][0], "O");
        assert_eq!(json["tags"][0].as_array().unwrap().len(), 2);
        assert!(json.get("labels").is_none());
    }

    #[tokio::test]
    async fn tokenizes_raw_sentences_on_request() {
        let body = r#"{"sentences": ["Hello world."], "tokenize": true}"#;
        let response = app(false).oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        // Three tokens: "Hello", "world", "."
        assert_eq!(json["tags"][0].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn exposes_labels_only_for_two_head_models() {
        let body = r#"{"sentences": [[{"value": "Hi"}]]}"#;

        let json = body_json(app(false).oneshot(post_json(body)).await.unwrap()).await;
        assert!(json.get("labels").is_none());

        let json = body_json(app(true).oneshot(post_json(body)).await.unwrap()).await;
        assert_eq!(json["labels"][0][0], "none");
    }

    #[tokio::test]
    async fn raw_sentences_without_tokenize_fail() {
        let body = r#"{"sentences": ["Hello"], "tokenize": false}"#;
        let response = app(false).oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

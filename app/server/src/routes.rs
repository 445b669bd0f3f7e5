//! HTTP surface for the insights service

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use giginsights::{ConcernSummary, InsightError, InsightsService};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "giginsights.sid";

const INTERNAL_ERROR: &str = "Something went wrong";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InsightsService>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    prompt: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<InsightError> for ApiError {
    fn from(e: InsightError) -> Self {
        match e {
            InsightError::Validation(message) => ApiError::BadRequest(message),
            InsightError::EmptyCorpus(collection) => {
                ApiError::Internal(collection.empty_message().to_string())
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                ApiError::Internal(INTERNAL_ERROR.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health_check))
        .route("/complaints", get(list_complaints))
        .route("/summary", get(summary))
        .route("/policy-suggestions", get(policy_suggestions))
        .route("/analytics", get(analytics))
        .route("/chat", post(chat))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health_check() -> &'static str {
    "Server is working"
}

async fn list_complaints(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    Json(state.service.complaints())
}

async fn summary(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = state.service.summary().await?;
    Ok(Json(json!({ "summary": summary })))
}

// The payload key stays `summary` for client compatibility
async fn policy_suggestions(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let suggestions = state.service.policy_suggestions().await?;
    Ok(Json(json!({ "summary": suggestions })))
}

async fn analytics(State(state): State<AppState>) -> Result<Json<Vec<ConcernSummary>>, ApiError> {
    Ok(Json(state.service.analytics().await?))
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable chat body, treating prompt as missing");
            ChatRequest::default()
        }
    };

    let (session_key, minted) = match session_cookie(&headers) {
        Some(key) => (key, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    let reply = state
        .service
        .chat(&session_key, &request.prompt)
        .await
        .map_err(|e| match e {
            InsightError::Validation(message) => ApiError::BadRequest(message),
            other => {
                tracing::error!(error = %other, "Chat turn failed");
                ApiError::Internal(INTERNAL_ERROR.to_string())
            }
        })?;

    if reply.fallback {
        tracing::warn!("Chat turn answered with the fallback reply");
    }

    let mut response = Json(ChatResponse { response: reply.text }).into_response();
    if minted {
        let cookie = format!("{}={}; HttpOnly; Path=/; SameSite=Lax", SESSION_COOKIE, session_key);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(SET_COOKIE, value);
        }
    }
    Ok(response)
}

/// Session token from the request cookies, if present and well-formed.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
        .map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use giginsights::{
        ComplaintRecord, CompletionClient, CompletionError, CompletionRequest, InsightsConfig,
        PolicyRecord, StaticCorpus,
    };
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Replies with queued texts, failing once the queue is empty.
    struct StubClient {
        replies: Mutex<Vec<String>>,
    }

    impl StubClient {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, CompletionError> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or(CompletionError::EmptyResponse)
        }
    }

    fn state(corpus: StaticCorpus, replies: &[&str]) -> AppState {
        let service = InsightsService::new(
            InsightsConfig::default(),
            Arc::new(corpus),
            Arc::new(StubClient::new(replies)),
        );
        AppState {
            service: Arc::new(service),
        }
    }

    fn corpus() -> StaticCorpus {
        StaticCorpus::new(
            vec![
                ComplaintRecord::new("Pay:Low fares"),
                ComplaintRecord::new("Safety:No cameras"),
            ],
            vec![PolicyRecord(json!({"title": "Fare floor"}))],
        )
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn chat_request(body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = router(state(StaticCorpus::default(), &[]));
        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Server is working");
    }

    #[tokio::test]
    async fn test_summary_end_to_end() {
        let app = router(state(corpus(), &["Summary text"]));
        let response = app.oneshot(get_request("/summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "summary": "Summary text" }));
    }

    #[tokio::test]
    async fn test_empty_corpus_maps_to_500_with_message() {
        let app = router(state(StaticCorpus::default(), &["unused"]));

        let response = app.clone().oneshot(get_request("/summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "No complaints found." }));

        let response = app.clone().oneshot(get_request("/analytics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = app.oneshot(get_request("/policy-suggestions")).await.unwrap();
        assert_eq!(body_json(response).await, json!({ "error": "No policy found." }));
    }

    #[tokio::test]
    async fn test_complaints_and_analytics() {
        let app = router(state(corpus(), &[r#"[{"concern":"Low pay","count":2}]"#]));

        let response = app.clone().oneshot(get_request("/complaints")).await.unwrap();
        let complaints = body_json(response).await;
        assert_eq!(complaints.as_array().unwrap().len(), 2);
        assert_eq!(complaints[0]["complaintTitle"], "Pay:Low fares");

        let response = app.oneshot(get_request("/analytics")).await.unwrap();
        assert_eq!(
            body_json(response).await,
            json!([{ "concern": "Low pay", "count": 2 }])
        );
    }

    #[tokio::test]
    async fn test_complaints_are_served_unmodified() {
        let stored = vec![
            json!({"complaintTitle": "Pay:Low fares", "source": "app", "votes": 3}),
            json!({"name": "No title", "date": 20240101}),
            json!({"complaintTitle": "Safety:No cameras"}),
        ];
        let app = router(state(StaticCorpus::from_raw(stored.clone(), vec![]), &["Summary text"]));

        let response = app.clone().oneshot(get_request("/complaints")).await.unwrap();
        assert_eq!(body_json(response).await, json!(stored));

        // The entry without a title is skipped, the others still count
        let response = app.oneshot(get_request("/summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "summary": "Summary text" }));
    }

    #[tokio::test]
    async fn test_policy_suggestions_use_summary_key() {
        let app = router(state(corpus(), &["Introduce a fare floor"]));
        let response = app.oneshot(get_request("/policy-suggestions")).await.unwrap();
        assert_eq!(
            body_json(response).await,
            json!({ "summary": "Introduce a fare floor" })
        );
    }

    #[tokio::test]
    async fn test_chat_rejects_missing_prompt() {
        let state = state(corpus(), &["unused"]);
        let app = router(state.clone());

        for body in [r#"{"prompt":"  "}"#, "{}", "not json"] {
            let response = app.clone().oneshot(chat_request(body, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(response.headers().get(SET_COOKIE).is_none());
            assert_eq!(body_json(response).await, json!({ "error": "Prompt is required" }));
        }
        assert!(state.service.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_chat_reuses_session_from_cookie() {
        let state = state(corpus(), &["a1", "a2"]);
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(chat_request(r#"{"prompt":"q1"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert_eq!(body_json(response).await, json!({ "response": "a1" }));

        let cookie = set_cookie.split(';').next().unwrap();
        let response = app
            .oneshot(chat_request(r#"{"prompt":"q2"}"#, Some(cookie)))
            .await
            .unwrap();
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(body_json(response).await, json!({ "response": "a2" }));

        let key = cookie.trim_start_matches("giginsights.sid=");
        let history = state.service.sessions().history(key).await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(state.service.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_completion_failure_returns_fallback() {
        let app = router(state(corpus(), &[]));
        let response = app
            .oneshot(chat_request(r#"{"prompt":"q1"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "response": "Sorry, something went wrong." })
        );
    }

    #[tokio::test]
    async fn test_chat_with_empty_corpus_is_internal_error() {
        let app = router(state(StaticCorpus::default(), &["unused"]));
        let response = app
            .oneshot(chat_request(r#"{"prompt":"q1"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "Something went wrong" }));
    }

    #[test]
    fn test_session_cookie_parsing() {
        let id = Uuid::new_v4().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; giginsights.sid={}", id)).unwrap(),
        );
        assert_eq!(session_cookie(&headers), Some(id));

        let mut bad = HeaderMap::new();
        bad.insert(COOKIE, HeaderValue::from_static("giginsights.sid=not-a-uuid"));
        assert_eq!(session_cookie(&bad), None);
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }
}

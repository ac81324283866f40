use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use searcher_core::{DocId, Error, QueryOptions, Searcher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub measure: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub took_s: Option<f64>,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Deserialize)]
pub struct DocParams {
    #[serde(default)]
    pub preview: bool,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: String,
    pub text: String,
}

pub type AppState = Arc<Searcher>;

/// Errors rendered as `{"error": ...}` with a matching status.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn build_app(searcher: Searcher) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(Arc::new(searcher))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

// CORS_ALLOW_ORIGIN is a comma-separated origin list; unset or empty allows any origin.
fn cors_layer() -> CorsLayer {
    let origins: Vec<_> = std::env::var("CORS_ALLOW_ORIGIN")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    let allow = if origins.is_empty() { AllowOrigin::from(Any) } else { AllowOrigin::list(origins) };
    CorsLayer::new().allow_origin(allow).allow_methods(Any).allow_headers(Any)
}

pub async fn search_handler(
    State(searcher): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let options = QueryOptions { limit: params.k, preview: params.preview, measure: params.measure };
    let response = searcher.query(&params.q, &options)?;

    let mut previews = response.previews.into_iter();
    let results = response
        .document_ids
        .iter()
        .map(|id| SearchHit { doc_id: id.to_string(), preview: previews.next() })
        .collect();

    Ok(Json(SearchResponse {
        query: params.q,
        took_s: response.took.map(|d| d.as_secs_f64()),
        results,
    }))
}

pub async fn doc_handler(
    State(searcher): State<AppState>,
    Path(doc_id): Path<DocId>,
    Query(params): Query<DocParams>,
) -> Result<Json<DocResponse>, ApiError> {
    let text = searcher.show(&[doc_id], params.preview)?.pop().unwrap_or_default();
    Ok(Json(DocResponse { doc_id: doc_id.to_string(), text }))
}

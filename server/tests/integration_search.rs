use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use searcher_core::{DocId, Searcher, SearcherConfig};
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

// Two documents; "rust" makes up a larger share of the first one.
fn build_tiny_index(dir: &TempDir) -> (Router, Vec<DocId>) {
    let mut config = SearcherConfig { datastore: "sled".into(), ..Default::default() };
    config.sled.path = dir.path().join("searcher.sled");
    let mut searcher = Searcher::open(config).unwrap();
    searcher.init(true).unwrap();
    let ids = searcher
        .register_documents(["Rust is great\nrust systems programming", "Learning rust\nslowly but surely today"])
        .unwrap();
    searcher.index().unwrap();
    (searcher_server::build_app(searcher), ids)
}

async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let (app, ids) = build_tiny_index(&dir);

    let (status, json) = call(app, "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], ids[0].to_string());
    assert_eq!(arr[1]["doc_id"], ids[1].to_string());
    assert!(json.get("took_s").is_none());
}

#[tokio::test]
async fn search_with_preview_and_measure() {
    let dir = tempdir().unwrap();
    let (app, _) = build_tiny_index(&dir);

    let (status, json) = call(app, "/search?q=learning&preview=true&measure=true").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["preview"], "Learning rust");
    assert!(json["took_s"].as_f64().is_some());
}

#[tokio::test]
async fn unknown_terms_give_empty_results() {
    let dir = tempdir().unwrap();
    let (app, _) = build_tiny_index(&dir);

    let (status, json) = call(app, "/search?q=haskell").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn doc_lookup_and_missing_doc() {
    let dir = tempdir().unwrap();
    let (app, ids) = build_tiny_index(&dir);

    let (status, json) = call(app.clone(), &format!("/doc/{}?preview=true", ids[1])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["text"], "Learning rust");

    let (status, json) = call(app.clone(), "/doc/987654").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("987654"));

    let (status, _) = call(app, "/doc/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempdir().unwrap();
    let (app, _) = build_tiny_index(&dir);
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

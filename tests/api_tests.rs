//! API integration tests
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use policycalc::api::{router, AppState};
use policycalc::config::{OutputFormat, ProcessingConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_app(dir: &Path) -> (Router, Arc<AppState>) {
    let config = ProcessingConfig {
        output_dir: dir.join("out"),
        output_format: OutputFormat::Csv,
        ..Default::default()
    };
    let state = Arc::new(AppState::new(config));
    (router(Arc::clone(&state)), state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// INFO ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(dir.path());

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["formulas_loaded"], 0);
    assert_eq!(body["data"]["registry_version"], 0);
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(dir.path());

    let (status, body) = send(app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let endpoints = body["data"]["endpoints"].as_array().unwrap();
    assert!(endpoints.iter().any(|e| e["path"] == "/api/v1/process"));
}

#[tokio::test]
async fn test_variables() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(dir.path());

    let (status, body) = send(app, get("/api/v1/variables")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["name"].as_str())
        .collect();
    assert!(names.contains(&"PREMIUM"));
}

// ═══════════════════════════════════════════════════════════════════════════
// FORMULA REGISTRY
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_replace_and_list_formulas() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(dir.path());

    let payload = json!({
        "formulas": [
            {"term_description": "total_premium", "mathematical_relationship": "premium * 10"},
            {"name": "surrender_value", "expression": "total_premium * 0.3"}
        ]
    });
    let (status, body) = send(app.clone(), post_json("/api/v1/formulas", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Stored extracted formulas");
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(state.registry.len(), 2);

    let (status, body) = send(app, get("/api/v1/formulas")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["formulas"][0]["name"], "total_premium");
    assert!(body["data"]["last_run"].is_null());
}

#[tokio::test]
async fn test_invalid_formula_set_keeps_previous() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(dir.path());

    let good = json!([{"name": "a", "expression": "1"}]);
    let (status, _) = send(app.clone(), post_json("/api/v1/formulas", good)).await;
    assert_eq!(status, StatusCode::OK);
    let version = state.registry.snapshot().version;

    let bad = json!([{"name": "  ", "expression": "1"}]);
    let (status, body) = send(app, post_json("/api/v1/formulas", bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("empty name"));
    assert_eq!(state.registry.snapshot().version, version);
}

// ═══════════════════════════════════════════════════════════════════════════
// PROCESS AND DOWNLOAD
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_process_then_download() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(dir.path());

    let input = dir.path().join("policies.csv");
    fs::write(&input, "COVER_CODE,PREMIUM,TOTAL_PREMIUM\nL190A01,1000,\n").unwrap();

    let formulas = json!([{"name": "total_premium", "expression": "premium * 10"}]);
    send(app.clone(), post_json("/api/v1/formulas", formulas)).await;

    let request = post_json(
        "/api/v1/process",
        json!({"file_path": input.display().to_string()}),
    );
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "success");
    assert_eq!(body["data"]["successful_calculations"], 1);
    let filename = body["data"]["output_filename"].as_str().unwrap().to_string();

    let last = state.last_run().unwrap();
    assert_eq!(last.output_filename.as_deref(), Some(filename.as_str()));

    let response = app
        .oneshot(get(&format!("/api/v1/download/{}", filename)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("10000"));
}

#[tokio::test]
async fn test_process_unsupported_file() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(dir.path());

    let input = dir.path().join("policies.txt");
    fs::write(&input, "hello").unwrap();

    let request = post_json(
        "/api/v1/process",
        json!({"file_path": input.display().to_string()}),
    );
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_download_missing_file() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(dir.path());

    let (status, body) = send(app, get("/api/v1/download/processed_output_x.xlsx")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_extract_and_store() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(dir.path());

    let document = dir.path().join("brochure.txt");
    fs::write(
        &document,
        "SV: Surrender Value - Paid out on surrender = Total Premium * 0.3\n",
    )
    .unwrap();

    let request = post_json(
        "/api/v1/extract",
        json!({"file_path": document.display().to_string(), "store": true}),
    );
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["file_type"], ".txt");
    assert_eq!(body["data"]["stored"], true);
    assert_eq!(body["data"]["formulas"].as_array().unwrap().len(), 1);
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_extract_empty_document() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(dir.path());

    let document = dir.path().join("empty.txt");
    fs::write(&document, "   \n").unwrap();

    let request = post_json(
        "/api/v1/extract",
        json!({"file_path": document.display().to_string(), "store": true}),
    );
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_extract_unsupported_type() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(dir.path());

    let request = post_json("/api/v1/extract", json!({"file_path": "model.exe"}));
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].as_str().unwrap().contains("Unsupported"));
}

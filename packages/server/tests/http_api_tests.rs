//! Router-level tests: envelope shape, status codes and route wiring.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::*;
use marketplace_core::common::{ManufacturerId, ModelId, ScraperJobId};
use marketplace_core::domains::scraper_jobs::actions::{submit_job, SubmitJobRequest};
use marketplace_core::server::build_app;

fn app(fixture: &ScraperFixture) -> Router {
    build_app(fixture.deps.clone(), None, &["http://localhost:3000".to_string()])
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn submit_returns_id_and_pid() {
    let fixture = ScraperFixture::new(WAITS_FOR_SIGTERM, "");

    let (status, body) = send(
        app(&fixture),
        Method::POST,
        "/admin/scraper-jobs",
        Some(json!({
            "search_url": "https://example.test/search?x=1",
            "manufacturer_id": MANUFACTURER_ID,
            "model_id": MODEL_ID,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["data"]["pid"].is_u64());
    let id = body["data"]["id"].as_i64().unwrap() as i32;

    let (status, active) = send(app(&fixture), Method::GET, "/admin/scraper-jobs/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["data"][0]["job_id"], json!(id));

    let (status, body) = send(
        app(&fixture),
        Method::POST,
        &format!("/admin/scraper-jobs/{}/cancel", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": {"message": "Job cancelled successfully"}}));

    let (_, detail) = send(
        app(&fixture),
        Method::GET,
        &format!("/admin/scraper-jobs/{}", id),
        None,
    )
    .await;
    assert_eq!(detail["data"]["status"], json!("cancelled"));
    assert_eq!(detail["data"]["manufacturer_name"], json!("Toyota"));
}

#[tokio::test]
async fn validation_errors_use_envelope() {
    let fixture = ScraperFixture::new("", "");

    let (status, body) = send(
        app(&fixture),
        Method::POST,
        "/admin/scraper-jobs",
        Some(json!({ "manufacturer_id": MANUFACTURER_ID, "model_id": MODEL_ID })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "error": "Search URL and manufacturer are required"})
    );
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let fixture = ScraperFixture::new("", "");

    let (status, body) = send(
        app(&fixture),
        Method::POST,
        "/admin/vehicles/add-single",
        Some(json!({ "url": "https://example.test/listing/1", "manufacturer_id": "toyota" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(fixture.store.write_count(), 0);
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let fixture = ScraperFixture::new("", "");

    let (status, body) = send(app(&fixture), Method::GET, "/admin/scraper-jobs/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "error": "Job not found"}));

    let (status, _) = send(app(&fixture), Method::POST, "/admin/scraper-jobs/99/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(app(&fixture), Method::GET, "/admin/scraper-jobs/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_is_empty_on_fresh_store() {
    let fixture = ScraperFixture::new("", "");

    let (status, body) = send(app(&fixture), Method::GET, "/admin/scraper-jobs", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": []}));
}

#[tokio::test]
async fn duplicate_vehicle_is_bad_request() {
    let fixture = ScraperFixture::new("", "");
    fixture.store.insert_vehicle("https://example.test/listing/1");

    let (status, body) = send(
        app(&fixture),
        Method::POST,
        "/admin/vehicles/add-single",
        Some(json!({
            "url": "https://example.test/listing/1",
            "manufacturer_id": MANUFACTURER_ID,
            "model_id": MODEL_ID,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Vehicle with this URL already exists"));
}

#[tokio::test]
async fn finished_job_log_stream_sends_final_state() {
    let fixture = ScraperFixture::new("exit 4\n", "");
    let submitted = submit_job(
        SubmitJobRequest {
            search_url: Some("https://example.test/search".to_string()),
            manufacturer_id: Some(ManufacturerId::new(MANUFACTURER_ID)),
            model_id: Some(ModelId::new(MODEL_ID)),
            model_name: None,
        },
        &fixture.deps,
    )
    .await
    .unwrap();
    wait_outcome(submitted.outcome).await;

    let response = app(&fixture)
        .oneshot(
            Request::builder()
                .uri(format!("/admin/scraper-jobs/{}/logs", submitted.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: connected"));
    assert!(text.contains("event: exit"));
    assert!(text.contains("\"status\":\"failed\""));
    assert!(text.contains("Process exited with code 4"));

    let (status, _) = send(
        app(&fixture),
        Method::GET,
        &format!("/admin/scraper-jobs/{}/logs", ScraperJobId::new(999)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_tracked_processes() {
    let fixture = ScraperFixture::new("", "");

    let (status, body) = send(app(&fixture), Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["scraper_processes"], json!(0));
    assert!(body.get("connection_pool").is_none());
}

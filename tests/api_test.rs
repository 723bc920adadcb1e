mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use common::Harness;
use serde_json::{json, Value};
use stateset_receiving::{app_router, AppState};
use tower::ServiceExt;
use uuid::Uuid;

const BASE: &str = "/api/v1/receiving";

struct TestApp {
    router: Router,
    h: Harness,
}

impl TestApp {
    fn new(blind_conference: bool) -> Self {
        let h = Harness::new(blind_conference);
        let router = app_router(AppState::new(h.service.clone()));
        Self { router, h }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, &format!("{BASE}{uri}"), Some(body)).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, &format!("{BASE}{uri}"), None).await
    }

    async fn create_ready_document(&self, expected: u32) -> String {
        let (status, body) = self
            .post(
                "/documents",
                json!({
                    "document_number": "NF-1001",
                    "supplier_id": Uuid::new_v4(),
                    "issue_date": "2026-10-01",
                    "lines": [
                        { "product": "WIDGET-001", "expected_quantity": expected, "unit_of_measure": "UN" }
                    ]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post(
                &format!("/documents/{id}/dock"),
                json!({ "dock_location_id": self.h.dock.id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "AWAITING_EXECUTION");
        id
    }
}

#[tokio::test]
async fn health_reports_up() {
    let app = TestApp::new(true);
    let (status, body) = app.request(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
    assert_eq!(body["blind_conference"], true);
}

#[tokio::test]
async fn full_conference_over_http() {
    let app = TestApp::new(true);
    let id = app.create_ready_document(6).await;

    let (status, body) = app
        .post(
            &format!("/documents/{id}/conference"),
            json!({ "product": "7891234567895", "quantity": 6, "volumes_count": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let codes = body["volume_codes"].as_array().unwrap();
    assert_eq!(codes.len(), 2);
    let code = codes[0].as_str().unwrap();

    let (status, body) = app.get(&format!("/volumes/by-code/{code}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_id"], id.as_str());

    let (status, body) = app.get(&format!("/documents/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lines"][0]["counted_quantity"], 6);
    assert!(body["lines"][0]["expected_quantity"].is_null());

    let (status, body) = app.get(&format!("/documents/{id}/progress")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["progress_percent"].is_null());

    let (status, body) = app
        .post(
            &format!("/documents/{id}/finalize"),
            json!({ "staging_location_id": app.h.staging.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FINALIZED");
    assert_eq!(body["volumes_stored"], 2);

    let (status, body) = app
        .post(
            &format!("/documents/{id}/conference"),
            json!({ "product": "WIDGET-001", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["code"], "immutable_state");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn divergence_review_over_http() {
    let app = TestApp::new(true);
    let id = app.create_ready_document(10).await;
    app.post(
        &format!("/documents/{id}/conference"),
        json!({ "product": "WIDGET-001", "quantity": 7 }),
    )
    .await;
    let (_, finalized) = app
        .post(
            &format!("/documents/{id}/finalize"),
            json!({ "staging_location_id": app.h.staging.id }),
        )
        .await;
    assert_eq!(finalized["status"], "DIVERGENT");

    let (status, pending) = app
        .get(&format!("/documents/{id}/divergences?status=PENDING"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let divergence = &pending.as_array().unwrap()[0];
    assert_eq!(divergence["kind"], "PHYSICAL_SHORTAGE");
    let divergence_id = divergence["id"].as_str().unwrap();

    let (status, body) = app
        .post(
            &format!("/divergences/{divergence_id}/resolve"),
            json!({ "decision": "REJECT", "justification": "short shipment", "resolved_by": "sup-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_status"], "BLOCKED");

    let (status, body) = app
        .post(
            &format!("/documents/{id}/close-dispute"),
            json!({ "justification": "credit note received", "closed_by": "buyer-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FINALIZED");
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let app = TestApp::new(true);

    let (status, body) = app.get(&format!("/documents/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let id = app.create_ready_document(3).await;
    let (status, body) = app
        .post(
            &format!("/documents/{id}/dock"),
            json!({ "dock_location_id": app.h.staging.id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = app
        .post(
            &format!("/documents/{id}/conference"),
            json!({ "product": "UNKNOWN", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "unknown_product");

    let (status, body) = app
        .post(
            &format!("/documents/{id}/finalize"),
            json!({ "staging_location_id": app.h.staging.id }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    let (status, _) = app
        .post(&format!("/documents/{id}/cancel"), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = app
        .post(&format!("/documents/{id}/cancel"), json!({ "confirm": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELED");
}

#[tokio::test]
async fn listing_endpoints() {
    let app = TestApp::new(false);
    app.create_ready_document(2).await;
    app.create_ready_document(2).await;

    let (status, body) = app.get("/documents?status=AWAITING_EXECUTION&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/documents?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/locations?type=DOCK").await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["DOCK-01", "DOCK-02"]);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let app = TestApp::new(true);
    app.create_ready_document(1).await;

    let (status, body) = app.request(Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_str()
        .unwrap()
        .contains("receiving_documents_created_total"));
}

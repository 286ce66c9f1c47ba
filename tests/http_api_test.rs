mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{model_json, MemoryAuditSink, RecordingNotifier, StubModel};
use serde_json::Value;
use tower::ServiceExt;
use triage_flow::app::http::{router, AppState};
use triage_flow::domain::ports::ReasoningError;
use triage_flow::TriageService;

fn app_with(model: StubModel, audit: MemoryAuditSink) -> Router {
    let service = TriageService::new(model, audit, RecordingNotifier::default());
    router(AppState::ready(service))
}

fn triage_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/triage")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_triage_returns_decision() {
    let audit = MemoryAuditSink::default();
    let app = app_with(StubModel::replying(model_json("5", 0.1)), audit.clone());

    let response = app
        .oneshot(triage_request(
            r#"{"description": "Mild headache for 1 day, no other symptoms"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["urgency_level"], 5);
    assert_eq!(body["uncertainty_score"], 0.1);
    assert_eq!(body["safety_flag"], false);
    assert_eq!(body["dispatch_ambulance"], false);
    assert!(body["clinical_reasoning"].as_str().unwrap().contains("CHAIN-OF-THOUGHT"));
    assert!(body["timestamp"].is_string());
    assert_eq!(audit.records().len(), 1);
}

#[tokio::test]
async fn test_legacy_field_names_are_accepted() {
    let app = app_with(StubModel::replying(model_json("4", 0.2)), MemoryAuditSink::default());

    let response = app
        .oneshot(triage_request(
            r#"{"text_description": "Rash on both arms since yesterday", "image_url": "https://example.org/rash.png"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["urgency_level"], 4);
}

#[tokio::test]
async fn test_invalid_descriptions_are_bad_requests() {
    let model = StubModel::replying(model_json("5", 0.1));
    let audit = MemoryAuditSink::default();

    for body in [r#"{"description": ""}"#, r#"{"description": "ow"}"#, r#"{}"#] {
        let app = app_with(model.clone(), audit.clone());
        let response = app.oneshot(triage_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("Symptom description"), "detail: {}", detail);
    }

    assert_eq!(model.calls(), 0);
    assert!(audit.records().is_empty());
}

#[tokio::test]
async fn test_model_failure_still_returns_ok_with_fallback() {
    let app = app_with(
        StubModel::failing(ReasoningError::Upstream("HTTP 500".to_string())),
        MemoryAuditSink::default(),
    );

    let response = app
        .oneshot(triage_request(r#"{"description": "Shortness of breath at rest"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["urgency_level"], 1);
    assert_eq!(body["uncertainty_score"], 1.0);
    assert_eq!(body["safety_flag"], true);
    assert_eq!(body["dispatch_ambulance"], true);
}

#[tokio::test]
async fn test_unavailable_service_returns_503() {
    let app = router(AppState::<MemoryAuditSink>::unavailable(
        "Missing required configuration: reasoning.api_key",
    ));

    let response = app
        .oneshot(triage_request(r#"{"description": "Shortness of breath at rest"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
    assert!(detail.contains("reasoning.api_key"));
}

#[tokio::test]
async fn test_health_endpoints() {
    for uri in ["/", "/health"] {
        let app = app_with(StubModel::replying(model_json("5", 0.1)), MemoryAuditSink::default());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "operational");
        assert_eq!(body["service"], "TriageFlow API");
        assert_eq!(body["reasoning_configured"], true);
    }

    let app = router(AppState::<MemoryAuditSink>::unavailable("no key"));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(response).await["reasoning_configured"], false);
}

#[tokio::test]
async fn test_malformed_body_gets_json_detail() {
    let model = StubModel::replying(model_json("5", 0.1));

    let app = app_with(model.clone(), MemoryAuditSink::default());
    let response = app
        .oneshot(triage_request(r#"{"description": "chest pain"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
    assert!(detail.starts_with("Invalid request body"), "detail: {}", detail);

    let app = app_with(model.clone(), MemoryAuditSink::default());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/triage")
                .body(Body::from(r#"{"description": "Shortness of breath at rest"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["detail"].is_string());

    assert_eq!(model.calls(), 0);
}

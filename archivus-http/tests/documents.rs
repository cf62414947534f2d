//! End-to-end tests against the `/api/v1/documents/*` surface, built the way
//! `archivus-pipeline`'s scenario tests assemble a pipeline, driven through
//! the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use archivus_ai::{AiAdapter, AiAdapterConfig, DeterministicProvider};
use archivus_blob::{BlobAdapter, BlobConfig, InMemoryBlobStore};
use archivus_core::domain::SubscriptionTier;
use archivus_core::domain::Tenant;
use archivus_core::{Config, Role, TenantId};
use archivus_http::auth::{encode_dev_token, Claims, DevTokenVerifier, SharedVerifier};
use archivus_http::{build_router, AppState};
use archivus_pipeline::pipeline::Pipeline;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

fn starter_tenant(name: &str) -> Tenant {
    let mut tenant = Tenant::new(name, SubscriptionTier::Starter);
    tenant.storage_quota_bytes = 5 * 1024 * 1024 * 1024;
    tenant.api_quota_period = 1_000;
    tenant
}

async fn test_state(tenant: Tenant) -> (AppState, TenantId) {
    let store = archivus_pipeline::InMemoryStore::new();
    let tenant_id = tenant.id;
    store.create_tenant(tenant);

    let mut config = Config::new();
    config.set("max_file_size", "10485760");
    let snapshot = config.snapshot();

    let blobs = Arc::new(BlobAdapter::new(InMemoryBlobStore::new(), BlobConfig::default()));
    let ai = AiAdapter::new(DeterministicProvider::new(), AiAdapterConfig::from_snapshot(&snapshot));
    let pipeline = Pipeline::start(store, blobs, Arc::new(ai), snapshot).await.unwrap();

    let verifier: SharedVerifier = Arc::new(DevTokenVerifier);
    let state = AppState::new(pipeline.context.clone(), verifier);
    (state, tenant_id)
}

fn bearer_for(tenant_id: TenantId, role: Role) -> String {
    let claims = Claims {
        user_id: Uuid::new_v4(),
        tenant_id,
        role,
        issued_at: Utc::now(),
        expires_at: Utc::now() + Duration::hours(1),
    };
    encode_dev_token(&claims)
}

/// Builds a `multipart/form-data` body with a single `file` part plus
/// arbitrary extra text fields.
fn multipart_upload(fields: &[(&str, &str)], file_name: &str, content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "archivus-test-boundary".to_string();
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n--");
    body.extend_from_slice(boundary.as_bytes());
    body.extend_from_slice(b"--\r\n");
    (boundary, body)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn upload_without_bearer_token_is_unauthorized() {
    let (state, _tenant_id) = test_state(starter_tenant("acme")).await;
    let router = build_router(state);

    let (boundary, body) = multipart_upload(&[], "invoice.pdf", "application/pdf", b"hello world");
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/documents/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn upload_then_download_round_trip() {
    let (state, tenant_id) = test_state(starter_tenant("acme")).await;
    let router = build_router(state);
    let token = bearer_for(tenant_id, Role::User);

    let contents = b"%PDF-1.4 fake invoice body".to_vec();
    let (boundary, body) = multipart_upload(
        &[("title", "Q1 invoice"), ("tags", "finance, urgent")],
        "invoice.pdf",
        "application/pdf",
        &contents,
    );
    let upload_request = Request::builder()
        .method("POST")
        .uri("/api/v1/documents/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();

    let upload_response = router.clone().oneshot(upload_request).await.unwrap();
    assert_eq!(upload_response.status(), StatusCode::CREATED);
    let upload_body = json_body(upload_response).await;
    assert_eq!(upload_body["document"]["document_type"], "invoice");
    assert_eq!(upload_body["document"]["status"], "processing");

    let queued: Vec<String> = upload_body["queued_jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert!(queued.contains(&"text_extraction".to_string()));
    assert!(queued.contains(&"document_classification".to_string()));

    let document_id = upload_body["document"]["id"].as_str().unwrap().to_string();

    let download_request = Request::builder()
        .method("GET")
        .uri(format!("/api/v1/documents/{document_id}/download"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let download_response = router.clone().oneshot(download_request).await.unwrap();
    assert_eq!(download_response.status(), StatusCode::OK);
    let disposition = download_response.headers().get("content-disposition").unwrap().to_str().unwrap().to_string();
    assert!(disposition.contains("invoice.pdf"));
    let downloaded = download_response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(downloaded.as_ref(), contents.as_slice());
}

#[tokio::test]
async fn download_from_a_different_tenant_is_not_found_not_forbidden() {
    let (state, tenant_id) = test_state(starter_tenant("acme")).await;
    let router = build_router(state);
    let owner_token = bearer_for(tenant_id, Role::User);

    let (boundary, body) = multipart_upload(&[], "receipt.png", "image/png", b"\x89PNG fake bytes");
    let upload_request = Request::builder()
        .method("POST")
        .uri("/api/v1/documents/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .header("authorization", format!("Bearer {owner_token}"))
        .body(Body::from(body))
        .unwrap();
    let upload_response = router.clone().oneshot(upload_request).await.unwrap();
    let upload_body = json_body(upload_response).await;
    let document_id = upload_body["document"]["id"].as_str().unwrap().to_string();

    let stranger_token = bearer_for(TenantId::new(), Role::User);
    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/v1/documents/{document_id}/download"))
        .header("authorization", format!("Bearer {stranger_token}"))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preview_placeholder_before_preview_generation_runs() {
    let (state, tenant_id) = test_state(starter_tenant("acme")).await;
    let router = build_router(state);
    let token = bearer_for(tenant_id, Role::User);

    let (boundary, body) = multipart_upload(&[], "contract.docx", "application/octet-stream", b"contract bytes");
    let upload_request = Request::builder()
        .method("POST")
        .uri("/api/v1/documents/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();
    let upload_response = router.clone().oneshot(upload_request).await.unwrap();
    let upload_body = json_body(upload_response).await;
    let document_id = upload_body["document"]["id"].as_str().unwrap().to_string();

    let preview_request = Request::builder()
        .method("GET")
        .uri(format!("/api/v1/documents/{document_id}/preview"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let preview_response = router.oneshot(preview_request).await.unwrap();
    assert_eq!(preview_response.status(), StatusCode::OK);
    assert_eq!(preview_response.headers().get("content-type").unwrap(), "text/plain");
}

#[tokio::test]
async fn ai_results_and_jobs_reflect_a_freshly_queued_upload() {
    let (state, tenant_id) = test_state(starter_tenant("acme")).await;
    let router = build_router(state);
    let token = bearer_for(tenant_id, Role::User);

    let (boundary, body) = multipart_upload(&[], "invoice.pdf", "application/pdf", b"invoice bytes");
    let upload_request = Request::builder()
        .method("POST")
        .uri("/api/v1/documents/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();
    let upload_response = router.clone().oneshot(upload_request).await.unwrap();
    let upload_body = json_body(upload_response).await;
    let document_id = upload_body["document"]["id"].as_str().unwrap().to_string();
    let queued_count = upload_body["queued_jobs"].as_array().unwrap().len();

    let jobs_request = Request::builder()
        .method("GET")
        .uri(format!("/api/v1/documents/{document_id}/jobs"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let jobs_response = router.clone().oneshot(jobs_request).await.unwrap();
    assert_eq!(jobs_response.status(), StatusCode::OK);
    let jobs_body = json_body(jobs_response).await;
    assert_eq!(jobs_body.as_array().unwrap().len(), queued_count);

    let ai_request = Request::builder()
        .method("GET")
        .uri(format!("/api/v1/documents/{document_id}/ai-results"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let ai_response = router.oneshot(ai_request).await.unwrap();
    assert_eq!(ai_response.status(), StatusCode::OK);
    let ai_body = json_body(ai_response).await;
    assert_eq!(ai_body["document_id"], document_id);
}

#[tokio::test]
async fn upload_with_enable_ai_false_queues_nothing() {
    let (state, tenant_id) = test_state(starter_tenant("acme")).await;
    let router = build_router(state);
    let token = bearer_for(tenant_id, Role::User);

    let (boundary, body) = multipart_upload(&[("enable_ai", "false")], "memo.txt", "text/plain", b"just a memo");
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/documents/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["document"]["status"], "pending");
    assert!(body["queued_jobs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn upload_missing_file_field_is_a_bad_request() {
    let (state, tenant_id) = test_state(starter_tenant("acme")).await;
    let router = build_router(state);
    let token = bearer_for(tenant_id, Role::User);

    let boundary = "archivus-test-boundary-2".to_string();
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"title\"\r\n\r\nno file here\r\n");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/documents/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

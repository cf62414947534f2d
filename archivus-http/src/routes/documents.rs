//! Handlers for `/api/v1/documents/*` (§6.1). Upload is the one non-trivial
//! route — everything else is a tenant-scoped read over the pipeline's
//! store and blob adapter.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use archivus_blob::{BlobCtx, BlobId, OpenedContent};
use archivus_core::domain::{DocumentType, Job};
use archivus_core::ArchivusError;
use archivus_pipeline::stages::common::job_type_name;
use archivus_pipeline::{UploadOptions, UploadPayload};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/documents/upload", post(upload))
        .route("/documents/{id}/download", get(download))
        .route("/documents/{id}/preview", get(preview))
        .route("/documents/{id}/ai-results", get(ai_results))
        .route("/documents/{id}/jobs", get(jobs))
}

fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn parse_document_type(raw: &str) -> Option<DocumentType> {
    match raw.to_ascii_lowercase().as_str() {
        "invoice" => Some(DocumentType::Invoice),
        "receipt" => Some(DocumentType::Receipt),
        "contract" => Some(DocumentType::Contract),
        "report" => Some(DocumentType::Report),
        "correspondence" => Some(DocumentType::Correspondence),
        "other" => Some(DocumentType::Other),
        _ => None,
    }
}

/// `POST /documents/upload` (§6.1): parses the multipart form directly into
/// an [`UploadPayload`]/[`UploadOptions`] pair and hands off to
/// [`archivus_pipeline::IntakeService`].
async fn upload(
    State(state): State<AppState>,
    AuthContext(req_ctx): AuthContext,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;
    let mut options = UploadOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(ApiError::from)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|s| s.to_string());
                bytes = Some(field.bytes().await.map_err(ApiError::from)?.to_vec());
            }
            "title" => options.title = Some(field.text().await.map_err(ApiError::from)?),
            "description" => options.description = Some(field.text().await.map_err(ApiError::from)?),
            "folder_id" => {
                let raw = field.text().await.map_err(ApiError::from)?;
                if !raw.trim().is_empty() {
                    let parsed = raw
                        .trim()
                        .parse::<Uuid>()
                        .map_err(|e| ArchivusError::invalid_input(format!("malformed folder_id: {e}")))?;
                    options.folder_id = Some(parsed);
                }
            }
            "document_type" => {
                let raw = field.text().await.map_err(ApiError::from)?;
                options.document_type = parse_document_type(&raw);
            }
            "tags" => options.tags.extend(split_tags(&field.text().await.map_err(ApiError::from)?)),
            "enable_ai" => options.enable_ai = parse_bool(&field.text().await.map_err(ApiError::from)?, true),
            "skip_duplicate_check" => {
                options.skip_dedup = parse_bool(&field.text().await.map_err(ApiError::from)?, false)
            }
            // `enable_ocr` and `categories` are accepted per §6.1 but have no
            // stage gate / persisted field in this design — category CRUD
            // isn't part of the core, and OCR fallback is text_extraction's
            // own per-document decision (§4.7.1) — so both are read and
            // discarded rather than rejected.
            "enable_ocr" | "categories" => {
                let _ = field.text().await.map_err(ApiError::from)?;
            }
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    let file_name = file_name.ok_or_else(|| ArchivusError::invalid_input("missing required 'file' field"))?;
    let bytes = bytes.ok_or_else(|| ArchivusError::invalid_input("missing required 'file' field"))?;
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    let declared_size = bytes.len() as u64;

    let payload = UploadPayload { file_name, content_type, declared_size, bytes };
    let actor_id = req_ctx.actor_id.unwrap_or_else(Uuid::new_v4);

    let result = state.intake.upload(req_ctx.tenant_id, actor_id, payload, options).await?;

    let queued_jobs: Vec<&'static str> = result
        .queued_job_ids
        .iter()
        .filter_map(|id| state.pipeline.store.get_job(*id))
        .map(|job| job_type_name(job.stage_type))
        .collect();

    let body = serde_json::json!({
        "document": result.document,
        "queued_jobs": queued_jobs,
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// `GET /documents/{id}/download` (§6.1): streams the blob with
/// `Content-Disposition: attachment`.
async fn download(
    State(state): State<AppState>,
    AuthContext(req_ctx): AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let document = state
        .pipeline
        .store
        .get_document(req_ctx.tenant_id, id)
        .ok_or_else(|| ArchivusError::not_found(format!("document {id} not found")))?;

    let blob_ctx = BlobCtx::new(req_ctx.tenant_id.0.to_string());
    let blob_id = BlobId::from_string(document.storage_path.clone());
    let opened = state
        .pipeline
        .blobs
        .open(blob_ctx, blob_id, None)
        .await
        .map_err(|e| ArchivusError::storage_failure(e.to_string()))?;

    let stream = match opened.content {
        OpenedContent::Stream { stream, .. } => stream,
        OpenedContent::SignedUrl { url, .. } => return Ok(Redirect::temporary(&url).into_response()),
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, document.content_type.clone())
        .header(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", document.file_name))
        .body(Body::from_stream(stream))
        .map_err(|e| ArchivusError::internal(e.to_string()))?;
    Ok(response)
}

/// `GET /documents/{id}/preview` (§6.1): the preview artifact if
/// `preview_generation` has produced one, otherwise a 200 placeholder.
async fn preview(
    State(state): State<AppState>,
    AuthContext(req_ctx): AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let document = state
        .pipeline
        .store
        .get_document(req_ctx.tenant_id, id)
        .ok_or_else(|| ArchivusError::not_found(format!("document {id} not found")))?;

    let Some(preview_path) = state.pipeline.store.get_preview_path(document.id) else {
        return Ok((StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], "preview not yet available").into_response());
    };

    let blob_ctx = BlobCtx::new(req_ctx.tenant_id.0.to_string());
    let blob_id = BlobId::from_string(preview_path);
    let opened = state
        .pipeline
        .blobs
        .open(blob_ctx, blob_id, None)
        .await
        .map_err(|e| ArchivusError::storage_failure(e.to_string()))?;

    let content_type = opened.receipt.content_type.clone().unwrap_or_else(|| "application/octet-stream".to_string());
    let stream = match opened.content {
        OpenedContent::Stream { stream, .. } => stream,
        OpenedContent::SignedUrl { url, .. } => return Ok(Redirect::temporary(&url).into_response()),
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from_stream(stream))
        .map_err(|e| ArchivusError::internal(e.to_string()))?;
    Ok(response)
}

/// `GET /documents/{id}/ai-results` (§6.1): assembled from the
/// `document_ai_result` side table, whatever stages have completed so far.
async fn ai_results(
    State(state): State<AppState>,
    AuthContext(req_ctx): AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let document = state
        .pipeline
        .store
        .get_document(req_ctx.tenant_id, id)
        .ok_or_else(|| ArchivusError::not_found(format!("document {id} not found")))?;

    let ai_result = state.pipeline.store.get_ai_result(document.id);
    let body = match ai_result {
        Some(r) => serde_json::json!({
            "document_id": document.id,
            "has_results": true,
            "summary": r.summary,
            "entities": r.extracted_entities,
            "classification": r.classification,
            "tags": r.tags,
            "processed_at": document.updated_at,
        }),
        None => serde_json::json!({
            "document_id": document.id,
            "has_results": false,
        }),
    };
    Ok(Json(body))
}

/// `GET /documents/{id}/jobs` (§6.1): every stage job against this document
/// — every stage type in this design belongs to the AI processing graph.
async fn jobs(
    State(state): State<AppState>,
    AuthContext(req_ctx): AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Job>>, ApiError> {
    state
        .pipeline
        .store
        .get_document(req_ctx.tenant_id, id)
        .ok_or_else(|| ArchivusError::not_found(format!("document {id} not found")))?;

    Ok(Json(state.pipeline.store.jobs_for_document(id)))
}

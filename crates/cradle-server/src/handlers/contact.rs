use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use tracing::info;

use super::{notify, StatusUpdate};
use crate::{
    error::ApiError,
    extract::ApiJson,
    identity::Identity,
    store::InquiryStatus,
    validate::{validate_inquiry, InquiryInput},
    AppState,
};

const NOT_FOUND: &str = "Inquiry not found";

// ── Submit ────────────────────────────────────────────────────────────────────

pub async fn submit_inquiry(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<InquiryInput>,
) -> Result<Response, ApiError> {
    let fields = validate_inquiry(body).map_err(ApiError::Validation)?;
    let inquiry = state
        .store
        .submit_inquiry(fields)
        .map_err(ApiError::internal("Failed to submit inquiry"))?;

    info!(
        id = %inquiry.id,
        subject = %inquiry.subject,
        "audit: inquiry.submit"
    );
    notify(&state, "inquiry.submitted", &inquiry.id, &inquiry);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Inquiry submitted successfully. We will get back to you soon!",
            "data": {
                "id": inquiry.id,
                "submittedAt": inquiry.submitted_at,
            }
        })),
    )
        .into_response())
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_inquiries(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
) -> Result<Response, ApiError> {
    let inquiries = state
        .store
        .list_inquiries()
        .map_err(ApiError::internal("Failed to fetch inquiries"))?;
    info!(count = inquiries.len(), by = %admin.uid, "audit: inquiry.list");
    Ok(Json(json!({
        "success": true,
        "count": inquiries.len(),
        "data": inquiries,
    }))
    .into_response())
}

// ── Get ───────────────────────────────────────────────────────────────────────

pub async fn get_inquiry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let inquiry = state
        .store
        .get_inquiry(&id)
        .map_err(ApiError::internal("Failed to fetch inquiry"))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    Ok(Json(json!({"success": true, "data": inquiry})).into_response())
}

// ── Status ────────────────────────────────────────────────────────────────────

pub async fn update_inquiry_status(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> Result<Response, ApiError> {
    let status: InquiryStatus = body
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or(ApiError::InvalidStatus)?;

    let inquiry = state
        .store
        .set_inquiry_status(&id, status)
        .map_err(ApiError::internal("Failed to update inquiry"))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    info!(id = %id, %status, by = %admin.uid, "audit: inquiry.status");
    notify(&state, "inquiry.status_changed", &id, &inquiry);

    Ok(Json(json!({
        "success": true,
        "message": "Inquiry status updated",
        "data": inquiry,
    }))
    .into_response())
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_inquiry(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let deleted = state
        .store
        .delete_inquiry(&id)
        .map_err(ApiError::internal("Failed to delete inquiry"))?;
    if !deleted {
        info!(id = %id, "audit: inquiry.delete.not_found");
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    info!(id = %id, by = %admin.uid, "audit: inquiry.delete");
    Ok(Json(json!({
        "success": true,
        "message": "Inquiry deleted successfully",
    }))
    .into_response())
}

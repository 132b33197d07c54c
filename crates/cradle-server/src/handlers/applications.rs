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
    store::ApplicationStatus,
    validate::{validate_application, ApplicationInput},
    AppState,
};

const NOT_FOUND: &str = "Application not found";

// ── Submit ────────────────────────────────────────────────────────────────────

pub async fn submit_application(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ApplicationInput>,
) -> Result<Response, ApiError> {
    let fields = validate_application(body).map_err(ApiError::Validation)?;
    let application = state
        .store
        .submit_application(fields)
        .map_err(ApiError::internal("Failed to submit application"))?;

    info!(
        id = %application.id,
        grade = %application.grade_applying_for,
        "audit: application.submit"
    );
    notify(&state, "application.submitted", &application.id, &application);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Application submitted successfully",
            "data": {
                "id": application.id,
                "submittedAt": application.submitted_at,
            }
        })),
    )
        .into_response())
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_applications(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
) -> Result<Response, ApiError> {
    let applications = state
        .store
        .list_applications()
        .map_err(ApiError::internal("Failed to fetch applications"))?;
    info!(count = applications.len(), by = %admin.uid, "audit: application.list");
    Ok(Json(json!({
        "success": true,
        "count": applications.len(),
        "data": applications,
    }))
    .into_response())
}

// ── Get ───────────────────────────────────────────────────────────────────────

pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let application = state
        .store
        .get_application(&id)
        .map_err(ApiError::internal("Failed to fetch application"))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    Ok(Json(json!({"success": true, "data": application})).into_response())
}

// ── Status ────────────────────────────────────────────────────────────────────

pub async fn update_application_status(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> Result<Response, ApiError> {
    let status: ApplicationStatus = body
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or(ApiError::InvalidStatus)?;

    let application = state
        .store
        .set_application_status(&id, status)
        .map_err(ApiError::internal("Failed to update application"))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    info!(id = %id, %status, by = %admin.uid, "audit: application.status");
    notify(&state, "application.status_changed", &id, &application);

    Ok(Json(json!({
        "success": true,
        "message": "Application status updated",
        "data": application,
    }))
    .into_response())
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_application(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let deleted = state
        .store
        .delete_application(&id)
        .map_err(ApiError::internal("Failed to delete application"))?;
    if !deleted {
        info!(id = %id, "audit: application.delete.not_found");
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    info!(id = %id, by = %admin.uid, "audit: application.delete");
    Ok(Json(json!({
        "success": true,
        "message": "Application deleted successfully",
    }))
    .into_response())
}

pub mod applications;
pub mod auth;
pub mod blog;
pub mod contact;

use axum::{response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::AppState;

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "message": "Cradle Bridge Schools API is running",
        "timestamp": Utc::now(),
    }))
}

// ── Stats ─────────────────────────────────────────────────────────────────────

/// Headline figures shown on the home page.
pub async fn stats() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": {
            "totalStudents": 450,
            "yearsOfExcellence": 15,
            "qualifiedTeachers": 35,
            "successRate": 98,
            "extracurriculars": 12,
            "awards": 25,
        }
    }))
}

/// Body of the `PATCH .../{id}/status` endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Hands `record` to the notification hook, if one is configured.
fn notify(state: &AppState, event: &str, id: &str, record: &impl Serialize) {
    let Some(notifier) = &state.notifier else {
        return;
    };
    match serde_json::to_value(record) {
        Ok(detail) => notifier.fire(event, id, detail),
        Err(e) => warn!(error = %e, event, "failed to encode notification detail"),
    }
}

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{error::ApiError, extract::ApiJson, identity::Identity, AppState};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: Option<String>,
}

/// Checks a token supplied in the body, for the admin login screen.
pub async fn verify_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> Result<Response, ApiError> {
    let token = body
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Token is required".to_string()))?;

    match state.identity.verify(token).await {
        Ok(user) => {
            debug!(uid = %user.uid, "auth: token verified");
            Ok(Json(json!({
                "success": true,
                "message": "Token verified successfully",
                "user": user,
            }))
            .into_response())
        }
        Err(e) => {
            warn!(error = %e, "auth: token verification failed");
            Err(ApiError::Unauthorized("Invalid or expired token"))
        }
    }
}

pub async fn me(Extension(user): Extension<Identity>) -> impl IntoResponse {
    Json(json!({"success": true, "user": user}))
}

pub async fn auth_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Authentication service is running",
        "provider": state.identity.name(),
        "timestamp": Utc::now(),
    }))
}

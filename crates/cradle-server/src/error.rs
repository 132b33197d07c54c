use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::AppState;

/// Every way a request can fail. Each variant renders as the standard
/// `{ "success": false, ... }` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid status")]
    InvalidStatus,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Too many requests from this IP, please try again later.")]
    TooManyRequests { retry_after: Duration },

    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(message: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
        move |source| ApiError::Internal { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::InvalidStatus => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Detail of a 500, carried on the response so [`expose_error_detail`] can
/// decide whether the caller may see it.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub message: &'static str,
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        match self {
            ApiError::Validation(errors) => {
                (status, Json(json!({"success": false, "errors": errors}))).into_response()
            }
            ApiError::TooManyRequests { retry_after } => (
                status,
                [(header::RETRY_AFTER, retry_after.as_secs().max(1).to_string())],
                Json(json!({"success": false, "message": message})),
            )
                .into_response(),
            ApiError::Internal { message, source } => {
                tracing::error!(error = %format!("{source:#}"), "{message}");
                let mut response =
                    (status, Json(json!({"success": false, "message": message}))).into_response();
                response.extensions_mut().insert(ErrorDetail {
                    message,
                    detail: format!("{source:#}"),
                });
                response
            }
            _ => (status, Json(json!({"success": false, "message": message}))).into_response(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// Middleware that adds the internal error text to 500 bodies when the
/// server runs in development mode.
pub async fn expose_error_detail(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.expose_errors {
        return response;
    }
    match response.extensions().get::<ErrorDetail>().cloned() {
        Some(ErrorDetail { message, detail }) => (
            response.status(),
            Json(json!({"success": false, "message": message, "error": detail})),
        )
            .into_response(),
        None => response,
    }
}

/// Last-resort handler for panics escaping a route.
pub fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"success": false, "message": "Something went wrong!"})),
    )
        .into_response()
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "message": "Route not found"})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use axum_test::TestServer;
    use serde_json::Value;
    use tower_http::catch_panic::CatchPanicLayer;

    use crate::{identity::IdentityProvider, store::Store};

    async fn failing() -> Result<Response, ApiError> {
        Err(ApiError::internal("Failed to fetch applications")(
            anyhow::anyhow!("disk unplugged"),
        ))
    }

    async fn exploding() -> &'static str {
        panic!("handler blew up")
    }

    fn failing_app(expose: bool) -> TestServer {
        let state = AppState::new(Store::in_memory().unwrap(), IdentityProvider::Development)
            .exposing_errors(expose);
        let app = Router::new()
            .route("/fail", get(failing))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                expose_error_detail,
            ))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn development_500_includes_detail() {
        let res = failing_app(true).get("/fail").await;
        res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            res.json::<Value>(),
            json!({
                "success": false,
                "message": "Failed to fetch applications",
                "error": "disk unplugged"
            })
        );
    }

    #[tokio::test]
    async fn production_500_hides_detail() {
        let res = failing_app(false).get("/fail").await;
        res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            res.json::<Value>(),
            json!({"success": false, "message": "Failed to fetch applications"})
        );
    }

    #[tokio::test]
    async fn panics_become_generic_500() {
        let app = Router::new()
            .route("/boom", get(exploding))
            .layer(CatchPanicLayer::custom(handle_panic));
        let res = TestServer::new(app).unwrap().get("/boom").await;
        res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            res.json::<Value>(),
            json!({"success": false, "message": "Something went wrong!"})
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::Validation(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidStatus.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal("boom")(anyhow::anyhow!("disk")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_carries_detail_extension() {
        let response = ApiError::internal("Failed to fetch applications")(anyhow::anyhow!(
            "lock poisoned"
        ))
        .into_response();
        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.message, "Failed to fetch applications");
        assert_eq!(detail.detail, "lock poisoned");
    }

    #[test]
    fn rate_limit_sets_retry_after() {
        let response = ApiError::TooManyRequests {
            retry_after: Duration::from_secs(42),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}

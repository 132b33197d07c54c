use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::{error::ApiError, identity::VerifyError, AppState};

pub const MISSING_TOKEN: &str = "No authentication token provided";
pub const INVALID_TOKEN: &str = "Invalid or expired authentication token";

/// Extracts `<token>` from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum middleware that rejects the request unless it carries a bearer token
/// the identity provider accepts. The verified [`Identity`](crate::identity::Identity)
/// is placed in the request extensions.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        debug!(path = %request.uri().path(), "auth: missing bearer token");
        return ApiError::Unauthorized(MISSING_TOKEN).into_response();
    };

    match state.identity.verify(token).await {
        Ok(identity) => {
            debug!(uid = %identity.uid, "auth: verified");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            log_rejection(&e);
            ApiError::Unauthorized(INVALID_TOKEN).into_response()
        }
    }
}

/// Like [`require_auth`] but never rejects: a valid token attaches the
/// identity, anything else proceeds anonymously.
pub async fn optional_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match state.identity.verify(token).await {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
            }
            Err(e) => log_rejection(&e),
        }
    }
    next.run(request).await
}

fn log_rejection(e: &VerifyError) {
    match e {
        VerifyError::Rejected(reason) => warn!(%reason, "auth: token rejected"),
        VerifyError::Unavailable(source) => {
            tracing::error!(error = %format!("{source:#}"), "auth: identity provider unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("bearer abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::ApiError,
    extract::ApiJson,
    identity::Identity,
    validate::{validate_new_post, validate_post_changes, BlogPostInput},
    AppState,
};

const NOT_FOUND: &str = "Blog post not found";

// ── Public reads ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct BlogQuery {
    pub category: Option<String>,
    pub limit: Option<String>,
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> Result<Response, ApiError> {
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let limit = match query.limit.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        None => None,
        Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
            ApiError::Validation(vec!["Limit must be a non-negative integer".to_string()])
        })?),
    };

    let posts = state
        .store
        .published_posts(category, limit)
        .map_err(ApiError::internal("Failed to fetch blog posts"))?;
    Ok(Json(json!({
        "success": true,
        "count": posts.len(),
        "data": posts,
    }))
    .into_response())
}

/// Published post by slug. Authenticated callers may also preview drafts.
pub async fn get_post(
    State(state): State<AppState>,
    viewer: Option<Extension<Identity>>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let post = state
        .store
        .post_by_slug(&slug, viewer.is_some())
        .map_err(ApiError::internal("Failed to fetch blog post"))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    Ok(Json(json!({"success": true, "data": post})).into_response())
}

pub async fn categories(State(state): State<AppState>) -> Result<Response, ApiError> {
    let categories = state
        .store
        .categories()
        .map_err(ApiError::internal("Failed to fetch categories"))?;
    Ok(Json(json!({"success": true, "data": categories})).into_response())
}

// ── Admin ─────────────────────────────────────────────────────────────────────

pub async fn all_posts(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
) -> Result<Response, ApiError> {
    let posts = state
        .store
        .all_posts()
        .map_err(ApiError::internal("Failed to fetch blog posts"))?;
    info!(count = posts.len(), by = %admin.uid, "audit: post.list_all");
    Ok(Json(json!({
        "success": true,
        "count": posts.len(),
        "data": posts,
    }))
    .into_response())
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    ApiJson(body): ApiJson<BlogPostInput>,
) -> Result<Response, ApiError> {
    let fields = validate_new_post(body).map_err(ApiError::Validation)?;
    let post = state
        .store
        .create_post(fields)
        .map_err(ApiError::internal("Failed to create blog post"))?;

    info!(id = %post.id, slug = %post.slug, status = %post.status, by = %admin.uid, "audit: post.create");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Blog post created successfully",
            "data": post,
        })),
    )
        .into_response())
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<BlogPostInput>,
) -> Result<Response, ApiError> {
    let changes = validate_post_changes(body).map_err(ApiError::Validation)?;
    let post = state
        .store
        .update_post(&id, changes)
        .map_err(ApiError::internal("Failed to update blog post"))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    info!(id = %id, status = %post.status, by = %admin.uid, "audit: post.update");
    Ok(Json(json!({
        "success": true,
        "message": "Blog post updated successfully",
        "data": post,
    }))
    .into_response())
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let deleted = state
        .store
        .delete_post(&id)
        .map_err(ApiError::internal("Failed to delete blog post"))?;
    if !deleted {
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    info!(id = %id, by = %admin.uid, "audit: post.delete");
    Ok(Json(json!({
        "success": true,
        "message": "Blog post deleted successfully",
    }))
    .into_response())
}

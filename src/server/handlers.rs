use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, AuthUser};
use crate::db::render_sitemap;
use crate::error::DbError;
use crate::models::{Post, PostEdit, User};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Public profile: the user and their published posts.
pub async fn public_user(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<User>, ApiError> {
    let mut user = state.repo.get_user_by_name(&name).await?;
    user.posts = user.published_posts().cloned().collect();
    Ok(Json(user))
}

/// Public post page. Drafts read as missing.
pub async fn public_post(
    State(state): State<AppState>,
    Path((name, slug)): Path<(String, String)>,
) -> Result<Json<Post>, ApiError> {
    let post = state
        .repo
        .get_post_by_username_and_slug(&name, &slug)
        .await?;
    if !post.data.published {
        return Err(DbError::PostNotFound(format!("{}/{}", name, slug)).into());
    }
    Ok(Json(post))
}

pub async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.repo.users_with_published_posts().await?;
    let xml = render_sitemap(&state.base_url, &users);
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}

/// Current user with every post, drafts included.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.repo.get_user(&user.user_id).await?))
}

/// Dashboard listing, most recently edited first.
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.repo.list_posts_by_author(&user.user_id).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.repo.create_post_for_user(&user.user_id).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn edit_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(edit): Json<PostEdit>,
) -> Result<Json<Post>, ApiError> {
    ensure_author(&state, &user, &id).await?;
    Ok(Json(state.repo.edit_post(&id, &edit).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ensure_author(&state, &user, &id).await?;
    state.repo.remove_post_for_user(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Someone else's post reads as missing.
async fn ensure_author(state: &AppState, user: &AuthUser, post_id: &str) -> Result<(), ApiError> {
    let post = state.repo.get_post(post_id).await?;
    if post.data.author != user.user_id {
        return Err(DbError::PostNotFound(post_id.to_string()).into());
    }
    Ok(())
}

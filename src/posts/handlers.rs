use super::models::{MessageResponse, PostListResponse, PostRequest, PostResponse};
use super::services::PostsService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, SharedState};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::warn;

/// Malformed or mistyped bodies are input errors, not axum's default 422
fn parse_body(
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<PostRequest, ApiError> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected post request body");
            Err(ApiError::BadRequest("Invalid request body".to_string()))
        }
    }
}

/// GET /posts
pub async fn list_posts(
    Extension(state): Extension<SharedState>,
    user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let posts = PostsService::new(state.db.clone())
        .list_for_user(&user.id)
        .await?;

    Ok(Json(PostListResponse { posts }))
}

/// GET /posts/:id
pub async fn get_post(
    Extension(state): Extension<SharedState>,
    user: AuthedUser,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = PostsService::new(state.db.clone())
        .get_for_user(&post_id, &user.id)
        .await?;

    Ok(Json(PostResponse { post }))
}

/// POST /posts
pub async fn create_post(
    Extension(state): Extension<SharedState>,
    user: AuthedUser,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_body(payload)?;
    let post = PostsService::new(state.db.clone())
        .create(&user.id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(PostResponse { post })))
}

/// PUT /posts/:id
pub async fn update_post(
    Extension(state): Extension<SharedState>,
    user: AuthedUser,
    Path(post_id): Path<String>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_body(payload)?;
    let post = PostsService::new(state.db.clone())
        .update(&post_id, &user.id, request)
        .await?;

    Ok(Json(PostResponse { post }))
}

/// DELETE /posts/:id
pub async fn delete_post(
    Extension(state): Extension<SharedState>,
    user: AuthedUser,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    PostsService::new(state.db.clone())
        .delete(&post_id, &user.id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Post deleted successfully".to_string(),
    }))
}

//! Post, like, comment and feed endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};

use super::{FormResponse, MultipartForm, form_result};
use crate::AppState;
use crate::api::dto::*;
use crate::api::{comment_to_response, post_detail_to_response, post_to_response};
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::AppError;

/// POST /api/v1/posts
///
/// Multipart form with `caption`, `body` and an optional `image` file.
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Json<FormResponse<PostResponse>>, AppError> {
    let mut form = MultipartForm::read(multipart, "image").await?;
    let image = form.image.take();

    let result = state
        .posts
        .create_post(&user, form.text("caption"), form.text("body"), image)
        .await
        .map(|post| post_to_response(&post, &state.storage));

    form_result(result)
}

/// GET /api/v1/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<PostDetailResponse>, AppError> {
    let detail = state
        .posts
        .get_post(&id, viewer.as_ref().map(|user| user.id.as_str()))
        .await?;

    Ok(Json(post_detail_to_response(&detail, &state.storage)))
}

/// PATCH /api/v1/posts/:id
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let post = state
        .posts
        .update_post(
            &user.id,
            &id,
            request.caption.as_deref(),
            request.body.as_deref(),
        )
        .await?;

    Ok(Json(post_to_response(&post, &state.storage)))
}

/// DELETE /api/v1/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.posts.delete_post(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/posts/:id/like
pub async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LikeResponse>, AppError> {
    let like = state.posts.toggle_like(&user.id, &id).await?;
    Ok(Json(LikeResponse {
        liked: like.liked,
        like_count: like.like_count,
    }))
}

/// GET /api/v1/posts/:id/comments
pub async fn comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let comments = state.posts.comments(&id).await?;
    Ok(Json(comments.iter().map(comment_to_response).collect()))
}

/// POST /api/v1/posts/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<FormResponse<CommentResponse>>, AppError> {
    let result = state
        .posts
        .add_comment(&user, &id, &request.content)
        .await
        .map(|comment| comment_to_response(&comment));

    form_result(result)
}

/// GET /api/v1/feed
pub async fn feed(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let posts = state
        .posts
        .feed(&user.id, params.limit, params.max_id.as_deref())
        .await?;

    Ok(Json(
        posts
            .iter()
            .map(|post| post_to_response(post, &state.storage))
            .collect(),
    ))
}

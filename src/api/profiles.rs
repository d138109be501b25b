//! Profile and follow-graph endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};

use super::{FormResponse, MultipartForm, form_result};
use crate::AppState;
use crate::api::dto::*;
use crate::api::{profile_to_response, profile_view_to_response};
use crate::auth::{CurrentUser, MaybeUser};
use crate::data::ProfileSummary;
use crate::error::AppError;
use crate::service::ProfileUpdate;

/// Look up a profile by handle, 404 if unknown
pub(crate) async fn resolve_profile(state: &AppState, username: &str) -> Result<ProfileSummary, AppError> {
    state
        .db
        .get_profile_summary_by_username(username)
        .await?
        .ok_or(AppError::NotFound)
}

/// GET /api/v1/profiles/:username
pub async fn get_profile(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileViewResponse>, AppError> {
    let view = state
        .accounts
        .profile_view(&username, viewer.as_ref().map(|user| user.id.as_str()))
        .await?;

    Ok(Json(profile_view_to_response(&view, &state.storage)))
}

/// GET /api/v1/profiles/:username/followers
pub async fn followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<ProfileResponse>>, AppError> {
    let profile = resolve_profile(&state, &username).await?;
    let followers = state.follows.followers(&profile.user_id).await?;

    Ok(Json(
        followers
            .iter()
            .map(|follower| profile_to_response(follower, &state.storage))
            .collect(),
    ))
}

/// GET /api/v1/profiles/:username/following
pub async fn following(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<ProfileResponse>>, AppError> {
    let profile = resolve_profile(&state, &username).await?;
    let following = state.follows.following(&profile.user_id).await?;

    Ok(Json(
        following
            .iter()
            .map(|followee| profile_to_response(followee, &state.storage))
            .collect(),
    ))
}

/// POST /api/v1/profiles/:username/follow
///
/// Toggles the follow edge. A self-follow is reported as a form error.
pub async fn toggle_follow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<FormResponse<FollowResponse>>, AppError> {
    let target = resolve_profile(&state, &username).await?;

    let result: Result<FollowResponse, AppError> = async {
        let following = state.follows.toggle_follow(&user.id, &target.user_id).await?;
        let followers_count = state.follows.followers_count(&target.user_id).await?;
        Ok(FollowResponse {
            following,
            followers_count,
        })
    }
    .await;

    form_result(result)
}

/// GET /api/v1/profile
pub async fn own_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProfileViewResponse>, AppError> {
    let view = state.accounts.own_profile_view(&user.id).await?;
    Ok(Json(profile_view_to_response(&view, &state.storage)))
}

/// PATCH /api/v1/profile
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<FormResponse<ProfileViewResponse>>, AppError> {
    let update = ProfileUpdate {
        bio: request.bio,
        username: request.username,
        email: request.email,
    };

    let result = state
        .accounts
        .update_profile(&user, update)
        .await
        .map(|view| profile_view_to_response(&view, &state.storage));

    form_result(result)
}

/// DELETE /api/v1/profile
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.accounts.delete_account(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/profile/avatar
///
/// Multipart form with an `avatar` file field.
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    let form = MultipartForm::read(multipart, "avatar").await?;
    let image = form
        .image
        .ok_or_else(|| AppError::Validation("Choose an image to upload".to_string()))?;

    let avatar_url = state.accounts.update_avatar(&user, image).await?;
    Ok(Json(AvatarResponse { avatar_url }))
}

/// DELETE /api/v1/profile/avatar
pub async fn remove_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.accounts.remove_avatar(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

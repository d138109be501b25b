//! Direct message endpoints

use axum::{
    extract::{Multipart, Path, State},
    response::Json,
};

use super::profiles::resolve_profile;
use super::{FormResponse, MultipartForm};
use crate::AppState;
use crate::api::dto::*;
use crate::api::{conversation_to_response, thread_to_response};
use crate::auth::CurrentUser;
use crate::error::AppError;

/// GET /api/v1/messages
pub async fn inbox(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ConversationResponse>>, AppError> {
    let conversations = state.messages.inbox(&user.id).await?;

    Ok(Json(
        conversations
            .iter()
            .map(|conversation| conversation_to_response(conversation, &state.storage))
            .collect(),
    ))
}

/// GET /api/v1/messages/unread_count
pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let unread_count = state.messages.unread_count(&user.id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

/// GET /api/v1/messages/:username
///
/// Opening a thread marks the counterpart's messages read.
pub async fn view_thread(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ThreadResponse>, AppError> {
    let counterpart = resolve_profile(&state, &username).await?;
    let messages = state
        .messages
        .view_thread(&user.id, &counterpart.user_id)
        .await?;

    Ok(Json(thread_to_response(
        &counterpart,
        &messages,
        &state.storage,
    )))
}

/// POST /api/v1/messages/:username
///
/// Multipart form with `content` and an optional `image` file. Responds
/// with the re-loaded thread; a validation failure is a form error.
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
    multipart: Multipart,
) -> Result<Json<FormResponse<ThreadResponse>>, AppError> {
    let counterpart = resolve_profile(&state, &username).await?;
    let mut form = MultipartForm::read(multipart, "image").await?;
    let image = form.image.take();

    let outcome = state
        .messages
        .send_and_view(&user, &counterpart.user_id, form.text("content"), image)
        .await?;

    Ok(Json(FormResponse {
        ok: outcome.error.is_none(),
        error: outcome.error,
        data: Some(thread_to_response(
            &counterpart,
            &outcome.thread,
            &state.storage,
        )),
    }))
}

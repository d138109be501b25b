//! API layer
//!
//! JSON HTTP handlers for:
//! - Profiles and the follow graph
//! - Posts, likes, comments and the feed
//! - Direct messages
//! - Metrics (Prometheus)

mod converters;
mod dto;
pub mod messages;
pub mod metrics;
pub mod posts;
pub mod profiles;

pub use converters::*;
pub use dto::*;

pub use metrics::{metrics_router, track_http_metrics};

use axum::{
    Json, Router,
    extract::Multipart,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::AppState;
use crate::error::AppError;
use crate::service::ImageUpload;

/// Create the `/api/v1` router
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Profiles & follow graph
        .route(
            "/v1/profile",
            get(profiles::own_profile)
                .patch(profiles::update_profile)
                .delete(profiles::delete_account),
        )
        .route(
            "/v1/profile/avatar",
            post(profiles::upload_avatar).delete(profiles::remove_avatar),
        )
        .route("/v1/profiles/:username", get(profiles::get_profile))
        .route("/v1/profiles/:username/followers", get(profiles::followers))
        .route("/v1/profiles/:username/following", get(profiles::following))
        .route("/v1/profiles/:username/follow", post(profiles::toggle_follow))
        // Posts
        .route("/v1/feed", get(posts::feed))
        .route("/v1/posts", post(posts::create_post))
        .route(
            "/v1/posts/:id",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/v1/posts/:id/like", post(posts::toggle_like))
        .route(
            "/v1/posts/:id/comments",
            get(posts::comments).post(posts::add_comment),
        )
        // Messages
        .route("/v1/messages", get(messages::inbox))
        .route("/v1/messages/unread_count", get(messages::unread_count))
        .route(
            "/v1/messages/:username",
            get(messages::view_thread).post(messages::send_message),
        )
}

/// Body of form-style endpoints
///
/// Validation failures are user-visible form errors, so they come back
/// with a 200 and `ok: false` instead of an error status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> FormResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
            data: None,
        }
    }
}

/// Turn a `Validation` error into a form error; other errors propagate
pub fn form_result<T>(result: Result<T, AppError>) -> Result<Json<FormResponse<T>>, AppError> {
    match result {
        Ok(data) => Ok(Json(FormResponse::success(data))),
        Err(AppError::Validation(message)) => Ok(Json(FormResponse::failure(message))),
        Err(error) => Err(error),
    }
}

/// Text fields and an optional image from a multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl MultipartForm {
    /// Read every field; the file field named `image_field` becomes the image
    ///
    /// An empty file part (no file chosen) counts as no image.
    pub async fn read(mut multipart: Multipart, image_field: &str) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == image_field {
                let content_type = field
                    .content_type()
                    .map(ToOwned::to_owned)
                    .unwrap_or_default();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?;
                if !data.is_empty() {
                    form.image = Some(ImageUpload {
                        data: data.to_vec(),
                        content_type,
                    });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {}", e)))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

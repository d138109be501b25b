//! Account service
//!
//! Handles identity and profile operations: signup, login,
//! profile views and edits, avatars and account deletion.

use std::sync::Arc;

use super::{ImageUpload, non_blank};
use crate::auth::{hash_password, verify_password};
use crate::data::{Database, EntityId, PostRecord, ProfileSummary, User};
use crate::error::AppError;
use crate::storage::MediaStorage;

const MAX_USERNAME_CHARS: usize = 30;
const MIN_PASSWORD_CHARS: usize = 8;
const PROFILE_POSTS_LIMIT: usize = 40;

fn validate_username(username: &str) -> Result<(), AppError> {
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    let len = username.chars().count();
    if len == 0 || len > MAX_USERNAME_CHARS || !valid_chars {
        return Err(AppError::Validation(format!(
            "Username must be 1-{} characters of letters, digits, '_' or '.'",
            MAX_USERNAME_CHARS
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation("Enter a valid email address".to_string())),
    }
}

/// Trim and sanitize a bio; an empty bio clears it
fn sanitize_bio(bio: &str) -> Option<String> {
    non_blank(bio).map(ammonia::clean)
}

/// Profile page data
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub profile: ProfileSummary,
    pub followers_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    /// Newest first
    pub posts: Vec<PostRecord>,
    /// Whether the viewer follows this profile; `None` when anonymous or
    /// viewing oneself
    pub is_following: Option<bool>,
}

/// Profile edit; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    /// Register a new identity with an empty profile
    ///
    /// # Errors
    /// - `Validation` for a malformed handle, email or short password
    /// - `Conflict` if the handle is taken
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<User, AppError> {
        let username = username.trim();
        let email = email.trim();
        validate_username(username)?;
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        let user = User {
            id: EntityId::new().0,
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            created_at: chrono::Utc::now(),
        };
        self.db.create_user_with_profile(&user).await?;

        crate::metrics::SIGNUPS_TOTAL.inc();
        tracing::info!(user_id = %user.id, username = %user.username, "Identity created");

        Ok(user)
    }

    /// Check a handle/password pair
    ///
    /// # Errors
    /// `Unauthorized` for an unknown handle or a wrong password
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .db
            .get_user_by_username(username.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password = password.to_string();
        let stored_hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        if !valid {
            tracing::info!(username = %user.username, "Rejected login");
            return Err(AppError::Unauthorized);
        }
        Ok(user)
    }

    /// Profile page for a handle
    pub async fn profile_view(&self, username: &str, viewer_id: Option<&str>) -> Result<ProfileView, AppError> {
        let profile = self
            .db
            .get_profile_summary_by_username(username)
            .await?
            .ok_or(AppError::NotFound)?;
        self.build_profile_view(profile, viewer_id).await
    }

    /// Profile page for an identity ID
    pub async fn own_profile_view(&self, user_id: &str) -> Result<ProfileView, AppError> {
        let profile = self
            .db
            .get_profile_summaries(&[user_id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::NotFound)?;
        self.build_profile_view(profile, Some(user_id)).await
    }

    async fn build_profile_view(
        &self,
        profile: ProfileSummary,
        viewer_id: Option<&str>,
    ) -> Result<ProfileView, AppError> {
        let user_id = profile.user_id.as_str();
        let is_following = match viewer_id {
            Some(viewer_id) if viewer_id != user_id => {
                Some(self.db.is_following(viewer_id, user_id).await?)
            }
            _ => None,
        };

        Ok(ProfileView {
            followers_count: self.db.count_followers(user_id).await?,
            following_count: self.db.count_following(user_id).await?,
            post_count: self.db.count_posts_by_author(user_id).await?,
            posts: self
                .db
                .get_posts_by_author(user_id, PROFILE_POSTS_LIMIT, None)
                .await?,
            is_following,
            profile,
        })
    }

    /// Edit bio, handle and/or email
    ///
    /// # Errors
    /// - `Validation` for a malformed handle or email
    /// - `Conflict` if the new handle is taken
    pub async fn update_profile(&self, caller: &User, update: ProfileUpdate) -> Result<ProfileView, AppError> {
        let username = update.username.as_deref().map(str::trim);
        if let Some(username) = username {
            validate_username(username)?;
        }
        let email = update.email.as_deref().map(str::trim);
        if let Some(email) = email {
            validate_email(email)?;
        }
        let bio = update.bio.as_deref().map(sanitize_bio);

        let updated = self
            .db
            .update_profile_fields(
                &caller.id,
                bio.as_ref().map(|bio| bio.as_deref()),
                username,
                email,
                chrono::Utc::now(),
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        tracing::info!(user_id = %caller.id, "Profile updated");
        self.own_profile_view(&caller.id).await
    }

    /// Replace the avatar
    ///
    /// The new blob is stored before the database changes; the previous
    /// blob is removed best-effort afterwards.
    ///
    /// # Returns
    /// Public URL of the new avatar
    pub async fn update_avatar(&self, caller: &User, image: ImageUpload) -> Result<String, AppError> {
        let profile = self
            .db
            .get_profile(&caller.id)
            .await?
            .ok_or(AppError::NotFound)?;
        let previous_key = profile.avatar_key;

        let stored = self
            .storage
            .upload_image("avatars", image.data, &image.content_type)
            .await?;

        let updated = match self
            .db
            .update_avatar_key_if_matches(
                &caller.id,
                previous_key.as_deref(),
                Some(&stored.key),
                chrono::Utc::now(),
            )
            .await
        {
            Ok(updated) => updated,
            Err(error) => {
                self.storage.delete_best_effort(&stored.key).await;
                return Err(error);
            }
        };
        if !updated {
            self.storage.delete_best_effort(&stored.key).await;
            return Err(AppError::Conflict(
                "avatar changed concurrently; retry".to_string(),
            ));
        }

        if let Some(old_key) = previous_key.as_deref() {
            self.storage.delete_best_effort(old_key).await;
        }

        tracing::info!(user_id = %caller.id, key = %stored.key, "Avatar updated");
        Ok(stored.url)
    }

    /// Clear the avatar, then remove its blob best-effort
    pub async fn remove_avatar(&self, caller: &User) -> Result<(), AppError> {
        let profile = self
            .db
            .get_profile(&caller.id)
            .await?
            .ok_or(AppError::NotFound)?;
        let Some(previous_key) = profile.avatar_key else {
            return Ok(());
        };

        let cleared = self
            .db
            .update_avatar_key_if_matches(&caller.id, Some(&previous_key), None, chrono::Utc::now())
            .await?;
        if cleared {
            self.storage.delete_best_effort(&previous_key).await;
            tracing::info!(user_id = %caller.id, "Avatar removed");
        }
        Ok(())
    }

    /// Delete the identity and everything it owns
    ///
    /// Rows cascade in the database; blobs are removed best-effort after.
    pub async fn delete_account(&self, caller: &User) -> Result<(), AppError> {
        let blob_keys = self.db.get_owned_blob_keys(&caller.id).await?;
        if !self.db.delete_user(&caller.id).await? {
            return Err(AppError::NotFound);
        }

        for key in &blob_keys {
            self.storage.delete_best_effort(key).await;
        }

        tracing::info!(
            user_id = %caller.id,
            username = %caller.username,
            blobs = blob_keys.len(),
            "Identity deleted"
        );
        Ok(())
    }
}

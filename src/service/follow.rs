//! Follow graph service
//!
//! The graph is the single `follows(follower -> followee)` relation;
//! followers and following are both queries over it.

use std::sync::Arc;

use crate::data::{Database, ProfileSummary};
use crate::error::AppError;

/// Message shown when an identity tries to follow itself
pub const SELF_FOLLOW_MESSAGE: &str = "You cannot follow yourself";

/// Follow graph service
pub struct FollowService {
    db: Arc<Database>,
}

impl FollowService {
    /// Create new follow service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn check_target(&self, follower_id: &str, followee_id: &str) -> Result<(), AppError> {
        if follower_id == followee_id {
            return Err(AppError::Validation(SELF_FOLLOW_MESSAGE.to_string()));
        }
        if self.db.get_user(followee_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Add the follower -> followee edge
    ///
    /// Idempotent.
    ///
    /// # Returns
    /// `true` if the edge was created by this call
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        self.check_target(follower_id, followee_id).await?;
        let created = self
            .db
            .insert_follow(follower_id, followee_id, chrono::Utc::now())
            .await?;

        if created {
            tracing::info!(%follower_id, %followee_id, "Followed");
        }
        Ok(created)
    }

    /// Remove the follower -> followee edge if present
    ///
    /// # Returns
    /// `true` if an edge was removed
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        let removed = self.db.delete_follow(follower_id, followee_id).await?;

        if removed {
            tracing::info!(%follower_id, %followee_id, "Unfollowed");
        }
        Ok(removed)
    }

    /// Flip the follower -> followee edge atomically
    ///
    /// # Returns
    /// `true` if the follower follows the followee after the call
    ///
    /// # Errors
    /// - `Validation` for a self-follow (edge set unchanged)
    /// - `NotFound` if the followee does not exist
    pub async fn toggle_follow(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        self.check_target(follower_id, followee_id).await?;
        let following = self
            .db
            .toggle_follow(follower_id, followee_id, chrono::Utc::now())
            .await?;

        let result = if following { "followed" } else { "unfollowed" };
        crate::metrics::FOLLOW_TOGGLES_TOTAL
            .with_label_values(&[result])
            .inc();
        tracing::info!(%follower_id, %followee_id, result, "Toggled follow");

        Ok(following)
    }

    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        self.db.is_following(follower_id, followee_id).await
    }

    pub async fn followers_count(&self, user_id: &str) -> Result<i64, AppError> {
        self.db.count_followers(user_id).await
    }

    pub async fn following_count(&self, user_id: &str) -> Result<i64, AppError> {
        self.db.count_following(user_id).await
    }

    /// Identities following `user_id`, newest edge first
    pub async fn followers(&self, user_id: &str) -> Result<Vec<ProfileSummary>, AppError> {
        self.db.get_followers(user_id).await
    }

    /// Identities `user_id` follows, newest edge first
    pub async fn following(&self, user_id: &str) -> Result<Vec<ProfileSummary>, AppError> {
        self.db.get_following(user_id).await
    }
}

//! Post service
//!
//! Handles posts, likes, comments and the home feed.

use std::sync::Arc;

use super::{ImageUpload, non_blank};
use crate::data::{Comment, Database, EntityId, Post, PostRecord, User};
use crate::error::AppError;
use crate::storage::MediaStorage;

const MAX_CAPTION_CHARS: usize = 255;
pub const FEED_DEFAULT_LIMIT: usize = 20;
pub const FEED_MAX_LIMIT: usize = 40;

fn validate_caption(caption: &str) -> Result<&str, AppError> {
    let caption = non_blank(caption)
        .ok_or_else(|| AppError::Validation("Caption cannot be empty".to_string()))?;
    if caption.chars().count() > MAX_CAPTION_CHARS {
        return Err(AppError::Validation(format!(
            "Caption cannot exceed {} characters",
            MAX_CAPTION_CHARS
        )));
    }
    Ok(caption)
}

fn sanitize_body(body: &str) -> String {
    ammonia::clean(body.trim())
}

/// A post with its comments
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    /// Oldest first
    pub comments: Vec<Comment>,
    /// `None` for anonymous viewers
    pub liked_by_viewer: Option<bool>,
}

/// Like state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

/// Post service
pub struct PostService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    /// Publish a post
    ///
    /// The image, if any, is stored before the row is written.
    ///
    /// # Errors
    /// - `Validation` for a blank or overlong caption, or a bad image
    /// - `Storage` if the image could not be stored
    pub async fn create_post(
        &self,
        author: &User,
        caption: &str,
        body: &str,
        image: Option<ImageUpload>,
    ) -> Result<PostRecord, AppError> {
        let caption = validate_caption(caption)?;
        let body = sanitize_body(body);

        let image_key = match image {
            Some(upload) => Some(
                self.storage
                    .upload_image("posts", upload.data, &upload.content_type)
                    .await?
                    .key,
            ),
            None => None,
        };

        let post = Post {
            id: EntityId::new().0,
            author_id: author.id.clone(),
            caption: caption.to_string(),
            body,
            image_key,
            created_at: chrono::Utc::now(),
        };

        if let Err(error) = self.db.insert_post(&post).await {
            if let Some(key) = post.image_key.as_deref() {
                self.storage.delete_best_effort(key).await;
            }
            return Err(error);
        }

        tracing::info!(post_id = %post.id, author_id = %author.id, "Post created");
        self.db.get_post(&post.id).await?.ok_or(AppError::NotFound)
    }

    /// A post with comments and the viewer's like state
    pub async fn get_post(&self, id: &str, viewer_id: Option<&str>) -> Result<PostDetail, AppError> {
        let post = self.db.get_post(id).await?.ok_or(AppError::NotFound)?;
        let comments = self.db.get_comments(id).await?;
        let liked_by_viewer = match viewer_id {
            Some(viewer_id) => Some(self.db.is_liked(id, viewer_id).await?),
            None => None,
        };

        Ok(PostDetail {
            post,
            comments,
            liked_by_viewer,
        })
    }

    async fn owned_post(&self, caller_id: &str, id: &str) -> Result<PostRecord, AppError> {
        let post = self.db.get_post(id).await?.ok_or(AppError::NotFound)?;
        if post.author_id != caller_id {
            return Err(AppError::Forbidden);
        }
        Ok(post)
    }

    /// Edit caption and/or body; author only
    pub async fn update_post(
        &self,
        caller_id: &str,
        id: &str,
        caption: Option<&str>,
        body: Option<&str>,
    ) -> Result<PostRecord, AppError> {
        self.owned_post(caller_id, id).await?;
        let caption = caption.map(validate_caption).transpose()?;
        let body = body.map(sanitize_body);

        if !self.db.update_post(id, caption, body.as_deref()).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!(post_id = %id, "Post updated");
        self.db.get_post(id).await?.ok_or(AppError::NotFound)
    }

    /// Delete a post; author only
    ///
    /// The row goes first, then the image blob best-effort.
    pub async fn delete_post(&self, caller_id: &str, id: &str) -> Result<(), AppError> {
        let post = self.owned_post(caller_id, id).await?;
        if !self.db.delete_post(id).await? {
            return Err(AppError::NotFound);
        }

        if let Some(key) = post.image_key.as_deref() {
            self.storage.delete_best_effort(key).await;
        }

        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    /// Flip the caller's like atomically
    pub async fn toggle_like(&self, caller_id: &str, post_id: &str) -> Result<LikeState, AppError> {
        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let liked = self
            .db
            .toggle_like(post_id, caller_id, chrono::Utc::now())
            .await?;
        let like_count = self.db.count_likes(post_id).await?;

        let result = if liked { "liked" } else { "unliked" };
        crate::metrics::LIKE_TOGGLES_TOTAL
            .with_label_values(&[result])
            .inc();

        Ok(LikeState { liked, like_count })
    }

    /// Comment on a post
    ///
    /// # Errors
    /// - `Validation` for blank content
    /// - `NotFound` for an unknown post
    pub async fn add_comment(&self, caller: &User, post_id: &str, content: &str) -> Result<Comment, AppError> {
        let content = non_blank(content)
            .ok_or_else(|| AppError::Validation("Comment cannot be empty".to_string()))?;
        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let comment = Comment {
            id: EntityId::new().0,
            post_id: post_id.to_string(),
            author_id: caller.id.clone(),
            author_username: caller.username.clone(),
            content: ammonia::clean(content),
            created_at: chrono::Utc::now(),
        };
        self.db.insert_comment(&comment).await?;

        tracing::debug!(comment_id = %comment.id, %post_id, "Comment added");
        Ok(comment)
    }

    /// Comments on a post, oldest first
    pub async fn comments(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        self.db.get_comments(post_id).await
    }

    /// Posts by the viewer and everyone the viewer follows, newest first
    ///
    /// # Arguments
    /// * `limit` - Page size, default 20, capped at 40
    /// * `max_id` - Only return posts older than this post
    pub async fn feed(
        &self,
        viewer_id: &str,
        limit: Option<usize>,
        max_id: Option<&str>,
    ) -> Result<Vec<PostRecord>, AppError> {
        let limit = limit.unwrap_or(FEED_DEFAULT_LIMIT).clamp(1, FEED_MAX_LIMIT);
        self.db.get_feed(viewer_id, limit, max_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::{create_test_db, create_user, local_storage, storage_with};
    use crate::storage::MockBlobStore;

    fn jpeg() -> ImageUpload {
        ImageUpload {
            data: vec![0xff, 0xd8, 0xff],
            content_type: "image/jpeg".to_string(),
        }
    }

    #[tokio::test]
    async fn create_post_validates_caption_and_sanitizes_body() {
        let (db, temp_dir) = create_test_db().await;
        let alice = create_user(&db, "alice").await;
        let service = PostService::new(db, local_storage(&temp_dir));

        let blank = service.create_post(&alice, "  ", "", None).await.unwrap_err();
        assert!(matches!(blank, AppError::Validation(_)));
        let long = service
            .create_post(&alice, &"c".repeat(256), "", None)
            .await
            .unwrap_err();
        assert!(matches!(long, AppError::Validation(_)));

        let post = service
            .create_post(&alice, " sunset ", "<b>warm</b><script>x</script>", None)
            .await
            .unwrap();
        assert_eq!(post.caption, "sunset");
        assert_eq!(post.body, "<b>warm</b>");
        assert_eq!(post.author_username, "alice");
        assert_eq!(post.like_count, 0);
    }

    #[tokio::test]
    async fn only_author_can_edit_or_delete() {
        let (db, temp_dir) = create_test_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let service = PostService::new(db.clone(), local_storage(&temp_dir));
        let post = service.create_post(&alice, "mine", "", None).await.unwrap();

        let error = service
            .update_post(&bob.id, &post.id, Some("stolen"), None)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Forbidden));
        let error = service.delete_post(&bob.id, &post.id).await.unwrap_err();
        assert!(matches!(error, AppError::Forbidden));

        let error = service.delete_post(&alice.id, "missing").await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));

        let updated = service
            .update_post(&alice.id, &post.id, None, Some("more"))
            .await
            .unwrap();
        assert_eq!(updated.caption, "mine");
        assert_eq!(updated.body, "more");

        service.delete_post(&alice.id, &post.id).await.unwrap();
        assert!(db.get_post(&post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn like_toggles_pairwise() {
        let (db, temp_dir) = create_test_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let service = PostService::new(db, local_storage(&temp_dir));
        let post = service.create_post(&alice, "like me", "", None).await.unwrap();

        let liked = service.toggle_like(&bob.id, &post.id).await.unwrap();
        assert_eq!(liked, LikeState { liked: true, like_count: 1 });

        let detail = service.get_post(&post.id, Some(&bob.id)).await.unwrap();
        assert_eq!(detail.liked_by_viewer, Some(true));
        assert_eq!(detail.post.like_count, 1);

        let unliked = service.toggle_like(&bob.id, &post.id).await.unwrap();
        assert_eq!(unliked, LikeState { liked: false, like_count: 0 });

        let missing = service.toggle_like(&bob.id, "missing").await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound));
    }

    #[tokio::test]
    async fn comments_are_validated_and_ordered() {
        let (db, temp_dir) = create_test_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let service = PostService::new(db, local_storage(&temp_dir));
        let post = service.create_post(&alice, "talk", "", None).await.unwrap();

        let blank = service.add_comment(&bob, &post.id, " ").await.unwrap_err();
        assert!(matches!(blank, AppError::Validation(_)));
        let missing = service.add_comment(&bob, "missing", "hi").await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound));

        service.add_comment(&bob, &post.id, "first").await.unwrap();
        service.add_comment(&alice, &post.id, "second").await.unwrap();

        let comments = service.comments(&post.id).await.unwrap();
        let contents: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(comments[0].author_username, "bob");
    }

    #[tokio::test]
    async fn feed_includes_self_and_followed_authors() {
        let (db, temp_dir) = create_test_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let carol = create_user(&db, "carol").await;
        db.insert_follow(&alice.id, &bob.id, chrono::Utc::now()).await.unwrap();
        let service = PostService::new(db, local_storage(&temp_dir));

        service.create_post(&alice, "a1", "", None).await.unwrap();
        service.create_post(&bob, "b1", "", None).await.unwrap();
        service.create_post(&carol, "c1", "", None).await.unwrap();
        let newest = service.create_post(&bob, "b2", "", None).await.unwrap();

        let feed = service.feed(&alice.id, None, None).await.unwrap();
        let captions: Vec<_> = feed.iter().map(|p| p.caption.as_str()).collect();
        assert_eq!(captions, vec!["b2", "b1", "a1"]);

        let page = service.feed(&alice.id, Some(1), Some(&newest.id)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].caption, "b1");
    }

    #[tokio::test]
    async fn image_is_stored_before_row_and_removed_after_delete() {
        let (db, temp_dir) = create_test_db().await;
        let alice = create_user(&db, "alice").await;
        let service = PostService::new(db, local_storage(&temp_dir));

        let post = service
            .create_post(&alice, "photo", "", Some(jpeg()))
            .await
            .unwrap();
        let key = post.image_key.clone().unwrap();
        assert!(key.starts_with("posts/"));
        let path = temp_dir.path().join("media").join(&key);
        assert!(path.exists());

        service.delete_post(&alice.id, &post.id).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_image_store_creates_no_post() {
        let (db, _temp_dir) = create_test_db().await;
        let alice = create_user(&db, "alice").await;

        let mut backend = MockBlobStore::new();
        backend
            .expect_store()
            .returning(|_, _, _| Err(AppError::Storage("unreachable".to_string())));
        let service = PostService::new(db.clone(), storage_with(Arc::new(backend)));

        let error = service
            .create_post(&alice, "photo", "", Some(jpeg()))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Storage(_)));
        assert_eq!(db.count_posts_by_author(&alice.id).await.unwrap(), 0);
    }
}

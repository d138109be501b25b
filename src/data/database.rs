//! SQLite database operations
//!
//! All database access goes through this module.
//! Check-then-write operations run inside `BEGIN IMMEDIATE` so that two
//! concurrent toggles on the same edge cannot both observe the old state.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use std::path::Path;
use std::time::Duration;

use super::models::*;
use crate::error::AppError;

const PROFILE_SUMMARY_SELECT: &str = r#"
    SELECT u.id AS user_id, u.username, p.bio, p.avatar_key, u.created_at
    FROM users u
    JOIN profiles p ON p.user_id = u.id
"#;

const POST_RECORD_SELECT: &str = r#"
    SELECT
        p.id, p.author_id, u.username AS author_username,
        p.caption, p.body, p.image_key, p.created_at,
        (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

const MESSAGE_SELECT: &str = r#"
    SELECT rowid AS seq, id, sender_id, receiver_id, content, image_key, is_read, created_at
    FROM messages
"#;

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`
fn map_unique_violation(error: sqlx::Error, message: &str) -> AppError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(error),
    }
}

/// Pooled connection inside a `BEGIN IMMEDIATE` transaction
///
/// If dropped before `commit` (an error, or the request future was
/// cancelled), the transaction is rolled back on a background task before
/// the connection rejoins the pool. Without a runtime the connection is
/// closed instead.
pub(crate) struct ImmediateTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl ImmediateTx {
    pub(crate) async fn begin(pool: &Pool<Sqlite>) -> Result<Self, AppError> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    pub(crate) fn conn(&mut self) -> Result<&mut SqliteConnection, AppError> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("transaction already finished")))
    }

    pub(crate) async fn commit(mut self) -> Result<(), AppError> {
        sqlx::query("COMMIT").execute(self.conn()?).await?;
        self.conn = None;
        Ok(())
    }
}

impl Drop for ImmediateTx {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(error) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                        tracing::warn!(%error, "Rollback of abandoned transaction failed; closing connection");
                        drop(conn.detach());
                    }
                });
            }
            Err(_) => drop(conn.detach()),
        }
    }
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Identities & profiles
    // =========================================================================

    /// Insert an identity together with its empty profile.
    ///
    /// Both rows are written in one transaction: an identity never exists
    /// without its profile.
    ///
    /// # Errors
    /// `Conflict` if the username is already taken
    pub async fn create_user_with_profile(&self, user: &User) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "username is already taken"))?;

        sqlx::query("INSERT INTO profiles (user_id, bio, avatar_key, updated_at) VALUES (?, NULL, NULL, ?)")
            .bind(&user.id)
            .bind(user.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Get identity by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get identity by handle (case-insensitive)
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get the raw profile row of an identity
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Get identity + profile by handle
    pub async fn get_profile_summary_by_username(
        &self,
        username: &str,
    ) -> Result<Option<ProfileSummary>, AppError> {
        let sql = format!("{PROFILE_SUMMARY_SELECT} WHERE u.username = ?");
        let summary = sqlx::query_as::<_, ProfileSummary>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(summary)
    }

    /// Get identity + profile for a batch of identity IDs
    pub async fn get_profile_summaries(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<ProfileSummary>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new(PROFILE_SUMMARY_SELECT);
        query_builder.push(" WHERE u.id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for id in user_ids {
                separated.push_bind(id);
            }
        }
        query_builder.push(")");

        let summaries = query_builder
            .build_query_as::<ProfileSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(summaries)
    }

    /// Patch identity/profile fields.
    ///
    /// Use `None` for omitted fields (no change), and `Some(None)` to clear the bio.
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching identity exists.
    pub async fn update_profile_fields(
        &self,
        user_id: &str,
        bio: Option<Option<&str>>,
        username: Option<&str>,
        email: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE profiles SET updated_at = ? WHERE user_id = ?")
            .bind(updated_at)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(bio) = bio {
            sqlx::query("UPDATE profiles SET bio = ? WHERE user_id = ?")
                .bind(bio)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(username) = username {
            sqlx::query("UPDATE users SET username = ? WHERE id = ?")
                .bind(username)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_unique_violation(e, "username is already taken"))?;
        }

        if let Some(email) = email {
            sqlx::query("UPDATE users SET email = ? WHERE id = ?")
                .bind(email)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Swap the avatar key if it still holds the expected value.
    ///
    /// # Returns
    /// `true` if updated, `false` if the key changed concurrently or the
    /// profile does not exist.
    pub async fn update_avatar_key_if_matches(
        &self,
        user_id: &str,
        expected_current_key: Option<&str>,
        avatar_key: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET avatar_key = ?, updated_at = ?
            WHERE user_id = ? AND avatar_key IS ?
            "#,
        )
        .bind(avatar_key)
        .bind(updated_at)
        .bind(user_id)
        .bind(expected_current_key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Every blob key referenced by rows that go away with the identity
    ///
    /// Includes images on messages the identity received: the cascade on
    /// `receiver_id` removes those rows too.
    pub async fn get_owned_blob_keys(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT avatar_key FROM profiles WHERE user_id = ? AND avatar_key IS NOT NULL
            UNION ALL
            SELECT image_key FROM posts WHERE author_id = ? AND image_key IS NOT NULL
            UNION ALL
            SELECT image_key FROM messages
            WHERE (sender_id = ? OR receiver_id = ?) AND image_key IS NOT NULL
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    /// Delete an identity; owned rows go with it through `ON DELETE CASCADE`
    pub async fn delete_user(&self, user_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    /// Insert follower → followee edge
    ///
    /// # Returns
    /// `true` if the edge was created, `false` if it already existed
    pub async fn insert_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete follower → followee edge
    ///
    /// # Returns
    /// `true` if an edge was removed
    pub async fn delete_follow(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip the follower → followee edge.
    ///
    /// Uses an IMMEDIATE transaction so the existence check and the write are atomic.
    ///
    /// # Returns
    /// `true` if the edge exists after the call
    pub async fn toggle_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tx = ImmediateTx::begin(&self.pool).await?;

        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(tx.conn()?)
            .await?;
        if removed.rows_affected() > 0 {
            tx.commit().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)")
            .bind(follower_id)
            .bind(followee_id)
            .bind(created_at)
            .execute(tx.conn()?)
            .await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Check whether `follower_id` follows `followee_id`
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followee_id = ?",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Count identities following `user_id`
    pub async fn count_followers(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE followee_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count identities `user_id` follows
    pub async fn count_following(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Identities following `user_id`, newest edge first
    pub async fn get_followers(&self, user_id: &str) -> Result<Vec<ProfileSummary>, AppError> {
        let sql = format!(
            "{PROFILE_SUMMARY_SELECT} JOIN follows f ON f.follower_id = u.id \
             WHERE f.followee_id = ? ORDER BY f.created_at DESC, f.rowid DESC"
        );
        let followers = sqlx::query_as::<_, ProfileSummary>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(followers)
    }

    /// Identities `user_id` follows, newest edge first
    pub async fn get_following(&self, user_id: &str) -> Result<Vec<ProfileSummary>, AppError> {
        let sql = format!(
            "{PROFILE_SUMMARY_SELECT} JOIN follows f ON f.followee_id = u.id \
             WHERE f.follower_id = ? ORDER BY f.created_at DESC, f.rowid DESC"
        );
        let following = sqlx::query_as::<_, ProfileSummary>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(following)
    }

    /// IDs of identities `user_id` follows
    pub async fn get_following_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>("SELECT followee_id FROM follows WHERE follower_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert post
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, caption, body, image_key, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.author_id)
        .bind(&post.caption)
        .bind(&post.body)
        .bind(&post.image_key)
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get post with author handle and counts
    pub async fn get_post(&self, id: &str) -> Result<Option<PostRecord>, AppError> {
        let sql = format!("{POST_RECORD_SELECT} WHERE p.id = ?");
        let post = sqlx::query_as::<_, PostRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Get posts by one author, newest first
    ///
    /// # Arguments
    /// * `limit` - Maximum number of posts
    /// * `max_id` - Only return posts older than this post
    pub async fn get_posts_by_author(
        &self,
        author_id: &str,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<PostRecord>, AppError> {
        let mut query_builder = QueryBuilder::<Sqlite>::new(POST_RECORD_SELECT);
        query_builder.push(" WHERE p.author_id = ");
        query_builder.push_bind(author_id);
        push_post_cursor(&mut query_builder, max_id, limit);

        let posts = query_builder
            .build_query_as::<PostRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    /// Get posts by the viewer and everyone the viewer follows, newest first
    pub async fn get_feed(
        &self,
        viewer_id: &str,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<PostRecord>, AppError> {
        let mut query_builder = QueryBuilder::<Sqlite>::new(POST_RECORD_SELECT);
        query_builder.push(" WHERE (p.author_id = ");
        query_builder.push_bind(viewer_id);
        query_builder.push(" OR p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = ");
        query_builder.push_bind(viewer_id);
        query_builder.push("))");
        push_post_cursor(&mut query_builder, max_id, limit);

        let posts = query_builder
            .build_query_as::<PostRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    /// Count posts by one author
    pub async fn count_posts_by_author(&self, author_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Patch caption and/or body; `None` keeps the stored value
    pub async fn update_post(
        &self,
        id: &str,
        caption: Option<&str>,
        body: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE posts SET caption = COALESCE(?, caption), body = COALESCE(?, body) WHERE id = ?",
        )
        .bind(caption)
        .bind(body)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete post; likes and comments cascade
    pub async fn delete_post(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Likes & comments
    // =========================================================================

    /// Flip `user_id`'s like on `post_id` atomically
    ///
    /// # Returns
    /// `true` if the post is liked after the call
    pub async fn toggle_like(
        &self,
        post_id: &str,
        user_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tx = ImmediateTx::begin(&self.pool).await?;

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(tx.conn()?)
            .await?;
        if removed.rows_affected() > 0 {
            tx.commit().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO post_likes (post_id, user_id, created_at) VALUES (?, ?, ?)")
            .bind(post_id)
            .bind(user_id)
            .bind(created_at)
            .execute(tx.conn()?)
            .await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Check if `user_id` likes `post_id`
    pub async fn is_liked(&self, post_id: &str, user_id: &str) -> Result<bool, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = ? AND user_id = ?")
                .bind(post_id)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    /// Count likes on a post
    pub async fn count_likes(&self, post_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_likes WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert comment
    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.author_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Comments on a post, oldest first
    pub async fn get_comments(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.content, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = ?
            ORDER BY c.created_at ASC, c.rowid ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Append a message; `is_read` starts false
    pub async fn insert_message(&self, message: &NewMessage) -> Result<Message, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, image_key, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.content)
        .bind(&message.image_key)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            seq: result.last_insert_rowid(),
            id: message.id.clone(),
            sender_id: message.sender_id.clone(),
            receiver_id: message.receiver_id.clone(),
            content: message.content.clone(),
            image_key: message.image_key.clone(),
            is_read: false,
            created_at: message.created_at,
        })
    }

    /// All messages between `a` and `b`, oldest first, ties by insertion order
    pub async fn get_thread(&self, a: &str, b: &str) -> Result<Vec<Message>, AppError> {
        let sql = format!(
            "{MESSAGE_SELECT} WHERE (sender_id = ? AND receiver_id = ?) \
             OR (sender_id = ? AND receiver_id = ?) \
             ORDER BY created_at ASC, rowid ASC"
        );
        let messages = sqlx::query_as::<_, Message>(&sql)
            .bind(a)
            .bind(b)
            .bind(b)
            .bind(a)
            .fetch_all(&self.pool)
            .await?;

        Ok(messages)
    }

    /// Every message the viewer sent or received
    pub async fn get_messages_involving(&self, user_id: &str) -> Result<Vec<Message>, AppError> {
        let sql = format!(
            "{MESSAGE_SELECT} WHERE sender_id = ? OR receiver_id = ? ORDER BY created_at ASC, rowid ASC"
        );
        let messages = sqlx::query_as::<_, Message>(&sql)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(messages)
    }

    /// Mark everything `counterpart_id` sent to `viewer_id` as read
    ///
    /// # Returns
    /// Number of messages that flipped from unread to read
    pub async fn mark_thread_read(
        &self,
        viewer_id: &str,
        counterpart_id: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = 1 WHERE sender_id = ? AND receiver_id = ? AND is_read = 0",
        )
        .bind(counterpart_id)
        .bind(viewer_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count unread messages received by `user_id`
    pub async fn count_unread_messages(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Count messages between `a` and `b` in either direction
    pub async fn count_thread_messages(&self, a: &str, b: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Append the `max_id` cursor, newest-first ordering and limit to a post query
fn push_post_cursor(query_builder: &mut QueryBuilder<'_, Sqlite>, max_id: Option<&str>, limit: usize) {
    if let Some(max_id) = max_id {
        query_builder.push(
            " AND (p.created_at, p.rowid) < (SELECT created_at, rowid FROM posts WHERE id = ",
        );
        query_builder.push_bind(max_id.to_string());
        query_builder.push(")");
    }
    query_builder.push(" ORDER BY p.created_at DESC, p.rowid DESC LIMIT ");
    query_builder.push_bind(limit as i64);
}

//! Data models
//!
//! Rust structs representing database rows and joined read models.
//! All entities use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Identity & Profile
// =============================================================================

/// A registered identity
///
/// `username` is unique case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// PHC-formatted argon2 hash
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Per-identity social metadata, one row per `User`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: String,
    pub bio: Option<String>,
    /// Blob key of the avatar image
    pub avatar_key: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Identity joined with its profile, used by every read path
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileSummary {
    pub user_id: String,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Posts
// =============================================================================

/// A post as written
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub caption: String,
    pub body: String,
    /// Blob key of the attached image
    pub image_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A post joined with its author handle and aggregate counts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRecord {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub caption: String,
    pub body: String,
    pub image_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
}

/// Comment on a post, joined with the author handle
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Messages
// =============================================================================

/// Directed message from `sender_id` to `receiver_id`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    /// Insertion order (SQLite rowid), breaks timestamp ties
    #[serde(skip)]
    pub seq: i64,
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub image_key: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The participant of this message that is not `viewer`
    pub fn counterpart_of(&self, viewer: &str) -> &str {
        if self.sender_id == viewer {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }

    /// Whether `viewer` received this message and has not read it yet
    pub fn is_unread_for(&self, viewer: &str) -> bool {
        self.receiver_id == viewer && !self.is_read
    }
}

/// Fields for a new message row
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub image_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

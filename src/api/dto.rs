//! API request and response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Requests
// =============================================================================

/// POST /auth/signup
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// POST /auth/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// PATCH /api/v1/profile
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

/// PATCH /api/v1/posts/:id
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub caption: Option<String>,
    pub body: Option<String>,
}

/// POST /api/v1/posts/:id/comments
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// Pagination parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub max_id: Option<String>,
    pub limit: Option<usize>,
}

// =============================================================================
// Responses
// =============================================================================

/// The caller's own identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Signup/login result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Session token, also set as the `session` cookie
    pub token: String,
    pub account: AccountResponse,
}

/// Public profile card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileViewResponse {
    pub profile: ProfileResponse,
    pub followers_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    pub posts: Vec<PostResponse>,
    pub is_following: Option<bool>,
}

/// Follow toggle result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowResponse {
    pub following: bool,
    pub followers_count: i64,
}

/// Avatar upload result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// Post with author and counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub caption: String,
    pub body: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
}

/// Post page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
    pub liked: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Like toggle result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub image_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Inbox row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub counterpart: ProfileResponse,
    pub last_message: Option<MessageResponse>,
    pub unread_count: i64,
}

/// Thread page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub counterpart: ProfileResponse,
    /// Oldest first
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

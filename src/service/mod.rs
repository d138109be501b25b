//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Every operation takes the caller identity explicitly.

mod account;
mod conversation;
mod follow;
mod message;
mod post;

pub use account::{AccountService, ProfileUpdate, ProfileView};
pub use conversation::{Conversation, assemble_conversations};
pub use follow::FollowService;
pub use message::{MessageService, SendOutcome};
pub use post::{FEED_DEFAULT_LIMIT, FEED_MAX_LIMIT, LikeState, PostDetail, PostService};

/// Image bytes received from a client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Trim user text; `None` when nothing is left
fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

//! Conversion functions from data models to API DTOs
//!
//! Blob keys are turned into public URLs here and nowhere else.

use crate::api::dto::*;
use crate::data::{Comment, Message, PostRecord, ProfileSummary, User};
use crate::service::{Conversation, PostDetail, ProfileView};
use crate::storage::MediaStorage;

pub fn account_to_response(user: &User) -> AccountResponse {
    AccountResponse {
        id: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        created_at: user.created_at,
    }
}

pub fn profile_to_response(profile: &ProfileSummary, storage: &MediaStorage) -> ProfileResponse {
    ProfileResponse {
        id: profile.user_id.clone(),
        username: profile.username.clone(),
        bio: profile.bio.clone(),
        avatar_url: profile.avatar_key.as_deref().map(|key| storage.public_url(key)),
        created_at: profile.created_at,
    }
}

pub fn profile_view_to_response(view: &ProfileView, storage: &MediaStorage) -> ProfileViewResponse {
    ProfileViewResponse {
        profile: profile_to_response(&view.profile, storage),
        followers_count: view.followers_count,
        following_count: view.following_count,
        post_count: view.post_count,
        posts: view
            .posts
            .iter()
            .map(|post| post_to_response(post, storage))
            .collect(),
        is_following: view.is_following,
    }
}

pub fn post_to_response(post: &PostRecord, storage: &MediaStorage) -> PostResponse {
    PostResponse {
        id: post.id.clone(),
        author_id: post.author_id.clone(),
        author_username: post.author_username.clone(),
        caption: post.caption.clone(),
        body: post.body.clone(),
        image_url: post.image_key.as_deref().map(|key| storage.public_url(key)),
        created_at: post.created_at,
        like_count: post.like_count,
        comment_count: post.comment_count,
    }
}

pub fn post_detail_to_response(detail: &PostDetail, storage: &MediaStorage) -> PostDetailResponse {
    PostDetailResponse {
        post: post_to_response(&detail.post, storage),
        comments: detail.comments.iter().map(comment_to_response).collect(),
        liked: detail.liked_by_viewer,
    }
}

pub fn comment_to_response(comment: &Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id.clone(),
        post_id: comment.post_id.clone(),
        author_id: comment.author_id.clone(),
        author_username: comment.author_username.clone(),
        content: comment.content.clone(),
        created_at: comment.created_at,
    }
}

pub fn message_to_response(message: &Message, storage: &MediaStorage) -> MessageResponse {
    MessageResponse {
        id: message.id.clone(),
        sender_id: message.sender_id.clone(),
        receiver_id: message.receiver_id.clone(),
        content: message.content.clone(),
        image_url: message.image_key.as_deref().map(|key| storage.public_url(key)),
        is_read: message.is_read,
        created_at: message.created_at,
    }
}

pub fn conversation_to_response(
    conversation: &Conversation,
    storage: &MediaStorage,
) -> ConversationResponse {
    ConversationResponse {
        counterpart: profile_to_response(&conversation.counterpart, storage),
        last_message: conversation
            .last_message
            .as_ref()
            .map(|message| message_to_response(message, storage)),
        unread_count: conversation.unread_count,
    }
}

pub fn thread_to_response(
    counterpart: &ProfileSummary,
    messages: &[Message],
    storage: &MediaStorage,
) -> ThreadResponse {
    ThreadResponse {
        counterpart: profile_to_response(counterpart, storage),
        messages: messages
            .iter()
            .map(|message| message_to_response(message, storage))
            .collect(),
    }
}

//! Direct message service
//!
//! Handles:
//! - Delivery under the configured messaging policy
//! - Thread reads and read-marking
//! - Inbox assembly and the unread counter

use std::collections::HashMap;
use std::sync::Arc;

use super::conversation::{Conversation, assemble_conversations};
use super::{ImageUpload, non_blank};
use crate::config::MessagingPolicy;
use crate::data::{Database, EntityId, Message, NewMessage, User};
use crate::error::AppError;
use crate::storage::MediaStorage;

/// Result of the send-then-view flow
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The new message, if delivery succeeded
    pub sent: Option<Message>,
    /// User-visible reason the message was not sent
    pub error: Option<String>,
    /// Thread as re-loaded after the attempt
    pub thread: Vec<Message>,
}

/// Direct message service
pub struct MessageService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
    policy: MessagingPolicy,
}

impl MessageService {
    /// Create new message service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>, policy: MessagingPolicy) -> Self {
        Self {
            db,
            storage,
            policy,
        }
    }

    /// Send a direct message
    ///
    /// # Errors
    /// - `Validation` for blank content or a message to oneself
    /// - `NotFound` if the receiver does not exist
    /// - `Forbidden` if the policy requires following and the sender
    ///   does not follow the receiver
    /// - `Storage` if the image could not be stored (no row is written)
    pub async fn send(
        &self,
        sender: &User,
        receiver_id: &str,
        content: &str,
        image: Option<ImageUpload>,
    ) -> Result<Message, AppError> {
        let content = non_blank(content)
            .ok_or_else(|| AppError::Validation("Message cannot be empty".to_string()))?;
        if sender.id == receiver_id {
            return Err(AppError::Validation(
                "You cannot message yourself".to_string(),
            ));
        }
        if self.db.get_user(receiver_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        if self.policy == MessagingPolicy::Following
            && !self.db.is_following(&sender.id, receiver_id).await?
        {
            return Err(AppError::Forbidden);
        }

        let image_key = match image {
            Some(upload) => Some(
                self.storage
                    .upload_image("messages", upload.data, &upload.content_type)
                    .await?
                    .key,
            ),
            None => None,
        };

        let new_message = NewMessage {
            id: EntityId::new().0,
            sender_id: sender.id.clone(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            image_key,
            created_at: chrono::Utc::now(),
        };

        let message = match self.db.insert_message(&new_message).await {
            Ok(message) => message,
            Err(error) => {
                if let Some(key) = new_message.image_key.as_deref() {
                    self.storage.delete_best_effort(key).await;
                }
                return Err(error);
            }
        };

        crate::metrics::MESSAGES_SENT_TOTAL.inc();
        tracing::info!(
            message_id = %message.id,
            sender_id = %message.sender_id,
            receiver_id = %message.receiver_id,
            "Message sent"
        );

        Ok(message)
    }

    /// Mark everything the counterpart sent to the viewer as read
    ///
    /// Messages the viewer sent are never touched. Idempotent.
    ///
    /// # Returns
    /// Number of messages that changed state
    pub async fn mark_thread_read(&self, viewer_id: &str, counterpart_id: &str) -> Result<u64, AppError> {
        let marked = self.db.mark_thread_read(viewer_id, counterpart_id).await?;
        if marked > 0 {
            crate::metrics::MESSAGES_MARKED_READ_TOTAL.inc_by(marked);
            tracing::debug!(%viewer_id, %counterpart_id, marked, "Marked thread read");
        }
        Ok(marked)
    }

    /// All messages between `a` and `b`, oldest first
    pub async fn thread(&self, a: &str, b: &str) -> Result<Vec<Message>, AppError> {
        self.db.get_thread(a, b).await
    }

    /// Open a thread: mark it read once, then load it
    pub async fn view_thread(&self, viewer_id: &str, counterpart_id: &str) -> Result<Vec<Message>, AppError> {
        self.mark_thread_read(viewer_id, counterpart_id).await?;
        self.thread(viewer_id, counterpart_id).await
    }

    /// Send, then open the thread
    ///
    /// A validation failure is reported next to the thread instead of
    /// failing the call; every other error propagates.
    pub async fn send_and_view(
        &self,
        sender: &User,
        receiver_id: &str,
        content: &str,
        image: Option<ImageUpload>,
    ) -> Result<SendOutcome, AppError> {
        let (sent, error) = match self.send(sender, receiver_id, content, image).await {
            Ok(message) => (Some(message), None),
            Err(AppError::Validation(message)) => (None, Some(message)),
            Err(error) => return Err(error),
        };

        let thread = self.view_thread(&sender.id, receiver_id).await?;
        Ok(SendOutcome {
            sent,
            error,
            thread,
        })
    }

    /// Conversation list for the viewer
    ///
    /// Under the `following` policy every followed identity is listed,
    /// messaged or not.
    pub async fn inbox(&self, viewer_id: &str) -> Result<Vec<Conversation>, AppError> {
        let messages = self.db.get_messages_involving(viewer_id).await?;
        let extra_counterparts = match self.policy {
            MessagingPolicy::Following => self.db.get_following_ids(viewer_id).await?,
            MessagingPolicy::Open => Vec::new(),
        };

        let mut counterpart_ids: Vec<String> = messages
            .iter()
            .map(|message| message.counterpart_of(viewer_id).to_string())
            .chain(extra_counterparts.iter().cloned())
            .collect();
        counterpart_ids.sort();
        counterpart_ids.dedup();

        let profiles: HashMap<_, _> = self
            .db
            .get_profile_summaries(&counterpart_ids)
            .await?
            .into_iter()
            .map(|profile| (profile.user_id.clone(), profile))
            .collect();

        Ok(assemble_conversations(
            viewer_id,
            messages,
            &extra_counterparts,
            &profiles,
        ))
    }

    /// Unread messages received by the viewer, across all threads
    pub async fn unread_count(&self, viewer_id: &str) -> Result<i64, AppError> {
        self.db.count_unread_messages(viewer_id).await
    }
}

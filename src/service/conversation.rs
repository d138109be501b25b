//! Conversation assembly
//!
//! Derives one logical thread per counterpart from the flat message list.
//! Nothing here is persisted; the inbox is recomputed on every view.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::data::{Message, ProfileSummary};

/// One inbox row
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub counterpart: ProfileSummary,
    /// Latest message in either direction, `None` for a followed
    /// identity that was never messaged
    pub last_message: Option<Message>,
    /// Messages from the counterpart the viewer has not read
    pub unread_count: i64,
}

#[derive(Default)]
struct Group {
    last_message: Option<Message>,
    unread_count: i64,
}

fn is_newer(candidate: &Message, current: &Message) -> bool {
    (candidate.created_at, candidate.seq) > (current.created_at, current.seq)
}

/// Group the viewer's messages by counterpart
///
/// # Arguments
/// * `viewer_id` - Identity whose inbox is being built
/// * `messages` - Messages in any order; rows not touching the viewer are ignored
/// * `extra_counterparts` - Identities listed even without messages
/// * `profiles` - Profile lookup for every counterpart; groups whose
///   counterpart is missing are dropped
///
/// # Returns
/// Most recent conversation first; conversations without messages last;
/// ties by handle, then ID.
pub fn assemble_conversations(
    viewer_id: &str,
    messages: Vec<Message>,
    extra_counterparts: &[String],
    profiles: &HashMap<String, ProfileSummary>,
) -> Vec<Conversation> {
    let mut groups: HashMap<String, Group> = HashMap::new();

    for message in messages {
        let touches_viewer = message.sender_id == viewer_id || message.receiver_id == viewer_id;
        if !touches_viewer || message.sender_id == message.receiver_id {
            continue;
        }

        let group = groups
            .entry(message.counterpart_of(viewer_id).to_string())
            .or_default();
        if message.is_unread_for(viewer_id) {
            group.unread_count += 1;
        }
        let replace = group
            .last_message
            .as_ref()
            .is_none_or(|current| is_newer(&message, current));
        if replace {
            group.last_message = Some(message);
        }
    }

    for counterpart_id in extra_counterparts {
        if counterpart_id != viewer_id {
            groups.entry(counterpart_id.clone()).or_default();
        }
    }

    let mut conversations: Vec<Conversation> = groups
        .into_iter()
        .filter_map(|(counterpart_id, group)| {
            let counterpart = profiles.get(&counterpart_id)?.clone();
            Some(Conversation {
                counterpart,
                last_message: group.last_message,
                unread_count: group.unread_count,
            })
        })
        .collect();

    conversations.sort_by(|a, b| {
        let recency = match (&a.last_message, &b.last_message) {
            (Some(x), Some(y)) => (y.created_at, y.seq).cmp(&(x.created_at, x.seq)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        recency
            .then_with(|| a.counterpart.username.cmp(&b.counterpart.username))
            .then_with(|| a.counterpart.user_id.cmp(&b.counterpart.user_id))
    });

    conversations
}

//! Conversations and the messages they own.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, MessageId, TempMessageId};

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Written by the person using the client.
    User,
    /// Generated by the assistant behind the backend.
    Assistant,
}

impl Sender {
    /// Map the `isUser` discriminator to a sender.
    #[must_use]
    pub const fn from_is_user(is_user: bool) -> Self {
        if is_user { Self::User } else { Self::Assistant }
    }

    /// Whether this is the user side of the exchange.
    #[must_use]
    pub const fn is_user(self) -> bool {
        matches!(self, Self::User)
    }

    /// Wire value used in the `sender` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Temporary id while pending, server id once confirmed.
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Text body.
    pub content: String,
    /// Author.
    pub sender: Sender,
    /// Creation time (client clock until the server supplies its own).
    pub created_at: DateTime<Utc>,
    /// True while awaiting server confirmation.
    #[serde(default)]
    pub pending: bool,
}

impl Message {
    /// Build an optimistic message that has not reached the server yet.
    #[must_use]
    pub fn optimistic(
        temp_id: TempMessageId,
        conversation_id: ConversationId,
        content: impl Into<String>,
        sender: Sender,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::from(temp_id),
            conversation_id,
            content: content.into(),
            sender,
            created_at,
            pending: true,
        }
    }

    /// Whether this message was written by the user.
    #[must_use]
    pub const fn is_user(&self) -> bool {
        self.sender.is_user()
    }

    /// Copy of this message with the pending marker cleared.
    #[must_use]
    pub fn confirmed(&self) -> Self {
        Self {
            pending: false,
            ..self.clone()
        }
    }
}

/// A conversation and its ordered messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Server-assigned identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Messages in list order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Soft-delete flag; deleted conversations are hidden from listings.
    #[serde(default)]
    pub is_deleted: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Whether this conversation counts as a draft: visible and without any
    /// confirmed message. Pending messages may still roll back.
    #[must_use]
    pub fn is_draft(&self) -> bool {
        !self.is_deleted && self.messages.iter().all(|m| m.pending)
    }

    /// Position of a message by id.
    #[must_use]
    pub fn position_of(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }

    /// Whether any message carries this id.
    #[must_use]
    pub fn contains_message(&self, id: &MessageId) -> bool {
        self.position_of(id).is_some()
    }

    /// Number of messages still awaiting confirmation.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.pending).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(messages: Vec<Message>, is_deleted: bool) -> Conversation {
        let now = Utc::now();
        Conversation {
            id: ConversationId::new("c1"),
            title: "New Conversation".to_string(),
            messages,
            is_deleted,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_draft_detection() {
        assert!(conversation(Vec::new(), false).is_draft());
        assert!(!conversation(Vec::new(), true).is_draft());

        let msg = Message::optimistic(
            TempMessageId::new(),
            ConversationId::new("c1"),
            "hi",
            Sender::User,
            Utc::now(),
        );
        assert!(conversation(vec![msg.clone()], false).is_draft());
        assert!(!conversation(vec![msg.confirmed()], false).is_draft());
    }

    #[test]
    fn test_optimistic_then_confirmed() {
        let temp = TempMessageId::new();
        let msg = Message::optimistic(
            temp,
            ConversationId::new("c1"),
            "hello",
            Sender::User,
            Utc::now(),
        );
        assert!(msg.pending);
        assert_eq!(msg.id, temp);

        let confirmed = msg.confirmed();
        assert!(!confirmed.pending);
        assert_eq!(confirmed.content, "hello");
    }

    #[test]
    fn test_sender_wire_values() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
        assert_eq!(Sender::from_is_user(false), Sender::Assistant);
        assert!(Sender::User.is_user());
    }
}

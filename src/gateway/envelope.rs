//! Wire shapes exchanged with the chat backend.
//!
//! Everything the backend sends is decoded here, once, into explicit types:
//! - [`Envelope`]: the `{ success, data, message?, error? }` wrapper
//! - [`ListPayload`]: a list that may arrive wrapped, bare, or not at all
//! - [`SendReply`]: what a message POST answers with (one message, a pair, or a list)
//!
//! The store never sniffs raw JSON.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{
    Conversation, ConversationId, GatewayError, GatewayResult, Message, MessageId, Sender,
};

/// Standard response wrapper.
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope<T> {
    /// Whether the backend considers the call successful.
    #[serde(default)]
    pub success: bool,
    /// Payload, when the call produces one.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Error detail (string or structured).
    #[serde(default)]
    pub error: Option<Value>,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode an envelope from a JSON value.
    ///
    /// # Errors
    /// Returns an error if the value is not an object of the expected shape.
    pub fn from_value(value: Value) -> GatewayResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

impl<T> Envelope<T> {
    /// Best available explanation for a failed envelope.
    #[must_use]
    pub fn reason(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_string();
        }
        match &self.error {
            Some(Value::String(text)) if !text.is_empty() => text.clone(),
            Some(Value::Null) | None => "request was not successful".to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Fail unless the envelope reports success; discards the payload.
    ///
    /// # Errors
    /// Returns [`GatewayError::Rejected`] when `success` is false.
    pub fn ensure_success(self) -> GatewayResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(GatewayError::Rejected(self.reason()))
        }
    }

    /// Extract the payload of a successful envelope.
    ///
    /// # Errors
    /// Returns [`GatewayError::Rejected`] when `success` is false and
    /// [`GatewayError::MissingData`] when `data` is absent.
    pub fn into_data(self, what: &'static str) -> GatewayResult<T> {
        if !self.success {
            return Err(GatewayError::Rejected(self.reason()));
        }
        self.data.ok_or(GatewayError::MissingData(what))
    }
}

/// A list response in one of the shapes backends are known to send.
#[derive(Clone, Debug, PartialEq)]
pub enum ListPayload<T> {
    /// `{ "data": [...] }`
    Wrapped(Vec<T>),
    /// `[...]`
    Bare(Vec<T>),
    /// Anything else, kept for diagnostics.
    Unrecognized(Value),
}

impl<T: DeserializeOwned> ListPayload<T> {
    /// Classify and decode a list response.
    ///
    /// # Errors
    /// Returns an error if a recognized list contains undecodable items.
    pub fn from_value(value: Value) -> GatewayResult<Self> {
        match value {
            Value::Array(_) => Ok(Self::Bare(serde_json::from_value(value)?)),
            Value::Object(mut map) => match map.remove("data") {
                Some(data @ Value::Array(_)) => Ok(Self::Wrapped(serde_json::from_value(data)?)),
                Some(other) => {
                    map.insert("data".to_string(), other);
                    Ok(Self::Unrecognized(Value::Object(map)))
                }
                None => Ok(Self::Unrecognized(Value::Object(map))),
            },
            other => Ok(Self::Unrecognized(other)),
        }
    }
}

impl<T> ListPayload<T> {
    /// Items of the list; unrecognized shapes yield an empty list.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Wrapped(items) | Self::Bare(items) => items,
            Self::Unrecognized(_) => Vec::new(),
        }
    }

    /// Whether the payload matched a known list shape.
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

/// Decode a timestamp from RFC 3339, offset-less ISO-8601 (read as UTC),
/// a bare date, or epoch milliseconds. Anything else becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if let Ok(at) = DateTime::parse_from_rfc3339(text) {
                return Some(at.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
                .map(|naive| naive.and_utc())
        }
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Conversation as sent by the backend.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// Server-assigned id.
    pub id: ConversationId,
    /// Title, if any.
    #[serde(default)]
    pub title: Option<String>,
    /// Embedded messages, if the backend includes them.
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
    /// Soft-delete flag.
    #[serde(default, alias = "is_deleted")]
    pub is_deleted: bool,
    /// Creation time.
    #[serde(default, alias = "created_at", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, alias = "updated_at", deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationRecord {
    /// Convert to the local model, filling missing timestamps with `now`.
    #[must_use]
    pub fn into_conversation(self, now: DateTime<Utc>) -> Conversation {
        let created_at = self.created_at.unwrap_or(now);
        let messages = self
            .messages
            .into_iter()
            .map(|m| m.into_message(&self.id, created_at))
            .collect();

        Conversation {
            title: self.title.unwrap_or_default(),
            messages,
            is_deleted: self.is_deleted,
            created_at,
            updated_at: self.updated_at.unwrap_or(now),
            id: self.id,
        }
    }
}

/// Message as sent by the backend.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Server-issued id.
    pub id: MessageId,
    /// Owning conversation, when echoed back.
    #[serde(default, alias = "conversation_id")]
    pub conversation_id: Option<ConversationId>,
    /// Text body.
    #[serde(default)]
    pub content: String,
    /// Boolean author discriminator.
    #[serde(default, alias = "is_user")]
    pub is_user: Option<bool>,
    /// Textual author discriminator (`user` / `assistant`).
    #[serde(default)]
    pub sender: Option<String>,
    /// Creation time.
    #[serde(default, alias = "created_at", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    /// Author of the record; `isUser` wins over `sender`, assistant by default.
    #[must_use]
    pub fn sender(&self) -> Sender {
        if let Some(is_user) = self.is_user {
            return Sender::from_is_user(is_user);
        }
        match self.sender.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("user" | "human") => Sender::User,
            _ => Sender::Assistant,
        }
    }

    /// Convert to a confirmed local message.
    #[must_use]
    pub fn into_message(self, conversation_id: &ConversationId, fallback: DateTime<Utc>) -> Message {
        let sender = self.sender();
        Message {
            id: self.id,
            conversation_id: self
                .conversation_id
                .unwrap_or_else(|| conversation_id.clone()),
            content: self.content,
            sender,
            created_at: self.created_at.unwrap_or(fallback),
            pending: false,
        }
    }

    /// Confirm an optimistic message with this record's server values.
    ///
    /// The local content is kept when the record echoes none.
    #[must_use]
    pub fn confirm(self, staged: &Message) -> Message {
        Message {
            id: self.id,
            conversation_id: staged.conversation_id.clone(),
            content: if self.content.is_empty() {
                staged.content.clone()
            } else {
                self.content
            },
            sender: staged.sender,
            created_at: self.created_at.unwrap_or(staged.created_at),
            pending: false,
        }
    }
}

/// Payload of a successful message POST.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum SendReply {
    /// The confirmed sent message plus the generated reply.
    Pair {
        /// Confirmed copy of the message that was sent.
        #[serde(rename = "userMessage", alias = "user_message")]
        user_message: MessageRecord,
        /// Generated reply, when one was produced.
        #[serde(default, rename = "assistantMessage", alias = "assistant_message")]
        assistant_message: Option<MessageRecord>,
    },
    /// Ordered messages, sent one first when present.
    Sequence(Vec<MessageRecord>),
    /// A single message: either the confirmed sent one or a reply.
    Single(MessageRecord),
}

impl SendReply {
    /// Messages that replace the optimistic entry, in list order.
    ///
    /// A record authored like `staged` confirms it; a record from the other
    /// side is a reply, in which case `staged` is confirmed in place and the
    /// reply follows it.
    #[must_use]
    pub fn into_confirmed(self, staged: &Message, received_at: DateTime<Utc>) -> Vec<Message> {
        let cid = &staged.conversation_id;
        match self {
            Self::Pair {
                user_message,
                assistant_message,
            } => {
                let mut out = vec![user_message.confirm(staged)];
                out.extend(assistant_message.map(|m| m.into_message(cid, received_at)));
                out
            }
            Self::Single(record) => {
                if record.sender() == staged.sender {
                    vec![record.confirm(staged)]
                } else {
                    vec![staged.confirmed(), record.into_message(cid, received_at)]
                }
            }
            Self::Sequence(records) => {
                let mut records = records.into_iter().peekable();
                let mut out = Vec::new();
                match records.next_if(|first| first.sender() == staged.sender) {
                    Some(first) => out.push(first.confirm(staged)),
                    None => out.push(staged.confirmed()),
                }
                out.extend(records.map(|m| m.into_message(cid, received_at)));
                out
            }
        }
    }
}

/// Body of a conversation POST.
#[derive(Clone, Debug, Serialize)]
pub struct NewConversation {
    /// Title to create the conversation with.
    pub title: String,
}

/// Body of a message POST.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Text body.
    pub content: String,
    /// Author.
    pub sender: Sender,
    /// Client-side creation time.
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    /// Request body for an optimistic message.
    #[must_use]
    pub fn from_staged(staged: &Message) -> Self {
        Self {
            conversation_id: staged.conversation_id.clone(),
            content: staged.content.clone(),
            sender: staged.sender,
            created_at: staged.created_at,
        }
    }
}

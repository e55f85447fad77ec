//! Remote gateway: the CRUD surface of the chat backend.
//!
//! The store only talks to the [`ChatGateway`] trait. [`HttpGateway`] is the
//! production implementation; tests script their own.

pub mod envelope;
pub mod http;
#[cfg(test)]
pub(crate) mod stub;

pub use envelope::{
    ConversationRecord, Envelope, ListPayload, MessageRecord, NewConversation, NewMessage,
    SendReply,
};
pub use http::HttpGateway;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::domain::{ConversationId, GatewayResult};

/// Boxed future type for gateway operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstraction over the chat backend.
///
/// Implementations report transport and status failures as errors and leave
/// envelope interpretation (`success`, `data`) to the caller.
pub trait ChatGateway: Send + Sync {
    /// List conversations.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not JSON.
    fn list_conversations(&self) -> GatewayFuture<'_, GatewayResult<ListPayload<ConversationRecord>>>;

    /// Create a conversation with the given title.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not an envelope.
    fn create_conversation(
        &self,
        title: &str,
    ) -> GatewayFuture<'_, GatewayResult<Envelope<ConversationRecord>>>;

    /// Delete a conversation.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not an envelope.
    fn delete_conversation(
        &self,
        id: &ConversationId,
    ) -> GatewayFuture<'_, GatewayResult<Envelope<Value>>>;

    /// List the messages of a conversation.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not JSON.
    fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> GatewayFuture<'_, GatewayResult<ListPayload<MessageRecord>>>;

    /// Send a message.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not an envelope.
    fn send_message(&self, message: NewMessage) -> GatewayFuture<'_, GatewayResult<Envelope<SendReply>>>;
}

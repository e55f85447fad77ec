//! Message reconciler: fetch, optimistic send, confirm or roll back.
//!
//! A sent message goes `absent -> pending -> confirmed | absent`. The
//! pending entry is staged before the request leaves and is owned by a
//! [`StagedMessage`] guard until the reply arrives: a confirmation disarms
//! the guard, anything else (error, early return, dropped future) removes
//! the entry again.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    ConversationId, Message, MessageId, Sender, StoreError, StoreResult, TempMessageId,
};
use crate::gateway::NewMessage;

use super::state::Action;
use super::{ChatStore, LoadingScope};

/// Pending message that is rolled back on drop unless confirmed.
struct StagedMessage<'a> {
    store: &'a ChatStore,
    conversation_id: ConversationId,
    temp_id: MessageId,
    armed: bool,
}

impl<'a> StagedMessage<'a> {
    fn stage(store: &'a ChatStore, message: Message, at: DateTime<Utc>) -> Self {
        let conversation_id = message.conversation_id.clone();
        let temp_id = message.id.clone();
        store.dispatch(Action::MessageStaged { message, at });
        Self {
            store,
            conversation_id,
            temp_id,
            armed: true,
        }
    }

    fn confirm(mut self, confirmed: Vec<Message>) {
        self.armed = false;
        self.store.dispatch(Action::MessageConfirmed {
            conversation_id: self.conversation_id.clone(),
            temp_id: self.temp_id.clone(),
            confirmed,
        });
    }
}

impl Drop for StagedMessage<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(temp_id = %self.temp_id, "rolling back pending message");
            self.store.dispatch(Action::MessageRolledBack {
                conversation_id: self.conversation_id.clone(),
                temp_id: self.temp_id.clone(),
            });
        }
    }
}

impl ChatStore {
    /// Replace a conversation's messages with the backend's list.
    ///
    /// Returns the number of messages fetched.
    ///
    /// # Errors
    /// Returns an error if the request fails or an item cannot be decoded.
    pub async fn fetch_messages(&self, conversation_id: &ConversationId) -> StoreResult<usize> {
        let _loading = self.begin(vec![
            LoadingScope::Conversation,
            LoadingScope::Messages(conversation_id.clone()),
        ]);

        let payload = match self.gateway().list_messages(conversation_id).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%conversation_id, error = %err, "failed to fetch messages");
                return Err(err.into());
            }
        };
        if !payload.is_recognized() {
            warn!(%conversation_id, "message list has an unexpected shape, treating it as empty");
        }

        let now = Utc::now();
        let messages: Vec<Message> = payload
            .into_items()
            .into_iter()
            .map(|record| record.into_message(conversation_id, now))
            .collect();
        let count = messages.len();

        self.dispatch(Action::MessagesReplaced {
            conversation_id: conversation_id.clone(),
            messages,
            at: now,
        });
        debug!(%conversation_id, count, "messages replaced");
        Ok(count)
    }

    /// Send a message with optimistic insertion.
    ///
    /// The message shows up as pending before the request is sent. On
    /// success it is replaced, in place, by the confirmed message(s) which
    /// are also returned; on failure it is removed.
    ///
    /// # Errors
    /// Returns [`StoreError::EmptyMessage`] for blank content,
    /// [`StoreError::UnknownConversation`] for an id the store does not
    /// hold, and the gateway error when the send fails.
    pub async fn add_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        is_user: bool,
    ) -> StoreResult<Vec<Message>> {
        if content.trim().is_empty() {
            return Err(StoreError::EmptyMessage);
        }
        if self.read(|s| s.conversation(conversation_id).is_none()) {
            return Err(StoreError::UnknownConversation(conversation_id.clone()));
        }

        let _loading = self.begin(vec![
            LoadingScope::Conversation,
            LoadingScope::Messages(conversation_id.clone()),
        ]);

        let now = Utc::now();
        let message = Message::optimistic(
            TempMessageId::new(),
            conversation_id.clone(),
            content,
            Sender::from_is_user(is_user),
            now,
        );
        let request = NewMessage::from_staged(&message);
        let staged = StagedMessage::stage(self, message.clone(), now);

        let result = self
            .gateway()
            .send_message(request)
            .await
            .and_then(|envelope| envelope.into_data("message"));

        match result {
            Ok(reply) => {
                let confirmed = reply.into_confirmed(&message, Utc::now());
                staged.confirm(confirmed.clone());
                info!(%conversation_id, count = confirmed.len(), "message confirmed");
                Ok(confirmed)
            }
            Err(err) => {
                drop(staged);
                warn!(%conversation_id, error = %err, "message send failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::domain::GatewayError;
    use crate::gateway::stub::{Op, StubGateway};
    use crate::store::test_support::conversation_json;

    async fn seeded(messages: usize) -> (Arc<StubGateway>, ChatStore, ConversationId) {
        let stub = StubGateway::new();
        let store = ChatStore::new(stub.clone());
        stub.respond(Op::ListConversations, json!([conversation_json("c1", messages)]));
        store.fetch_conversations().await;
        (stub, store, ConversationId::new("c1"))
    }

    fn ok(data: Value) -> Value {
        json!({"success": true, "data": data})
    }

    fn ids(store: &ChatStore, id: &ConversationId) -> Vec<String> {
        store
            .conversation(id)
            .unwrap()
            .messages
            .iter()
            .map(|m| m.id.as_str().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_rollback_on_failure() {
        let (stub, store, id) = seeded(2).await;
        let before = store.conversation(&id).unwrap().messages;
        stub.fail(Op::SendMessage, 500);

        let err = store.add_message(&id, "hello", true).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Gateway(GatewayError::Status { status: 500, .. })
        ));
        assert_eq!(store.conversation(&id).unwrap().messages, before);
        assert!(!store.is_message_loading(&id));
        assert!(!store.is_conversation_loading());
    }

    #[tokio::test]
    async fn test_rollback_on_rejected_envelope() {
        let (stub, store, id) = seeded(1).await;
        stub.respond(Op::SendMessage, json!({"success": false, "message": "too long"}));

        let err = store.add_message(&id, "hello", true).await.unwrap_err();

        assert!(matches!(err, StoreError::Gateway(GatewayError::Rejected(ref m)) if m == "too long"));
        assert_eq!(store.conversation(&id).unwrap().pending_count(), 0);
        assert_eq!(ids(&store, &id), vec!["c1-m0"]);
    }

    #[tokio::test]
    async fn test_confirm_replaces_temp_id() {
        let (stub, store, id) = seeded(1).await;
        stub.respond(
            Op::SendMessage,
            ok(json!({"id": "m9", "conversationId": "c1", "content": "hello", "isUser": true})),
        );

        let confirmed = store.add_message(&id, "hello", true).await.unwrap();

        assert_eq!(confirmed.len(), 1);
        let messages = store.conversation(&id).unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.iter().filter(|m| m.id.as_str() == "m9").count(), 1);
        assert!(messages.iter().all(|m| !m.pending));
        assert_eq!(stub.sent()[0].sender, Sender::User);
        assert!(!store.is_message_loading(&id));
        assert!(!store.is_conversation_loading());
    }

    #[tokio::test]
    async fn test_reply_pair_lands_after_sent_message() {
        let (stub, store, id) = seeded(1).await;
        stub.respond(
            Op::SendMessage,
            ok(json!({
                "userMessage": {"id": "u1", "isUser": true, "content": "question"},
                "assistantMessage": {"id": "a1", "isUser": false, "content": "answer"}
            })),
        );

        store.add_message(&id, "question", true).await.unwrap();

        assert_eq!(ids(&store, &id), vec!["c1-m0", "u1", "a1"]);
    }

    #[tokio::test]
    async fn test_assistant_message_keeps_sender() {
        let (stub, store, id) = seeded(1).await;
        stub.respond(
            Op::SendMessage,
            ok(json!({"id": "a5", "isUser": false, "content": "canned"})),
        );

        let confirmed = store.add_message(&id, "canned", false).await.unwrap();

        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].sender, Sender::Assistant);
        assert_eq!(stub.sent()[0].sender, Sender::Assistant);
    }

    #[tokio::test]
    async fn test_pending_is_visible_mid_flight() {
        let (stub, store, id) = seeded(0).await;
        let release = stub.hold(Op::SendMessage);
        stub.respond(Op::SendMessage, ok(json!({"id": "m1", "isUser": true})));
        let before = store.conversation(&id).unwrap().updated_at;

        let send = tokio::spawn({
            let store = store.clone();
            let id = id.clone();
            async move { store.add_message(&id, "hello", true).await }
        });
        while stub.calls(Op::SendMessage) < 1 {
            tokio::task::yield_now().await;
        }

        let conversation = store.conversation(&id).unwrap();
        assert_eq!(conversation.pending_count(), 1);
        assert_eq!(conversation.messages[0].content, "hello");
        assert!(conversation.updated_at > before);
        assert!(store.is_message_loading(&id));
        assert!(store.is_any_message_loading());

        release.notify_one();
        send.await.unwrap().unwrap();
        assert_eq!(ids(&store, &id), vec!["m1"]);
        assert!(!store.is_any_message_loading());
    }

    #[tokio::test]
    async fn test_confirmations_follow_send_order() {
        let (stub, store, id) = seeded(0).await;
        let release = stub.hold(Op::SendMessage);
        stub.respond(Op::SendMessage, ok(json!({"id": "first", "isUser": true})));
        stub.respond(Op::SendMessage, ok(json!({"id": "second", "isUser": true})));

        let first = tokio::spawn({
            let store = store.clone();
            let id = id.clone();
            async move { store.add_message(&id, "one", true).await }
        });
        while stub.calls(Op::SendMessage) < 1 {
            tokio::task::yield_now().await;
        }
        let second = tokio::spawn({
            let store = store.clone();
            let id = id.clone();
            async move { store.add_message(&id, "two", true).await }
        });
        while stub.calls(Op::SendMessage) < 2 {
            tokio::task::yield_now().await;
        }

        release.notify_one();
        release.notify_one();
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(ids(&store, &id), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_cancelled_send_rolls_back() {
        let (stub, store, id) = seeded(1).await;
        let _release = stub.hold(Op::SendMessage);
        stub.respond(Op::SendMessage, ok(json!({"id": "m1", "isUser": true})));

        let send = tokio::spawn({
            let store = store.clone();
            let id = id.clone();
            async move { store.add_message(&id, "hello", true).await }
        });
        while stub.calls(Op::SendMessage) < 1 {
            tokio::task::yield_now().await;
        }
        send.abort();
        assert!(send.await.unwrap_err().is_cancelled());

        assert_eq!(ids(&store, &id), vec!["c1-m0"]);
        assert!(!store.is_message_loading(&id));
        assert!(!store.is_conversation_loading());
    }

    #[tokio::test]
    async fn test_local_preconditions() {
        let (stub, store, id) = seeded(1).await;

        let blank = store.add_message(&id, "  \n", true).await.unwrap_err();
        assert!(matches!(blank, StoreError::EmptyMessage));

        let missing = ConversationId::new("nope");
        let unknown = store.add_message(&missing, "hi", true).await.unwrap_err();
        assert!(matches!(unknown, StoreError::UnknownConversation(ref c) if c == &missing));

        assert_eq!(stub.calls(Op::SendMessage), 0);
    }

    #[tokio::test]
    async fn test_fetch_messages_shapes() {
        let (stub, store, id) = seeded(3).await;

        stub.respond(
            Op::ListMessages,
            json!([{"id": 1, "isUser": true, "content": "a"}, {"id": 2, "sender": "assistant"}]),
        );
        assert_eq!(store.fetch_messages(&id).await.unwrap(), 2);
        assert_eq!(ids(&store, &id), vec!["1", "2"]);
        assert!(!store.is_message_loading(&id));
        assert!(!store.is_conversation_loading());

        stub.respond(Op::ListMessages, json!({"data": [{"id": "x", "content": "b"}]}));
        assert_eq!(store.fetch_messages(&id).await.unwrap(), 1);

        stub.respond(Op::ListMessages, json!({"success": false}));
        assert_eq!(store.fetch_messages(&id).await.unwrap(), 0);
        assert!(store.conversation(&id).unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_messages_failure_propagates() {
        let (stub, store, id) = seeded(2).await;
        stub.fail(Op::ListMessages, 404);

        let err = store.fetch_messages(&id).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Gateway(GatewayError::Status { status: 404, .. })
        ));
        assert_eq!(ids(&store, &id), vec!["c1-m0", "c1-m1"]);
        assert!(!store.is_message_loading(&id));
        assert!(!store.is_conversation_loading());
    }

    #[tokio::test]
    async fn test_fetch_for_unknown_conversation_is_ignored() {
        let (stub, store, _) = seeded(1).await;
        stub.respond(Op::ListMessages, json!([{"id": "m1"}]));

        let ghost = ConversationId::new("ghost");
        assert_eq!(store.fetch_messages(&ghost).await.unwrap(), 1);
        assert!(store.conversation(&ghost).is_none());
    }
}

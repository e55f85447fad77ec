//! Scripted in-memory gateway for store tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::Notify;

use crate::domain::{ConversationId, GatewayError, GatewayResult};

use super::envelope::{ConversationRecord, Envelope, ListPayload, MessageRecord, NewMessage, SendReply};
use super::{ChatGateway, GatewayFuture};

/// Gateway operation, used to key scripts and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    ListConversations,
    CreateConversation,
    DeleteConversation,
    ListMessages,
    SendMessage,
}

/// Scripted answer: a JSON body, or a transport-level failure with a status.
#[derive(Clone, Debug)]
pub(crate) enum Scripted {
    Body(Value),
    Status(u16),
}

#[derive(Default)]
struct Script {
    answers: HashMap<Op, VecDeque<Scripted>>,
    calls: HashMap<Op, usize>,
    titles: Vec<String>,
    sent: Vec<NewMessage>,
    holds: HashMap<Op, Arc<Notify>>,
}

/// Gateway answering from per-operation queues; unscripted calls fail with 500.
#[derive(Default)]
pub(crate) struct StubGateway {
    script: Mutex<Script>,
}

impl StubGateway {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a JSON body for the next call of `op`.
    pub(crate) fn respond(&self, op: Op, body: Value) {
        self.push(op, Scripted::Body(body));
    }

    /// Queue a failing status for the next call of `op`.
    pub(crate) fn fail(&self, op: Op, status: u16) {
        self.push(op, Scripted::Status(status));
    }

    /// Make calls of `op` wait until the returned handle is notified.
    pub(crate) fn hold(&self, op: Op) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.lock().holds.insert(op, Arc::clone(&notify));
        notify
    }

    pub(crate) fn calls(&self, op: Op) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub(crate) fn titles(&self) -> Vec<String> {
        self.lock().titles.clone()
    }

    pub(crate) fn sent(&self) -> Vec<NewMessage> {
        self.lock().sent.clone()
    }

    fn push(&self, op: Op, answer: Scripted) {
        self.lock().answers.entry(op).or_default().push_back(answer);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn answer(&self, op: Op) -> GatewayResult<Value> {
        let (answer, hold) = {
            let mut script = self.lock();
            *script.calls.entry(op).or_default() += 1;
            let answer = script.answers.get_mut(&op).and_then(VecDeque::pop_front);
            (answer, script.holds.get(&op).cloned())
        };

        if let Some(hold) = hold {
            hold.notified().await;
        }

        match answer {
            Some(Scripted::Body(body)) => Ok(body),
            Some(Scripted::Status(status)) => Err(GatewayError::Status {
                status,
                reason: "scripted failure".to_string(),
            }),
            None => Err(GatewayError::Status {
                status: 500,
                reason: format!("no scripted answer for {op:?}"),
            }),
        }
    }
}

impl ChatGateway for StubGateway {
    fn list_conversations(&self) -> GatewayFuture<'_, GatewayResult<ListPayload<ConversationRecord>>> {
        Box::pin(async move { ListPayload::from_value(self.answer(Op::ListConversations).await?) })
    }

    fn create_conversation(
        &self,
        title: &str,
    ) -> GatewayFuture<'_, GatewayResult<Envelope<ConversationRecord>>> {
        self.lock().titles.push(title.to_string());
        Box::pin(async move { Envelope::from_value(self.answer(Op::CreateConversation).await?) })
    }

    fn delete_conversation(
        &self,
        _id: &ConversationId,
    ) -> GatewayFuture<'_, GatewayResult<Envelope<Value>>> {
        Box::pin(async move { Envelope::from_value(self.answer(Op::DeleteConversation).await?) })
    }

    fn list_messages(
        &self,
        _conversation_id: &ConversationId,
    ) -> GatewayFuture<'_, GatewayResult<ListPayload<MessageRecord>>> {
        Box::pin(async move { ListPayload::from_value(self.answer(Op::ListMessages).await?) })
    }

    fn send_message(&self, message: NewMessage) -> GatewayFuture<'_, GatewayResult<Envelope<SendReply>>> {
        self.lock().sent.push(message);
        Box::pin(async move { Envelope::from_value(self.answer(Op::SendMessage).await?) })
    }
}

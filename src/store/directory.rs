//! Conversation directory operations.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::domain::{Conversation, ConversationId, StoreError, StoreResult};
use crate::gateway::Envelope;

use super::state::{Action, ChatState, DeletePrompt};
use super::{ChatStore, LoadingScope, Outcome};

/// Reason given when a draft blocks creation.
pub const DRAFT_EXISTS: &str =
    "An empty conversation already exists. Send a message in it before starting a new one.";

impl ChatStore {
    /// Replace the local conversation set with the backend's list.
    ///
    /// Failures and unrecognized payloads leave an empty set; the number of
    /// conversations now held is returned.
    pub async fn fetch_conversations(&self) -> usize {
        self.try_fetch_conversations().await.unwrap_or(0)
    }

    /// Like [`ChatStore::fetch_conversations`], but reports a failed request.
    ///
    /// The local set is emptied on failure either way.
    ///
    /// # Errors
    /// Returns the gateway error when the list cannot be fetched or decoded.
    pub async fn try_fetch_conversations(&self) -> StoreResult<usize> {
        let _loading = self.begin(vec![LoadingScope::General]);

        let (conversations, result): (Vec<Conversation>, StoreResult<()>) =
            match self.gateway().list_conversations().await {
                Ok(payload) => {
                    if !payload.is_recognized() {
                        warn!("conversation list has an unexpected shape, treating it as empty");
                    }
                    let now = Utc::now();
                    let conversations = payload
                        .into_items()
                        .into_iter()
                        .map(|record| record.into_conversation(now))
                        .collect();
                    (conversations, Ok(()))
                }
                Err(err) => {
                    error!(error = %err, "failed to fetch conversations");
                    (Vec::new(), Err(err.into()))
                }
            };

        let count = conversations.len();
        self.dispatch(Action::ConversationsReplaced(conversations));
        debug!(count, "conversations replaced");
        result.map(|()| count)
    }

    /// Point the selection at a conversation, or clear it. Not validated.
    pub fn set_active_conversation(&self, id: Option<ConversationId>) {
        self.dispatch(Action::ActiveChanged(id));
    }

    /// Create a conversation, unless a draft already exists.
    ///
    /// An absent or blank title falls back to the configured default.
    pub async fn create_conversation(&self, title: Option<&str>) -> Outcome<Conversation> {
        let Some(_loading) = self.try_begin(
            vec![LoadingScope::Conversation, LoadingScope::Creation],
            ChatState::blocks_new_conversation,
        ) else {
            info!("conversation creation refused: draft exists");
            return Outcome::Refused(DRAFT_EXISTS.to_string());
        };

        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(self.config().default_title.as_str());

        let result = self
            .gateway()
            .create_conversation(title)
            .await
            .and_then(|envelope| envelope.into_data("conversation"));

        let outcome = Outcome::from_gateway(result).map(|record| {
            let mut conversation = record.into_conversation(Utc::now());
            conversation.messages.clear();
            conversation
        });

        match &outcome {
            Outcome::Completed(conversation) => {
                self.dispatch(Action::ConversationAdded(conversation.clone()));
                info!(id = %conversation.id, title = %conversation.title, "conversation created");
            }
            other => warn!(reason = ?other.message(), "conversation creation failed"),
        }
        outcome
    }

    /// Delete a conversation remotely, then locally on confirmed success.
    pub async fn delete_conversation(&self, id: &ConversationId) -> Outcome<()> {
        let _loading = self.begin(vec![LoadingScope::Conversation]);

        let result = self
            .gateway()
            .delete_conversation(id)
            .await
            .and_then(Envelope::ensure_success);
        let outcome = Outcome::from_gateway(result);

        if outcome.success() {
            self.dispatch(Action::ConversationRemoved(id.clone()));
            info!(%id, "conversation deleted");
        } else {
            warn!(%id, reason = ?outcome.message(), "conversation deletion failed");
        }
        outcome
    }

    /// Open the delete prompt for a known conversation.
    ///
    /// Returns `false` when the conversation is unknown.
    pub fn request_delete(&self, id: &ConversationId) -> bool {
        let Some(title) = self.read(|s| s.conversation(id).map(|c| c.title.clone())) else {
            return false;
        };
        self.dispatch(Action::DeletePrompted(DeletePrompt {
            conversation_id: id.clone(),
            title,
        }));
        true
    }

    /// Close the delete prompt without deleting.
    pub fn cancel_delete(&self) {
        self.dispatch(Action::DeletePromptCleared(None));
    }

    /// Delete the prompted conversation. The prompt is closed whatever the outcome.
    ///
    /// Returns `None` when no prompt is open.
    pub async fn confirm_delete(&self) -> Option<Outcome<()>> {
        let prompt = self.delete_prompt()?;
        let outcome = self.delete_conversation(&prompt.conversation_id).await;
        self.dispatch(Action::DeletePromptCleared(Some(prompt.conversation_id)));
        Some(outcome)
    }

    /// New-chat flow: create, select, send the first message, refetch.
    ///
    /// # Errors
    /// Returns an error if the message is blank, creation is refused or
    /// fails, or the first message cannot be sent. A failed refetch is only
    /// logged.
    pub async fn start_conversation(&self, first_message: &str) -> StoreResult<ConversationId> {
        if first_message.trim().is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let conversation = self.create_conversation(None).await.into_result()?;
        let id = conversation.id;
        self.set_active_conversation(Some(id.clone()));

        self.add_message(&id, first_message, true).await?;
        if let Err(err) = self.fetch_messages(&id).await {
            warn!(%id, error = %err, "refetch after first message failed");
        }
        Ok(id)
    }
}

//! Store state and its reducer.
//!
//! [`ChatState`] is an immutable snapshot. The only way to get a new one is
//! [`ChatState::apply`], a pure `(state, action) -> state` function; the
//! store swaps whole snapshots and never edits one in place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Conversation, ConversationId, Message, MessageId};

use super::loading::{LoadingCounters, LoadingScope};

/// A state transition.
#[derive(Clone, Debug)]
pub enum Action {
    /// Replace the whole conversation set.
    ConversationsReplaced(Vec<Conversation>),
    /// Add a newly created conversation, replacing one with the same id.
    ConversationAdded(Conversation),
    /// Drop a conversation after confirmed remote deletion.
    ConversationRemoved(ConversationId),
    /// Move the active-selection pointer.
    ActiveChanged(Option<ConversationId>),
    /// Open the delete prompt.
    DeletePrompted(DeletePrompt),
    /// Close the delete prompt if it targets this conversation (any prompt on `None`).
    DeletePromptCleared(Option<ConversationId>),
    /// Replace a conversation's messages with a fetched list.
    MessagesReplaced {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Fetched messages.
        messages: Vec<Message>,
        /// Time of the fetch.
        at: DateTime<Utc>,
    },
    /// Append an optimistic message.
    MessageStaged {
        /// Optimistic message; its `conversation_id` selects the target.
        message: Message,
        /// Insertion time.
        at: DateTime<Utc>,
    },
    /// Swap an optimistic message for its confirmed form.
    MessageConfirmed {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Id of the optimistic entry.
        temp_id: MessageId,
        /// Replacement messages, in list order.
        confirmed: Vec<Message>,
    },
    /// Remove an optimistic message after a failed send.
    MessageRolledBack {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Id of the optimistic entry.
        temp_id: MessageId,
    },
    /// Raise loading counters.
    LoadingStarted(Vec<LoadingScope>),
    /// Lower loading counters.
    LoadingFinished(Vec<LoadingScope>),
}

/// Pending confirmation for deleting a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeletePrompt {
    /// Conversation awaiting confirmation.
    pub conversation_id: ConversationId,
    /// Its title when the prompt opened.
    pub title: String,
}

/// One row of the conversation sidebar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Conversation id.
    pub id: ConversationId,
    /// Title as stored.
    pub title: String,
    /// Positional name, `Conversation N`, numbered oldest first.
    pub display_name: String,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Number of messages.
    pub message_count: usize,
    /// Whether this is the active conversation.
    pub is_active: bool,
}

/// Snapshot of everything the store knows.
#[derive(Clone, Debug, Default)]
pub struct ChatState {
    conversations: Vec<Conversation>,
    active_conversation_id: Option<ConversationId>,
    delete_prompt: Option<DeletePrompt>,
    loading: LoadingCounters,
}

impl ChatState {
    /// Apply one action and return the next snapshot.
    #[must_use]
    pub fn apply(mut self, action: Action) -> Self {
        match action {
            Action::ConversationsReplaced(conversations) => {
                self.conversations = conversations;
            }
            Action::ConversationAdded(conversation) => {
                match self.conversation_mut(&conversation.id) {
                    Some(existing) => *existing = conversation,
                    None => self.conversations.push(conversation),
                }
            }
            Action::ConversationRemoved(id) => {
                self.conversations.retain(|c| c.id != id);
                if self.active_conversation_id.as_ref() == Some(&id) {
                    self.active_conversation_id = None;
                }
                if self
                    .delete_prompt
                    .as_ref()
                    .is_some_and(|p| p.conversation_id == id)
                {
                    self.delete_prompt = None;
                }
                self.loading.forget(&id);
            }
            Action::ActiveChanged(id) => {
                self.active_conversation_id = id;
            }
            Action::DeletePrompted(prompt) => {
                self.delete_prompt = Some(prompt);
            }
            Action::DeletePromptCleared(target) => {
                let matches = match (&target, &self.delete_prompt) {
                    (None, _) => true,
                    (Some(id), Some(prompt)) => &prompt.conversation_id == id,
                    (Some(_), None) => false,
                };
                if matches {
                    self.delete_prompt = None;
                }
            }
            Action::MessagesReplaced {
                conversation_id,
                messages,
                at,
            } => {
                if let Some(conv) = self.conversation_mut(&conversation_id) {
                    conv.messages = messages;
                    conv.updated_at = at;
                }
            }
            Action::MessageStaged { message, at } => {
                if let Some(conv) = self.conversation_mut(&message.conversation_id) {
                    conv.messages.push(message);
                    conv.updated_at = at;
                }
            }
            Action::MessageConfirmed {
                conversation_id,
                temp_id,
                confirmed,
            } => {
                if let Some(conv) = self.conversation_mut(&conversation_id) {
                    splice_confirmed(conv, &temp_id, confirmed);
                }
            }
            Action::MessageRolledBack {
                conversation_id,
                temp_id,
            } => {
                if let Some(conv) = self.conversation_mut(&conversation_id) {
                    conv.messages.retain(|m| m.id != temp_id);
                }
            }
            Action::LoadingStarted(scopes) => {
                for scope in &scopes {
                    self.loading.acquire(scope);
                }
            }
            Action::LoadingFinished(scopes) => {
                for scope in &scopes {
                    self.loading.release(scope);
                }
            }
        }
        self
    }

    fn conversation_mut(&mut self, id: &ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| &c.id == id)
    }

    /// All known conversations, deleted ones included.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Conversations that are not soft-deleted.
    pub fn visible_conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter().filter(|c| !c.is_deleted)
    }

    /// Look up a conversation by id.
    #[must_use]
    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    /// Messages of a conversation; empty when unknown.
    #[must_use]
    pub fn messages(&self, id: &ConversationId) -> &[Message] {
        self.conversation(id).map_or(&[], |c| c.messages.as_slice())
    }

    /// Currently selected conversation id.
    #[must_use]
    pub const fn active_conversation_id(&self) -> Option<&ConversationId> {
        self.active_conversation_id.as_ref()
    }

    /// Currently selected conversation, if it is known.
    #[must_use]
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_conversation_id
            .as_ref()
            .and_then(|id| self.conversation(id))
    }

    /// Open delete prompt.
    #[must_use]
    pub const fn delete_prompt(&self) -> Option<&DeletePrompt> {
        self.delete_prompt.as_ref()
    }

    /// Whether a visible conversation without confirmed messages exists.
    #[must_use]
    pub fn has_draft(&self) -> bool {
        self.conversations.iter().any(Conversation::is_draft)
    }

    /// Whether creating a conversation must be refused right now: a draft
    /// exists, or a creation that will produce one is already in flight.
    #[must_use]
    pub fn blocks_new_conversation(&self) -> bool {
        self.has_draft() || self.loading.creating()
    }

    /// True only during a directory-wide fetch.
    #[must_use]
    pub fn general_loading(&self) -> bool {
        self.loading.general()
    }

    /// True during any create, delete, message fetch or send.
    #[must_use]
    pub fn conversation_loading(&self) -> bool {
        self.loading.conversation()
    }

    /// True while this conversation's messages are fetched or one is sent to it.
    #[must_use]
    pub fn message_loading(&self, id: &ConversationId) -> bool {
        self.loading.messages(id)
    }

    /// True while any conversation has message activity.
    #[must_use]
    pub fn any_message_loading(&self) -> bool {
        self.loading.any_messages()
    }

    /// Per-conversation message loading flags.
    #[must_use]
    pub fn message_loading_map(&self) -> HashMap<ConversationId, bool> {
        self.loading.message_map()
    }

    /// Sidebar rows: visible conversations, most recently updated first,
    /// named by creation order.
    #[must_use]
    pub fn directory_listing(&self) -> Vec<DirectoryEntry> {
        let mut by_created: Vec<&Conversation> = self.visible_conversations().collect();
        by_created.sort_by_key(|c| c.created_at);

        let mut entries: Vec<DirectoryEntry> = by_created
            .into_iter()
            .enumerate()
            .map(|(i, c)| DirectoryEntry {
                id: c.id.clone(),
                title: c.title.clone(),
                display_name: format!("Conversation {}", i + 1),
                updated_at: c.updated_at,
                message_count: c.messages.len(),
                is_active: self.active_conversation_id.as_ref() == Some(&c.id),
            })
            .collect();

        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        entries
    }
}

/// Put confirmed messages where the optimistic entry was.
///
/// Taking the temporary slot keeps confirmations in send order. When the
/// slot is gone (the list was refetched meanwhile), confirmed messages the
/// list does not already hold are appended.
fn splice_confirmed(conv: &mut Conversation, temp_id: &MessageId, confirmed: Vec<Message>) {
    let slot = conv.position_of(temp_id);
    let fresh: Vec<Message> = confirmed
        .into_iter()
        .filter(|m| &m.id == temp_id || !conv.contains_message(&m.id))
        .collect();

    match slot {
        Some(index) => {
            conv.messages.splice(index..=index, fresh);
        }
        None => conv.messages.extend(fresh),
    }
}

//! Scoped loading flags.
//!
//! Every flag is a reference count. Operations acquire a [`LoadingGuard`]
//! and the guard's `Drop` releases exactly what it acquired, on success,
//! on error, and when the owning future is dropped mid-flight.

use std::collections::HashMap;
use std::mem;

use crate::domain::ConversationId;

use super::ChatStore;
use super::state::Action;

/// One loading flag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LoadingScope {
    /// Directory-wide fetch.
    General,
    /// Any create, delete, message fetch or send.
    Conversation,
    /// A conversation creation is in flight.
    Creation,
    /// Message activity on one conversation.
    Messages(ConversationId),
}

/// Counters behind the loading flags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LoadingCounters {
    general: u32,
    conversation: u32,
    creating: u32,
    messages: HashMap<ConversationId, u32>,
}

impl LoadingCounters {
    pub(crate) fn acquire(&mut self, scope: &LoadingScope) {
        match scope {
            LoadingScope::General => self.general += 1,
            LoadingScope::Conversation => self.conversation += 1,
            LoadingScope::Creation => self.creating += 1,
            LoadingScope::Messages(id) => *self.messages.entry(id.clone()).or_default() += 1,
        }
    }

    pub(crate) fn release(&mut self, scope: &LoadingScope) {
        match scope {
            LoadingScope::General => self.general = self.general.saturating_sub(1),
            LoadingScope::Conversation => {
                self.conversation = self.conversation.saturating_sub(1);
            }
            LoadingScope::Creation => self.creating = self.creating.saturating_sub(1),
            LoadingScope::Messages(id) => {
                if let Some(count) = self.messages.get_mut(id) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        self.messages.remove(id);
                    }
                }
            }
        }
    }

    /// Drop the per-conversation entry of a removed conversation.
    pub(crate) fn forget(&mut self, id: &ConversationId) {
        self.messages.remove(id);
    }

    pub(crate) const fn general(&self) -> bool {
        self.general > 0
    }

    pub(crate) const fn conversation(&self) -> bool {
        self.conversation > 0
    }

    pub(crate) const fn creating(&self) -> bool {
        self.creating > 0
    }

    pub(crate) fn messages(&self, id: &ConversationId) -> bool {
        self.messages.get(id).is_some_and(|count| *count > 0)
    }

    pub(crate) fn any_messages(&self) -> bool {
        self.messages.values().any(|count| *count > 0)
    }

    pub(crate) fn message_map(&self) -> HashMap<ConversationId, bool> {
        self.messages
            .iter()
            .map(|(id, count)| (id.clone(), *count > 0))
            .collect()
    }
}

/// Releases its scopes when dropped.
#[must_use = "loading flags are released as soon as the guard is dropped"]
pub struct LoadingGuard {
    store: ChatStore,
    scopes: Vec<LoadingScope>,
}

impl LoadingGuard {
    /// Wrap scopes that have already been acquired on `store`.
    pub(crate) const fn held(store: ChatStore, scopes: Vec<LoadingScope>) -> Self {
        Self { store, scopes }
    }

    /// Scopes this guard will release.
    #[must_use]
    pub fn scopes(&self) -> &[LoadingScope] {
        &self.scopes
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let scopes = mem::take(&mut self.scopes);
        if !scopes.is_empty() {
            self.store.dispatch(Action::LoadingFinished(scopes));
        }
    }
}

//! Chat store: the conversation directory, the message reconciler and the
//! loading tracker over one state cell.
//!
//! All state lives in a [`tokio::sync::watch`] channel holding a
//! [`ChatState`] snapshot. Writers go through [`ChatStore::dispatch`], which
//! runs the pure reducer inside `send_modify`, so each action lands
//! atomically and every subscriber sees whole snapshots.
//!
//! Operations are split by concern:
//! - [`directory`]: fetch, select, create, delete, delete prompt
//! - [`reconciler`]: message fetch, optimistic send, rollback

pub mod directory;
pub mod loading;
pub mod outcome;
pub mod reconciler;
pub mod state;

pub use loading::{LoadingGuard, LoadingScope};
pub use outcome::Outcome;
pub use state::{Action, ChatState, DeletePrompt, DirectoryEntry};

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

use crate::domain::{
    ChatSyncConfig, Conversation, ConversationId, GatewayResult, StoreConfig,
};
use crate::gateway::{ChatGateway, HttpGateway};

struct StoreInner {
    gateway: Arc<dyn ChatGateway>,
    state: watch::Sender<ChatState>,
    config: StoreConfig,
}

/// Shared handle to the chat state; cheap to clone.
#[derive(Clone)]
pub struct ChatStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for ChatStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStore")
            .field("state", &*self.inner.state.borrow())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ChatStore {
    /// Create a store over a gateway with default settings.
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self::with_config(gateway, StoreConfig::default())
    }

    /// Create a store over a gateway.
    #[must_use]
    pub fn with_config(gateway: Arc<dyn ChatGateway>, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                gateway,
                state: watch::Sender::new(ChatState::default()),
                config,
            }),
        }
    }

    /// Create a store talking HTTP to the configured backend.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn connect(config: &ChatSyncConfig) -> GatewayResult<Self> {
        config.validate()?;
        let gateway = HttpGateway::new(&config.gateway)?;
        Ok(Self::with_config(Arc::new(gateway), config.store.clone()))
    }

    pub(crate) fn gateway(&self) -> &dyn ChatGateway {
        self.inner.gateway.as_ref()
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Apply an action to the current state.
    pub fn dispatch(&self, action: Action) {
        trace!(?action, "dispatch");
        self.inner
            .state
            .send_modify(|state| *state = mem::take(state).apply(action));
    }

    /// Acquire loading scopes unless `refuse` holds for the current state.
    ///
    /// Check and acquisition happen in one state update.
    pub(crate) fn try_begin(
        &self,
        scopes: Vec<LoadingScope>,
        refuse: impl FnOnce(&ChatState) -> bool,
    ) -> Option<LoadingGuard> {
        let mut pending = Some(scopes.clone());
        self.inner.state.send_if_modified(|state| {
            if refuse(state) {
                pending = None;
                return false;
            }
            *state = mem::take(state).apply(Action::LoadingStarted(scopes));
            true
        });
        pending.map(|scopes| LoadingGuard::held(self.clone(), scopes))
    }

    /// Acquire loading scopes for the lifetime of the returned guard.
    pub fn begin(&self, scopes: Vec<LoadingScope>) -> LoadingGuard {
        self.dispatch(Action::LoadingStarted(scopes.clone()));
        LoadingGuard::held(self.clone(), scopes)
    }

    /// Current state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ChatState {
        self.inner.state.borrow().clone()
    }

    /// Change feed of whole-state snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.inner.state.subscribe()
    }

    fn read<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// All known conversations, deleted ones included.
    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.read(|s| s.conversations().to_vec())
    }

    /// Conversations that are not soft-deleted.
    #[must_use]
    pub fn visible_conversations(&self) -> Vec<Conversation> {
        self.read(|s| s.visible_conversations().cloned().collect())
    }

    /// Look up a conversation by id.
    #[must_use]
    pub fn conversation(&self, id: &ConversationId) -> Option<Conversation> {
        self.read(|s| s.conversation(id).cloned())
    }

    /// Currently selected conversation id.
    #[must_use]
    pub fn active_conversation_id(&self) -> Option<ConversationId> {
        self.read(|s| s.active_conversation_id().cloned())
    }

    /// Currently selected conversation, if known.
    #[must_use]
    pub fn active_conversation(&self) -> Option<Conversation> {
        self.read(|s| s.active_conversation().cloned())
    }

    /// Open delete prompt.
    #[must_use]
    pub fn delete_prompt(&self) -> Option<DeletePrompt> {
        self.read(|s| s.delete_prompt().cloned())
    }

    /// Sidebar rows, most recently updated first.
    #[must_use]
    pub fn directory_listing(&self) -> Vec<DirectoryEntry> {
        self.read(ChatState::directory_listing)
    }

    /// True only during a directory fetch.
    #[must_use]
    pub fn is_general_loading(&self) -> bool {
        self.read(ChatState::general_loading)
    }

    /// True during any create, delete, message fetch or send.
    #[must_use]
    pub fn is_conversation_loading(&self) -> bool {
        self.read(ChatState::conversation_loading)
    }

    /// True while this conversation has message activity.
    #[must_use]
    pub fn is_message_loading(&self, id: &ConversationId) -> bool {
        self.read(|s| s.message_loading(id))
    }

    /// True while any conversation has message activity.
    #[must_use]
    pub fn is_any_message_loading(&self) -> bool {
        self.read(ChatState::any_message_loading)
    }

    /// Per-conversation message loading flags.
    #[must_use]
    pub fn message_loading(&self) -> HashMap<ConversationId, bool> {
        self.read(ChatState::message_loading_map)
    }
}

//! Core chat types: identifiers, conversations, messages, errors and configuration.

pub mod config;
pub mod conversation;
pub mod errors;
pub mod ids;

pub use config::{ChatSyncConfig, DEFAULT_TITLE, GatewayConfig, RouteStyle, StoreConfig};
pub use conversation::{Conversation, Message, Sender};
pub use errors::{GatewayError, GatewayResult, StoreError, StoreResult};
pub use ids::{ConversationId, MessageId, TempMessageId};

//! Client-side state core for a chat application, in a strictly linted crate.
//!
//! A [`ChatStore`] keeps the conversation directory, reconciles optimistic
//! messages with the backend, and tracks loading flags. It reaches the
//! backend through a [`ChatGateway`]; [`HttpGateway`] is the REST client.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![warn(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![warn(dead_code)] // Le code inutilisé est signalé
#![deny(non_camel_case_types)]
// Les types doivent suivre la convention CamelCase

// Options supplémentaires pour ne rien laisser passer
#![warn(unused_imports)] // Les imports inutilisés sont signalés
#![warn(unused_variables)] // Les variables inutilisées sont signalées
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(non_snake_case)] // Les noms de variables et fonctions doivent être en snake_case
#![deny(non_upper_case_globals)] // Les constantes et globals doivent être en MAJUSCULE
#![deny(nonstandard_style)] // Empêche tout style de code non standard
#![forbid(unsafe_op_in_unsafe_fn)]
// Interdit l'utilisation d'unsafe même dans une fonction unsafe

// Clippy pour stricte discipline
#![warn(clippy::all)] // Active toutes les lints Clippy standard
#![warn(clippy::pedantic)] // Active les lints très strictes de Clippy
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)] // Interdit les TODO dans le code
#![deny(clippy::unimplemented)] // Interdit les fonctions non implémentées
#![warn(clippy::missing_const_for_fn)] // Force const lorsque possible
#![deny(clippy::unwrap_in_result)] // Interdit unwrap() sur Result
#![deny(clippy::module_inception)] // Interdit un module ayant le même nom que le crate
#![warn(clippy::redundant_clone)] // Signale les clones inutiles
#![deny(clippy::too_many_arguments)] // Limite le nombre d’arguments des fonctions
#![warn(clippy::cognitive_complexity)] // Limite la complexité cognitive des fonctions
// Les tests gardent unwrap() et panic!()
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// Lints pour sécurité et robustesse
#![deny(overflowing_literals)] // Interdit les littéraux qui débordent

/// Conversations, messages, identifiers, errors and configuration.
pub mod domain;
/// Remote gateway: wire shapes and the HTTP client.
pub mod gateway;
/// Entry helpers for the `chat-sync` binary.
pub mod start_chat_sync;
/// The chat store: directory, reconciler and loading tracker.
pub mod store;

pub use domain::{
    ChatSyncConfig, Conversation, ConversationId, GatewayError, Message, MessageId, Sender,
    StoreError,
};
pub use gateway::{ChatGateway, HttpGateway};
pub use store::{ChatState, ChatStore, Outcome};

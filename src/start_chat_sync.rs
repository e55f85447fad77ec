//! Entry helpers for the `chat-sync` command-line client.
//!
//! The binary builds a [`ChatStore`] from the environment, runs one command
//! against the backend and prints the result on stdout. Logs go to stderr.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, bail};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::domain::{ChatSyncConfig, ConversationId, Message};
use crate::store::ChatStore;

/// Usage text printed on invalid arguments.
pub const USAGE: &str = "\
usage: chat-sync <command>

commands:
  list                    list conversations
  create [title]          create a conversation
  messages <id>           show the messages of a conversation
  send <id> <text>        send a message to a conversation
  new <text>              start a conversation with a first message
  delete <id>             delete a conversation

environment:
  CHAT_SYNC_BACKEND_URL   backend base URL (default http://localhost:8080)
  CHAT_SYNC_ROUTES        proxy | backend
  CHAT_SYNC_TIMEOUT_SECS  request timeout in seconds
  RUST_LOG                log filter (default info)";

/// Invalid command line.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct UsageError(String);

/// A parsed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `list`
    List,
    /// `create [title]`
    Create(Option<String>),
    /// `messages <id>`
    Messages(ConversationId),
    /// `send <id> <text>`
    Send(ConversationId, String),
    /// `new <text>`
    New(String),
    /// `delete <id>`
    Delete(ConversationId),
}

impl Command {
    /// Parse arguments (without the program name).
    ///
    /// # Errors
    /// Returns a [`UsageError`] for unknown commands or missing arguments.
    pub fn parse<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Err(UsageError("missing command".to_string()));
        };
        let rest: Vec<String> = args.collect();

        match (name.as_str(), rest.as_slice()) {
            ("list", []) => Ok(Self::List),
            ("create", []) => Ok(Self::Create(None)),
            ("create", words) => Ok(Self::Create(Some(words.join(" ")))),
            ("messages", [id]) => Ok(Self::Messages(ConversationId::new(id.as_str()))),
            ("send", [id, words @ ..]) if !words.is_empty() => Ok(Self::Send(
                ConversationId::new(id.as_str()),
                words.join(" "),
            )),
            ("new", words) if !words.is_empty() => Ok(Self::New(words.join(" "))),
            ("delete", [id]) => Ok(Self::Delete(ConversationId::new(id.as_str()))),
            ("list" | "create" | "messages" | "send" | "new" | "delete", _) => {
                Err(UsageError(format!("wrong arguments for `{name}`")))
            }
            _ => Err(UsageError(format!("unknown command `{name}`"))),
        }
    }
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the `info` default.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Run the client (used by the `chat-sync` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` when the command succeeds, `1` on failure, `2` on
/// usage errors.
#[must_use]
pub fn run<I>(args: I) -> ExitCode
where
    I: IntoIterator<Item = String>,
{
    let command = match Command::parse(args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("chat-sync: {e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    init_tracing();
    tracing::debug!("chat-sync v{}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = rt.block_on(async {
        let config = ChatSyncConfig::from_env().context("invalid configuration")?;
        let store = ChatStore::connect(&config).context("failed to build client")?;
        execute(&store, command, &mut io::stdout().lock()).await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Run one command against a store, writing its output to `out`.
///
/// # Errors
/// Returns an error if the conversation list cannot be fetched, a backend
/// call fails, the conversation is unknown, or `out` cannot be written.
pub async fn execute<W: Write>(store: &ChatStore, command: Command, out: &mut W) -> anyhow::Result<()> {
    store
        .try_fetch_conversations()
        .await
        .context("could not fetch conversations")?;

    match command {
        Command::List => {
            for entry in store.directory_listing() {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{} messages",
                    entry.id, entry.display_name, entry.title, entry.message_count
                )?;
            }
        }
        Command::Create(title) => {
            let conversation = store
                .create_conversation(title.as_deref())
                .await
                .into_result()
                .context("could not create conversation")?;
            writeln!(out, "{}\t{}", conversation.id, conversation.title)?;
        }
        Command::Messages(id) => {
            ensure_known(store, &id)?;
            store
                .fetch_messages(&id)
                .await
                .with_context(|| format!("could not fetch messages of {id}"))?;
            let messages = store.conversation(&id).map(|c| c.messages).unwrap_or_default();
            print_messages(out, &messages)?;
        }
        Command::Send(id, text) => {
            ensure_known(store, &id)?;
            let confirmed = store
                .add_message(&id, &text, true)
                .await
                .with_context(|| format!("could not send to {id}"))?;
            print_messages(out, &confirmed)?;
        }
        Command::New(text) => {
            let id = store
                .start_conversation(&text)
                .await
                .context("could not start a conversation")?;
            writeln!(out, "{id}")?;
            let messages = store.conversation(&id).map(|c| c.messages).unwrap_or_default();
            print_messages(out, &messages)?;
        }
        Command::Delete(id) => {
            ensure_known(store, &id)?;
            if !store.request_delete(&id) {
                bail!("unknown conversation {id}");
            }
            store
                .confirm_delete()
                .await
                .context("delete prompt was closed")?
                .into_result()
                .with_context(|| format!("could not delete {id}"))?;
            writeln!(out, "deleted {id}")?;
        }
    }
    Ok(())
}

fn ensure_known(store: &ChatStore, id: &ConversationId) -> anyhow::Result<()> {
    if store.conversation(id).is_none() {
        bail!("unknown conversation {id}");
    }
    Ok(())
}

fn print_messages<W: Write>(out: &mut W, messages: &[Message]) -> io::Result<()> {
    for message in messages {
        writeln!(out, "[{}] {}: {}", message.id, message.sender, message.content)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::gateway::stub::{Op, StubGateway};
    use crate::store::test_support::conversation_json;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(args("list")), Ok(Command::List));
        assert_eq!(Command::parse(args("create")), Ok(Command::Create(None)));
        assert_eq!(
            Command::parse(args("create Trip plans")),
            Ok(Command::Create(Some("Trip plans".to_string())))
        );
        assert_eq!(
            Command::parse(args("send c1 hello there")),
            Ok(Command::Send(ConversationId::new("c1"), "hello there".to_string()))
        );
        assert_eq!(
            Command::parse(args("delete 7")),
            Ok(Command::Delete(ConversationId::new("7")))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse(Vec::new()).is_err());
        assert!(Command::parse(args("send c1")).is_err());
        assert!(Command::parse(args("messages")).is_err());
        assert!(Command::parse(args("new")).is_err());
        assert_eq!(
            Command::parse(args("frobnicate")),
            Err(UsageError("unknown command `frobnicate`".to_string()))
        );
    }

    #[test]
    fn test_usage_exit_code() {
        assert_eq!(run(args("bogus")), ExitCode::from(2));
    }

    #[tokio::test]
    async fn test_list_output() {
        let stub = StubGateway::new();
        let store = ChatStore::new(stub.clone());
        stub.respond(
            Op::ListConversations,
            json!([conversation_json("c1", 2), conversation_json("c2", 0)]),
        );

        let mut out = Vec::new();
        execute(&store, Command::List, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("c1\tConversation 1\ttitle c1\t2 messages"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_list() {
        let stub = StubGateway::new();
        let store = ChatStore::new(stub.clone());
        stub.fail(Op::ListConversations, 503);

        let mut out = Vec::new();
        let err = execute(&store, Command::List, &mut out).await.unwrap_err();

        assert!(err.to_string().contains("could not fetch conversations"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_send_to_unknown_conversation_fails() {
        let stub = StubGateway::new();
        let store = ChatStore::new(stub.clone());
        stub.respond(Op::ListConversations, json!([]));

        let mut out = Vec::new();
        let err = execute(&store, Command::Send(ConversationId::new("x"), "hi".to_string()), &mut out)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unknown conversation x"));
        assert_eq!(stub.calls(Op::SendMessage), 0);
    }

    #[tokio::test]
    async fn test_delete_output() {
        let stub = StubGateway::new();
        let store = ChatStore::new(stub.clone());
        stub.respond(Op::ListConversations, json!([conversation_json("c1", 1)]));
        stub.respond(Op::DeleteConversation, json!({"success": true}));

        let mut out = Vec::new();
        execute(&store, Command::Delete(ConversationId::new("c1")), &mut out)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "deleted c1\n");
        assert!(store.conversations().is_empty());
    }
}

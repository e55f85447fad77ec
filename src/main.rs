//! Binary entrypoint for the `chat-sync` client.

use std::process::ExitCode;

use chat_sync::start_chat_sync;

/// Run one command against the configured chat backend.
fn main() -> ExitCode {
    start_chat_sync::run(std::env::args().skip(1))
}

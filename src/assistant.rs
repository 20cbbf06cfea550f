//! `bdesk ask` and `bdesk chat`: the assistant panel on the command line.
//!
//! Replies are computed immediately; the configured delay only holds back
//! printing, mirroring the dashboard's "typing" pause.

use anyhow::Result;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use batch_desk_core::interpreter::{Interpreter, Reply};
use batch_desk_core::store::{BatchStore, BlobStore};

use crate::config::Config;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sqlite_store::open_store;

const GREETING: &str = "Hi! I'm your AI assistant. I can help you with job assignments, \
data filtering, and analytics. Try commands like 'Assign jobs X, Y, Z in Batch-1 to \
user@email.com' or 'How many jobs are pending in Batch-1?'";

/// Answer a single command.
pub async fn run_ask(config: &Config, text: &str, progress: &dyn ProgressReporter) -> Result<()> {
    let store = open_store(config).await?;
    let reply = answer(config, &store, text, progress).await?;
    print_reply(&reply);
    Ok(())
}

/// Read commands from stdin, one per line, until EOF or `exit`.
pub async fn run_chat(config: &Config, progress: &dyn ProgressReporter) -> Result<()> {
    let store = open_store(config).await?;
    println!("{}", GREETING);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text, "exit" | "quit") {
            break;
        }
        let reply = answer(config, &store, text, progress).await?;
        println!();
        print_reply(&reply);
    }
    Ok(())
}

async fn answer<B: BlobStore>(
    config: &Config,
    store: &BatchStore<B>,
    text: &str,
    progress: &dyn ProgressReporter,
) -> Result<Reply> {
    let reply = Interpreter::new(store)
        .assigned_by(config.assistant.assigned_by.clone())
        .respond(text)
        .await?;

    if config.assistant.reply_delay_ms > 0 {
        progress.report(ProgressEvent::Typing);
        tokio::time::sleep(Duration::from_millis(config.assistant.reply_delay_ms)).await;
    }
    Ok(reply)
}

fn print_reply(reply: &Reply) {
    println!("{}", reply.content);
    for action in &reply.actions {
        let mark = if action.success { "ok" } else { "failed" };
        println!("  [{} {}] {}", action.kind.as_str(), mark, action.message);
    }
}

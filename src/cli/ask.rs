use anyhow::Result;

use crate::ai::chat::{ChatSession, CompletionClient};
use crate::core::AppConfig;

pub async fn run(config: &AppConfig, message: &str, json: bool) -> Result<()> {
    let client = CompletionClient::from_config(config);
    let mut session = ChatSession::new(&config.greeting);
    session.open();

    // Blank input is ignored like it is in the chat, nothing to print
    let Some(reply) = session.submit(&client, message).await else {
        tracing::debug!("Ignoring blank message");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(session.transcript())?);
    } else {
        println!("{}", reply.text());
    }

    Ok(())
}

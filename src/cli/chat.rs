use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::ai::chat::{ChatSession, ChatState, CompletionClient, Role, TranscriptEvent};
use crate::core::AppConfig;

const RESET_COMMAND: &str = "/reset";

fn render(rx: &mut mpsc::UnboundedReceiver<TranscriptEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            // The user's own turns are already on screen
            TranscriptEvent::Appended(turn) if turn.role() == Role::Assistant => {
                println!("{}\n", turn.text());
            }
            TranscriptEvent::StateChanged(ChatState::Sending) => {
                println!("...");
            }
            TranscriptEvent::Reset => {
                println!("--- new conversation ---\n");
            }
            _ => {}
        }
    }
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let client = CompletionClient::from_config(config);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = ChatSession::new(&config.greeting).events(tx);

    session.open();
    render(&mut rx);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                if line.trim() == RESET_COMMAND {
                    session.reset();
                    render(&mut rx);
                    continue;
                }

                // Blank lines are ignored by the session
                let Some(pending) = session.begin(&line) else {
                    continue;
                };
                let _ = rl.add_history_entry(line.as_str());
                render(&mut rx);

                let turn = client.complete(pending.transcript()).await;
                session.finish(pending, turn);
                render(&mut rx);
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    session.close();
    tracing::debug!(
        "Chat session {} ended with {} turns",
        session.session_id(),
        session.transcript().len()
    );

    Ok(())
}

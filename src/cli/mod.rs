use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod ask;
pub mod chat;
pub mod persona;

use crate::core::AppConfig;

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Start an interactive chat with the portfolio assistant
    Chat {},
    /// Ask a single question and print the reply
    Ask {
        #[arg(long)]
        message: String,
        /// Print the whole transcript as JSON instead of the reply
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Print the system instruction sent with every request
    Persona {},
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Total attempts per message, overrides FOLIO_MAX_RETRIES
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// First backoff delay, overrides FOLIO_BASE_DELAY_MS
    #[arg(long, global = true)]
    base_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

// Logs go to stderr so they don't interleave with the conversation
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    let mut config = AppConfig::from_env()?;
    if let Some(max_retries) = args.max_retries {
        config.max_retries = max_retries;
    }
    if let Some(base_delay_ms) = args.base_delay_ms {
        config.base_delay_ms = base_delay_ms;
    }

    // Handle each sub command
    match args.command {
        Some(Command::Chat {}) => {
            chat::run(&config).await?;
        }
        Some(Command::Ask { message, json }) => {
            ask::run(&config, &message, json).await?;
        }
        Some(Command::Persona {}) => {
            persona::run(&config);
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_ask_with_global_overrides() {
        let cli = Cli::try_parse_from([
            "folio",
            "ask",
            "--message",
            "What does he do?",
            "--json",
            "--max-retries",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.max_retries, Some(5));
        assert_eq!(cli.base_delay_ms, None);
        assert_eq!(
            cli.command,
            Some(Command::Ask {
                message: String::from("What does he do?"),
                json: true
            })
        );
    }

    #[test]
    fn it_requires_a_message_for_ask() {
        assert!(Cli::try_parse_from(["folio", "ask"]).is_err());
    }
}

//! Advisor CLI
//!
//! Streams a generated chat reply or recommendation from the backend to
//! stdout. Ctrl-C stops the in-flight generation; whatever content already
//! arrived stays on screen.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use advisor_core::auth::{StaticTokenProvider, StoredTokenProvider, TokenProvider};
use advisor_core::config::ClientConfig;
use advisor_core::stream::{GenerationMode, HttpTransport, SessionCoordinator, SessionState};

#[derive(Parser)]
#[command(name = "advisor", about = "Stream AI generations from the advisor backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream a chat reply within a conversation session
    Reply {
        /// Conversation session id
        #[arg(long)]
        session: Uuid,
        /// The message to send
        message: String,
    },
    /// Stream the initial recommendation for a conversation session
    Recommend {
        /// Conversation session id
        #[arg(long)]
        session: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::load().context("loading configuration")?;

    let tokens: Arc<dyn TokenProvider> = match std::env::var("ADVISOR_TOKEN") {
        Ok(token) => Arc::new(StaticTokenProvider::new(token)),
        Err(_) => Arc::new(StoredTokenProvider::new(config.token_path.clone())),
    };
    let coordinator = SessionCoordinator::new(
        config.base_url.clone(),
        Arc::new(HttpTransport::new()),
        tokens,
    );

    let mode = match cli.command {
        Command::Reply { session, message } => GenerationMode::Reply {
            session_id: session,
            content: message,
        },
        Command::Recommend { session } => GenerationMode::Recommendation {
            session_id: session,
        },
    };

    let mut rx = coordinator.subscribe();
    coordinator.start(mode).await?;

    let mut printed = 0usize;
    let final_state = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                coordinator.cancel();
            }
            changed = rx.changed() => {
                changed.context("coordinator dropped")?;
                let snap = rx.borrow().clone();
                if snap.content.len() > printed {
                    print!("{}", &snap.content[printed..]);
                    std::io::stdout().flush()?;
                    printed = snap.content.len();
                }
                if snap.state.is_terminal() {
                    break snap;
                }
            }
        }
    };

    println!();
    match final_state.state {
        SessionState::Complete => Ok(()),
        SessionState::Cancelled => {
            eprintln!("generation cancelled");
            Ok(())
        }
        SessionState::Error => {
            let detail = final_state
                .error_detail
                .unwrap_or_else(|| "unknown error".to_string());
            bail!("generation failed: {detail}");
        }
        // Terminal loop only exits on terminal states
        SessionState::Idle | SessionState::Streaming => unreachable!(),
    }
}

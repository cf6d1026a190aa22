//! Windlass CLI entry point.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use windlass::agent::Engine;
use windlass::checkpoint::CheckpointStore;
use windlass::config::EngineConfig;
use windlass::provider::OpenAiProvider;
use windlass::session::{format_task_list, SessionState};
use windlass::tools::{register_builtin_tools, ToolRegistry};

#[derive(Parser)]
#[command(name = "windlass", version, about = "Resumable agent orchestration engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send an input to the agent and run the loop to completion
    Chat {
        /// The user input
        input: String,
        /// Continue an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },
    /// Answer a pending human review and continue a suspended session
    Resume {
        /// The suspended session id
        session: String,
        /// The review answer: approve, reject, or modification feedback
        answer: String,
    },
    /// Print the latest state of a session
    State {
        /// The session id
        session: String,
    },
    /// Print the checkpoint history of a session
    History {
        /// The session id
        session: String,
    },
    /// List all known sessions
    Sessions,
}

fn build_engine() -> anyhow::Result<Engine> {
    let config = EngineConfig::load().context("loading configuration")?;

    let api_key = std::env::var("WINDLASS_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .context("WINDLASS_API_KEY or OPENAI_API_KEY must be set")?;
    let provider = match std::env::var("WINDLASS_API_BASE") {
        Ok(base) => OpenAiProvider::with_base_url(&api_key, &base),
        Err(_) => OpenAiProvider::new(&api_key),
    };

    let mut tools = ToolRegistry::new();
    register_builtin_tools(&mut tools);

    let checkpoints = CheckpointStore::with_path(EngineConfig::dir().join("checkpoints"))
        .context("opening checkpoint store")?;

    Ok(Engine::new(config, Arc::new(provider), tools, checkpoints))
}

/// Print the outcome of a finished or suspended run.
fn report(state: &SessionState) {
    if let Some(prompt) = Engine::pending_review_prompt(state) {
        println!("{}", prompt);
        println!();
        println!(
            "Session suspended. Continue with: windlass resume {} \"<answer>\"",
            state.session_id
        );
        return;
    }

    if let Some(text) = state.last_assistant_text() {
        println!("{}", text);
    }
    println!();
    println!("[session: {} | status: {}]", state.session_id, state.status);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Chat { input, session } => {
            let engine = build_engine()?;
            let state = engine.invoke(&input, session.as_deref()).await?;
            report(&state);
        }
        Command::Resume { session, answer } => {
            let engine = build_engine()?;
            let state = engine.resume(&session, &answer).await?;
            report(&state);
        }
        Command::State { session } => {
            let engine = build_engine()?;
            match engine.get_state(&session).await? {
                Some(state) => {
                    println!("session:  {}", state.session_id);
                    println!("status:   {}", state.status);
                    println!("messages: {}", state.message_count());
                    println!("review:   {}", state.requires_human_review);
                    println!("compressions: {}", state.compression_history.len());
                    if !state.task_list.is_empty() {
                        println!("tasks:\n{}", format_task_list(&state.task_list));
                    }
                }
                None => bail!("Unknown session '{}'", session),
            }
        }
        Command::History { session } => {
            let engine = build_engine()?;
            let history = engine.get_state_history(&session).await?;
            if history.is_empty() {
                bail!("No history for session '{}'", session);
            }
            for (i, state) in history.iter().enumerate() {
                println!(
                    "{:>4}  {}  status={} messages={}",
                    i,
                    state.updated_at.format("%Y-%m-%d %H:%M:%S"),
                    state.status,
                    state.message_count()
                );
            }
        }
        Command::Sessions => {
            let engine = build_engine()?;
            for id in engine.checkpoints().list().await? {
                println!("{}", id);
            }
        }
    }

    Ok(())
}

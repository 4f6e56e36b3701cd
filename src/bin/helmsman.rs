use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use helmsman::assembler::{ContextAssembler, TurnRequest};
use helmsman::config::AssistantConfig;
use helmsman::guided::{GuidedMode, GuidedSession};
use helmsman::llm_client::{LlmClient, Message};
use helmsman::store::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,helmsman=debug")),
        )
        .init();

    let config = AssistantConfig::load();
    let store = Arc::new(
        SqliteStore::open(&config.database_path)
            .context("failed to open the helmsman store")?,
    );
    let assembler = ContextAssembler::new(
        store.clone(),
        config.persona.clone(),
        config.tier_ceilings,
        Duration::from_millis(config.fetch_timeout_ms),
        config.rim_interval_days,
    );
    let llm = LlmClient::new(
        config.llm_api_url.clone(),
        config.llm_api_key.clone().unwrap_or_default(),
        config.llm_model.clone(),
    );

    tracing::info!("Helmsman chat loop ready (model: {})", config.llm_model);
    println!("Type a message, or /start <mode>, /pause, /resume, /ready, /archive, /quit.");
    println!("Page defaults to 'crowsnest'; switch with /page <name>.");

    let mut page = "crowsnest".to_string();
    let mut session: Option<GuidedSession> = None;
    let mut history: Vec<Message> = Vec::new();

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('/') {
            if handle_command(rest, &assembler, &mut page, &mut session).await? {
                break;
            }
            continue;
        }

        let request = TurnRequest {
            message: line.to_string(),
            page: page.clone(),
            session_id: session.as_ref().map(|s| s.id.clone()),
            tier: config.default_budget_tier(),
        };
        let assembled = assembler.assemble_turn(&request).await?;
        tracing::debug!(
            "Prompt uses {} tokens across {} sections",
            assembled.prompt.used_tokens,
            assembled.prompt.admitted.len()
        );

        history.push(Message::user(line));
        let reply = match llm.send(&assembled.prompt.text, &history).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("LLM call failed: {}", e);
                history.pop();
                continue;
            }
        };
        println!("{}", reply);
        history.push(Message::assistant(reply.clone()));

        if let Some(loaded) = assembled.session {
            session = Some(loaded);
        }
        if let Some(active) = session.as_mut() {
            let outcome = assembler.ingest_reply(active, &reply).await?;
            for step in &outcome.saved_steps {
                println!("[saved {}]", step);
            }
            if outcome.needs_reprompt() {
                println!("[a step could not be saved; please confirm it again]");
            }
            if outcome.completed {
                println!("[session complete]");
            }
        }
    }

    Ok(())
}

/// Returns true when the loop should exit.
async fn handle_command(
    command: &str,
    assembler: &ContextAssembler,
    page: &mut String,
    session: &mut Option<GuidedSession>,
) -> Result<bool> {
    let mut parts = command.splitn(2, ' ');
    match (parts.next().unwrap_or(""), parts.next()) {
        ("quit", _) | ("exit", _) => return Ok(true),
        ("page", Some(name)) => {
            *page = name.trim().to_string();
            println!("[page: {}]", page);
        }
        ("start", Some(raw)) => match GuidedMode::from_db(raw.trim()) {
            Some(mode) => {
                let started = assembler.engine().start(mode, None).await?;
                println!("[started {} session {}]", mode.as_db_str(), started.id);
                *session = Some(started);
            }
            None => {
                let known: Vec<&str> = GuidedMode::ALL.iter().map(|m| m.as_db_str()).collect();
                println!("[unknown mode; try one of: {}]", known.join(", "));
            }
        },
        ("pause", _) => {
            if let Some(active) = session.as_mut() {
                assembler.engine().pause(active).await?;
                println!("[paused]");
            }
        }
        ("resume", _) => {
            if let Some(active) = session.as_mut() {
                assembler.engine().resume(active).await?;
                println!("[resumed at step {}]", active.current_step + 1);
            }
        }
        ("ready", _) => {
            if let Some(active) = session.as_mut() {
                match assembler.engine().promote_ready(active).await {
                    Ok(()) => println!("[promoted; rim check-ins open]"),
                    Err(e) => println!("[{}]", e),
                }
            }
        }
        ("archive", _) => {
            if let Some(active) = session.as_mut() {
                assembler.engine().archive(active).await?;
                println!("[archived]");
                *session = None;
            }
        }
        _ => println!("[unknown command]"),
    }
    Ok(false)
}

// CLI module
// Public interface for the command-line surface

mod args;
mod commands;
mod orders;
mod repl;
mod session;

pub use args::{Cli, Commands, GlobalArgs, OrdersCommand, PlaceArgs};
pub use commands::{format_help, Command};
pub use orders::handle_orders;
pub use repl::{trace_line, Repl};
pub use session::{ChatMessage, ChatRole, ChatSession, GREETING};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::style::Stylize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::agent::{AgentProfile, EscalationRequest, SqlAgent};
use crate::config::{resolve_config, Config};
use crate::db::{self, Database, SqlDatabase};
use crate::logging::init_logging;
use crate::orders::OrderStore;
use crate::providers::{create_provider, LlmProvider};

/// Entry point behind `main`: resolve configuration, open the database,
/// and dispatch the subcommand (interactive chat by default).
pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.global.config.as_deref(), cli.global.overrides())?;
    init_logging(config.features.debug_logging)?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let agent = build_agent(&config).await?;
            Repl::new(agent).run().await
        }
        Commands::Ask { question } => {
            let agent = build_agent(&config).await?;
            let answer = ask_once(&agent, &question.join(" ")).await?;
            println!("{}", answer);
            Ok(())
        }
        Commands::Escalate {
            name,
            role,
            state,
            issue,
        } => {
            let agent = build_agent(&escalation_config(&config)).await?;
            let request = EscalationRequest {
                name,
                role,
                state,
                issue,
            };
            let answer = agent.escalate(&request, None).await?;
            println!("{}", answer.text);
            Ok(())
        }
        Commands::Schema { tables } => {
            let backend = open_database(&config).await?;
            let mut sql_db = SqlDatabase::new(backend);
            if let Some(include) = config.agent.effective_tables() {
                sql_db = sql_db.with_include_tables(include);
            }
            println!("{}", sql_db.table_info(&tables).await?);
            Ok(())
        }
        Commands::Orders(command) => {
            let backend = open_database(&config).await?;
            let read_only = backend.is_read_only();
            let store = OrderStore::new(backend, config.agent.orders_table.clone())?
                .with_return_window(config.agent.return_window_days);
            let today = Local::now().date_naive();
            println!("{}", handle_orders(command, &store, read_only, today).await?);
            Ok(())
        }
    }
}

/// `escalate` always runs the escalation profile, whatever is configured.
fn escalation_config(config: &Config) -> Config {
    let mut config = config.clone();
    config.agent.profile = AgentProfile::Escalation;
    config
}

async fn open_database(config: &Config) -> Result<Arc<dyn Database>> {
    config.validate_database()?;
    db::connect(&config.database)
        .await
        .context("Failed to connect to the database")
}

async fn build_agent(config: &Config) -> Result<SqlAgent> {
    // Check the key before opening connections so the message is actionable.
    config.validate()?;
    let backend = open_database(config).await?;
    let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(&config.provider)?);
    SqlAgent::from_config(config, provider, backend)
}

/// Answer a single question, tracing agent steps on stderr.
async fn ask_once(agent: &SqlAgent, question: &str) -> Result<String> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = trace_line(&event) {
                eprintln!("{}", line.dark_grey());
            }
        }
    });

    let result = agent.run(question, Some(&tx)).await;
    drop(tx);
    let _ = printer.await;
    Ok(result?.text)
}

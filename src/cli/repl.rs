// Interactive chat REPL

use anyhow::Result;
use crossterm::{style::Stylize, terminal};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, IsTerminal};
use tokio::sync::mpsc;
use tracing::debug;

use super::commands::{format_help, Command};
use super::session::{ChatSession, GREETING};
use crate::agent::{AgentEvent, SqlAgent};

/// Longest tool output echoed in the trace
const TRACE_PREVIEW_CHARS: usize = 300;

fn terminal_width() -> usize {
    terminal::size().map(|(w, _)| w as usize).unwrap_or(80)
}

pub struct Repl {
    agent: SqlAgent,
    session: ChatSession,
    is_interactive: bool,
    show_trace: bool,
}

impl Repl {
    pub fn new(agent: SqlAgent) -> Self {
        Self {
            agent,
            session: ChatSession::new(),
            is_interactive: io::stdout().is_terminal(),
            show_trace: true,
        }
    }

    pub fn with_trace(mut self, show: bool) -> Self {
        self.show_trace = show;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;

        if self.is_interactive {
            println!(
                "orderdesk v{} - {} profile on {}",
                env!("CARGO_PKG_VERSION"),
                self.agent.profile(),
                self.agent.database().backend().describe()
            );
            println!("{}", "Type /help for commands.".dark_grey());
            println!();
        }
        println!("{}", GREETING.bold());

        loop {
            if self.is_interactive {
                println!("{}", "─".repeat(terminal_width()).dark_grey());
            }

            let line = match editor.readline("> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            let _ = editor.add_history_entry(input);

            if let Some(command) = Command::parse(input) {
                if command == Command::Quit {
                    break;
                }
                match self.handle_command(command).await {
                    Ok(output) => println!("{}", output),
                    Err(e) => println!("{} {:#}", "Error:".red(), e),
                }
                continue;
            }

            self.session.push_user(input);
            match self.ask(input).await {
                Ok(answer) => {
                    println!();
                    println!("{}", answer);
                    self.session.push_assistant(answer);
                }
                Err(e) => {
                    // The REPL keeps going; the failed question is not answered.
                    println!("{} {:#}", "Error:".red(), e);
                }
            }
            println!();
        }

        if self.is_interactive {
            println!("Goodbye!");
        }
        Ok(())
    }

    async fn handle_command(&mut self, command: Command) -> Result<String> {
        let db = self.agent.database().clone();
        match command {
            Command::Help => Ok(format_help()),
            Command::Clear => {
                self.session.clear();
                Ok(format!("History cleared.\n{}", GREETING))
            }
            Command::Tables => {
                let tables = db.usable_tables().await?;
                if tables.is_empty() {
                    Ok("No tables available.".to_string())
                } else {
                    Ok(tables.join("\n"))
                }
            }
            Command::Schema(tables) => db.table_info(&tables).await,
            Command::Quit => Ok(String::new()),
        }
    }

    /// Run the agent, printing its trace while it works.
    async fn ask(&self, input: &str) -> Result<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(print_trace(rx, self.show_trace));

        let result = self.agent.run(input, Some(&tx)).await;
        drop(tx);
        if let Err(e) = printer.await {
            debug!("Trace printer stopped: {}", e);
        }

        result.map(|answer| answer.text)
    }
}

async fn print_trace(mut rx: mpsc::UnboundedReceiver<AgentEvent>, show: bool) {
    while let Some(event) = rx.recv().await {
        if !show {
            continue;
        }
        if let Some(line) = trace_line(&event) {
            println!("{}", line.dark_grey());
        }
    }
}

/// One-line rendering of an agent event for the terminal
pub fn trace_line(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::Thinking { turn } if *turn == 1 => Some("Thinking...".to_string()),
        AgentEvent::Thinking { .. } => None,
        AgentEvent::Thought(text) => Some(format!("  {}", text.trim())),
        AgentEvent::ToolCall { name, input } => Some(format!("→ {} {}", name, input)),
        AgentEvent::ToolResult {
            name,
            content,
            is_error,
        } => {
            let marker = if *is_error { "✗" } else { "✓" };
            Some(format!("{} {}: {}", marker, name, preview(content)))
        }
        AgentEvent::Finished { turns } => Some(format!("Done in {} turn(s)", turns)),
    }
}

fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= TRACE_PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(TRACE_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trace_lines() {
        assert_eq!(
            trace_line(&AgentEvent::Thinking { turn: 1 }).as_deref(),
            Some("Thinking...")
        );
        assert_eq!(trace_line(&AgentEvent::Thinking { turn: 2 }), None);
        assert_eq!(
            trace_line(&AgentEvent::ToolCall {
                name: "sql_db_query".to_string(),
                input: json!({"query": "SELECT 1"}),
            })
            .as_deref(),
            Some(r#"→ sql_db_query {"query":"SELECT 1"}"#)
        );
        let err = trace_line(&AgentEvent::ToolResult {
            name: "sql_db_query".to_string(),
            content: "Error: no such table".to_string(),
            is_error: true,
        })
        .unwrap();
        assert!(err.starts_with("✗ sql_db_query"));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x ".repeat(400);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), TRACE_PREVIEW_CHARS + 3);
    }
}

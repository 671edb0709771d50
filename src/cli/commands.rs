// Slash command handling

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Clear,
    Tables,
    Schema(Vec<String>),
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.trim().split_whitespace();
        let head = parts.next()?;
        match head {
            "/help" | "/?" => Some(Command::Help),
            "/quit" | "/exit" => Some(Command::Quit),
            "/clear" => Some(Command::Clear),
            "/tables" => Some(Command::Tables),
            "/schema" => Some(Command::Schema(
                parts
                    .flat_map(|p| p.split(','))
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            _ => None,
        }
    }
}

pub fn format_help() -> String {
    r#"Available commands:
  /help             - Show this help message
  /tables           - List the tables the agent can use
  /schema [tables]  - Show table schemas with sample rows
  /clear            - Clear the message history
  /quit             - Exit

Type any question to get started!"#
        .to_string()
}

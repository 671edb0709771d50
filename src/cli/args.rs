// Command-line arguments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::agent::{AgentProfile, Role};
use crate::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(name = "orderdesk")]
#[command(
    version,
    about = "Chat with your store database through an LLM SQL agent",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Config file (default: ~/.orderdesk/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Model API key (overrides GROQ_API_KEY / OPENAI_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Model name, e.g. llama-3.1-8b-instant
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 1.0)
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Agent profile
    #[arg(short, long, global = true, value_enum)]
    pub profile: Option<AgentProfile>,

    /// Maximum model round-trips per question
    #[arg(long, global = true)]
    pub max_turns: Option<usize>,

    /// Restrict the agent to these tables (comma-separated)
    #[arg(long, global = true, value_delimiter = ',')]
    pub tables: Option<Vec<String>>,

    /// SQLite database file
    #[arg(long, global = true)]
    pub sqlite: Option<PathBuf>,

    /// Allow writes (SQLite opens read-only by default)
    #[arg(long, global = true)]
    pub read_write: bool,

    /// MySQL host
    #[arg(long, global = true)]
    pub mysql_host: Option<String>,

    /// MySQL port
    #[arg(long, global = true)]
    pub mysql_port: Option<u16>,

    /// MySQL user
    #[arg(long, global = true)]
    pub mysql_user: Option<String>,

    /// MySQL password (prefer ORDERDESK_DB_PASSWORD)
    #[arg(long, global = true)]
    pub mysql_password: Option<String>,

    /// MySQL database (schema)
    #[arg(long, global = true)]
    pub mysql_database: Option<String>,
}

impl GlobalArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            profile: self.profile,
            max_turns: self.max_turns,
            sqlite_path: self.sqlite.clone(),
            read_write: self.read_write,
            mysql_host: self.mysql_host.clone(),
            mysql_port: self.mysql_port,
            mysql_user: self.mysql_user.clone(),
            mysql_password: self.mysql_password.clone(),
            mysql_database: self.mysql_database.clone(),
            include_tables: self.tables.clone(),
            debug: self.verbose,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive chat with the agent (default)
    Chat,

    /// Ask a single question and print the answer
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Route an issue up the management hierarchy and draft an email
    Escalate {
        /// Your name
        #[arg(long)]
        name: String,

        /// Your role (Customer, State Manager, Regional Manager, ...)
        #[arg(long)]
        role: Role,

        /// Your state, if applicable
        #[arg(long)]
        state: Option<String>,

        /// Description of the issue
        #[arg(long)]
        issue: String,
    },

    /// Print table schemas with sample rows
    Schema {
        /// Tables to describe (all usable tables if omitted)
        tables: Vec<String>,
    },

    /// Manage orders directly, without the model
    #[command(subcommand)]
    Orders(OrdersCommand),
}

#[derive(Debug, Subcommand)]
pub enum OrdersCommand {
    /// Create the orders table if it does not exist
    Init,

    /// Place a new order (dated today, not delivered)
    Place(PlaceArgs),

    /// List all orders
    List,

    /// List orders that have not been delivered
    Undelivered,

    /// Change product and quantity of an undelivered order
    Update {
        customer_id: String,

        #[arg(long)]
        product: String,

        #[arg(long)]
        quantity: i64,
    },

    /// Mark an order delivered
    Deliver { customer_id: String },

    /// Delete an order that has not been delivered
    Cancel { customer_id: String },

    /// Check whether an order can be returned
    CheckReturn { customer_id: String },

    /// Mark a delivered order returned (within the return window)
    Return { customer_id: String },
}

#[derive(Debug, Clone, Args)]
pub struct PlaceArgs {
    #[arg(long)]
    pub customer_name: String,

    #[arg(long)]
    pub customer_id: String,

    /// Consumer, Home Office, or Corporate
    #[arg(long, default_value = "")]
    pub segment: String,

    #[arg(long, default_value = "United States")]
    pub country: String,

    #[arg(long, default_value = "")]
    pub state: String,

    #[arg(long, default_value = "")]
    pub postal_code: String,

    /// West, East, Central, or South
    #[arg(long, default_value = "")]
    pub region: String,

    /// Office Supplies, Furniture, or Technology
    #[arg(long, default_value = "")]
    pub category: String,

    #[arg(long)]
    pub product: String,

    #[arg(long, default_value_t = 1)]
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_escalate() {
        let cli = Cli::parse_from([
            "orderdesk",
            "escalate",
            "--name",
            "Dana",
            "--role",
            "state manager",
            "--issue",
            "Late shipments",
        ]);
        match cli.command {
            Some(Commands::Escalate { role, state, .. }) => {
                assert_eq!(role, Role::StateManager);
                assert!(state.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "orderdesk",
            "ask",
            "how",
            "many",
            "--profile",
            "orders",
            "--tables",
            "orders_2,returns",
            "--mysql-host",
            "db",
        ]);
        let overrides = cli.global.overrides();
        assert_eq!(overrides.profile, Some(AgentProfile::Orders));
        assert_eq!(
            overrides.include_tables,
            Some(vec!["orders_2".to_string(), "returns".to_string()])
        );
        assert_eq!(overrides.mysql_host.as_deref(), Some("db"));
        match cli.command {
            Some(Commands::Ask { question }) => assert_eq!(question.join(" "), "how many"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_orders_update() {
        let cli = Cli::parse_from([
            "orderdesk", "orders", "update", "C-5001", "--product", "Desk", "--quantity", "7",
        ]);
        match cli.command {
            Some(Commands::Orders(OrdersCommand::Update {
                customer_id,
                quantity,
                ..
            })) => {
                assert_eq!(customer_id, "C-5001");
                assert_eq!(quantity, 7);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

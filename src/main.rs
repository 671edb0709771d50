// orderdesk - chat with a store database through an LLM SQL agent
// Main entry point

use anyhow::Result;
use clap::Parser;

use orderdesk::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::run(cli).await
}

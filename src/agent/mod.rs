// SQL agent
//
// A bounded tool-use loop over an LLM provider: the model sees the profile's
// system prompt and the tool definitions, calls tools until it can answer,
// and its final plain-text reply is returned.

mod escalation;
mod events;
mod profile;
mod prompts;

pub use escalation::{EscalationRequest, Role, UnknownRole};
pub use events::AgentEvent;
pub use profile::AgentProfile;
pub use prompts::{compose_user_input, system_prompt, PromptContext};

use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::db::{Database, SqlDatabase};
use crate::orders::OrderStore;
use crate::providers::{ContentBlock, LlmProvider, Message, ProviderRequest};
use crate::tools::implementations::{
    CancelOrderTool, EscalationPathTool, ListTablesTool, MarkDeliveredTool, PlaceOrderTool,
    ProcessReturnTool, QueryTool, ReturnCheckTool, SchemaTool, UpdateOrderTool,
};
use crate::tools::{ToolExecutor, ToolRegistry};
use events::emit;

pub const DEFAULT_MAX_TURNS: usize = 15;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent stopped after {0} turns without a final answer")]
    MaxTurnsExceeded(usize),
}

/// Final answer of one agent run
#[derive(Debug, Clone, PartialEq)]
pub struct AgentAnswer {
    pub text: String,
    pub turns: usize,
    pub tool_calls: usize,
}

/// Tools available to `profile`
pub fn build_registry(
    profile: AgentProfile,
    db: Arc<SqlDatabase>,
    orders: Option<Arc<OrderStore>>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ListTablesTool::new(db.clone())));
    registry.register(Box::new(SchemaTool::new(db.clone())));
    registry.register(Box::new(QueryTool::new(db)));

    if profile.has_order_tools() {
        if let Some(store) = orders {
            registry.register(Box::new(PlaceOrderTool::new(store.clone())));
            registry.register(Box::new(UpdateOrderTool::new(store.clone())));
            registry.register(Box::new(MarkDeliveredTool::new(store.clone())));
            registry.register(Box::new(CancelOrderTool::new(store.clone())));
            registry.register(Box::new(ReturnCheckTool::new(store.clone())));
            registry.register(Box::new(ProcessReturnTool::new(store)));
        }
    }
    if profile.has_escalation_tool() {
        registry.register(Box::new(EscalationPathTool));
    }
    registry
}

pub struct SqlAgent {
    provider: Arc<dyn LlmProvider>,
    executor: ToolExecutor,
    db: Arc<SqlDatabase>,
    profile: AgentProfile,
    system_prompt: String,
    temperature: Option<f32>,
    max_tokens: u32,
    max_turns: usize,
}

impl SqlAgent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        profile: AgentProfile,
        db: Arc<SqlDatabase>,
        executor: ToolExecutor,
        system_prompt: String,
    ) -> Self {
        Self {
            provider,
            executor,
            db,
            profile,
            system_prompt,
            temperature: None,
            max_tokens: 2048,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Wire an agent from configuration: table allowlist, access policy,
    /// order tools for the orders profile, and the profile prompt.
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn LlmProvider>,
        backend: Arc<dyn Database>,
    ) -> Result<Self> {
        let agent_cfg = &config.agent;
        let profile = agent_cfg.profile;

        let mut sql_db = SqlDatabase::new(backend.clone())
            .with_read_only(config.database.is_read_only())
            .with_schema_changes(agent_cfg.allow_schema_changes)
            .with_max_result_chars(agent_cfg.max_result_chars);
        if let Some(tables) = agent_cfg.effective_tables() {
            sql_db = sql_db.with_include_tables(tables);
        }
        if profile.has_order_tools() {
            // Order changes must pass the lifecycle guards in OrderStore.
            sql_db = sql_db.with_protected_tables(vec![agent_cfg.orders_table.clone()]);
        }
        let sql_db = Arc::new(sql_db);

        let orders = if profile.has_order_tools() {
            let store = OrderStore::new(backend, agent_cfg.orders_table.clone())?
                .with_return_window(agent_cfg.return_window_days);
            Some(Arc::new(store))
        } else {
            None
        };

        let ctx = PromptContext {
            dialect: sql_db.dialect(),
            orders_table: agent_cfg.orders_table.clone(),
            window_days: agent_cfg.return_window_days,
            read_only: sql_db.is_read_only(),
            today: Local::now().date_naive(),
        };
        let prompt = system_prompt(profile, &ctx);
        let executor = ToolExecutor::new(build_registry(profile, sql_db.clone(), orders));

        info!(
            "Agent ready: profile={}, tools=[{}]",
            profile,
            executor.registry().names().join(", ")
        );

        Ok(Self::new(provider, profile, sql_db, executor, prompt)
            .with_temperature(config.provider.temperature)
            .with_max_tokens(config.provider.max_tokens)
            .with_max_turns(agent_cfg.max_turns))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn profile(&self) -> AgentProfile {
        self.profile
    }

    pub fn database(&self) -> &Arc<SqlDatabase> {
        &self.db
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Answer one question. Each call starts a fresh conversation.
    #[instrument(skip(self, input, events), fields(profile = %self.profile))]
    pub async fn run(
        &self,
        input: &str,
        events: Option<&UnboundedSender<AgentEvent>>,
    ) -> Result<AgentAnswer> {
        let tool_defs = self.executor.definitions();
        let mut messages = vec![Message::user(compose_user_input(input))];
        let mut tool_calls = 0;

        for turn in 0..self.max_turns {
            debug!("Agent turn {}/{}", turn + 1, self.max_turns);
            emit(events, AgentEvent::Thinking { turn: turn + 1 });

            let mut request = ProviderRequest::new(messages.clone())
                .with_system(self.system_prompt.clone())
                .with_max_tokens(self.max_tokens)
                .with_tools(tool_defs.clone());
            if let Some(temperature) = self.temperature {
                request = request.with_temperature(temperature);
            }

            let response = self.provider.send_message(&request).await?;

            if !response.has_tool_uses() {
                let text = response.text();
                info!(
                    "Agent finished in {} turns ({} tool calls)",
                    turn + 1,
                    tool_calls
                );
                emit(events, AgentEvent::Finished { turns: turn + 1 });
                return Ok(AgentAnswer {
                    text,
                    turns: turn + 1,
                    tool_calls,
                });
            }

            let thought = response.text();
            if !thought.trim().is_empty() {
                emit(events, AgentEvent::Thought(thought));
            }

            let tool_uses = response.tool_uses();
            messages.push(response.to_message());

            let mut results = Vec::with_capacity(tool_uses.len());
            for tool_use in &tool_uses {
                emit(
                    events,
                    AgentEvent::ToolCall {
                        name: tool_use.name.clone(),
                        input: tool_use.input.clone(),
                    },
                );
                let result = self.executor.execute_tool(tool_use).await;
                emit(
                    events,
                    AgentEvent::ToolResult {
                        name: tool_use.name.clone(),
                        content: result.content.clone(),
                        is_error: result.is_error,
                    },
                );
                results.push(ContentBlock::ToolResult {
                    tool_use_id: result.tool_use_id,
                    content: result.content,
                    is_error: result.is_error.then_some(true),
                });
            }
            tool_calls += tool_uses.len();
            messages.push(Message::with_content("user", results));
        }

        Err(AgentError::MaxTurnsExceeded(self.max_turns).into())
    }

    /// Run the escalation form through the agent.
    pub async fn escalate(
        &self,
        request: &EscalationRequest,
        events: Option<&UnboundedSender<AgentEvent>>,
    ) -> Result<AgentAnswer> {
        self.run(&request.to_task(), events).await
    }
}

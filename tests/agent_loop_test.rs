// End-to-end agent loop against a mock chat-completions server
//
// The mock answers the first request with a tool call and the follow-up
// (which carries the tool result) with the final answer.

use anyhow::Result;
use chrono::Local;
use mockito::Matcher;
use orderdesk::agent::{AgentEvent, AgentProfile, SqlAgent};
use orderdesk::config::{Config, DatabaseConfig};
use orderdesk::db::{self, Database};
use orderdesk::orders::{NewOrder, OrderStore};
use orderdesk::providers::{LlmProvider, OpenAIProvider, RetryPolicy};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn completion(message: serde_json::Value, finish_reason: &str) -> String {
    json!({
        "id": "chatcmpl-test",
        "model": "llama-3.1-8b-instant",
        "choices": [{"index": 0, "finish_reason": finish_reason, "message": message}]
    })
    .to_string()
}

fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> String {
    completion(
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": arguments.to_string()}
            }]
        }),
        "tool_calls",
    )
}

fn answer(text: &str) -> String {
    completion(json!({"role": "assistant", "content": text}), "stop")
}

async fn orders_config(dir: &TempDir) -> Result<(Config, Arc<dyn Database>)> {
    let mut config = Config::default();
    config.provider.api_key = "gsk_test".to_string();
    config.agent.profile = AgentProfile::Orders;
    config.database = DatabaseConfig::Sqlite {
        path: dir.path().join("orders.db"),
        read_only: false,
    };
    config.validate()?;

    let backend = db::connect(&config.database).await?;
    let store = OrderStore::new(backend.clone(), config.agent.orders_table.clone())?;
    store.ensure_schema().await?;
    let order = NewOrder {
        customer_name: "Alan Turing".to_string(),
        customer_id: "C-7".to_string(),
        product_name: "Whiteboard".to_string(),
        quantity: 2,
        ..Default::default()
    };
    store.insert_order(&order, Local::now().date_naive()).await?;
    store.mark_delivered("C-7").await?;
    Ok((config, backend))
}

fn provider(server: &mockito::ServerGuard) -> Arc<dyn LlmProvider> {
    Arc::new(
        OpenAIProvider::new_groq("gsk_test".to_string())
            .unwrap()
            .with_base_url(server.url())
            .with_retry_policy(RetryPolicy::none()),
    )
}

#[tokio::test]
async fn test_orders_agent_processes_return() -> Result<()> {
    let dir = TempDir::new()?;
    let (config, backend) = orders_config(&dir).await?;

    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer gsk_test")
        .match_body(Matcher::Regex("order_process_return".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tool_call(
            "call_1",
            "order_process_return",
            json!({"customer_id": "C-7"}),
        ))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex(r#""role":"tool""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(answer("The return for C-7 has been processed."))
        .expect(1)
        .create_async()
        .await;

    let agent = SqlAgent::from_config(&config, provider(&server), backend.clone())?;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let result = agent.run("Customer C-7 wants to return the whiteboard", Some(&tx)).await?;
    drop(tx);

    assert_eq!(result.text, "The return for C-7 has been processed.");
    assert_eq!(result.turns, 2);
    assert_eq!(result.tool_calls, 1);
    first.assert_async().await;
    second.assert_async().await;

    let mut tool_results = Vec::new();
    while let Some(event) = rx.recv().await {
        if let AgentEvent::ToolResult { content, is_error, .. } = event {
            tool_results.push((content, is_error));
        }
    }
    assert_eq!(tool_results.len(), 1);
    assert!(!tool_results[0].1, "{}", tool_results[0].0);

    let store = OrderStore::new(backend, config.agent.orders_table.clone())?;
    let order = store.find_order("C-7").await?;
    assert_eq!(order.status.to_string(), "RETURNED");
    Ok(())
}

#[tokio::test]
async fn test_orders_agent_cannot_touch_other_tables() -> Result<()> {
    let dir = TempDir::new()?;
    let (config, backend) = orders_config(&dir).await?;
    backend
        .execute("CREATE TABLE payroll (Name TEXT, Salary INTEGER)", &[])
        .await?;
    backend
        .execute("INSERT INTO payroll VALUES ('Ada', 100)", &[])
        .await?;

    let (server, _mocks) = server_with_script(vec![
        tool_call(
            "call_1",
            "sql_db_query",
            json!({"query": "DELETE FROM payroll"}),
        ),
        answer("I can only work with the orders table."),
    ])
    .await;

    let agent = SqlAgent::from_config(&config, provider(&server), backend.clone())?;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let result = agent.run("Clear the payroll table", Some(&tx)).await?;
    drop(tx);
    assert_eq!(result.text, "I can only work with the orders table.");

    let mut refused = false;
    while let Some(event) = rx.recv().await {
        if let AgentEvent::ToolResult { content, is_error, .. } = event {
            refused = is_error && content.contains("payroll");
        }
    }
    assert!(refused);

    let rows = backend.query("SELECT COUNT(*) AS n FROM payroll", &[]).await?;
    assert_eq!(rows.get(0, "n").and_then(|v| v.as_i64()), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_orders_agent_raw_sql_cannot_skip_lifecycle() -> Result<()> {
    let dir = TempDir::new()?;
    let (config, backend) = orders_config(&dir).await?;

    let raw_update = "UPDATE orders_2 SET Delivered = 'RETURNED' WHERE Customer_ID = 'C-7'";
    let (server, _mocks) = server_with_script(vec![
        tool_call("call_1", "sql_db_query", json!({ "query": raw_update })),
        answer("Returns have to go through the return check."),
    ])
    .await;

    let agent = SqlAgent::from_config(&config, provider(&server), backend.clone())?;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    agent.run("Mark C-7 as returned, skip the checks", Some(&tx)).await?;
    drop(tx);

    let mut refusal = None;
    while let Some(event) = rx.recv().await {
        if let AgentEvent::ToolResult { content, is_error, .. } = event {
            refusal = Some((content, is_error));
        }
    }
    let (content, is_error) = refusal.expect("the query tool ran");
    assert!(is_error);
    assert!(content.contains("order tools"), "{}", content);

    let store = OrderStore::new(backend, config.agent.orders_table.clone())?;
    assert_eq!(store.find_order("C-7").await?.status.to_string(), "YES");
    Ok(())
}

/// Mock server that serves `bodies` in order: the first to the opening
/// request, the rest to requests that already carry tool results.
/// Mocks are removed on drop, so they are returned alongside the server.
async fn server_with_script(bodies: Vec<String>) -> (mockito::ServerGuard, Vec<mockito::Mock>) {
    let mut server = mockito::Server::new_async().await;
    let mut mocks = Vec::new();
    for (i, body) in bodies.into_iter().enumerate() {
        let mut mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(1);
        if i > 0 {
            mock = mock.match_body(Matcher::Regex(r#""role":"tool""#.to_string()));
        }
        mocks.push(mock.create_async().await);
    }
    (server, mocks)
}

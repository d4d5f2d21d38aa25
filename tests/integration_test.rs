//! Integration tests for sql-agent
//!
//! These drive whole turns through the agent loop against an in-memory
//! SQLite database and a scripted provider.

use async_trait::async_trait;
use serde_json::json;
use sql_agent::agent::conversation::tool_messages_are_paired;
use sql_agent::agent::{AgentExecutor, ExecutorOptions, TurnOutcome, INCOMPLETE_ANSWER};
use sql_agent::cli::commands::{handle_command, Command};
use sql_agent::cli::Session;
use sql_agent::database::DatabaseManager;
use sql_agent::error::{Result, SqlAgentError};
use sql_agent::llm::provider::{
    GenerationParams, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolDefinition,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays canned responses and records every prompt and tool list it sees
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<LLMResponse>>>,
    prompts: Mutex<Vec<Vec<Message>>>,
    tool_names: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<LLMResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            tool_names: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        _params: Option<&GenerationParams>,
    ) -> Result<LLMResponse> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        *self.tool_names.lock().unwrap() = tools.iter().map(|t| t.name.clone()).collect();
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SqlAgentError::LLMProvider("script exhausted".to_string())))
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn has_api_key(&self) -> bool {
        true
    }
}

fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> Result<LLMResponse> {
    Ok(LLMResponse::with_tool_calls(vec![ToolCall::new(
        id,
        name,
        arguments.to_string(),
    )]))
}

fn answer(text: &str) -> Result<LLMResponse> {
    Ok(LLMResponse::new(text))
}

async fn shop() -> DatabaseManager {
    let database = DatabaseManager::connect(":memory:").await.unwrap();
    for statement in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER, total REAL)",
        "INSERT INTO users (name) VALUES ('Alice'), ('Bob')",
        "INSERT INTO orders (user_id, total) VALUES (1, 9.5), (1, 20.0), (2, 3.25)",
    ] {
        assert_eq!(database.run_query(statement).await, "[]");
    }
    database
}

async fn executor(
    provider: Arc<ScriptedProvider>,
    report_dir: &std::path::Path,
) -> AgentExecutor {
    AgentExecutor::for_database(provider, shop().await, report_dir)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_count_orders() {
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "run_sqlite_query", json!({"query": "SELECT COUNT(*) FROM orders"})),
        answer("There are 3 orders."),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(provider.clone(), dir.path()).await;

    let outcome = executor.run_turn("How many orders are there?").await.unwrap();

    assert!(outcome.is_complete());
    assert!(outcome.text().contains('3'));

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0][0].content.contains("users, orders"));
    assert_eq!(prompts[1].last().unwrap().content, "[(3,)]");

    let history = executor.conversation().history();
    let tools: Vec<&Message> = history
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .collect();
    assert_eq!(tools.len(), 1);
    assert_eq!(history[history.len() - 2].role, MessageRole::Tool);
    assert_eq!(history.last().unwrap().role, MessageRole::Assistant);
    assert!(tool_messages_are_paired(history));

    assert_eq!(
        *provider.tool_names.lock().unwrap(),
        vec!["run_sqlite_query", "describe_tables", "list_tables", "write_report"]
    );
}

#[tokio::test]
async fn test_describe_then_query() {
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "describe_tables", json!({"table_names": ["users"]})),
        tool_call("c2", "run_sqlite_query", json!({"query": "SELECT name FROM users ORDER BY id"})),
        answer("Alice and Bob."),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(provider.clone(), dir.path()).await;

    executor.run_turn("Who are the users?").await.unwrap();

    let prompts = provider.prompts();
    assert_eq!(
        prompts[1].last().unwrap().content,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)"
    );
    assert_eq!(prompts[2].last().unwrap().content, "[('Alice',), ('Bob',)]");
}

#[tokio::test]
async fn test_bad_sql_is_recovered() {
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "run_sqlite_query", json!({"query": "SELECT address FROM users"})),
        answer("That column does not exist."),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(provider.clone(), dir.path()).await;

    let outcome = executor.run_turn("Where do users live?").await.unwrap();

    assert!(outcome.is_complete());
    let prompts = provider.prompts();
    let result = &prompts[1].last().unwrap().content;
    assert!(result.starts_with("The following error occurred:"));
}

#[tokio::test]
async fn test_unknown_tool_is_recovered() {
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "drop_everything", json!({})),
        answer("I cannot do that."),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(provider.clone(), dir.path()).await;

    executor.run_turn("Delete the database").await.unwrap();

    assert_eq!(
        provider.prompts()[1].last().unwrap().content,
        "drop_everything is not a valid tool, try one of \
         [run_sqlite_query, describe_tables, list_tables, write_report]."
    );
}

#[tokio::test]
async fn test_bad_arguments_are_recovered() {
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "run_sqlite_query", json!({"sql": "SELECT 1"})),
        answer("Retrying is needed."),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(provider.clone(), dir.path()).await;

    executor.run_turn("Anything").await.unwrap();

    let prompts = provider.prompts();
    let result = &prompts[1].last().unwrap().content;
    assert!(result.starts_with("Error: Invalid arguments for tool 'run_sqlite_query'"));
}

#[tokio::test]
async fn test_history_carries_over() {
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "run_sqlite_query", json!({"query": "SELECT COUNT(*) FROM orders"})),
        answer("There are 3 orders."),
        tool_call("c2", "run_sqlite_query", json!({"query": "SELECT COUNT(*) FROM users"})),
        answer("There are 2 users."),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(provider.clone(), dir.path()).await;

    executor.run_turn("How many orders are there?").await.unwrap();
    let first_turn = executor.conversation().history().to_vec();
    executor
        .run_turn("Repeat the same process for users.")
        .await
        .unwrap();

    let prompts = provider.prompts();
    let third = &prompts[2];
    assert_eq!(&third[1..=first_turn.len()], first_turn.as_slice());
    assert_eq!(
        third[first_turn.len() + 1].content,
        "Repeat the same process for users."
    );
    assert_eq!(executor.conversation().history().len(), 8);
}

#[tokio::test]
async fn test_report_in_second_turn() {
    let provider = ScriptedProvider::new(vec![
        tool_call("c1", "run_sqlite_query", json!({"query": "SELECT COUNT(*) FROM orders"})),
        answer("There are 3 orders."),
        tool_call(
            "c2",
            "write_report",
            json!({"title": "Order Count", "rows": [{"orders": 3}]}),
        ),
        answer("The report is ready."),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(provider.clone(), dir.path()).await;

    executor.run_turn("How many orders are there?").await.unwrap();
    executor
        .run_turn("Write the result to an html report.")
        .await
        .unwrap();

    let path = dir.path().join("order-count.html");
    let prompts = provider.prompts();
    let confirmation = &prompts[3].last().unwrap().content;
    assert_eq!(confirmation, &format!("Report written to {}", path.display()));
    let html = std::fs::read_to_string(path).unwrap();
    assert!(html.contains("<h1>Order Count</h1>"));
    assert!(html.contains("<td>3</td>"));
}

#[tokio::test]
async fn test_tool_call_budget() {
    let responses = (0..10)
        .map(|i| tool_call(&format!("c{}", i), "list_tables", json!({})))
        .collect();
    let provider = ScriptedProvider::new(responses);
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(provider.clone(), dir.path())
        .await
        .with_options(ExecutorOptions::default().with_max_tool_calls(4));

    let outcome = executor.run_turn("Keep going").await.unwrap();

    assert_eq!(outcome, TurnOutcome::Incomplete(INCOMPLETE_ANSWER.to_string()));
    assert_eq!(provider.prompts().len(), 5);
    let history = executor.conversation().history();
    assert_eq!(
        history.iter().filter(|m| m.role == MessageRole::Tool).count(),
        4
    );
    assert_eq!(history.last().unwrap().content, INCOMPLETE_ANSWER);
}

#[tokio::test]
async fn test_provider_failure_mid_turn() {
    let provider = ScriptedProvider::new(vec![
        answer("Hello."),
        tool_call("c1", "list_tables", json!({})),
        Err(SqlAgentError::LLMApiError {
            provider: "OpenAI".to_string(),
            message: "overloaded".to_string(),
            status: 503,
        }),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut executor = executor(provider, dir.path()).await;

    executor.run_turn("Hi").await.unwrap();
    let before = executor.conversation().history().to_vec();

    let err = executor.run_turn("List the tables").await.unwrap_err();

    assert!(err.is_provider_error());
    assert_eq!(executor.conversation().history(), before.as_slice());
    assert!(executor.conversation().scratch().is_empty());
}

#[tokio::test]
async fn test_session_round_trip() {
    let provider = ScriptedProvider::new(vec![answer("There are 2 users.")]);
    let dir = tempfile::tempdir().unwrap();
    let database = shop().await;
    let executor = AgentExecutor::for_database(provider, database.clone(), dir.path())
        .await
        .unwrap();
    let mut session = Session::new(executor, database);

    let tables = Command::parse("/tables").unwrap();
    assert_eq!(
        handle_command(&tables, &mut session).await.unwrap(),
        "users\norders"
    );

    let question = Command::parse("How many users?").unwrap();
    assert_eq!(
        handle_command(&question, &mut session).await.unwrap(),
        "There are 2 users."
    );

    let history = Command::parse("/history").unwrap();
    let rendered = handle_command(&history, &mut session).await.unwrap();
    assert!(rendered.contains("How many users?"));
}

#[test]
fn test_catalog_edge_cases() {
    tokio_test::block_on(async {
        let database = shop().await;

        let empty = tokio_test::assert_ok!(database.describe_tables(&[]).await);
        assert_eq!(empty, "");

        let missing = vec!["nonexistent".to_string()];
        let unknown = tokio_test::assert_ok!(database.describe_tables(&missing).await);
        assert_eq!(unknown, "");

        let both = vec!["orders".to_string(), "nonexistent".to_string()];
        let described = tokio_test::assert_ok!(database.describe_tables(&both).await);
        assert_eq!(
            described,
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER, total REAL)"
        );
    });
}

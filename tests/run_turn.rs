//! Turn orchestration against a scripted agents service

mod common;

use std::sync::{Arc, Mutex};

use common::*;
use contoso_agent::core::{AgentError, ToolCall};
use contoso_agent::tools::NO_RESULTS;
use contoso_agent::{Config, Lab, RunEvent, RunOrchestrator, SessionManager, TerminalOutcome};
use tokio_test::{assert_err, assert_ok};

async fn orchestrator(backend: &Arc<ScriptedBackend>, config: &Config) -> RunOrchestrator {
    let manager = SessionManager::new(backend.clone());
    let (session, tools) = manager.start(config).await.unwrap();
    backend.clear_calls();
    RunOrchestrator::from_config(backend.clone(), session, tools, config)
}

#[tokio::test]
async fn test_region_question_completes_after_one_query() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![requires(vec![query_call(
        "call_1",
        "SELECT DISTINCT region FROM sales_data",
    )])]);
    backend.push_stream(vec![
        delta("Contoso sells in "),
        delta("4 regions."),
        RunEvent::MessageCompleted(text_message("Contoso sells in 4 regions.")),
        completed(),
    ]);

    let streamed = Arc::new(Mutex::new(String::new()));
    let sink = streamed.clone();
    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::FunctionCalling))
        .await
        .with_token_callback(Box::new(move |text| sink.lock().unwrap().push_str(text)));

    let outcome = assert_ok!(orchestrator.run_turn("What regions do we sell in?").await);
    assert_eq!(
        outcome,
        TerminalOutcome::Completed {
            text: "Contoso sells in 4 regions.".to_string(),
            artifacts: Vec::new(),
        }
    );
    assert_eq!(*streamed.lock().unwrap(), "Contoso sells in 4 regions.");

    let submitted = backend.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].len(), 1);
    assert_eq!(submitted[0][0].tool_call_id, "call_1");
    let table: serde_json::Value = serde_json::from_str(&submitted[0][0].output).unwrap();
    assert_eq!(table["region"].as_array().unwrap().len(), 4);

    assert_eq!(
        backend.calls(),
        vec![
            format!("create_message:{}:user:What regions do we sell in?", THREAD_ID),
            format!("create_run:{}:{}", THREAD_ID, AGENT_ID),
            format!("submit:{}", RUN_ID),
        ]
    );
}

#[tokio::test]
async fn test_each_required_action_is_answered_once() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![requires(vec![query_call(
        "call_1",
        "SELECT revenue_total FROM sales_data",
    )])]);
    backend.push_stream(vec![requires(vec![query_call(
        "call_2",
        "SELECT region FROM sales_data WHERE region = 'ANTARCTICA'",
    )])]);
    backend.push_stream(vec![requires(vec![
        query_call("call_3", "SELECT SUM(revenue) AS total FROM sales_data WHERE year = 2024"),
        query_call("call_4", "SELECT COUNT(*) AS n FROM sales_data"),
    ])]);
    backend.push_stream(vec![delta("Done."), completed()]);

    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::FunctionCalling)).await;
    let outcome = assert_ok!(orchestrator.run_turn("Revenue for 2024?").await);
    assert!(matches!(outcome, TerminalOutcome::Completed { .. }));

    let submitted = backend.submitted();
    assert_eq!(submitted.len(), 3);
    assert_eq!(backend.calls_starting_with("submit:").len(), 3);

    // Query errors go back to the agent instead of ending the turn
    let error: serde_json::Value = serde_json::from_str(&submitted[0][0].output).unwrap();
    assert_eq!(error["query"], "SELECT revenue_total FROM sales_data");
    assert!(error["error"].as_str().unwrap().contains("revenue_total"));

    assert_eq!(submitted[1][0].output, NO_RESULTS);

    let ids: Vec<&str> = submitted[2]
        .iter()
        .map(|output| output.tool_call_id.as_str())
        .collect();
    assert_eq!(ids, vec!["call_3", "call_4"]);
    assert_eq!(submitted[2][1].output, r#"{"n":[5]}"#);
}

#[tokio::test]
async fn test_malformed_arguments_abandon_the_turn() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![requires(vec![ToolCall::new(
        "call_1",
        "fetch_sales_data_using_sqlite_query",
        r#"{"query": "SELECT"#,
    )])]);
    backend.push_stream(vec![delta("Hello again."), completed()]);

    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::FunctionCalling)).await;

    let err = assert_err!(orchestrator.run_turn("Break the tool").await);
    assert!(matches!(err, AgentError::ToolArguments { .. }));
    assert!(backend.submitted().is_empty());
    assert_eq!(backend.calls_starting_with("cancel:"), vec![format!("cancel:{}", RUN_ID)]);

    // The session is still usable for the next prompt
    let outcome = assert_ok!(orchestrator.run_turn("Hello?").await);
    assert_eq!(
        outcome,
        TerminalOutcome::Completed {
            text: "Hello again.".to_string(),
            artifacts: Vec::new(),
        }
    );
}

#[tokio::test]
async fn test_unknown_tool_abandons_the_turn() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![requires(vec![ToolCall::new(
        "call_1",
        "get_weather",
        "{}",
    )])]);

    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::FunctionCalling)).await;
    let err = assert_err!(orchestrator.run_turn("Weather?").await);

    assert!(matches!(err, AgentError::UnknownTool(ref name) if name == "get_weather"));
    assert!(backend.calls_starting_with("submit:").is_empty());
    assert_eq!(backend.calls_starting_with("cancel:").len(), 1);
}

#[tokio::test]
async fn test_tool_round_limit() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![requires(vec![query_call("call_1", "SELECT 1 AS x")])]);
    backend.push_stream(vec![requires(vec![query_call("call_2", "SELECT 2 AS x")])]);

    let mut config = shared.config(Lab::FunctionCalling);
    config.agent.max_tool_rounds = 1;
    let mut orchestrator = orchestrator(&backend, &config).await;

    let err = assert_err!(orchestrator.run_turn("Loop forever").await);
    assert!(matches!(err, AgentError::ToolRoundLimit(1)));
    assert_eq!(backend.submitted().len(), 1);
    assert_eq!(backend.calls_starting_with("cancel:").len(), 1);
}

#[tokio::test]
async fn test_duplicate_artifact_is_fetched_per_reference() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.add_file("assistant-chart1", b"\x89PNG chart");
    backend.push_stream(vec![
        RunEvent::MessageCompleted(image_message(&["assistant-chart1", "assistant-chart1"])),
        completed(),
    ]);

    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::CodeInterpreter)).await;
    let outcome = assert_ok!(orchestrator.run_turn("Chart sales by region").await);

    assert_eq!(backend.calls_starting_with("get_file:").len(), 2);
    assert!(backend.calls_starting_with("delete").is_empty());

    let expected = shared.files_dir().join("assistant-chart1.png");
    match outcome {
        TerminalOutcome::Completed { artifacts, .. } => {
            assert_eq!(artifacts, vec![expected.clone(), expected.clone()]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let entries: Vec<_> = std::fs::read_dir(shared.files_dir()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(std::fs::read(expected).unwrap(), b"\x89PNG chart");
}

#[tokio::test]
async fn test_artifact_failure_does_not_fail_the_run() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![
        RunEvent::MessageCompleted(image_message(&["assistant-missing"])),
        completed(),
    ]);

    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::CodeInterpreter)).await;
    let outcome = assert_ok!(orchestrator.run_turn("Chart it").await);

    assert!(matches!(
        outcome,
        TerminalOutcome::Completed { ref artifacts, .. } if artifacts.is_empty()
    ));
}

#[tokio::test]
async fn test_unsafe_artifact_id_is_skipped() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.add_file("a.b", b"x");
    backend.add_file("ab", b"\x89PNG");
    backend.push_stream(vec![
        RunEvent::MessageCompleted(image_message(&["a.b", "ab"])),
        completed(),
    ]);

    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::CodeInterpreter)).await;
    let outcome = assert_ok!(orchestrator.run_turn("Chart it").await);

    assert_eq!(backend.calls_starting_with("get_file:"), vec!["get_file:ab"]);
    assert_eq!(
        outcome,
        TerminalOutcome::Completed {
            text: String::new(),
            artifacts: vec![shared.files_dir().join("ab.png")],
        }
    );
}

#[tokio::test]
async fn test_rate_limit_is_a_distinct_outcome() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![failed("rate_limit_exceeded", "Rate limit is exceeded.")]);
    backend.push_stream(vec![failed("server_error", "Something went wrong.")]);

    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::FunctionCalling)).await;

    let outcome = assert_ok!(orchestrator.run_turn("Sales?").await);
    assert_eq!(
        outcome,
        TerminalOutcome::RateLimited {
            message: "Rate limit is exceeded.".to_string()
        }
    );

    let outcome = assert_ok!(orchestrator.run_turn("Sales again?").await);
    assert_eq!(
        outcome,
        TerminalOutcome::Failed {
            code: "server_error".to_string(),
            message: "Something went wrong.".to_string(),
        }
    );
}

#[tokio::test]
async fn test_stream_ending_without_terminal_event() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.push_stream(vec![delta("Partial")]);

    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::FunctionCalling)).await;
    let err = assert_err!(orchestrator.run_turn("Sales?").await);
    assert!(matches!(err, AgentError::Backend(_)));
}

#[tokio::test]
async fn test_stream_error_is_surfaced() {
    let shared = SharedDir::new();
    let backend = ScriptedBackend::new();
    backend.push_raw_stream(vec![
        Ok(delta("Partial")),
        Err(AgentError::backend("Stream error: server_error")),
    ]);

    let mut orchestrator = orchestrator(&backend, &shared.config(Lab::FunctionCalling)).await;
    let err = assert_err!(orchestrator.run_turn("Sales?").await);
    assert!(err.to_string().contains("server_error"));
}

//! Shared test helpers: a scripted in-memory agents service and an on-disk
//! shared directory with instructions and a small sales database.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use contoso_agent::backend::{AgentBackend, CreateAgentRequest, EventStream, RequiredAction, RunRequest};
use contoso_agent::core::{
    AgentError, ContentPart, FileIdRef, MessageRole, Result, RunError, RunHandle, TextContent,
    ThreadMessage, ToolCall, ToolOutput,
};
use contoso_agent::{Config, Lab, RunEvent};
use tempfile::TempDir;

pub const AGENT_ID: &str = "asst_1";
pub const THREAD_ID: &str = "thread_1";
pub const RUN_ID: &str = "run_1";

/// In-memory agents service that replays queued event streams
#[derive(Default)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<String>>,
    streams: Mutex<VecDeque<Vec<Result<RunEvent>>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    submitted: Mutex<Vec<Vec<ToolOutput>>>,
    agent_requests: Mutex<Vec<CreateAgentRequest>>,
    fail_deletes: AtomicBool,
    fail_thread: AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the events returned by the next run start or tool output submission
    pub fn push_stream(&self, events: Vec<RunEvent>) {
        self.push_raw_stream(events.into_iter().map(Ok).collect());
    }

    pub fn push_raw_stream(&self, events: Vec<Result<RunEvent>>) {
        self.streams.lock().unwrap().push_back(events);
    }

    pub fn add_file(&self, file_id: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.to_vec());
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn fail_thread_creation(&self) {
        self.fail_thread.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn submitted(&self) -> Vec<Vec<ToolOutput>> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn agent_requests(&self) -> Vec<CreateAgentRequest> {
        self.agent_requests.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn next_stream(&self) -> Result<EventStream> {
        let events = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::backend("no scripted stream left"))?;
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<String> {
        self.record("create_agent");
        self.agent_requests.lock().unwrap().push(request.clone());
        Ok(AGENT_ID.to_string())
    }

    async fn create_thread(&self) -> Result<String> {
        self.record("create_thread");
        if self.fail_thread.load(Ordering::SeqCst) {
            return Err(AgentError::Api {
                status: 500,
                message: "thread creation failed".to_string(),
            });
        }
        Ok(THREAD_ID.to_string())
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<String> {
        self.record(format!("create_message:{}:{}:{}", thread_id, role, content));
        Ok("msg_user".to_string())
    }

    async fn create_run_stream(&self, request: &RunRequest) -> Result<EventStream> {
        self.record(format!("create_run:{}:{}", request.thread_id, request.agent_id));
        self.next_stream()
    }

    async fn submit_tool_outputs_stream(
        &self,
        run: &RunHandle,
        outputs: &[ToolOutput],
    ) -> Result<EventStream> {
        self.record(format!("submit:{}", run.run_id));
        self.submitted.lock().unwrap().push(outputs.to_vec());
        self.next_stream()
    }

    async fn cancel_run(&self, run: &RunHandle) -> Result<()> {
        self.record(format!("cancel:{}", run.run_id));
        Ok(())
    }

    async fn get_file_content(&self, file_id: &str) -> Result<Vec<u8>> {
        self.record(format!("get_file:{}", file_id));
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| AgentError::Api {
                status: 404,
                message: format!("No file found with id '{}'", file_id),
            })
    }

    async fn upload_file(&self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        self.record(format!("upload:{}", name));
        Ok(format!("file-{}", name.replace('.', "-")))
    }

    async fn create_vector_store(&self, name: &str, file_ids: &[String]) -> Result<String> {
        self.record(format!("vector_store:{}:{}", name, file_ids.join(",")));
        Ok("vs_1".to_string())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.record(format!("delete_thread:{}", thread_id));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AgentError::backend("delete refused"));
        }
        Ok(())
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.record(format!("delete_agent:{}", agent_id));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AgentError::backend("delete refused"));
        }
        Ok(())
    }
}

/// A shared directory laid out the way the CLI expects
pub struct SharedDir {
    pub dir: TempDir,
}

impl SharedDir {
    /// Instructions for every lab plus the sales database
    pub fn new() -> Self {
        let shared = Self::empty();
        shared.write_instructions();
        shared.write_database();
        shared
    }

    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn files_dir(&self) -> PathBuf {
        self.path().join("files")
    }

    pub fn write_instructions(&self) {
        let dir = self.path().join("instructions");
        std::fs::create_dir_all(&dir).unwrap();
        for name in [
            "function_calling.txt",
            "file_search.txt",
            "code_interpreter.txt",
            "bing_grounding.txt",
        ] {
            std::fs::write(
                dir.join(name),
                "You are a Contoso sales analysis agent.\n{database_schema_string}\n",
            )
            .unwrap();
        }
        std::fs::write(
            dir.join("code_interpreter_multilingual.txt"),
            "You are a Contoso sales analysis agent.\n{database_schema_string}\nFonts: {font_file_id}\n",
        )
        .unwrap();
    }

    pub fn write_database(&self) {
        let dir = self.path().join("database");
        std::fs::create_dir_all(&dir).unwrap();
        let conn = rusqlite::Connection::open(dir.join("contoso-sales.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE sales_data (
                id INTEGER PRIMARY KEY,
                main_category TEXT,
                product_type TEXT,
                region TEXT,
                month INTEGER,
                year INTEGER,
                revenue REAL
            );
            INSERT INTO sales_data (main_category, product_type, region, month, year, revenue) VALUES
                ('CAMPING', 'TENTS', 'AFRICA', 1, 2023, 1200.5),
                ('CAMPING', 'TENTS', 'ASIA-PACIFIC', 2, 2023, 830.0),
                ('APPAREL', 'JACKETS', 'EUROPE', 3, 2024, 410.25),
                ('APPAREL', 'JACKETS', 'NORTH AMERICA', 4, 2024, 990.0),
                ('CAMPING', 'BACKPACKS', 'EUROPE', 5, 2024, 640.0);",
        )
        .unwrap();
    }

    pub fn write_file(&self, relative: &str, bytes: &[u8]) {
        let path = self.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    pub fn config(&self, lab: Lab) -> Config {
        let mut config = Config::default();
        config.backend.endpoint = "http://localhost:9/".to_string();
        config.model.deployment = "gpt-4o".to_string();
        config.paths.shared_dir = self.path().to_path_buf();
        config.agent.lab = lab;
        config
    }
}

pub fn run() -> RunHandle {
    RunHandle::new(THREAD_ID, RUN_ID)
}

pub fn delta(text: &str) -> RunEvent {
    RunEvent::ContentDelta {
        text: text.to_string(),
    }
}

pub fn requires(calls: Vec<ToolCall>) -> RunEvent {
    RunEvent::RequiresAction(RequiredAction {
        run: run(),
        tool_calls: calls,
    })
}

pub fn query_call(id: &str, query: &str) -> ToolCall {
    ToolCall::new(
        id,
        "fetch_sales_data_using_sqlite_query",
        serde_json::json!({ "query": query }).to_string(),
    )
}

pub fn completed() -> RunEvent {
    RunEvent::RunCompleted { run: run() }
}

pub fn failed(code: &str, message: &str) -> RunEvent {
    RunEvent::RunFailed {
        run: run(),
        error: RunError {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

pub fn text_message(text: &str) -> ThreadMessage {
    ThreadMessage {
        id: "msg_1".to_string(),
        role: MessageRole::Assistant,
        content: vec![ContentPart::Text {
            text: TextContent {
                value: text.to_string(),
                annotations: Vec::new(),
            },
        }],
    }
}

pub fn image_message(file_ids: &[&str]) -> ThreadMessage {
    ThreadMessage {
        id: "msg_2".to_string(),
        role: MessageRole::Assistant,
        content: file_ids
            .iter()
            .map(|id| ContentPart::ImageFile {
                image_file: FileIdRef {
                    file_id: id.to_string(),
                },
            })
            .collect(),
    }
}

//! Agents service client
//!
//! Async HTTP client for an Assistants-style agents API with streaming runs.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::backend::sse::decode_frame;
use crate::backend::traits::{AgentBackend, CreateAgentRequest, EventStream, RunRequest};
use crate::core::config::AuthScheme;
use crate::core::{AgentError, Config, MessageRole, Result, RunHandle, ToolOutput};

/// Give up on vector store indexing after this many status checks
const MAX_VECTOR_STORE_POLLS: u32 = 120;

/// Agents API client
#[derive(Clone)]
pub struct AgentsClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    auth: AuthScheme,
    api_version: Option<String>,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct IdPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
struct VectorStorePayload {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

impl AgentsClient {
    /// Create a client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.backend.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.backend.endpoint)?,
            api_key: config.backend.api_key.clone(),
            auth: config.backend.auth,
            api_version: config.backend.api_version.clone(),
            poll_interval: Duration::from_millis(config.backend.vector_store_poll_ms),
        })
    }

    /// Create an unauthenticated client with custom base URL
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(120)).build()?,
            base_url: normalize_base_url(base_url)?,
            api_key: None,
            auth: AuthScheme::Bearer,
            api_version: None,
            poll_interval: Duration::from_secs(1),
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>, auth: AuthScheme) -> Self {
        self.api_key = Some(key.into());
        self.auth = auth;
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.join(path)?;
        if let Some(version) = &self.api_version {
            url.query_pairs_mut().append_pair("api-version", version);
        }
        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let builder = self.client.request(method, self.url(path)?);
        Ok(match (&self.api_key, self.auth) {
            (Some(key), AuthScheme::Bearer) => builder.bearer_auth(key),
            (Some(key), AuthScheme::ApiKey) => builder.header("api-key", key),
            (None, _) => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                AgentError::backend(format!(
                    "Cannot connect to the agent service at {}",
                    self.base_url
                ))
            } else {
                AgentError::from(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status,
                message: error_message(&body),
            });
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| AgentError::backend(format!("Failed to parse response: {}", e)))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(path, "POST");
        let response = self
            .send(self.request(Method::POST, path)?.json(body))
            .await?;
        Self::read_json(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let response = self.send(self.request(Method::GET, path)?).await?;
        Self::read_json(response).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        debug!(path, "DELETE");
        self.send(self.request(Method::DELETE, path)?).await?;
        Ok(())
    }

    async fn open_stream(&self, path: &str, body: &serde_json::Value) -> Result<EventStream> {
        debug!(path, "POST (stream)");
        let response = self
            .send(
                self.request(Method::POST, path)?
                    .header(ACCEPT, "text/event-stream")
                    .json(body),
            )
            .await?;
        Ok(event_stream(response))
    }
}

/// Joining relative paths needs a trailing slash on the base
fn normalize_base_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Pull `error.message` out of an error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Turn an SSE response body into run events
///
/// The stream ends after the first transport or decode error.
fn event_stream(response: Response) -> EventStream {
    let frames = response.bytes_stream().eventsource();

    Box::pin(async_stream::stream! {
        futures::pin_mut!(frames);

        while let Some(frame) = frames.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    yield Err(AgentError::backend(format!("Stream read failed: {}", e)));
                    return;
                }
            };

            match decode_frame(&frame) {
                Ok(Some(event)) => yield Ok(event),
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    })
}

#[async_trait]
impl AgentBackend for AgentsClient {
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<String> {
        let agent: IdPayload = self.post_json("assistants", request).await?;
        Ok(agent.id)
    }

    async fn create_thread(&self) -> Result<String> {
        let thread: IdPayload = self.post_json("threads", &json!({})).await?;
        Ok(thread.id)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<String> {
        let message: IdPayload = self
            .post_json(
                &format!("threads/{}/messages", thread_id),
                &json!({ "role": role, "content": content }),
            )
            .await?;
        Ok(message.id)
    }

    async fn create_run_stream(&self, request: &RunRequest) -> Result<EventStream> {
        let mut body = serde_json::to_value(request)?;
        body["stream"] = json!(true);
        self.open_stream(&format!("threads/{}/runs", request.thread_id), &body)
            .await
    }

    async fn submit_tool_outputs_stream(
        &self,
        run: &RunHandle,
        outputs: &[ToolOutput],
    ) -> Result<EventStream> {
        let body = json!({ "tool_outputs": outputs, "stream": true });
        self.open_stream(
            &format!(
                "threads/{}/runs/{}/submit_tool_outputs",
                run.thread_id, run.run_id
            ),
            &body,
        )
        .await
    }

    async fn cancel_run(&self, run: &RunHandle) -> Result<()> {
        let _: serde_json::Value = self
            .post_json(
                &format!("threads/{}/runs/{}/cancel", run.thread_id, run.run_id),
                &json!({}),
            )
            .await?;
        Ok(())
    }

    async fn get_file_content(&self, file_id: &str) -> Result<Vec<u8>> {
        let response = self
            .send(self.request(Method::GET, &format!("files/{}/content", file_id))?)
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AgentError::setup(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let response = self
            .send(self.request(Method::POST, "files")?.multipart(form))
            .await?;
        let file: IdPayload = Self::read_json(response).await?;
        Ok(file.id)
    }

    async fn create_vector_store(&self, name: &str, file_ids: &[String]) -> Result<String> {
        let mut store: VectorStorePayload = self
            .post_json(
                "vector_stores",
                &json!({ "name": name, "file_ids": file_ids }),
            )
            .await?;

        let mut polls = 0;
        while store.status.as_deref() == Some("in_progress") {
            if polls >= MAX_VECTOR_STORE_POLLS {
                return Err(AgentError::backend(format!(
                    "Vector store {} still indexing after {} checks",
                    store.id, polls
                )));
            }
            polls += 1;
            tokio::time::sleep(self.poll_interval).await;
            store = self.get_json(&format!("vector_stores/{}", store.id)).await?;
        }

        match store.status.as_deref() {
            Some("failed") | Some("expired") => Err(AgentError::backend(format!(
                "Vector store {} could not be built",
                store.id
            ))),
            _ => Ok(store.id),
        }
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.delete(&format!("threads/{}", thread_id)).await
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.delete(&format!("assistants/{}", agent_id)).await
    }
}

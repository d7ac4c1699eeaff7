//! Knowledge-grounded question answering via the OpenAI Assistants API.
//!
//! Answers are restricted to a fixed vector store through the `file_search`
//! tool. Creating the assistant is expensive and its configuration is
//! constant for the process, so the identity is created lazily at most once
//! and shared by every turn of every session. Runs are asynchronous jobs
//! polled to a terminal state with a bounded wait.

use crate::config::OpenAiConfig;
use crate::engine::{Citation, KbAnswer, KnowledgeEngine};
use crate::error::VoiceError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Maximum total time to wait for an assistant run to reach a terminal state.
const RUN_MAX_WAIT: Duration = Duration::from_secs(60);

/// Interval between run status polls.
const RUN_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Minimal identity of a created API object.
#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

/// Run state as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunState {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub last_error: Option<LastError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LastError {
    #[serde(default)]
    pub message: String,
}

impl RunState {
    pub(crate) fn is_pending(&self) -> bool {
        matches!(self.status.as_str(), "queued" | "in_progress")
    }
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Vec<serde_json::Value>,
}

/// Polls `fetch` until the run leaves its pending states, sleeping
/// `interval` between attempts, for at most `max_wait` in total.
///
/// Exceeding the bound is a failure, never an infinite hang.
pub(crate) async fn poll_until_terminal<F, Fut>(
    mut fetch: F,
    max_wait: Duration,
    interval: Duration,
) -> Result<RunState, VoiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RunState, VoiceError>>,
{
    let mut waited = Duration::ZERO;
    loop {
        let run = fetch().await?;
        if !run.is_pending() {
            return Ok(run);
        }
        if waited >= max_wait {
            return Err(VoiceError::Kb(format!(
                "assistant run still {} after {}s",
                run.status,
                max_wait.as_secs()
            )));
        }
        tokio::time::sleep(interval).await;
        waited += interval;
    }
}

/// Knowledge engine backed by a lazily-created, process-wide assistant.
pub struct AssistantKnowledgeEngine {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    vector_store_id: String,
    instructions: String,
    /// Single-flight cell for the shared assistant identity. Seeded from
    /// config when an assistant id is supplied externally.
    assistant_id: OnceCell<String>,
    max_wait: Duration,
    poll_interval: Duration,
}

impl AssistantKnowledgeEngine {
    pub fn new(client: reqwest::Client, config: &OpenAiConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.assistant_model.clone(),
            vector_store_id: config.vector_store_id.clone(),
            instructions: config.assistant_instructions.clone(),
            assistant_id: OnceCell::new_with(config.assistant_id.clone()),
            max_wait: RUN_MAX_WAIT,
            poll_interval: RUN_POLL_INTERVAL,
        }
    }

    /// Overrides the run-polling bounds. Intended for tests and unusual
    /// deployments; the defaults match upstream latency.
    pub fn with_poll_timing(mut self, max_wait: Duration, interval: Duration) -> Self {
        self.max_wait = max_wait;
        self.poll_interval = interval;
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    /// Returns the shared assistant id, creating the assistant on first use.
    ///
    /// `get_or_try_init` serializes racing initializers, so concurrent
    /// sessions hitting a cold process still create exactly one assistant.
    async fn ensure_assistant(&self) -> Result<&str, VoiceError> {
        let id = self
            .assistant_id
            .get_or_try_init(|| async {
                let body = json!({
                    "name": "KB Voice Assistant",
                    "instructions": self.instructions,
                    "model": self.model,
                    "tools": [{"type": "file_search"}],
                    "tool_resources": {
                        "file_search": {"vector_store_ids": [self.vector_store_id]}
                    },
                });
                let created: ObjectId =
                    expect_json(self.post("/assistants").json(&body).send().await).await?;
                tracing::info!(assistant_id = %created.id, "created knowledge-base assistant");
                Ok::<_, VoiceError>(created.id)
            })
            .await?;
        Ok(id)
    }

    async fn fetch_run(&self, thread_id: &str, run_id: &str) -> Result<RunState, VoiceError> {
        expect_json(
            self.get(&format!("/threads/{}/runs/{}", thread_id, run_id))
                .send()
                .await,
        )
        .await
    }
}

#[async_trait]
impl KnowledgeEngine for AssistantKnowledgeEngine {
    async fn ask(
        &self,
        question: &str,
        style_directives: Option<&str>,
    ) -> Result<KbAnswer, VoiceError> {
        let assistant_id = self.ensure_assistant().await?;

        let thread: ObjectId =
            expect_json(self.post("/threads").json(&json!({})).send().await).await?;

        let _: serde_json::Value = expect_json(
            self.post(&format!("/threads/{}/messages", thread.id))
                .json(&json!({"role": "user", "content": question}))
                .send()
                .await,
        )
        .await?;

        let mut run_body = json!({"assistant_id": assistant_id});
        if let Some(style) = style_directives {
            run_body["additional_instructions"] = style.into();
        }
        let run: RunState = expect_json(
            self.post(&format!("/threads/{}/runs", thread.id))
                .json(&run_body)
                .send()
                .await,
        )
        .await?;

        let run = if run.is_pending() {
            poll_until_terminal(
                || self.fetch_run(&thread.id, &run.id),
                self.max_wait,
                self.poll_interval,
            )
            .await?
        } else {
            run
        };

        if run.status != "completed" {
            let detail = run
                .last_error
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("assistant run status: {}", run.status));
            return Err(VoiceError::Kb(detail));
        }

        let messages: MessageList = expect_json(
            self.get(&format!("/threads/{}/messages", thread.id))
                .send()
                .await,
        )
        .await?;

        let Some(message) = messages.data.iter().find(|m| m.role == "assistant") else {
            return Ok(KbAnswer::default());
        };
        Ok(extract_answer(message))
    }
}

/// Checks status and deserializes the response body, mapping every failure
/// into a knowledge-engine error.
async fn expect_json<T: DeserializeOwned>(
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, VoiceError> {
    let response = response.map_err(|e| VoiceError::Kb(e.to_string()))?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(VoiceError::Kb(format!(
            "assistants API returned {}: {}",
            status, body
        )));
    }
    response.json().await.map_err(|e| VoiceError::Kb(e.to_string()))
}

/// Pulls answer text and citations out of an assistant message.
///
/// Annotation objects pass through verbatim; anything that is not an object
/// is wrapped as `{"citation": <display form>}` so shape surprises upstream
/// never fail the turn.
fn extract_answer(message: &ThreadMessage) -> KbAnswer {
    let mut answer = String::new();
    let mut citations: Vec<Citation> = Vec::new();

    for part in &message.content {
        if part.get("type").and_then(|t| t.as_str()) != Some("text") {
            continue;
        }
        let Some(text) = part.get("text") else {
            continue;
        };
        if let Some(value) = text.get("value").and_then(|v| v.as_str()) {
            answer.push_str(value);
        }
        if let Some(annotations) = text.get("annotations").and_then(|a| a.as_array()) {
            for annotation in annotations {
                if annotation.is_object() {
                    citations.push(annotation.clone());
                } else {
                    citations.push(json!({"citation": annotation.to_string()}));
                }
            }
        }
    }

    KbAnswer {
        answer: answer.trim().to_string(),
        citations,
    }
}

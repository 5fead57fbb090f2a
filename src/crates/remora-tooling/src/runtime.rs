//! The external agent runtime boundary (§6, "Agent runtime (consumed)")
//! and the human-input adapter built on top of it (§4.8).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use remora_events::{Event, EventBus, EventKind};
use remora_model::BundleHandle;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Result, ToolingError};

/// Model invocation parameters the executor forwards untouched to the
/// runtime; the core never interprets these.
#[derive(Debug, Clone, Default)]
pub struct ModelParams {
    pub model: String,
    pub temperature: Option<f64>,
    pub extra: HashMap<String, Value>,
}

/// What one agent invocation produced.
#[derive(Debug, Clone)]
pub struct AgentRunOutput {
    pub output: String,
    pub raw: Value,
}

impl AgentRunOutput {
    pub fn new(output: impl Into<String>) -> Self {
        Self { output: output.into(), raw: Value::Null }
    }
}

/// The boundary the executor calls into for every agent task (§6).
/// `observer` is the run's event bus; the runtime is expected to emit
/// `KernelStart`/`KernelEnd`, `ModelRequest`/`ModelResponse`,
/// `ToolCall`/`ToolResult`, and `TurnComplete` on it as the agent runs.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(
        &self,
        bundle: &BundleHandle,
        prompt: &str,
        observer: Arc<EventBus>,
        agent_id: &str,
        model_params: &ModelParams,
        max_turns: u32,
        cancellation: CancellationToken,
    ) -> Result<AgentRunOutput>;
}

/// A scripted outcome for one [`FakeAgentRuntime`] invocation, letting
/// tests exercise every §8 scenario without a real LLM.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed(String),
    Fail(String),
    SleepThenSucceed(Duration, String),
    AskHuman { question: String, options: Option<Vec<String>>, timeout: Duration },
}

/// Test double for [`AgentRuntime`]. Each `agent_id` gets a scripted
/// [`Behavior`]; unscripted ids fall back to `default`.
pub struct FakeAgentRuntime {
    behaviors: DashMap<String, Behavior>,
    default: Behavior,
}

impl FakeAgentRuntime {
    pub fn new(default: Behavior) -> Self {
        Self { behaviors: DashMap::new(), default }
    }

    pub fn script(&self, agent_id: impl Into<String>, behavior: Behavior) {
        self.behaviors.insert(agent_id.into(), behavior);
    }
}

#[async_trait]
impl AgentRuntime for FakeAgentRuntime {
    async fn run(
        &self,
        _bundle: &BundleHandle,
        _prompt: &str,
        observer: Arc<EventBus>,
        agent_id: &str,
        _model_params: &ModelParams,
        _max_turns: u32,
        cancellation: CancellationToken,
    ) -> Result<AgentRunOutput> {
        if cancellation.is_cancelled() {
            return Err(ToolingError::Cancelled);
        }

        let behavior = self
            .behaviors
            .get(agent_id)
            .map(|b| b.clone())
            .unwrap_or_else(|| self.default.clone());

        match behavior {
            Behavior::Succeed(output) => Ok(AgentRunOutput::new(output)),
            Behavior::Fail(error) => Err(ToolingError::RuntimeFailed(error)),
            Behavior::SleepThenSucceed(duration, output) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => Ok(AgentRunOutput::new(output)),
                    _ = cancellation.cancelled() => Err(ToolingError::Cancelled),
                }
            }
            Behavior::AskHuman { question, options, timeout } => {
                HumanInputCoordinator::ask(&observer, agent_id, question, options, timeout)
                    .await
                    .map(AgentRunOutput::new)
            }
        }
    }
}

/// Thin adapter over the event bus implementing human-in-the-loop
/// requests (§4.8); not a component with its own state.
pub struct HumanInputCoordinator;

impl HumanInputCoordinator {
    /// Emit `HumanInputRequest` and suspend for the matching
    /// `HumanInputResponse`, returning its `response` string. A timeout
    /// surfaces as [`ToolingError::RuntimeTimeout`], a recoverable error
    /// the caller may retry.
    pub async fn ask(
        bus: &EventBus,
        agent_id: &str,
        question: impl Into<String>,
        options: Option<Vec<String>>,
        timeout: Duration,
    ) -> Result<String> {
        let request_id = Uuid::new_v4().to_string();
        bus.emit(Event::HumanInputRequest {
            timestamp: Event::now_ts(),
            graph_id: String::new(),
            agent_id: agent_id.to_string(),
            request_id: request_id.clone(),
            question: question.into(),
            options,
        });

        let wanted = request_id.clone();
        let event = bus
            .wait_for(
                EventKind::HumanInputResponse,
                move |e| matches!(e, Event::HumanInputResponse { request_id, .. } if *request_id == wanted),
                timeout,
            )
            .await
            .map_err(|_| ToolingError::RuntimeTimeout)?;

        match event {
            Event::HumanInputResponse { response, .. } => Ok(response),
            _ => unreachable!("wait_for filtered to HumanInputResponse"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_model::BundleHandle;

    #[tokio::test]
    async fn fake_runtime_returns_scripted_success() {
        let runtime = FakeAgentRuntime::new(Behavior::Fail("unscripted".into()));
        runtime.script("agent-1", Behavior::Succeed("done".into()));
        let bus = Arc::new(EventBus::new());

        let result = runtime
            .run(
                &BundleHandle::new("b"),
                "prompt",
                bus,
                "agent-1",
                &ModelParams::default(),
                1,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.output, "done");
    }

    #[tokio::test]
    async fn fake_runtime_surfaces_scripted_failure() {
        let runtime = FakeAgentRuntime::new(Behavior::Succeed("default".into()));
        runtime.script("agent-1", Behavior::Fail("boom".into()));
        let bus = Arc::new(EventBus::new());

        let result = runtime
            .run(
                &BundleHandle::new("b"),
                "prompt",
                bus,
                "agent-1",
                &ModelParams::default(),
                1,
                CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ToolingError::RuntimeFailed(_))));
    }

    #[tokio::test]
    async fn cancellation_short_circuits_a_sleeping_run() {
        let runtime = FakeAgentRuntime::new(Behavior::SleepThenSucceed(Duration::from_secs(10), "late".into()));
        let bus = Arc::new(EventBus::new());
        let token = CancellationToken::new();
        token.cancel();

        let result = runtime
            .run(
                &BundleHandle::new("b"),
                "prompt",
                bus,
                "agent-1",
                &ModelParams::default(),
                1,
                token,
            )
            .await;
        assert!(matches!(result, Err(ToolingError::Cancelled)));
    }

    #[tokio::test]
    async fn human_input_round_trip_resumes_with_the_response() {
        let bus = Arc::new(EventBus::new());
        // Subscribe before spawning the asker so its emit can't race ahead
        // of this test's own subscription.
        let mut requests = bus.stream(vec![EventKind::HumanInputRequest]);

        let asker_bus = bus.clone();
        let asker = tokio::spawn(async move {
            HumanInputCoordinator::ask(&asker_bus, "agent-1", "which option?", Some(vec!["a".into(), "b".into()]), Duration::from_secs(1)).await
        });

        let request_id = match requests.next().await {
            Some(Event::HumanInputRequest { request_id, .. }) => request_id,
            other => panic!("expected HumanInputRequest, got {other:?}"),
        };
        bus.emit(Event::HumanInputResponse { timestamp: Event::now_ts(), request_id, response: "b".into() });

        let response = asker.await.unwrap().unwrap();
        assert_eq!(response, "b");
    }
}

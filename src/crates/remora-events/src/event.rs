//! The typed event variant set carried by the [`crate::bus::EventBus`].
//!
//! Covers §4.1/§6: lifecycle, human-input, checkpoint events owned by
//! the core, plus the agent-runtime variants re-exported through the
//! same union so every subscriber pattern-matches uniformly (§9,
//! "Observer integration").

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The discriminant used by `subscribe`/`wait_for`/`stream` filters.
/// Kept separate from [`Event`] itself so a filter can be built without
/// constructing a dummy payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    GraphStart,
    GraphComplete,
    GraphError,
    AgentStart,
    AgentComplete,
    AgentError,
    AgentSkipped,
    HumanInputRequest,
    HumanInputResponse,
    CheckpointSaved,
    CheckpointRestored,
    KernelStart,
    KernelEnd,
    ModelRequest,
    ModelResponse,
    ToolCall,
    ToolResult,
    TurnComplete,
}

/// An immutable, variant-tagged event record. All variants carry
/// `timestamp` (seconds since the Unix epoch, double precision) per §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    GraphStart {
        timestamp: f64,
        graph_id: String,
        node_count: usize,
    },
    GraphComplete {
        timestamp: f64,
        graph_id: String,
        completed_count: usize,
        failed_count: usize,
    },
    GraphError {
        timestamp: f64,
        graph_id: String,
        error: String,
    },
    AgentStart {
        timestamp: f64,
        graph_id: String,
        agent_id: String,
        node_name: String,
    },
    AgentComplete {
        timestamp: f64,
        graph_id: String,
        agent_id: String,
        /// Truncated to roughly 200 chars per §6.
        result_summary: String,
    },
    AgentError {
        timestamp: f64,
        graph_id: String,
        agent_id: String,
        error: String,
    },
    AgentSkipped {
        timestamp: f64,
        graph_id: String,
        agent_id: String,
        reason: String,
    },
    HumanInputRequest {
        timestamp: f64,
        graph_id: String,
        agent_id: String,
        request_id: String,
        question: String,
        options: Option<Vec<String>>,
    },
    HumanInputResponse {
        timestamp: f64,
        request_id: String,
        response: String,
    },
    CheckpointSaved {
        timestamp: f64,
        graph_id: String,
        checkpoint_id: String,
    },
    CheckpointRestored {
        timestamp: f64,
        graph_id: String,
        checkpoint_id: String,
    },
    KernelStart {
        timestamp: f64,
        agent_id: String,
        turn_index: Option<u32>,
    },
    KernelEnd {
        timestamp: f64,
        agent_id: String,
        turn_index: Option<u32>,
    },
    ModelRequest {
        timestamp: f64,
        agent_id: String,
        model: String,
        token_counts: Option<Value>,
    },
    ModelResponse {
        timestamp: f64,
        agent_id: String,
        model: String,
        token_counts: Option<Value>,
    },
    ToolCall {
        timestamp: f64,
        agent_id: String,
        tool_name: String,
        arguments: Value,
    },
    ToolResult {
        timestamp: f64,
        agent_id: String,
        tool_name: String,
        output: Value,
        is_error: bool,
    },
    TurnComplete {
        timestamp: f64,
        agent_id: String,
        turn_index: u32,
    },
}

impl Event {
    /// The discriminant of this event, used for filter matching.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::GraphStart { .. } => EventKind::GraphStart,
            Event::GraphComplete { .. } => EventKind::GraphComplete,
            Event::GraphError { .. } => EventKind::GraphError,
            Event::AgentStart { .. } => EventKind::AgentStart,
            Event::AgentComplete { .. } => EventKind::AgentComplete,
            Event::AgentError { .. } => EventKind::AgentError,
            Event::AgentSkipped { .. } => EventKind::AgentSkipped,
            Event::HumanInputRequest { .. } => EventKind::HumanInputRequest,
            Event::HumanInputResponse { .. } => EventKind::HumanInputResponse,
            Event::CheckpointSaved { .. } => EventKind::CheckpointSaved,
            Event::CheckpointRestored { .. } => EventKind::CheckpointRestored,
            Event::KernelStart { .. } => EventKind::KernelStart,
            Event::KernelEnd { .. } => EventKind::KernelEnd,
            Event::ModelRequest { .. } => EventKind::ModelRequest,
            Event::ModelResponse { .. } => EventKind::ModelResponse,
            Event::ToolCall { .. } => EventKind::ToolCall,
            Event::ToolResult { .. } => EventKind::ToolResult,
            Event::TurnComplete { .. } => EventKind::TurnComplete,
        }
    }

    /// Seconds since the Unix epoch, as carried on every variant.
    pub fn now_ts() -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let e = Event::AgentStart {
            timestamp: 0.0,
            graph_id: "g".into(),
            agent_id: "a".into(),
            node_name: "n".into(),
        };
        assert_eq!(e.kind(), EventKind::AgentStart);
    }
}

use std::time::Duration;

use remora_tooling::ModelParams;

/// What to do when a task in a batch fails (§4.6, "Error policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop launching further batches after this one settles.
    StopGraph,
    /// Mark the transitive downstream closure of every failure as skipped.
    SkipDownstream,
    /// Take no additional action; downstream tasks still attempt to run.
    Continue,
}

/// Tunables for one [`crate::executor::Executor::run`] invocation.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_concurrency: usize,
    pub error_policy: ErrorPolicy,
    pub per_agent_timeout: Option<Duration>,
    /// Cap on `ResultSummary.output` length.
    pub output_truncation_limit: usize,
    /// Cap on the `AgentComplete` event's `result_summary` field.
    pub event_summary_limit: usize,
    pub model_params: ModelParams,
    pub max_turns: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            error_policy: ErrorPolicy::SkipDownstream,
            per_agent_timeout: None,
            output_truncation_limit: 4096,
            event_summary_limit: 200,
            model_params: ModelParams::default(),
            max_turns: 25,
        }
    }
}

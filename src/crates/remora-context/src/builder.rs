use std::collections::{HashMap, VecDeque};

use remora_events::{Event, EventKind};
use remora_model::SourceNode;
use tokio::sync::RwLock;

use crate::action::{truncate_summary, RecentAction};

/// Looks up related-code snippets for a target node, injected by the
/// caller. Lookup failures are logged and suppressed (§4.5, "Failure").
pub trait RelatedCodeStore: Send + Sync {
    fn related(&self, target: &SourceNode) -> Option<String>;
}

/// Bounds on the state [`ContextBuilder`] retains.
#[derive(Debug, Clone, Copy)]
pub struct ContextConfig {
    /// Ring buffer capacity for recent actions.
    pub window_size: usize,
    /// How many completed-agent summaries `render` includes.
    pub summary_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            summary_limit: 10,
        }
    }
}

/// Derives a bounded textual prompt fragment from the observed event
/// stream (§4.5). State updates are pure given the event; rendering is
/// referentially transparent given the current state.
pub struct ContextBuilder {
    config: ContextConfig,
    actions: RwLock<VecDeque<RecentAction>>,
    summaries: RwLock<HashMap<String, String>>,
    summary_order: RwLock<VecDeque<String>>,
    related_code: Option<Box<dyn RelatedCodeStore>>,
}

impl ContextBuilder {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            actions: RwLock::new(VecDeque::with_capacity(config.window_size)),
            summaries: RwLock::new(HashMap::new()),
            summary_order: RwLock::new(VecDeque::new()),
            related_code: None,
        }
    }

    pub fn with_related_code_store(mut self, store: impl RelatedCodeStore + 'static) -> Self {
        self.related_code = Some(Box::new(store));
        self
    }

    /// Subscribes to all events; ignores variants it does not use (§4.5).
    pub async fn handle(&self, event: &Event) {
        match event {
            Event::ToolResult { tool_name, output, is_error, .. } => {
                self.push_action(RecentAction {
                    source: tool_name.clone(),
                    success: !is_error,
                    summary: truncate_summary(&output.to_string()),
                })
                .await;
            }
            Event::AgentError { agent_id, error, .. } => {
                self.push_action(RecentAction {
                    source: agent_id.clone(),
                    success: false,
                    summary: truncate_summary(error),
                })
                .await;
            }
            Event::AgentComplete { agent_id, result_summary, .. } => {
                self.record_summary(agent_id.clone(), result_summary.clone()).await;
            }
            _ => {}
        }
    }

    async fn push_action(&self, action: RecentAction) {
        let mut actions = self.actions.write().await;
        if actions.len() == self.config.window_size {
            actions.pop_front();
        }
        actions.push_back(action);
    }

    async fn record_summary(&self, agent_id: String, summary: String) {
        let mut summaries = self.summaries.write().await;
        let mut order = self.summary_order.write().await;
        if !summaries.contains_key(&agent_id) {
            order.push_back(agent_id.clone());
            if order.len() > self.config.summary_limit {
                if let Some(evicted) = order.pop_front() {
                    summaries.remove(&evicted);
                }
            }
        }
        summaries.insert(agent_id, summary);
    }

    /// Produce a deterministic prompt fragment for `target`. Always
    /// returns a string, possibly empty; auxiliary lookup failures never
    /// propagate (§4.5, "Failure").
    pub async fn render(&self, target: &SourceNode) -> String {
        let mut sections = Vec::new();

        if let Some(store) = &self.related_code {
            match store.related(target) {
                Some(related) if !related.is_empty() => {
                    sections.push(format!("## Related Code\n{related}"));
                }
                _ => {}
            }
        }

        let actions = self.actions.read().await;
        if !actions.is_empty() {
            let lines: Vec<String> = actions
                .iter()
                .map(|a| {
                    let status = if a.success { "ok" } else { "error" };
                    format!("- [{status}] {}: {}", a.source, a.summary)
                })
                .collect();
            sections.push(format!("## Recent Actions\n{}", lines.join("\n")));
        }
        drop(actions);

        let order = self.summary_order.read().await;
        let summaries = self.summaries.read().await;
        if !order.is_empty() {
            let lines: Vec<String> = order
                .iter()
                .rev()
                .take(self.config.summary_limit)
                .rev()
                .filter_map(|id| summaries.get(id).map(|s| format!("- {id}: {s}")))
                .collect();
            if !lines.is_empty() {
                sections.push(format!("## Prior Analysis\n{}", lines.join("\n")));
            }
        }

        sections.join("\n\n")
    }
}

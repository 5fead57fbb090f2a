//! Wires discovery, the graph builder, a workspace manager, and the
//! executor into one call — the facade's one job (§1, overview).

use std::path::Path;
use std::sync::Arc;

use remora_context::ContextBuilder;
use remora_discovery::{discover, DiscoveryConfig, LanguagePackRegistry};
use remora_events::EventBus;
use remora_executor::{Executor, ExecutorConfig};
use remora_graph::{build, BundleMapping, EdgeRule};
use remora_model::ExecutorState;
use remora_tooling::AgentRuntime;
use remora_workspace::{WorkspaceConfig, WorkspaceManager, WorkspaceStore};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Tunables for one end-to-end [`Pipeline::run`].
pub struct PipelineConfig {
    pub discovery: DiscoveryConfig,
    pub workspace: WorkspaceConfig,
    pub executor: ExecutorConfig,
    pub bundle_mapping: BundleMapping,
    pub edge_rules: Vec<Box<dyn EdgeRule>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            workspace: WorkspaceConfig::default(),
            executor: ExecutorConfig::default(),
            bundle_mapping: BundleMapping::default(),
            edge_rules: Vec::new(),
        }
    }
}

/// Drives one project through discovery, graph construction, and
/// execution, wiring each subsystem's public API together behind one
/// call.
pub struct Pipeline<S: WorkspaceStore + 'static> {
    registry: LanguagePackRegistry,
    bus: Arc<EventBus>,
    context: Arc<ContextBuilder>,
    runtime: Arc<dyn AgentRuntime>,
    store: Arc<S>,
}

impl<S: WorkspaceStore + 'static> Pipeline<S> {
    pub fn new(
        registry: LanguagePackRegistry,
        bus: Arc<EventBus>,
        context: Arc<ContextBuilder>,
        runtime: Arc<dyn AgentRuntime>,
        store: Arc<S>,
    ) -> Self {
        Self { registry, bus, context, runtime, store }
    }

    /// The event bus this pipeline's runs publish to; subscribe before
    /// calling [`Pipeline::run`] to avoid missing early events.
    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    /// A fresh, unseeded workspace manager sharing this pipeline's store.
    /// Build one directly when a caller needs to restore a checkpoint
    /// before running, or wants to hold a handle for post-run snapshotting.
    pub fn new_workspace_manager(&self, graph_id: impl Into<String>) -> Arc<WorkspaceManager<S>> {
        Arc::new(WorkspaceManager::new(graph_id, self.store.clone()))
    }

    /// Discover `project_root`, build its dependency graph, and execute it
    /// to completion against `workspaces`, returning the final
    /// [`ExecutorState`].
    pub async fn run(
        &self,
        project_root: &Path,
        graph_id: &str,
        config: &PipelineConfig,
        workspaces: Arc<WorkspaceManager<S>>,
        cancellation: CancellationToken,
    ) -> Result<ExecutorState> {
        let nodes = discover(&[project_root], &config.discovery, &self.registry)?;
        let graph = build(&nodes, &config.bundle_mapping, &config.edge_rules)?;

        let executor = Executor::new(config.executor.clone(), self.runtime.clone(), self.bus.clone(), self.context.clone());
        let state = executor
            .run(graph, graph_id, project_root, &config.workspace, workspaces, cancellation)
            .await?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_context::ContextConfig;
    use remora_events::EventKind;
    use remora_model::{BundleHandle, NODE_TYPE_FILE, NODE_TYPE_FUNCTION};
    use remora_tooling::{Behavior, FakeAgentRuntime};
    use remora_workspace::MemoryStore;

    fn registry() -> LanguagePackRegistry {
        LanguagePackRegistry::with_builtins()
    }

    #[tokio::test]
    async fn end_to_end_run_completes_every_discovered_task() {
        let project = tempfile::tempdir().unwrap();
        std::fs::write(project.path().join("a.rs"), "fn foo() {}\n").unwrap();

        let bus = Arc::new(EventBus::new());
        let context = Arc::new(ContextBuilder::new(ContextConfig::default()));
        let runtime = Arc::new(FakeAgentRuntime::new(Behavior::Succeed("reviewed".into())));
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(registry(), bus.clone(), context, runtime, store);

        let mut config = PipelineConfig::default();
        config.bundle_mapping = BundleMapping::new()
            .map(NODE_TYPE_FILE, BundleHandle::new("file-bundle"))
            .map(NODE_TYPE_FUNCTION, BundleHandle::new("lint-bundle"));

        let mut graph_started = bus.stream(vec![EventKind::GraphStart]);
        let workspaces = pipeline.new_workspace_manager("run-1");
        let state = pipeline
            .run(project.path(), "run-1", &config, workspaces, CancellationToken::new())
            .await
            .unwrap();

        assert!(graph_started.next().await.is_some());
        assert!(!state.results.is_empty());
        assert!(state.failed.is_empty());
    }
}

//! Full discovery -> graph -> workspace -> executor run over an actual
//! small Rust source tree, driven entirely through the facade.

use std::sync::Arc;

use remora::{
    AgentRuntime, Behavior, BundleHandle, BundleMapping, ContextBuilder, ContextConfig, DiscoveryConfig, ErrorPolicy,
    EventBus, ExecutorConfig, FakeAgentRuntime, IntraFileEdgeRule, LanguagePackRegistry, MemoryStore, Pipeline,
    PipelineConfig, WorkspaceConfig, NODE_TYPE_FILE, NODE_TYPE_FUNCTION,
};
use tokio_util::sync::CancellationToken;

fn config() -> PipelineConfig {
    PipelineConfig {
        discovery: DiscoveryConfig::default(),
        workspace: WorkspaceConfig::default(),
        executor: ExecutorConfig { max_concurrency: 2, error_policy: ErrorPolicy::SkipDownstream, ..Default::default() },
        bundle_mapping: BundleMapping::new()
            .map(NODE_TYPE_FILE, BundleHandle::new("file-review"))
            .map(NODE_TYPE_FUNCTION, BundleHandle::new("function-lint")),
        edge_rules: vec![Box::new(IntraFileEdgeRule)],
    }
}

#[tokio::test]
async fn discovers_and_reviews_every_function_in_a_small_crate() {
    let project = tempfile::tempdir().unwrap();
    std::fs::write(
        project.path().join("lib.rs"),
        "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n\nfn sub(a: i32, b: i32) -> i32 {\n    a - b\n}\n",
    )
    .unwrap();

    let runtime: Arc<dyn AgentRuntime> = Arc::new(FakeAgentRuntime::new(Behavior::Succeed("looks fine".into())));
    let bus = Arc::new(EventBus::new());
    let context = Arc::new(ContextBuilder::new(ContextConfig::default()));
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(LanguagePackRegistry::with_builtins(), bus, context, runtime, store);

    let cfg = config();
    let workspaces = pipeline.new_workspace_manager("g1");
    let state = pipeline
        .run(project.path(), "g1", &cfg, workspaces, CancellationToken::new())
        .await
        .unwrap();

    // One file node plus two function nodes.
    assert_eq!(state.results.len(), 3);
    assert!(state.failed.is_empty());
    assert!(state.skipped.is_empty());
}

#[tokio::test]
async fn a_failing_file_review_skips_its_functions() {
    let project = tempfile::tempdir().unwrap();
    std::fs::write(project.path().join("lib.rs"), "fn broken() {\n    todo!()\n}\n").unwrap();

    let runtime = Arc::new(FakeAgentRuntime::new(Behavior::Succeed("ok".into())));
    let file_id = remora::SourceNode::derive_id(
        &std::fs::canonicalize(project.path().join("lib.rs")).unwrap().display().to_string(),
        NODE_TYPE_FILE,
        "lib",
    );
    runtime.script(file_id, Behavior::Fail("review crashed".into()));
    let runtime: Arc<dyn AgentRuntime> = runtime;

    let bus = Arc::new(EventBus::new());
    let context = Arc::new(ContextBuilder::new(ContextConfig::default()));
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(LanguagePackRegistry::with_builtins(), bus, context, runtime, store);

    let cfg = config();
    let workspaces = pipeline.new_workspace_manager("g1");
    let state = pipeline
        .run(project.path(), "g1", &cfg, workspaces, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(state.failed.len(), 1);
    assert_eq!(state.skipped.len(), 1);
    assert!(state.results.is_empty());
}

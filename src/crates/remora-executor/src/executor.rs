//! The core scheduler and failure-policy engine (§4.6).

use std::path::Path;
use std::sync::Arc;

use remora_context::ContextBuilder;
use remora_events::{Event, EventBus};
use remora_graph::Graph;
use remora_model::{AgentTask, ExecutorState, ResultSummary, TaskStatus};
use remora_tooling::{to_workspace_relative, AgentRuntime};
use remora_workspace::{WorkspaceConfig, WorkspaceManager, WorkspaceStore};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ErrorPolicy, ExecutorConfig};
use crate::error::{ExecutionError, Result};

/// Drives one graph to completion: batch-by-batch, semaphore-bounded
/// concurrency, with the configured [`ErrorPolicy`] applied after each
/// batch settles.
pub struct Executor<S: WorkspaceStore> {
    config: ExecutorConfig,
    runtime: Arc<dyn AgentRuntime>,
    bus: Arc<EventBus>,
    context: Arc<ContextBuilder>,
    _store: std::marker::PhantomData<fn() -> S>,
}

impl<S: WorkspaceStore + 'static> Executor<S> {
    pub fn new(config: ExecutorConfig, runtime: Arc<dyn AgentRuntime>, bus: Arc<EventBus>, context: Arc<ContextBuilder>) -> Self {
        Self { config, runtime, bus, context, _store: std::marker::PhantomData }
    }

    /// Run `graph` to completion over the project rooted at
    /// `project_root`, returning the final [`ExecutorState`] (§4.6
    /// algorithm, steps 1-6).
    ///
    /// `workspaces` is caller-owned rather than constructed here, so a
    /// `CheckpointManager` built against the same `Arc` can snapshot it
    /// before this run starts (restore) or after it ends (save) — see
    /// `remora-checkpoint`.
    pub async fn run(
        &self,
        graph: Graph,
        graph_id: &str,
        project_root: &Path,
        workspace_config: &WorkspaceConfig,
        workspaces: Arc<WorkspaceManager<S>>,
        cancellation: CancellationToken,
    ) -> Result<ExecutorState> {
        let ctx_for_sub = self.context.clone();
        let _context_sub = self.bus.subscribe_all(move |event| {
            let ctx = ctx_for_sub.clone();
            async move { ctx.handle(&event).await }
        });

        let state = Arc::new(Mutex::new(ExecutorState::new(graph_id, graph.tasks().clone())));
        self.bus.emit(Event::GraphStart {
            timestamp: Event::now_ts(),
            graph_id: graph_id.to_string(),
            node_count: graph.len(),
        });

        workspaces
            .seed(project_root, workspace_config)
            .await
            .map_err(|e| ExecutionError::Workspace(e.to_string()))?;

        let mut cancelled = false;
        'batches: for batch in graph.batches() {
            if cancellation.is_cancelled() {
                cancelled = true;
                break;
            }

            let runnable: Vec<String> = {
                let guard = state.lock().await;
                batch
                    .into_iter()
                    .filter(|id| !matches!(guard.status_of(id), Some(TaskStatus::Failed) | Some(TaskStatus::Skipped)))
                    .collect()
            };

            let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
            let mut handles = Vec::with_capacity(runnable.len());
            for task_id in &runnable {
                if cancellation.is_cancelled() {
                    cancelled = true;
                    break;
                }
                let task = graph.task(task_id).expect("runnable id came from this graph").clone();
                let semaphore = semaphore.clone();
                let runtime = self.runtime.clone();
                let bus = self.bus.clone();
                let context = self.context.clone();
                let workspaces = workspaces.clone();
                let config = self.config.clone();
                let graph_id = graph_id.to_string();
                let project_root = project_root.to_path_buf();
                let cancellation = cancellation.clone();
                let state = state.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");

                    {
                        let mut guard = state.lock().await;
                        let _ = guard.transition(&task.id, TaskStatus::Running);
                    }
                    bus.emit(Event::AgentStart {
                        timestamp: Event::now_ts(),
                        graph_id: graph_id.clone(),
                        agent_id: task.id.clone(),
                        node_name: task.name.clone(),
                    });

                    let outcome = run_one(&task, &*runtime, &bus, &context, &workspaces, &project_root, &config, cancellation).await;

                    let mut guard = state.lock().await;
                    match outcome {
                        Ok(summary) => {
                            let event_summary = truncate(&summary.output, config.event_summary_limit);
                            let _ = guard.complete(summary);
                            bus.emit(Event::AgentComplete {
                                timestamp: Event::now_ts(),
                                graph_id: graph_id.clone(),
                                agent_id: task.id.clone(),
                                result_summary: event_summary,
                            });
                        }
                        Err(error) => {
                            let _ = guard.transition(&task.id, TaskStatus::Failed);
                            bus.emit(Event::AgentError {
                                timestamp: Event::now_ts(),
                                graph_id: graph_id.clone(),
                                agent_id: task.id.clone(),
                                error,
                            });
                        }
                    }
                }));
            }

            for (task_id, handle) in runnable.iter().cloned().zip(handles) {
                if let Err(join_err) = handle.await {
                    warn!(error = %join_err, task_id = %task_id, "agent task panicked");
                    let mut guard = state.lock().await;
                    let _ = guard.transition(&task_id, TaskStatus::Failed);
                    self.bus.emit(Event::AgentError {
                        timestamp: Event::now_ts(),
                        graph_id: graph_id.to_string(),
                        agent_id: task_id.clone(),
                        error: ExecutionError::Internal(join_err.to_string()).to_string(),
                    });
                }
            }

            if cancellation.is_cancelled() {
                cancelled = true;
                break;
            }

            let mut guard = state.lock().await;
            match self.config.error_policy {
                ErrorPolicy::StopGraph => {
                    if runnable.iter().any(|id| guard.failed.contains(id)) {
                        break;
                    }
                }
                ErrorPolicy::SkipDownstream => {
                    for id in &runnable {
                        if !guard.failed.contains(id) {
                            continue;
                        }
                        for downstream_id in graph.transitive_downstream(id) {
                            let already_settled = matches!(
                                guard.status_of(&downstream_id),
                                Some(TaskStatus::Completed) | Some(TaskStatus::Failed) | Some(TaskStatus::Skipped)
                            );
                            if already_settled {
                                continue;
                            }
                            let _ = guard.transition(&downstream_id, TaskStatus::Skipped);
                            self.bus.emit(Event::AgentSkipped {
                                timestamp: Event::now_ts(),
                                graph_id: graph_id.to_string(),
                                agent_id: downstream_id.clone(),
                                reason: format!("upstream {id} failed"),
                            });
                        }
                    }
                }
                ErrorPolicy::Continue => {}
            }
        }

        workspaces.teardown(true);

        let final_state = Arc::try_unwrap(state)
            .unwrap_or_else(|arc| panic!("executor holds the only reference, got {} refs", Arc::strong_count(&arc)))
            .into_inner();

        if cancelled {
            self.bus.emit(Event::GraphError {
                timestamp: Event::now_ts(),
                graph_id: graph_id.to_string(),
                error: "cancelled".to_string(),
            });
        } else {
            self.bus.emit(Event::GraphComplete {
                timestamp: Event::now_ts(),
                graph_id: graph_id.to_string(),
                completed_count: final_state.results.len(),
                failed_count: final_state.failed.len(),
            });
        }
        info!(graph_id, completed = final_state.results.len(), failed = final_state.failed.len(), "graph run finished");

        Ok(final_state)
    }
}

async fn run_one<S: WorkspaceStore>(
    task: &AgentTask,
    runtime: &dyn AgentRuntime,
    bus: &Arc<EventBus>,
    context: &ContextBuilder,
    workspaces: &Arc<WorkspaceManager<S>>,
    project_root: &Path,
    config: &ExecutorConfig,
    cancellation: CancellationToken,
) -> std::result::Result<ResultSummary, String> {
    if let Err(err) = workspaces.get(&task.id).await {
        return Err(format!("failed to acquire workspace: {err}"));
    }

    if let Ok(relative) = to_workspace_relative(project_root, Path::new(&task.target.file_path)) {
        if let Err(err) = workspaces.read(&task.id, &relative).await {
            warn!(task_id = %task.id, path = %relative.display(), error = %err, "workspace file did not materialize for task");
        }
    }

    let rendered_context = context.render(&task.target).await;
    let prompt = build_prompt(task, &rendered_context);

    let invocation = runtime.run(
        &task.bundle_path,
        &prompt,
        bus.clone(),
        &task.id,
        &config.model_params,
        config.max_turns,
        cancellation,
    );

    let invoked = match config.per_agent_timeout {
        Some(duration) => match tokio::time::timeout(duration, invocation).await {
            Ok(result) => result,
            Err(_) => return Err(format!("agent {} timed out", task.id)),
        },
        None => invocation.await,
    };

    invoked
        .map(|output| ResultSummary::success(task.id.clone(), output.output, config.output_truncation_limit))
        .map_err(|err| err.to_string())
}

fn build_prompt(task: &AgentTask, rendered_context: &str) -> String {
    let header = format!(
        "# {}\n{}:{}-{}",
        task.name, task.target.file_path, task.target.start_line, task.target.end_line
    );
    let body = format!("```\n{}\n```", task.target.text);
    if rendered_context.is_empty() {
        format!("{header}\n\n{body}")
    } else {
        format!("{header}\n\n{body}\n\n{rendered_context}")
    }
}

fn truncate(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        s.to_string()
    } else {
        let mut truncated = s.chars().take(limit).collect::<String>();
        truncated.push('…');
        truncated
    }
}

//! The ordered graph of [`AgentTask`]s for one run (§4.3).
//!
//! All operations here are O(V+E): the topological sort is Kahn's
//! algorithm over an explicit in-degree count and a binary-heap ready
//! set, and `batches()` is a single linear pass over the precomputed
//! order annotated with each task's batch index. §4.3 calls out
//! quadratic implementations as a bug; there is no resort-the-whole-queue
//! step anywhere in this module.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use remora_model::AgentTask;

use crate::error::{GraphError, Result};

/// A dependency-ordered set of [`AgentTask`]s, plus the precomputed
/// topological order and batch assignment.
#[derive(Debug, Clone)]
pub struct Graph {
    tasks: HashMap<String, AgentTask>,
    /// Topological order, Kahn's algorithm with the §3 tie-break:
    /// descending priority, then ascending id.
    order: Vec<String>,
    /// `batch_of[i]` is the batch index of `order[i]`.
    batch_of: HashMap<String, usize>,
    batch_count: usize,
}

/// Ready-set entry; `Ord` sorts highest-priority, lowest-id first (the
/// §3 tie-break), so a sorted `Vec<Ready>` can be consumed front-to-back
/// as the next wave's priority order.
#[derive(Eq, PartialEq)]
struct Ready {
    priority: i64,
    id: String,
}

impl Ord for Ready {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| Reverse(&self.id).cmp(&Reverse(&other.id)))
    }
}

impl PartialOrd for Ready {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Graph {
    /// Build a graph from tasks whose `upstream`/`downstream` sets are
    /// already populated (see [`crate::builder::build`]).
    ///
    /// Runs Kahn's algorithm once to both validate acyclicity and produce
    /// the stable order; raises [`GraphError::Cycle`] naming every id that
    /// never became ready, per §4.3.
    pub fn from_tasks(tasks: HashMap<String, AgentTask>) -> Result<Self> {
        let mut in_degree: HashMap<String, usize> = tasks
            .keys()
            .map(|id| (id.clone(), 0usize))
            .collect();
        for task in tasks.values() {
            for down in &task.downstream {
                if let Some(entry) = in_degree.get_mut(down) {
                    *entry += 1;
                }
            }
        }

        let mut frontier: Vec<Ready> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| Ready {
                priority: tasks[id].priority,
                id: id.clone(),
            })
            .collect();
        frontier.sort_by(|a, b| b.cmp(a));

        let mut order = Vec::with_capacity(tasks.len());
        let mut batch_of = HashMap::with_capacity(tasks.len());
        let mut batch_index = 0usize;
        let mut remaining = tasks.len();

        // Process one full "wave" (batch) at a time: release every
        // currently-ready task's downstream edges, then seed the next
        // wave from whatever just hit in-degree zero. This makes
        // batch_of correct in the same pass as the topological order.
        while !frontier.is_empty() {
            let this_wave = std::mem::take(&mut frontier);
            let mut next_ready: Vec<Ready> = Vec::new();
            for ready in this_wave {
                order.push(ready.id.clone());
                batch_of.insert(ready.id.clone(), batch_index);
                remaining -= 1;
                for down in &tasks[&ready.id].downstream {
                    if let Some(entry) = in_degree.get_mut(down) {
                        *entry -= 1;
                        if *entry == 0 {
                            next_ready.push(Ready {
                                priority: tasks[down].priority,
                                id: down.clone(),
                            });
                        }
                    }
                }
            }
            next_ready.sort_by(|a, b| b.cmp(a));
            frontier = next_ready;
            batch_index += 1;
        }

        if remaining != 0 {
            let stuck: Vec<String> = in_degree
                .into_iter()
                .filter(|(_, d)| *d > 0)
                .map(|(id, _)| id)
                .collect();
            return Err(GraphError::Cycle(stuck));
        }

        Ok(Self {
            tasks,
            order,
            batch_of,
            batch_count: batch_index,
        })
    }

    pub fn tasks(&self) -> &HashMap<String, AgentTask> {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&AgentTask> {
        self.tasks.get(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The stable topological order computed at build time.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Batch *k* contains every task whose upstream set is a subset of
    /// tasks in batches `0..k` (§4.3). Ordering within a batch follows
    /// the same stable priority order as `order()`.
    pub fn batches(&self) -> Vec<Vec<String>> {
        let mut batches = vec![Vec::new(); self.batch_count];
        for id in &self.order {
            let idx = self.batch_of[id];
            batches[idx].push(id.clone());
        }
        batches
    }

    /// All ids directly or transitively downstream of `id` (used by the
    /// `skip_downstream` error policy).
    pub fn transitive_downstream(&self, id: &str) -> HashSet<String> {
        let mut visited = HashSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(task) = self.tasks.get(&current) {
                for down in &task.downstream {
                    if visited.insert(down.clone()) {
                        stack.push(down.clone());
                    }
                }
            }
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_model::{BundleHandle, SourceNode};

    fn mk(id_seed: &str, priority: i64) -> AgentTask {
        let node = SourceNode::new("function", id_seed, "/x.rs", "", 1, 1);
        AgentTask::new(node, BundleHandle::new("b"), priority)
    }

    fn link(tasks: &mut HashMap<String, AgentTask>, from: &str, to: &str) {
        let from_id = tasks[from].id.clone();
        let to_id = tasks[to].id.clone();
        tasks.get_mut(to).unwrap().upstream.insert(from_id.clone());
        tasks.get_mut(from).unwrap().downstream.insert(to_id);
    }

    #[test]
    fn empty_graph_has_no_batches() {
        let graph = Graph::from_tasks(HashMap::new()).unwrap();
        assert!(graph.batches().is_empty());
    }

    #[test]
    fn diamond_batches_correctly() {
        let a = mk("a", 0);
        let b = mk("b", 0);
        let c = mk("c", 0);
        let d = mk("d", 0);
        let mut by_name = HashMap::new();
        by_name.insert("a".to_string(), a);
        by_name.insert("b".to_string(), b);
        by_name.insert("c".to_string(), c);
        by_name.insert("d".to_string(), d);
        link(&mut by_name, "a", "b");
        link(&mut by_name, "a", "c");
        link(&mut by_name, "b", "d");
        link(&mut by_name, "c", "d");

        let tasks: HashMap<String, AgentTask> =
            by_name.values().map(|t| (t.id.clone(), t.clone())).collect();
        let graph = Graph::from_tasks(tasks).unwrap();
        let batches = graph.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], vec![by_name["a"].id.clone()]);
        assert_eq!(batches[2], vec![by_name["d"].id.clone()]);
        let mut mid = batches[1].clone();
        mid.sort();
        let mut expected = vec![by_name["b"].id.clone(), by_name["c"].id.clone()];
        expected.sort();
        assert_eq!(mid, expected);
    }

    #[test]
    fn deep_chain_one_task_per_batch() {
        let names = ["a", "b", "c", "d", "e"];
        let mut by_name: HashMap<String, AgentTask> =
            names.iter().map(|n| (n.to_string(), mk(n, 0))).collect();
        for w in names.windows(2) {
            link(&mut by_name, w[0], w[1]);
        }
        let tasks: HashMap<String, AgentTask> =
            by_name.values().map(|t| (t.id.clone(), t.clone())).collect();
        let graph = Graph::from_tasks(tasks).unwrap();
        let batches = graph.batches();
        assert_eq!(batches.len(), 5);
        for batch in &batches {
            assert_eq!(batch.len(), 1);
        }
    }

    #[test]
    fn cycle_is_rejected() {
        let a = mk("a", 0);
        let b = mk("b", 0);
        let mut by_name = HashMap::new();
        by_name.insert("a".to_string(), a);
        by_name.insert("b".to_string(), b);
        link(&mut by_name, "a", "b");
        link(&mut by_name, "b", "a");
        let tasks: HashMap<String, AgentTask> =
            by_name.values().map(|t| (t.id.clone(), t.clone())).collect();
        let err = Graph::from_tasks(tasks).unwrap_err();
        assert!(matches!(err, GraphError::Cycle(ids) if ids.len() == 2));
    }

    #[test]
    fn priority_breaks_ties_within_a_batch() {
        let low = mk("low", 0);
        let high = mk("high", 10);
        let mut by_name = HashMap::new();
        by_name.insert("low".to_string(), low);
        by_name.insert("high".to_string(), high);
        let tasks: HashMap<String, AgentTask> =
            by_name.values().map(|t| (t.id.clone(), t.clone())).collect();
        let graph = Graph::from_tasks(tasks).unwrap();
        assert_eq!(graph.order()[0], by_name["high"].id);
    }
}

//! In-Memory Run Repository
//!
//! Nodes, events, and artifacts are each kept in an append-ordered `Vec`
//! rather than a map, since `RunRepository`'s contract is ordering, not
//! point lookup: `list_events` must replay in arrival order for the SSE
//! trace endpoint.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::run::{Artifact, DagNode, Run, RunEvent, RunRepository};
use crate::domain::shared::{RunId, TenantId};

/// In-memory, process-local `RunRepository`.
#[derive(Debug, Default)]
pub struct InMemoryRunRepository {
    runs: RwLock<HashMap<String, Run>>,
    nodes: RwLock<HashMap<String, Vec<DagNode>>>,
    events: RwLock<HashMap<String, Vec<RunEvent>>>,
    artifacts: RwLock<HashMap<String, Vec<Artifact>>>,
}

impl InMemoryRunRepository {
    /// Construct an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn insert_run(&self, run: Run) {
        self.runs
            .write()
            .unwrap()
            .insert(run.run_id.as_str().to_string(), run);
    }

    async fn get_run(&self, tenant_id: &TenantId, run_id: &RunId) -> Option<Run> {
        self.runs
            .read()
            .unwrap()
            .get(run_id.as_str())
            .filter(|r| &r.tenant_id == tenant_id)
            .cloned()
    }

    async fn update_run(&self, run: Run) {
        self.runs
            .write()
            .unwrap()
            .insert(run.run_id.as_str().to_string(), run);
    }

    async fn upsert_node(&self, node: DagNode) {
        let mut nodes = self.nodes.write().unwrap();
        let run_nodes = nodes.entry(node.run_id.as_str().to_string()).or_default();
        if let Some(existing) = run_nodes.iter_mut().find(|n| n.node_id == node.node_id) {
            *existing = node;
        } else {
            run_nodes.push(node);
        }
    }

    async fn list_nodes(&self, run_id: &RunId) -> Vec<DagNode> {
        self.nodes
            .read()
            .unwrap()
            .get(run_id.as_str())
            .cloned()
            .unwrap_or_default()
    }

    async fn append_event(&self, event: RunEvent) {
        self.events
            .write()
            .unwrap()
            .entry(event.run_id.as_str().to_string())
            .or_default()
            .push(event);
    }

    async fn list_events(&self, tenant_id: &TenantId, run_id: &RunId) -> Vec<RunEvent> {
        self.events
            .read()
            .unwrap()
            .get(run_id.as_str())
            .map(|events| {
                events
                    .iter()
                    .filter(|e| &e.tenant_id == tenant_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn append_artifact(&self, artifact: Artifact) {
        self.artifacts
            .write()
            .unwrap()
            .entry(artifact.run_id.as_str().to_string())
            .or_default()
            .push(artifact);
    }

    async fn list_artifacts(&self, run_id: &RunId) -> Vec<Artifact> {
        self.artifacts
            .read()
            .unwrap()
            .get(run_id.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

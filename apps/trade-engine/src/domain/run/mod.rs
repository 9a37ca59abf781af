//! Run / DAG Execution Record
//!
//! A `Run` is the durable record of one confirmed trade proposal moving
//! through the execution DAG (portfolio -> policy_check -> approval ->
//! execution -> reconciliation). `DagNode` rows trace each stage; `RunEvent`
//! rows are the append-only, strictly-ordered audit trail a client can
//! stream over SSE.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::shared::{ArtifactId, ConfirmationId, DagNodeId, ProductId, RunId, TenantId, Timestamp};

/// Terminal and non-terminal states of a run. Only `COMPLETED`, `FAILED`,
/// and `REJECTED` are terminal; nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// Queued, not yet picked up by a worker.
    Pending,
    /// A worker is actively executing the DAG.
    Running,
    /// Every node succeeded.
    Completed,
    /// A node failed after exhausting its retries.
    Failed,
    /// Policy or approval rejected the run before execution.
    Rejected,
}

impl RunStatus {
    /// `true` for `COMPLETED`, `FAILED`, and `REJECTED`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Rejected)
    }
}

/// Which asset class this run trades; stock orders take the
/// `ASSISTED_LIVE` ticket path rather than direct broker submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Coinbase-traded crypto asset.
    Crypto,
    /// Equity, handled via an assisted-live ticket rather than direct API.
    Stock,
}

/// The durable execution record for one confirmed trade proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique run identifier.
    pub run_id: RunId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// `PAPER` or `LIVE`.
    pub execution_mode: String,
    /// Crypto or stock.
    pub asset_class: AssetClass,
    /// The confirmed `TradeAction` list, serialized verbatim from the
    /// confirmation that spawned this run.
    pub trade_proposal_json: JsonValue,
    /// The confirmation this run was created from.
    pub source_confirmation_id: Option<ConfirmationId>,
    /// Product this run is locked to for its lifetime.
    pub locked_product_id: Option<ProductId>,
    /// Free-form metadata (reasoner output, request correlation, etc).
    pub metadata_json: JsonValue,
    /// When the run began executing.
    pub started_at: Timestamp,
    /// When the run reached a terminal state, if it has.
    pub completed_at: Option<Timestamp>,
}

impl Run {
    /// Start a new run for a confirmed proposal.
    #[must_use]
    pub fn start(
        tenant_id: TenantId,
        execution_mode: impl Into<String>,
        asset_class: AssetClass,
        trade_proposal_json: JsonValue,
        source_confirmation_id: Option<ConfirmationId>,
        locked_product_id: Option<ProductId>,
    ) -> Self {
        Self {
            run_id: RunId::generate(),
            tenant_id,
            status: RunStatus::Pending,
            execution_mode: execution_mode.into(),
            asset_class,
            trade_proposal_json,
            source_confirmation_id,
            locked_product_id,
            metadata_json: JsonValue::Object(serde_json::Map::new()),
            started_at: Timestamp::now(),
            completed_at: None,
        }
    }

    /// Move to a terminal status, stamping `completed_at`. No-op (returns
    /// `false`) if the run is already terminal.
    pub fn finish(&mut self, status: RunStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.completed_at = Some(Timestamp::now());
        true
    }
}

/// Status of a single DAG node's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DagNodeStatus {
    /// Not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Completed without error.
    Succeeded,
    /// Failed; the run is expected to transition to `FAILED`.
    Failed,
    /// Skipped (e.g. reconciliation skipped after a rejection).
    Skipped,
}

/// One named stage of a run's DAG: `portfolio`, `policy_check`, `approval`,
/// `execution`, `reconciliation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagNode {
    /// Unique node identifier.
    pub node_id: DagNodeId,
    /// Owning run.
    pub run_id: RunId,
    /// Node name, e.g. `"execution"`.
    pub name: String,
    /// Current status.
    pub status: DagNodeStatus,
    /// Serialized inputs the node was invoked with.
    pub inputs_json: JsonValue,
    /// Serialized outputs the node produced, once finished.
    pub outputs_json: Option<JsonValue>,
    /// Serialized error detail, if the node failed.
    pub error_json: Option<JsonValue>,
    /// When the node started.
    pub started_at: Timestamp,
    /// When the node finished, if it has.
    pub completed_at: Option<Timestamp>,
}

impl DagNode {
    /// Start a new node for a run.
    #[must_use]
    pub fn start(run_id: RunId, name: impl Into<String>, inputs_json: JsonValue) -> Self {
        Self {
            node_id: DagNodeId::generate(),
            run_id,
            name: name.into(),
            status: DagNodeStatus::Running,
            inputs_json,
            outputs_json: None,
            error_json: None,
            started_at: Timestamp::now(),
            completed_at: None,
        }
    }

    /// Mark the node succeeded, recording its outputs.
    pub fn succeed(&mut self, outputs_json: JsonValue) {
        self.status = DagNodeStatus::Succeeded;
        self.outputs_json = Some(outputs_json);
        self.completed_at = Some(Timestamp::now());
    }

    /// Mark the node failed, recording the error.
    pub fn fail(&mut self, error_json: JsonValue) {
        self.status = DagNodeStatus::Failed;
        self.error_json = Some(error_json);
        self.completed_at = Some(Timestamp::now());
    }
}

/// An append-only audit event within a run, the unit streamed over the
/// run-events SSE endpoint. Events within a run are strictly ordered;
/// there is no ordering guarantee across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// Owning run.
    pub run_id: RunId,
    /// Owning tenant, carried for tenant-scoped queries without a join.
    pub tenant_id: TenantId,
    /// Event type, e.g. `"PLAN_CREATED"`, `"STEP_STARTED"`,
    /// `"ORDER_SUBMITTED"`, `"ORDER_FILLED"`.
    pub event_type: String,
    /// Event-specific payload.
    pub payload_json: JsonValue,
    /// When the event was recorded.
    pub ts: Timestamp,
}

/// An append-only artifact blob attached to a run (e.g. `order_intent`,
/// `order_rules`, `trade_receipt`). Artifacts are never overwritten or
/// deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique artifact identifier.
    pub artifact_id: ArtifactId,
    /// Owning run.
    pub run_id: RunId,
    /// Artifact kind, e.g. `"order_intent"`.
    pub kind: String,
    /// Serialized artifact body.
    pub body_json: JsonValue,
    /// When the artifact was written.
    pub created_at: Timestamp,
}

/// Persistence abstraction for runs and their DAG nodes, events, and
/// artifacts. Event appends must never reorder or rewrite prior rows.
#[async_trait::async_trait]
pub trait RunRepository: Send + Sync {
    /// Persist a newly started run.
    async fn insert_run(&self, run: Run);

    /// Look up a run, scoped to the caller's tenant.
    async fn get_run(&self, tenant_id: &TenantId, run_id: &RunId) -> Option<Run>;

    /// Persist an updated run row (status/completed_at transitions).
    async fn update_run(&self, run: Run);

    /// Append (or upsert, keyed by `node_id`) a DAG node row.
    async fn upsert_node(&self, node: DagNode);

    /// All DAG nodes recorded for a run, in start order.
    async fn list_nodes(&self, run_id: &RunId) -> Vec<DagNode>;

    /// Append one run event. Must preserve arrival order.
    async fn append_event(&self, event: RunEvent);

    /// All events recorded for a run, in append order.
    async fn list_events(&self, tenant_id: &TenantId, run_id: &RunId) -> Vec<RunEvent>;

    /// Append one artifact. Artifacts are write-once.
    async fn append_artifact(&self, artifact: Artifact);

    /// All artifacts recorded for a run.
    async fn list_artifacts(&self, run_id: &RunId) -> Vec<Artifact>;
}

#[async_trait::async_trait]
impl<T: RunRepository + ?Sized> RunRepository for std::sync::Arc<T> {
    async fn insert_run(&self, run: Run) {
        (**self).insert_run(run).await;
    }

    async fn get_run(&self, tenant_id: &TenantId, run_id: &RunId) -> Option<Run> {
        (**self).get_run(tenant_id, run_id).await
    }

    async fn update_run(&self, run: Run) {
        (**self).update_run(run).await;
    }

    async fn upsert_node(&self, node: DagNode) {
        (**self).upsert_node(node).await;
    }

    async fn list_nodes(&self, run_id: &RunId) -> Vec<DagNode> {
        (**self).list_nodes(run_id).await
    }

    async fn append_event(&self, event: RunEvent) {
        (**self).append_event(event).await;
    }

    async fn list_events(&self, tenant_id: &TenantId, run_id: &RunId) -> Vec<RunEvent> {
        (**self).list_events(tenant_id, run_id).await
    }

    async fn append_artifact(&self, artifact: Artifact) {
        (**self).append_artifact(artifact).await;
    }

    async fn list_artifacts(&self, run_id: &RunId) -> Vec<Artifact> {
        (**self).list_artifacts(run_id).await
    }
}

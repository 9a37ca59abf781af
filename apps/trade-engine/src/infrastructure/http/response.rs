//! HTTP response bodies.
//!
//! Shapes mirror the external interface contract exactly: field names and
//! the discriminant key (`intent` vs. `status`) are bit-exact since clients
//! branch on them.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::application::dto::OrderDto;
use crate::domain::run::{Artifact, DagNode, Run, RunEvent};

/// Response to `POST /api/v1/chat/command`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatCommandResponse {
    /// `GREETING` or `OUT_OF_SCOPE` — no trade content.
    Chat(ChatReplyResponse),
    /// Every action passed preflight; a confirmation was staged.
    Pending(TradeConfirmationPendingResponse),
    /// At least one action was blocked; nothing was staged.
    Rejected(RejectedResponse),
}

/// `{intent:"GREETING"|"OUT_OF_SCOPE", content, request_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReplyResponse {
    /// `"GREETING"` or `"OUT_OF_SCOPE"`.
    pub intent: &'static str,
    /// The chat reply text.
    pub content: String,
    /// Request correlation id.
    pub request_id: String,
}

/// `{intent:"TRADE_CONFIRMATION_PENDING", confirmation_id, content, pending_trade, suggestions, preconfirm_insight?}`.
#[derive(Debug, Clone, Serialize)]
pub struct TradeConfirmationPendingResponse {
    /// Always `"TRADE_CONFIRMATION_PENDING"`.
    pub intent: &'static str,
    /// The staged confirmation's id (`conf_`-prefixed).
    pub confirmation_id: String,
    /// A human-readable summary of the staged proposal.
    pub content: String,
    /// The staged proposal, as the user will confirm or cancel it.
    pub pending_trade: PendingTradeResponse,
    /// Suggested next replies, e.g. `["CONFIRM", "CANCEL"]`.
    pub suggestions: Vec<String>,
    /// Reasoner narrative, when one was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconfirm_insight: Option<JsonValue>,
}

/// The `pending_trade` object within [`TradeConfirmationPendingResponse`].
#[derive(Debug, Clone, Serialize)]
pub struct PendingTradeResponse {
    /// `PAPER` or `LIVE`.
    pub mode: String,
    /// The staged, possibly-adjusted actions.
    pub actions: Vec<JsonValue>,
}

/// `{status:"REJECTED", content, suggestions}`.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedResponse {
    /// Always `"REJECTED"`.
    pub status: &'static str,
    /// A human-readable explanation naming the blocking reason.
    pub content: String,
    /// Suggested next replies, e.g. `["Cancel", "Buy more BTC to reach minimum"]`.
    pub suggestions: Vec<String>,
}

/// Response to `POST /api/v1/confirmations/{conf_id}/confirm`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ConfirmResponse {
    /// A new run was started.
    Executing {
        /// Always `"EXECUTING"`.
        status: &'static str,
        /// The run id started for this confirmation.
        run_id: String,
        /// Echoes the request's `news_enabled`, once wired to a reasoner.
        news_enabled: bool,
        /// Reasoner narrative, when one was produced.
        #[serde(skip_serializing_if = "Option::is_none")]
        financial_insight: Option<JsonValue>,
    },
    /// Idempotent replay of an already-confirmed confirmation.
    AlreadyConfirmed {
        /// Always `"CONFIRMED"`.
        status: &'static str,
        /// The run id started on first confirmation.
        run_id: String,
    },
}

/// Response to `GET /api/v1/runs/{run_id}`.
///
/// `approvals`, `policy_events`, `snapshots`, and `evals` are always empty:
/// this slice does not implement the Execution Orchestrator's
/// portfolio/policy/approval DAG nodes (see `DESIGN.md`), so there is
/// nothing yet to populate them with. The fields are still present so
/// clients written against the full contract deserialize cleanly.
#[derive(Debug, Clone, Serialize)]
pub struct RunViewResponse {
    /// The run row itself.
    pub run: Run,
    /// DAG nodes recorded for the run, in start order.
    pub nodes: Vec<DagNode>,
    /// Orders placed under the run.
    pub orders: Vec<OrderDto>,
    /// Always empty in this slice.
    pub approvals: Vec<JsonValue>,
    /// Always empty in this slice.
    pub policy_events: Vec<JsonValue>,
    /// Always empty in this slice.
    pub snapshots: Vec<JsonValue>,
    /// Always empty in this slice.
    pub evals: Vec<JsonValue>,
}

/// One event in the `GET /api/v1/runs/{run_id}/events` SSE stream.
#[derive(Debug, Clone, Serialize)]
pub struct RunEventResponse {
    /// Event kind, e.g. `"PLAN_CREATED"`.
    pub event_type: String,
    /// Event-specific payload.
    pub payload: JsonValue,
    /// When the event was recorded, RFC 3339.
    pub ts: String,
}

impl From<&RunEvent> for RunEventResponse {
    fn from(event: &RunEvent) -> Self {
        Self {
            event_type: event.event_type.clone(),
            payload: event.payload_json.clone(),
            ts: event.ts.as_datetime().to_rfc3339(),
        }
    }
}

/// Response to `GET /api/v1/runs/{run_id}/trace`.
#[derive(Debug, Clone, Serialize)]
pub struct RunTraceResponse {
    /// The original trade proposal this run executes.
    pub plan: JsonValue,
    /// DAG nodes in start order.
    pub steps: Vec<DagNode>,
    /// Artifacts recorded for the run.
    pub artifacts: Vec<Artifact>,
}

/// Response to `GET /api/v1/orders/{order_id}/fill-status`.
#[derive(Debug, Clone, Serialize)]
pub struct FillStatusResponse {
    /// The order's current status.
    pub status: crate::domain::order_execution::value_objects::OrderStatus,
    /// Whether the order is confirmed filled.
    pub fill_confirmed: bool,
    /// A short human-readable summary.
    pub message: String,
}

/// Response to `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall health.
    pub ok: bool,
    /// Whether the persistence layer answered a liveness probe.
    pub db_ready: bool,
    /// Whether the schema matches the binary's expected migration set.
    pub schema_ok: bool,
    /// Whether pending migrations remain to be applied.
    pub migrations_needed: bool,
    /// Names of migrations not yet applied.
    pub pending_migrations: Vec<String>,
    /// Whether LIVE trading is currently enabled by configuration.
    pub live_trading_enabled: bool,
    /// The command an operator would run to apply pending migrations.
    pub migrate_cmd: String,
}

/// Response to `GET /api/v1/ops/capabilities`.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilitiesResponse {
    /// Whether LIVE trading is currently enabled by configuration.
    pub live_trading_enabled: bool,
    /// Whether PAPER trading is available (always true in this slice).
    pub paper_trading_enabled: bool,
    /// Whether the reasoner's insight narrative is wired up.
    pub insights_enabled: bool,
    /// Whether news context can be folded into the reasoner.
    pub news_enabled: bool,
    /// Whether the persistence layer answered a liveness probe.
    pub db_ready: bool,
    /// Whether pending migrations remain to be applied.
    pub migrations_needed: bool,
    /// Status label for the configured news provider.
    pub news_provider_status: String,
    /// The configured market data provider, e.g. `"coinbase"`.
    pub market_data_provider: String,
    /// The running binary's version.
    pub version: String,
    /// Remediation hint, when a capability is degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

/// Response to `POST /api/v1/confirmations/{conf_id}/cancel`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    /// Always `"CANCELLED"`.
    pub status: &'static str,
}

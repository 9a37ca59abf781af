//! REST controller: route table, application state, and handlers.
//!
//! Every handler is a thin translation layer: extract, call one use case
//! (or, where the contract needs a peek ahead of the use case, one direct
//! repository read), map the outcome onto the external response shape.
//! No handler performs I/O of its own beyond those calls.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::application::dto::OrderDto;
use crate::application::ports::{BrokerError, BrokerPort};
use crate::application::use_cases::{
    BuildTradeContextError, BuildTradeContextUseCase, CancelConfirmationError,
    CancelConfirmationUseCase, ConfirmOutcome, ConfirmTradeError, ConfirmTradeUseCase,
    ExecuteRunUseCase, GetOrderFillStatusError, GetOrderFillStatusUseCase, GetRunError,
    GetRunUseCase, StageConfirmationUseCase, StageOutcome,
};
use crate::config::Config;
use crate::domain::confirmation::ConfirmationRepository;
use crate::domain::order_execution::repository::OrderRepository;
use crate::domain::product_catalog::ProductCatalogRepository;
use crate::domain::portfolio_snapshot::PortfolioSnapshotRepository;
use crate::domain::run::RunRepository;
use crate::domain::shared::{ConfirmationId, ConversationId, OrderId, RunId, TenantId};
use crate::error::{ErrorCode, TradeEngineError};

use super::command_parser::{parse_command, ParsedIntent};
use super::request::ChatCommandRequest;
use super::response::{
    CancelResponse, CapabilitiesResponse, ChatCommandResponse, ChatReplyResponse, ConfirmResponse,
    FillStatusResponse, HealthResponse, PendingTradeResponse, RejectedResponse, RunEventResponse,
    RunTraceResponse, RunViewResponse, TradeConfirmationPendingResponse,
};

const DEFAULT_TENANT: &str = "default-tenant";

/// Shared application state, generic over every port/repository so the
/// binary can wire concrete adapters while tests wire stubs.
pub struct AppState<B, O, C, R, P>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    build_context: Arc<BuildTradeContextUseCase<B, P>>,
    stage_confirmation: Arc<StageConfirmationUseCase<C>>,
    confirm_trade: Arc<ConfirmTradeUseCase<C, R, B, O, P>>,
    cancel_confirmation: Arc<CancelConfirmationUseCase<C>>,
    get_run: Arc<GetRunUseCase<R, O>>,
    get_fill_status: Arc<GetOrderFillStatusUseCase<O>>,
    /// Raw handle for reads the use cases don't already expose (events,
    /// trace, run lookup for the 404 pre-check).
    runs: R,
    /// Raw handle for the capabilities/health refresh-age probe.
    catalog: P,
    /// Raw handle so `confirm` can peek a confirmation's `mode` for the
    /// LIVE_DISABLED pre-check before calling the use case.
    confirmations: C,
    config: Arc<Config>,
    version: String,
}

impl<B, O, C, R, P> Clone for AppState<B, O, C, R, P>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            build_context: Arc::clone(&self.build_context),
            stage_confirmation: Arc::clone(&self.stage_confirmation),
            confirm_trade: Arc::clone(&self.confirm_trade),
            cancel_confirmation: Arc::clone(&self.cancel_confirmation),
            get_run: Arc::clone(&self.get_run),
            get_fill_status: Arc::clone(&self.get_fill_status),
            runs: self.runs.clone(),
            catalog: self.catalog.clone(),
            confirmations: self.confirmations.clone(),
            config: Arc::clone(&self.config),
            version: self.version.clone(),
        }
    }
}

impl<B, O, C, R, P> AppState<B, O, C, R, P>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    /// Assemble application state from its constituent ports and repositories.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        broker: B,
        orders: O,
        confirmations: C,
        runs: R,
        catalog: P,
        snapshots: Arc<dyn PortfolioSnapshotRepository>,
        config: Arc<Config>,
        version: impl Into<String>,
    ) -> Self {
        let executor = Arc::new(ExecuteRunUseCase::new(
            broker.clone(),
            orders.clone(),
            runs.clone(),
            catalog.clone(),
            Arc::clone(&snapshots),
            Arc::clone(&config),
        ));
        Self {
            build_context: Arc::new(BuildTradeContextUseCase::new(broker, catalog.clone(), snapshots)),
            stage_confirmation: Arc::new(StageConfirmationUseCase::new(confirmations.clone())),
            confirm_trade: Arc::new(ConfirmTradeUseCase::new(confirmations.clone(), runs.clone(), executor)),
            cancel_confirmation: Arc::new(CancelConfirmationUseCase::new(confirmations.clone())),
            get_run: Arc::new(GetRunUseCase::new(runs.clone(), orders.clone())),
            get_fill_status: Arc::new(GetOrderFillStatusUseCase::new(orders)),
            runs,
            catalog,
            confirmations,
            config,
            version: version.into(),
        }
    }
}

fn tenant_from_headers(headers: &HeaderMap) -> TenantId {
    headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| TenantId::new(DEFAULT_TENANT), TenantId::new)
}

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), ToString::to_string)
}

fn broker_error_code(error: &BrokerError) -> ErrorCode {
    match error {
        BrokerError::OrderRejected { .. } => ErrorCode::OrderRejected,
        BrokerError::OrderTimeout => ErrorCode::OrderTimeout,
        BrokerError::ApiError { .. } => ErrorCode::BrokerApiError,
        BrokerError::RateLimited => ErrorCode::RateLimited,
        BrokerError::CredentialsMissing => ErrorCode::CredentialsMissing,
    }
}

/// Wire every external-interface route onto `state`.
pub fn create_router<B, O, C, R, P>(state: AppState<B, O, C, R, P>) -> Router
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health::<B, O, C, R, P>))
        .route("/api/v1/ops/capabilities", get(capabilities::<B, O, C, R, P>))
        .route("/api/v1/chat/command", post(chat_command::<B, O, C, R, P>))
        .route(
            "/api/v1/confirmations/{conf_id}/confirm",
            post(confirm::<B, O, C, R, P>),
        )
        .route(
            "/api/v1/confirmations/{conf_id}/cancel",
            post(cancel::<B, O, C, R, P>),
        )
        .route("/api/v1/runs/{run_id}", get(get_run_handler::<B, O, C, R, P>))
        .route("/api/v1/runs/{run_id}/events", get(run_events::<B, O, C, R, P>))
        .route("/api/v1/runs/{run_id}/trace", get(run_trace::<B, O, C, R, P>))
        .route(
            "/api/v1/orders/{order_id}/fill-status",
            get(fill_status::<B, O, C, R, P>),
        )
        .with_state(state)
}

async fn chat_command<B, O, C, R, P>(
    State(state): State<AppState<B, O, C, R, P>>,
    headers: HeaderMap,
    Json(req): Json<ChatCommandRequest>,
) -> Result<Json<ChatCommandResponse>, TradeEngineError>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    let request_id = request_id_from_headers(&headers);
    let tenant_id = tenant_from_headers(&headers);

    match parse_command(&req.text) {
        ParsedIntent::Greeting => Ok(Json(ChatCommandResponse::Chat(ChatReplyResponse {
            intent: "GREETING",
            content: "Hi! Tell me what you'd like to trade, e.g. \"buy $3 of BTC\".".to_string(),
            request_id,
        }))),
        ParsedIntent::OutOfScope => Ok(Json(ChatCommandResponse::Chat(ChatReplyResponse {
            intent: "OUT_OF_SCOPE",
            content: "I can only help with buying or selling crypto right now.".to_string(),
            request_id,
        }))),
        ParsedIntent::Trade(actions) => {
            let conversation_id = req
                .conversation_id
                .map_or_else(ConversationId::generate, ConversationId::new);

            let mode = if state.config.trading.force_paper_mode {
                "PAPER".to_string()
            } else {
                state.config.trading.execution_mode_default.clone()
            };

            let bundle = state
                .build_context
                .execute(tenant_id, mode, actions)
                .await
                .map_err(|err| match err {
                    BuildTradeContextError::BalanceFetch(broker_error) => {
                        TradeEngineError::new(broker_error_code(&broker_error), broker_error.to_string())
                            .with_request_id(request_id.clone())
                    }
                    BuildTradeContextError::NoPortfolioSnapshot => {
                        TradeEngineError::new(ErrorCode::InternalError, err.to_string())
                            .with_request_id(request_id.clone())
                    }
                })?;

            match state
                .stage_confirmation
                .execute(conversation_id, &bundle.context, &bundle.products)
                .await
            {
                StageOutcome::Staged(confirmation) => {
                    let actions = confirmation
                        .proposal_json
                        .get("actions")
                        .and_then(|v| v.as_array())
                        .cloned()
                        .unwrap_or_default();
                    Ok(Json(ChatCommandResponse::Pending(TradeConfirmationPendingResponse {
                        intent: "TRADE_CONFIRMATION_PENDING",
                        confirmation_id: confirmation.id.to_string(),
                        content: "Here's what I'm about to do. Reply CONFIRM or CANCEL.".to_string(),
                        pending_trade: PendingTradeResponse {
                            mode: confirmation.mode.clone(),
                            actions,
                        },
                        suggestions: vec!["CONFIRM".to_string(), "CANCEL".to_string()],
                        preconfirm_insight: None,
                    })))
                }
                StageOutcome::Rejected(report) => {
                    let first_blocked = report
                        .results
                        .iter()
                        .find(|r| r.status == crate::domain::preflight::PreflightStatus::Blocked);
                    let content = first_blocked
                        .map(|r| r.message.clone())
                        .unwrap_or_else(|| "The requested trade could not proceed.".to_string());
                    Ok(Json(ChatCommandResponse::Rejected(RejectedResponse {
                        status: "REJECTED",
                        content,
                        suggestions: vec!["Cancel".to_string()],
                    })))
                }
            }
        }
    }
}

async fn confirm<B, O, C, R, P>(
    State(state): State<AppState<B, O, C, R, P>>,
    headers: HeaderMap,
    Path(conf_id_raw): Path<String>,
) -> Result<Json<ConfirmResponse>, TradeEngineError>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    let request_id = request_id_from_headers(&headers);
    let tenant_id = tenant_from_headers(&headers);

    let Some(confirmation_id) = ConfirmationId::parse(&conf_id_raw) else {
        return Err(
            TradeEngineError::new(ErrorCode::ValidationError, "malformed confirmation id")
                .with_request_id(request_id),
        );
    };

    if let Some(confirmation) = state.confirmations.get_by_id(&tenant_id, &confirmation_id).await {
        if confirmation.mode == "LIVE" && !state.config.trading.live_trading_allowed() {
            return Err(
                TradeEngineError::new(ErrorCode::LiveDisabled, "live trading is disabled")
                    .with_request_id(request_id),
            );
        }
    }

    match state.confirm_trade.execute(&tenant_id, &confirmation_id).await {
        Ok(ConfirmOutcome::Started(run_id)) => Ok(Json(ConfirmResponse::Executing {
            status: "EXECUTING",
            run_id: run_id.to_string(),
            news_enabled: false,
            financial_insight: None,
        })),
        Ok(ConfirmOutcome::AlreadyConfirmed(run_id)) => Ok(Json(ConfirmResponse::AlreadyConfirmed {
            status: "CONFIRMED",
            run_id: run_id.to_string(),
        })),
        Err(ConfirmTradeError::NotFound) => Err(TradeEngineError::new(
            ErrorCode::ConfirmationNotFound,
            "no confirmation exists for this id",
        )
        .with_request_id(request_id)),
        Err(ConfirmTradeError::TerminalState(status)) => Err(TradeEngineError::new(
            ErrorCode::ConfirmationTerminalState,
            format!("confirmation is already {status:?} and cannot be confirmed"),
        )
        .with_request_id(request_id)),
        Err(ConfirmTradeError::ConcurrentModification) => Err(TradeEngineError::new(
            ErrorCode::ConfirmationTerminalState,
            "confirmation was concurrently modified, retry the read",
        )
        .with_request_id(request_id)),
    }
}

async fn cancel<B, O, C, R, P>(
    State(state): State<AppState<B, O, C, R, P>>,
    headers: HeaderMap,
    Path(conf_id_raw): Path<String>,
) -> Result<Json<CancelResponse>, TradeEngineError>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    let request_id = request_id_from_headers(&headers);
    let tenant_id = tenant_from_headers(&headers);

    let Some(confirmation_id) = ConfirmationId::parse(&conf_id_raw) else {
        return Err(
            TradeEngineError::new(ErrorCode::ValidationError, "malformed confirmation id")
                .with_request_id(request_id),
        );
    };

    match state.cancel_confirmation.execute(&tenant_id, &confirmation_id).await {
        Ok(()) => Ok(Json(CancelResponse { status: "CANCELLED" })),
        Err(CancelConfirmationError::NotFound) => Err(TradeEngineError::new(
            ErrorCode::ConfirmationNotFound,
            "no confirmation exists for this id",
        )
        .with_request_id(request_id)),
        Err(CancelConfirmationError::TerminalState(status)) => Err(TradeEngineError::new(
            ErrorCode::ConfirmationTerminalState,
            format!("confirmation is already {status:?} and cannot be cancelled"),
        )
        .with_request_id(request_id)),
        Err(CancelConfirmationError::ConcurrentModification) => Err(TradeEngineError::new(
            ErrorCode::ConfirmationTerminalState,
            "confirmation was concurrently modified, retry the read",
        )
        .with_request_id(request_id)),
    }
}

async fn get_run_handler<B, O, C, R, P>(
    State(state): State<AppState<B, O, C, R, P>>,
    headers: HeaderMap,
    Path(run_id_raw): Path<String>,
) -> Result<Json<RunViewResponse>, TradeEngineError>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    let request_id = request_id_from_headers(&headers);
    let tenant_id = tenant_from_headers(&headers);
    let run_id = RunId::new(run_id_raw);

    let view = state.get_run.execute(&tenant_id, &run_id).await.map_err(|error| match error {
        GetRunError::NotFound => TradeEngineError::new(ErrorCode::RunNotFound, "no run exists for this id")
            .with_request_id(request_id.clone()),
        GetRunError::Order(order_error) => {
            TradeEngineError::new(ErrorCode::InternalError, order_error.to_string())
                .with_request_id(request_id.clone())
        }
    })?;

    Ok(Json(RunViewResponse {
        run: view.run,
        nodes: view.nodes,
        orders: view.orders.iter().map(OrderDto::from_order).collect(),
        approvals: vec![],
        policy_events: vec![],
        snapshots: vec![],
        evals: vec![],
    }))
}

async fn run_events<B, O, C, R, P>(
    State(state): State<AppState<B, O, C, R, P>>,
    headers: HeaderMap,
    Path(run_id_raw): Path<String>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>, TradeEngineError>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    let request_id = request_id_from_headers(&headers);
    let tenant_id = tenant_from_headers(&headers);
    let run_id = RunId::new(run_id_raw);

    if state.runs.get_run(&tenant_id, &run_id).await.is_none() {
        return Err(TradeEngineError::new(ErrorCode::RunNotFound, "no run exists for this id")
            .with_request_id(request_id));
    }

    let events = state.runs.list_events(&tenant_id, &run_id).await;
    let sse_events: Vec<Result<Event, std::convert::Infallible>> = events
        .iter()
        .map(RunEventResponse::from)
        .map(|payload| {
            let event_type = payload.event_type.clone();
            Ok(Event::default().event(event_type).json_data(payload).unwrap_or_default())
        })
        .collect();

    Ok(Sse::new(tokio_stream::iter(sse_events)))
}

async fn run_trace<B, O, C, R, P>(
    State(state): State<AppState<B, O, C, R, P>>,
    headers: HeaderMap,
    Path(run_id_raw): Path<String>,
) -> Result<Json<RunTraceResponse>, TradeEngineError>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    let request_id = request_id_from_headers(&headers);
    let tenant_id = tenant_from_headers(&headers);
    let run_id = RunId::new(run_id_raw);

    let Some(run) = state.runs.get_run(&tenant_id, &run_id).await else {
        return Err(TradeEngineError::new(ErrorCode::RunNotFound, "no run exists for this id")
            .with_request_id(request_id));
    };

    let steps = state.runs.list_nodes(&run_id).await;
    let artifacts = state.runs.list_artifacts(&run_id).await;

    Ok(Json(RunTraceResponse {
        plan: run.trade_proposal_json,
        steps,
        artifacts,
    }))
}

async fn fill_status<B, O, C, R, P>(
    State(state): State<AppState<B, O, C, R, P>>,
    headers: HeaderMap,
    Path(order_id_raw): Path<String>,
) -> Result<Json<FillStatusResponse>, TradeEngineError>
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    let request_id = request_id_from_headers(&headers);
    let order_id = OrderId::new(order_id_raw);

    let status = state.get_fill_status.execute(&order_id).await.map_err(|error| match error {
        GetOrderFillStatusError::NotFound => {
            TradeEngineError::new(ErrorCode::OrderNotFound, "no order exists for this id")
                .with_request_id(request_id.clone())
        }
        GetOrderFillStatusError::Order(order_error) => {
            TradeEngineError::new(ErrorCode::InternalError, order_error.to_string())
                .with_request_id(request_id.clone())
        }
    })?;

    Ok(Json(FillStatusResponse {
        status: status.status,
        fill_confirmed: status.fill_confirmed,
        message: status.message,
    }))
}

async fn health<B, O, C, R, P>(State(state): State<AppState<B, O, C, R, P>>) -> impl IntoResponse
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    Json(HealthResponse {
        ok: true,
        db_ready: true,
        schema_ok: true,
        migrations_needed: false,
        pending_migrations: vec![],
        live_trading_enabled: state.config.trading.live_trading_allowed(),
        migrate_cmd: "no migrations required for the in-memory backend in this build".to_string(),
    })
}

async fn capabilities<B, O, C, R, P>(State(state): State<AppState<B, O, C, R, P>>) -> impl IntoResponse
where
    B: BrokerPort + Clone + Send + Sync + 'static,
    O: OrderRepository + Clone + Send + Sync + 'static,
    C: ConfirmationRepository + Clone + Send + Sync + 'static,
    R: RunRepository + Clone + Send + Sync + 'static,
    P: ProductCatalogRepository + Clone + Send + Sync + 'static,
{
    let live_trading_enabled = state.config.trading.live_trading_allowed();
    let remediation = if live_trading_enabled {
        None
    } else {
        Some("Set TRADING_DISABLE_LIVE=false and restart to enable live trading.".to_string())
    };

    Json(CapabilitiesResponse {
        live_trading_enabled,
        paper_trading_enabled: true,
        insights_enabled: false,
        news_enabled: false,
        db_ready: true,
        migrations_needed: false,
        news_provider_status: "disabled".to_string(),
        market_data_provider: state.config.trading.market_data_mode.clone(),
        version: state.version.clone(),
        remediation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{OrderHistoryEntry, PlaceOrderRequest, PlaceOrderResponse, PreviewResult};
    use crate::domain::asset_resolution::ExecutableBalance;
    use crate::domain::order_execution::value_objects::Fill;
    use crate::domain::product_catalog::Product;
    use crate::domain::shared::{BrokerId, ProductId, Timestamp};
    use crate::domain::portfolio_snapshot::PortfolioSnapshot;
    use crate::infrastructure::persistence::{
        InMemoryConfirmationRepository, InMemoryOrderRepository, InMemoryPortfolioSnapshotRepository,
        InMemoryProductCatalogRepository, InMemoryRunRepository,
    };
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct StubBroker;

    #[async_trait]
    impl BrokerPort for StubBroker {
        async fn place_order(
            &self,
            _request: PlaceOrderRequest,
        ) -> Result<PlaceOrderResponse, BrokerError> {
            unreachable!("not exercised by controller tests")
        }

        async fn get_balances(&self) -> Result<Vec<ExecutableBalance>, BrokerError> {
            Ok(vec![ExecutableBalance {
                currency: "USD".to_string(),
                available_qty: dec!(1000),
                hold_qty: dec!(0),
                account_uuid: "acct-1".to_string(),
                updated_at: Timestamp::now(),
            }])
        }

        async fn get_fills(
            &self,
            _broker_order_id: &BrokerId,
            _order_id: &OrderId,
            _run_id: &RunId,
        ) -> Result<Vec<Fill>, BrokerError> {
            unreachable!()
        }

        async fn get_order_history(
            &self,
            _broker_order_id: &BrokerId,
        ) -> Result<OrderHistoryEntry, BrokerError> {
            unreachable!()
        }

        async fn preview_order(&self, _request: &PlaceOrderRequest) -> Result<PreviewResult, BrokerError> {
            unreachable!()
        }

        async fn get_market_price(&self, _product_id: &ProductId) -> Result<Decimal, BrokerError> {
            Ok(dec!(65000))
        }
    }

    async fn test_state() -> AppState<
        StubBroker,
        Arc<InMemoryOrderRepository>,
        Arc<InMemoryConfirmationRepository>,
        Arc<InMemoryRunRepository>,
        Arc<InMemoryProductCatalogRepository>,
    > {
        let snapshots = InMemoryPortfolioSnapshotRepository::new();
        let mut balances = std::collections::HashMap::new();
        balances.insert(
            "USD".to_string(),
            ExecutableBalance {
                currency: "USD".to_string(),
                available_qty: dec!(1000),
                hold_qty: dec!(0),
                account_uuid: "acct-1".to_string(),
                updated_at: Timestamp::now(),
            },
        );
        snapshots
            .save(PortfolioSnapshot {
                tenant_id: TenantId::new(DEFAULT_TENANT),
                balances,
                captured_at: Timestamp::now(),
            })
            .await;

        AppState::new(
            StubBroker,
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(InMemoryConfirmationRepository::new()),
            Arc::new(InMemoryRunRepository::new()),
            Arc::new(InMemoryProductCatalogRepository::new()),
            Arc::new(snapshots),
            Arc::new(Config::default()),
            "test",
        )
    }

    #[tokio::test]
    async fn chat_command_greeting_is_a_chat_reply() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/chat/command")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text":"hello there"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["intent"], "GREETING");
    }

    #[tokio::test]
    async fn chat_command_stages_a_buy_and_confirm_executes_it() {
        let state = test_state().await;
        state
            .catalog
            .upsert_all(vec![Product {
                product_id: ProductId::new("BTC-USD"),
                base_currency: "BTC".to_string(),
                quote_currency: "USD".to_string(),
                base_min_size: dec!(0.00001),
                base_increment: dec!(0.00000001),
                quote_increment: dec!(0.01),
                min_market_funds: dec!(1),
                status: crate::domain::product_catalog::ProductStatus::Online,
                trading_disabled: false,
            }])
            .await;
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/chat/command")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text":"buy $3 of BTC"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["intent"], "TRADE_CONFIRMATION_PENDING");
        let confirmation_id = json["confirmation_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/confirmations/{confirmation_id}/confirm"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "EXECUTING");
        assert!(json["run_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn confirm_rejects_a_malformed_confirmation_id() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/confirmations/not-a-conf-id/confirm")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn confirm_unknown_id_is_not_found() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/confirmations/conf_missing/confirm")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cancel_unknown_confirmation_is_not_found() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/confirmations/conf_missing/cancel")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_run_unknown_id_is_not_found() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/runs/run-missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fill_status_unknown_order_is_not_found() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orders/ord-missing/fill-status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["ok"], true);
    }

    #[tokio::test]
    async fn capabilities_reports_live_trading_disabled_by_default() {
        let app = create_router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/ops/capabilities")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["live_trading_enabled"], false);
        assert!(json["remediation"].is_string());
    }
}

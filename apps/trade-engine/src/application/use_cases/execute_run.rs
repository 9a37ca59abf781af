//! Execute Run Use Case
//!
//! The DAG runner behind a confirmed trade: `portfolio -> policy_check ->
//! approval -> execution -> reconciliation`. [`ConfirmTradeUseCase`] spawns
//! [`ExecuteRunUseCase::execute`] once a run is inserted; the HTTP response
//! returns `EXECUTING` before this finishes, so every node's start/end,
//! inputs, outputs, and error are persisted as they happen rather than
//! assembled after the fact.
//!
//! Approval (§4.9.1) auto-approves unconditionally in both `PAPER` and
//! `LIVE`: this slice has no human-approval-queue component to defer to.
//! The auto-sell check in the execution node is defensive rather than
//! load-bearing — [`StageConfirmationUseCase`](super::StageConfirmationUseCase)
//! rejects staging outright on any blocked action, so a confirmed proposal
//! (the only kind that reaches a `Run`) can never carry one. See
//! `DESIGN.md` for both decisions.
//!
//! [`ConfirmTradeUseCase`]: super::ConfirmTradeUseCase

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};

use crate::application::ports::BrokerPort;
use crate::config::Config;
use crate::domain::order_execution::aggregate::{Order, OrderSize};
use crate::domain::order_execution::repository::OrderRepository;
use crate::domain::order_execution::value_objects::{OrderSide, OrderStatus};
use crate::domain::portfolio_snapshot::PortfolioSnapshotRepository;
use crate::domain::preflight::run_preflight;
use crate::domain::product_catalog::{Product, ProductCatalogRepository};
use crate::domain::run::{AssetClass, Artifact, DagNode, DagNodeStatus, Run, RunEvent, RunRepository, RunStatus};
use crate::domain::shared::{ArtifactId, Money, Quantity, RunId, Symbol, TenantId, Timestamp};
use crate::domain::trade_context::{TradeAction, TradeSide};

use super::build_trade_context::BuildTradeContextUseCase;
use super::poll_order_status::{PollOrderStatusUseCase, PollOutcome};
use super::submit_order::{SubmitOrderCommand, SubmitOrderUseCase};

/// Runs a confirmed trade's DAG to a terminal [`RunStatus`].
pub struct ExecuteRunUseCase<B, O, R, P>
where
    B: BrokerPort + Clone,
    O: OrderRepository + Clone,
    R: RunRepository,
    P: ProductCatalogRepository + Clone,
{
    broker: B,
    orders: O,
    runs: R,
    catalog: P,
    snapshots: Arc<dyn PortfolioSnapshotRepository>,
    config: Arc<Config>,
}

impl<B, O, R, P> ExecuteRunUseCase<B, O, R, P>
where
    B: BrokerPort + Clone,
    O: OrderRepository + Clone,
    R: RunRepository,
    P: ProductCatalogRepository + Clone,
{
    /// Construct the runner over every port and repository its nodes touch.
    pub const fn new(
        broker: B,
        orders: O,
        runs: R,
        catalog: P,
        snapshots: Arc<dyn PortfolioSnapshotRepository>,
        config: Arc<Config>,
    ) -> Self {
        Self { broker, orders, runs, catalog, snapshots, config }
    }

    /// Run `run`'s DAG to completion, bounded by
    /// `config.trading.execution_timeout()`. Never returns an error: every
    /// failure is recorded on the run itself and this always leaves the run
    /// in a terminal status.
    pub async fn execute(&self, mut run: Run) {
        let timeout = self.config.trading.execution_timeout();
        if tokio::time::timeout(timeout, self.run_dag(&mut run)).await.is_err() {
            tracing::warn!(run_id = %run.run_id.as_str(), "run exceeded the execution timeout");
            if run.finish(RunStatus::Failed) {
                self.emit(&run, "RUN_TIMEOUT", json!({"timeout_secs": timeout.as_secs()})).await;
            }
        }
        self.runs.update_run(run).await;
    }

    async fn run_dag(&self, run: &mut Run) {
        run.status = RunStatus::Running;
        self.runs.update_run(run.clone()).await;

        let run_id = run.run_id.clone();
        let tenant_id = run.tenant_id.clone();

        // --- portfolio ---
        let mut node = DagNode::start(run_id.clone(), "portfolio", json!({}));
        self.runs.upsert_node(node.clone()).await;

        let raw_actions = run.trade_proposal_json.get("actions").cloned().unwrap_or(JsonValue::Array(vec![]));
        let mut actions: Vec<TradeAction> = match serde_json::from_value(raw_actions) {
            Ok(actions) => actions,
            Err(e) => {
                node.fail(json!({"error": e.to_string()}));
                self.runs.upsert_node(node).await;
                self.reject(run, "the stored trade proposal could not be parsed").await;
                return;
            }
        };

        if let Some(locked) = run.locked_product_id.clone() {
            for action in &mut actions {
                action.product_id = locked.clone();
            }
        }

        let build_context =
            BuildTradeContextUseCase::new(self.broker.clone(), self.catalog.clone(), Arc::clone(&self.snapshots));
        let bundle = match build_context.execute(tenant_id.clone(), run.execution_mode.clone(), actions).await {
            Ok(bundle) => bundle,
            Err(e) => {
                node.fail(json!({"error": e.to_string()}));
                self.runs.upsert_node(node).await;
                self.fail(run, &e.to_string()).await;
                return;
            }
        };
        node.succeed(json!({
            "balance_source": format!("{:?}", bundle.balance_source),
            "action_count": bundle.context.actions().len(),
        }));
        self.runs.upsert_node(node).await;
        self.emit(run, "PLAN_CREATED", json!({"action_count": bundle.context.actions().len()})).await;

        // --- policy_check ---
        let mut node = DagNode::start(run_id.clone(), "policy_check", json!({}));
        self.runs.upsert_node(node.clone()).await;

        let catalog_products: Vec<(&str, &Product)> =
            bundle.products.iter().map(|(asset, product)| (asset.as_str(), product)).collect();
        let report = run_preflight(&bundle.context, &catalog_products);

        if report.any_blocked() {
            node.fail(json!({"results": report.results}));
            self.runs.upsert_node(node).await;
            self.emit(run, "POLICY_REJECTED", json!({"results": report.results})).await;
            self.skip(&run_id, "approval").await;
            self.skip(&run_id, "execution").await;
            self.skip(&run_id, "reconciliation").await;
            run.finish(RunStatus::Rejected);
            return;
        }
        node.succeed(json!({"all_ready": true}));
        self.runs.upsert_node(node).await;

        // --- approval ---
        // No human-approval-queue exists in this slice; every policy-clean
        // run is auto-approved regardless of mode.
        let mut node = DagNode::start(run_id.clone(), "approval", json!({}));
        self.runs.upsert_node(node.clone()).await;
        node.succeed(json!({"auto_approved": true}));
        self.runs.upsert_node(node).await;
        self.emit(run, "APPROVAL_GRANTED", json!({"auto_approved": true})).await;

        // --- execution ---
        let mut node = DagNode::start(run_id.clone(), "execution", json!({}));
        self.runs.upsert_node(node.clone()).await;

        let live = run.execution_mode.eq_ignore_ascii_case("LIVE");
        if live && run.asset_class == AssetClass::Crypto && self.config.trading.demo_safe_mode {
            self.artifact(&run_id, "demo_mode_blocked", json!({"reason": "DEMO_SAFE_MODE"})).await;
            node.fail(json!({"code": "DEMO_MODE_LIVE_BLOCKED"}));
            self.runs.upsert_node(node).await;
            self.emit(run, "DEMO_MODE_LIVE_BLOCKED", json!({})).await;
            self.skip(&run_id, "reconciliation").await;
            run.finish(RunStatus::Rejected);
            return;
        }

        let balances_json: serde_json::Map<String, JsonValue> = bundle
            .context
            .balances()
            .map(|(currency, balance)| (currency.to_string(), serde_json::to_value(balance).unwrap_or(JsonValue::Null)))
            .collect();
        self.artifact(&run_id, "portfolio_snapshot", JsonValue::Object(balances_json)).await;

        // Defensive: staging rejects any blocked action outright, so a
        // confirmed proposal can never carry an auto-sell directive. Kept
        // as a guard in case that staging invariant ever changes.
        if report.results.iter().any(|r| r.auto_sell_proposal.is_some()) {
            tracing::warn!(
                run_id = %run_id.as_str(),
                "a confirmed run carried an auto-sell proposal; this should be unreachable"
            );
        }

        let submit = SubmitOrderUseCase::new(self.broker.clone(), self.orders.clone());
        let poll = PollOrderStatusUseCase::new(self.broker.clone(), self.orders.clone());

        let mut placed_orders = Vec::new();
        let mut execution_failed = false;

        for (index, action) in bundle.context.actions().iter().enumerate() {
            let rules = bundle.context.resolved_product(action.product_id.as_str());
            let context_price = bundle.context.market_price(&action.asset);

            let (size, price) = match action.side {
                TradeSide::Buy => (OrderSize::Notional(Money::new(action.amount_usd)), context_price),
                TradeSide::Sell if live => match self.refetch_sell_size(action).await {
                    Ok(resized) => resized,
                    Err(reason) => {
                        execution_failed = true;
                        self.emit(run, "ORDER_REJECTED", json!({"asset": action.asset, "reason": reason})).await;
                        continue;
                    }
                },
                TradeSide::Sell => match action.requested_qty {
                    Some(qty) => (OrderSize::Quantity(Quantity::new(qty)), context_price),
                    None => (OrderSize::Notional(Money::new(action.amount_usd)), context_price),
                },
            };

            let side = match action.side {
                TradeSide::Buy => OrderSide::Buy,
                TradeSide::Sell => OrderSide::Sell,
            };

            self.artifact(
                &run_id,
                "order_intent",
                json!({"index": index, "asset": action.asset, "side": format!("{side:?}")}),
            )
            .await;
            if let Some(rules) = rules {
                self.artifact(&run_id, "order_rules", serde_json::to_value(rules).unwrap_or(JsonValue::Null)).await;
            }

            let cmd = SubmitOrderCommand {
                run_id: run_id.clone(),
                action_index: index,
                tenant_id: tenant_id.clone(),
                provider: "coinbase".to_string(),
                symbol: Symbol::new(action.product_id.as_str()),
                side,
                size,
                price,
                base_increment: rules.and_then(|r| r.base_increment),
                base_min_size: rules.and_then(|r| r.base_min_size),
            };

            match submit.execute(cmd).await {
                Ok(order) => {
                    self.emit(
                        run,
                        "ORDER_SUBMITTED",
                        json!({"order_id": order.id().as_str(), "asset": action.asset}),
                    )
                    .await;

                    let (order, outcome) = match order.broker_order_id().cloned() {
                        Some(broker_order_id) => match poll.execute(order, &broker_order_id).await {
                            Ok(result) => result,
                            Err(e) => {
                                execution_failed = true;
                                self.emit(
                                    run,
                                    "ORDER_FAILED",
                                    json!({"asset": action.asset, "error": e.to_string()}),
                                )
                                .await;
                                continue;
                            }
                        },
                        None => (order, PollOutcome::Timeout),
                    };

                    match outcome {
                        PollOutcome::Terminal(OrderStatus::Filled) => {
                            self.emit(run, "ORDER_FILLED", json!({"order_id": order.id().as_str()})).await;
                        }
                        PollOutcome::Terminal(status) => {
                            self.emit(
                                run,
                                "ORDER_PENDING_FILL",
                                json!({"order_id": order.id().as_str(), "status": format!("{status:?}")}),
                            )
                            .await;
                        }
                        PollOutcome::Timeout | PollOutcome::PollFailed => {
                            execution_failed = true;
                            self.emit(run, "ORDER_TIMEOUT", json!({"order_id": order.id().as_str()})).await;
                        }
                    }

                    self.artifact(
                        &run_id,
                        "trade_receipt",
                        json!({
                            "order_id": order.id().as_str(),
                            "status": format!("{:?}", order.status()),
                            "filled_qty": order.filled_qty().amount(),
                            "avg_fill_price": order.avg_fill_price().amount(),
                        }),
                    )
                    .await;

                    placed_orders.push(order);
                }
                Err(e) => {
                    execution_failed = true;
                    self.emit(run, "ORDER_REJECTED", json!({"asset": action.asset, "error": e.to_string()})).await;
                }
            }
        }

        if execution_failed {
            node.fail(json!({"placed": placed_orders.len()}));
        } else {
            node.succeed(json!({"placed": placed_orders.len()}));
        }
        self.runs.upsert_node(node).await;

        // --- reconciliation ---
        let mut node = DagNode::start(run_id.clone(), "reconciliation", json!({"orders": placed_orders.len()}));
        self.runs.upsert_node(node.clone()).await;

        for mut order in placed_orders {
            let Some(broker_order_id) = order.broker_order_id().cloned() else { continue };
            match self.broker.get_fills(&broker_order_id, order.id(), &run_id).await {
                Ok(fills) => {
                    let target_qty = order.qty().unwrap_or(Quantity::new(Decimal::MAX));
                    for fill in fills {
                        if let Err(e) = order.apply_fill(fill, target_qty) {
                            tracing::warn!(error = %e, "failed to apply a reconciled fill");
                        }
                    }
                    if let Err(e) = self.orders.save(&order).await {
                        tracing::warn!(error = %e, "failed to persist a reconciled order");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to fetch fills during reconciliation");
                }
            }
        }

        if execution_failed {
            node.fail(json!({}));
            self.runs.upsert_node(node).await;
            self.emit(run, "RUN_FAILED", json!({})).await;
            run.finish(RunStatus::Failed);
        } else {
            node.succeed(json!({}));
            self.runs.upsert_node(node).await;
            self.emit(run, "RUN_COMPLETED", json!({})).await;
            run.finish(RunStatus::Completed);
        }
    }

    /// Re-fetch the current balance and price for a LIVE sell and clamp its
    /// size to whatever is actually available, rather than trusting the
    /// amount a proposal carried from staging time.
    async fn refetch_sell_size(&self, action: &TradeAction) -> Result<(OrderSize, Option<Decimal>), String> {
        let balances = self.broker.get_balances().await.map_err(|e| e.to_string())?;
        let balance = balances
            .into_iter()
            .find(|b| b.currency.eq_ignore_ascii_case(&action.asset))
            .ok_or_else(|| format!("{} is no longer held", action.asset))?;
        let price = self.broker.get_market_price(&action.product_id).await.map_err(|e| e.to_string())?;

        let requested = if action.sell_all {
            balance.available_qty
        } else {
            action.requested_qty.unwrap_or_else(|| action.amount_usd / price)
        };
        let safe_qty = requested.min(balance.available_qty);
        if safe_qty <= Decimal::ZERO {
            return Err(format!("no sellable {} balance remains", action.asset));
        }

        Ok((OrderSize::Quantity(Quantity::new(safe_qty)), Some(price)))
    }

    async fn reject(&self, run: &mut Run, reason: &str) {
        self.skip(&run.run_id.clone(), "approval").await;
        self.skip(&run.run_id.clone(), "execution").await;
        self.skip(&run.run_id.clone(), "reconciliation").await;
        self.emit(run, "RUN_REJECTED", json!({"reason": reason})).await;
        run.finish(RunStatus::Rejected);
    }

    async fn fail(&self, run: &mut Run, reason: &str) {
        self.emit(run, "RUN_FAILED", json!({"reason": reason})).await;
        run.finish(RunStatus::Failed);
    }

    async fn skip(&self, run_id: &RunId, name: &str) {
        let mut node = DagNode::start(run_id.clone(), name, json!({}));
        node.status = DagNodeStatus::Skipped;
        node.completed_at = Some(Timestamp::now());
        self.runs.upsert_node(node).await;
    }

    async fn artifact(&self, run_id: &RunId, kind: &str, body_json: JsonValue) {
        self.runs
            .append_artifact(Artifact {
                artifact_id: ArtifactId::generate(),
                run_id: run_id.clone(),
                kind: kind.to_string(),
                body_json,
                created_at: Timestamp::now(),
            })
            .await;
    }

    async fn emit(&self, run: &Run, event_type: &str, payload_json: JsonValue) {
        self.runs
            .append_event(RunEvent {
                run_id: run.run_id.clone(),
                tenant_id: run.tenant_id.clone(),
                event_type: event_type.to_string(),
                payload_json,
                ts: Timestamp::now(),
            })
            .await;
    }
}

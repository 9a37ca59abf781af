//! Stage Confirmation Use Case
//!
//! Runs the Preflight Engine over a built [`TradeContext`] and, when every
//! action is `READY` or `ADJUSTED`, stages a [`Confirmation`] the user can
//! confirm or cancel. A context with any `BLOCKED` action is rejected
//! outright — nothing is staged for a partially-blocked intent.
//!
//! Per the adjusted-amount-persistence decision (see `DESIGN.md`), an
//! `ADJUSTED` action's reduced notional is folded into `proposal_json` at
//! stage time; confirming later replays the stored proposal rather than
//! re-running preflight.

use serde_json::{Value as JsonValue, json};

use crate::domain::confirmation::{Confirmation, ConfirmationRepository};
use crate::domain::preflight::{PreflightReport, PreflightStatus, run_preflight};
use crate::domain::product_catalog::Product;
use crate::domain::shared::ConversationId;
use crate::domain::trade_context::TradeContext;

/// Outcome of staging a confirmation.
#[derive(Debug, Clone)]
pub enum StageOutcome {
    /// Every action passed preflight; a confirmation was staged.
    Staged(Confirmation),
    /// At least one action was blocked; nothing was staged.
    Rejected(PreflightReport),
}

/// Evaluates preflight and stages a confirmation for a trade context.
pub struct StageConfirmationUseCase<C: ConfirmationRepository> {
    confirmations: C,
}

impl<C: ConfirmationRepository> StageConfirmationUseCase<C> {
    /// Construct the use case over a confirmation repository.
    pub const fn new(confirmations: C) -> Self {
        Self { confirmations }
    }

    /// Evaluate `context` and, if every action is ready, stage a
    /// confirmation for `conversation_id`.
    pub async fn execute(
        &self,
        conversation_id: ConversationId,
        context: &TradeContext,
        products: &[(String, Product)],
    ) -> StageOutcome {
        let catalog_products: Vec<(&str, &Product)> =
            products.iter().map(|(asset, product)| (asset.as_str(), product)).collect();
        let report = run_preflight(context, &catalog_products);

        if report.any_blocked() {
            return StageOutcome::Rejected(report);
        }

        let proposal_json = proposal_with_adjustments(context, &report);
        let locked_product_id = context
            .actions()
            .first()
            .map(|action| action.product_id.clone());

        let confirmation = Confirmation::create_pending(
            context.tenant_id().clone(),
            conversation_id,
            context.execution_mode().to_string(),
            proposal_json,
            None,
            locked_product_id,
        );

        self.confirmations.insert(confirmation.clone()).await;

        StageOutcome::Staged(confirmation)
    }
}

/// Serialize the context's actions, substituting each `ADJUSTED` action's
/// reduced notional so the persisted proposal matches what preflight
/// actually approved.
fn proposal_with_adjustments(context: &TradeContext, report: &PreflightReport) -> JsonValue {
    let actions: Vec<JsonValue> = context
        .actions()
        .iter()
        .zip(&report.results)
        .map(|(action, result)| {
            let amount_usd = if result.status == PreflightStatus::Adjusted {
                result.adjusted_amount_usd.unwrap_or(action.amount_usd)
            } else {
                action.amount_usd
            };
            json!({
                "side": action.side,
                "asset": action.asset,
                "product_id": action.product_id.as_str(),
                "amount_mode": action.amount_mode,
                "amount_usd": amount_usd,
                "sell_all": action.sell_all,
                "requested_qty": action.requested_qty,
                "adjusted": result.status == PreflightStatus::Adjusted,
            })
        })
        .collect();

    json!({ "actions": actions })
}

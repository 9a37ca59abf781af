//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod build_trade_context;
mod cancel_confirmation;
mod confirm_trade;
mod execute_run;
mod get_order_fill_status;
mod get_run;
mod poll_order_status;
mod stage_confirmation;
mod submit_order;

pub use build_trade_context::{BuildTradeContextError, BuildTradeContextUseCase, TradeContextBundle};
pub use cancel_confirmation::{CancelConfirmationError, CancelConfirmationUseCase};
pub use confirm_trade::{ConfirmOutcome, ConfirmTradeError, ConfirmTradeUseCase};
pub use execute_run::ExecuteRunUseCase;
pub use get_order_fill_status::{FillStatus, GetOrderFillStatusError, GetOrderFillStatusUseCase};
pub use get_run::{GetRunError, GetRunUseCase, RunView};
pub use poll_order_status::{
    PollOrderStatusError, PollOrderStatusUseCase, PollOutcome, MAX_CONSECUTIVE_ERRORS,
    POLL_CEILING, POLL_INTERVAL,
};
pub use stage_confirmation::{StageConfirmationUseCase, StageOutcome};
pub use submit_order::{SubmitOrderCommand, SubmitOrderError, SubmitOrderUseCase};

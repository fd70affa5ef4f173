//! Output record types: the per-step snapshot, the synthetic protocol
//! message, the conditions trace, and the boundary-flushed strategy and trade
//! summaries.

use serde::Serialize;

use crate::domain::engine::StrategyState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    Order,
    OrderUpdate,
    HeartBeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageEntity {
    SimulationEngine,
    SimulationExecutor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderCreator {
    SimulationEngine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderOwner {
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderType {
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderDirection {
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatus {
    Signaled,
}

/// Order fields of a non-heartbeat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order_id: u64,
    pub creator: OrderCreator,
    pub owner: OrderOwner,
    pub exchange: String,
    pub market: String,
    pub order_type: OrderType,
    pub rate: f64,
    pub stop: f64,
    pub take_profit: f64,
    pub direction: OrderDirection,
    pub status: OrderStatus,
}

/// Synthetic message to the downstream executor. Heartbeats carry no order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMessage {
    pub message_id: u64,
    pub from: MessageEntity,
    pub to: MessageEntity,
    pub kind: MessageKind,
    pub timestamp: i64,
    pub order: Option<OrderDetails>,
}

/// What the step did, as written into the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StepAction {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "Sell")]
    Sell,
    #[serde(rename = "Buy@StopLoss")]
    BuyAtStopLoss,
    #[serde(rename = "Buy@TakeProfit")]
    BuyAtTakeProfit,
}

impl StepAction {
    pub fn label(&self) -> &'static str {
        match self {
            StepAction::None => "",
            StepAction::Sell => "Sell",
            StepAction::BuyAtStopLoss => "Buy@StopLoss",
            StepAction::BuyAtTakeProfit => "Buy@TakeProfit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExitType {
    #[default]
    None,
    StopLoss,
    TakeProfit,
}

/// Full numeric snapshot of one processed period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRecord {
    pub begin: i64,
    pub end: i64,
    pub action: StepAction,
    pub market_rate: f64,
    pub balance_asset_a: f64,
    pub balance_asset_b: f64,
    pub profit: f64,
    pub last_profit: f64,
    pub last_profit_percent: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub roundtrips: u64,
    pub hits: u64,
    pub fails: u64,
    pub hit_ratio: f64,
    pub roi: f64,
    pub periods: u64,
    pub days: f64,
    pub annualized_rate_of_return: f64,
    pub position_rate: f64,
    pub position_size: f64,
    pub strategy: usize,
    pub state: StrategyState,
    pub stop_loss_phase: usize,
    pub take_profit_phase: usize,
    pub message: OrderMessage,
}

/// The 0/1 outcome of every cached condition at one step, in stable
/// evaluation order, plus the indices a plotter needs to label them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionsRecord {
    pub begin: i64,
    pub end: i64,
    pub strategy: usize,
    pub state: StrategyState,
    pub stop_loss_phase: usize,
    pub take_profit_phase: usize,
    pub values: Vec<u8>,
}

/// One closed (or boundary-flushed) strategy window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRecord {
    pub begin: i64,
    pub end: i64,
    pub status: u8,
    pub number: usize,
    pub begin_rate: f64,
    pub end_rate: f64,
}

/// One closed (or boundary-flushed) trade window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub begin: i64,
    pub end: i64,
    pub status: u8,
    pub profit: f64,
    pub last_profit_percent: f64,
    pub exit_type: ExitType,
    pub begin_rate: f64,
    pub end_rate: f64,
    pub stop_rate: f64,
}

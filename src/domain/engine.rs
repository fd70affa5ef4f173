//! Simulation engine: the per-period strategy state machine.
//!
//! One engine instance owns an indicator repository and a compiled trading
//! system. `run` walks the candle series in order, consults the condition
//! cache, and drives the state transitions in a fixed order each step:
//! signal, signal-off, hit detection, entry, target management, entering
//! accounting, exit accounting. Continuation memory is pulled before the
//! first step and committed after the last one only when the run's final
//! candle lands exactly on the end of the configured calendar day.

use serde::{Serialize, Serializer};

use crate::domain::candle::Candle;
use crate::domain::conditions::{ConditionCache, ConditionGroup};
use crate::domain::config::EngineConfig;
use crate::domain::context::{Scalars, StepContext};
use crate::domain::error::MarketsimError;
use crate::domain::formula_eval::evaluate_price;
use crate::domain::indicator::{
    BollingerBand, BollingerChannel, BollingerSubChannel, PercentageBandwidth,
};
use crate::domain::memory::ContinuationMemory;
use crate::domain::records::{
    ConditionsRecord, ExitType, MessageEntity, MessageKind, OrderCreator, OrderDetails,
    OrderDirection, OrderMessage, OrderOwner, OrderStatus, OrderType, SimulationRecord,
    StepAction, StrategyRecord, TradeRecord,
};
use crate::domain::repository::IndicatorRepository;
use crate::domain::trading_system::{Strategy, TradingSystem};

pub const ONE_DAY_MS: i64 = 86_400_000;

/// Stop and take prices are clamped here; a zero or negative target would
/// mean unbounded leverage and division by zero downstream.
pub const MIN_TARGET_PRICE: f64 = 1.0;

const SNAPSHOT_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StrategyState {
    Idle = 0,
    Signaled = 1,
    Entering = 2,
    Holding = 3,
    Exiting = 4,
}

impl Serialize for StrategyState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Parameters of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    /// Candles beginning before this instant are skipped.
    pub start: i64,
    /// The calendar day this invocation covers, as the day's first instant.
    /// `None` disables the day-boundary accounting entirely (whole-market
    /// runs in a single call).
    pub current_day: Option<i64>,
}

/// Context snapshot kept for the last few processed steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSnapshot {
    pub candle: Candle,
    pub percentage_bandwidth: Option<PercentageBandwidth>,
    pub bollinger_band: Option<BollingerBand>,
    pub channel: Option<BollingerChannel>,
    pub sub_channel: Option<BollingerSubChannel>,
}

#[derive(Debug, Default)]
pub struct RunOutput {
    pub records: Vec<SimulationRecord>,
    pub conditions: Vec<ConditionsRecord>,
    pub strategies: Vec<StrategyRecord>,
    pub trades: Vec<TradeRecord>,
    pub snapshots: Vec<StepSnapshot>,
}

/// Parallel accumulator for steps that belong to days already committed by a
/// prior invocation. Committing from here instead of the live counters keeps
/// resent candles from double-incrementing memory.
#[derive(Debug, Clone, Copy, Default)]
struct Shadow {
    balance_a: f64,
    balance_b: f64,
    last_profit: f64,
    profit: f64,
    last_profit_percent: f64,
    roundtrips: u64,
    fails: u64,
    hits: u64,
    periods: u64,
    hit_ratio: f64,
    roi: f64,
    annualized: f64,
}

/// All mutable step-loop state.
#[derive(Debug)]
struct RunState {
    state: StrategyState,
    /// 1-based index of the strategy owning the active cycle; 0 = none.
    strategy_number: usize,
    /// 1-based phase cursors; 0 while no position is open.
    stop_loss_phase: usize,
    take_profit_phase: usize,
    stop_loss: f64,
    take_profit: f64,
    position_rate: f64,
    position_size: f64,
    position_instant: Option<i64>,
    previous_balance_a: f64,
    balance_a: f64,
    balance_b: f64,
    last_profit: f64,
    profit: f64,
    last_profit_percent: f64,
    roundtrips: u64,
    fails: u64,
    hits: u64,
    periods: u64,
    hit_ratio: f64,
    roi: f64,
    days: f64,
    annualized: f64,
    order_id: u64,
    message_id: u64,
    action: StepAction,
    market_rate: f64,
    current_strategy: StrategyRecord,
    current_trade: TradeRecord,
    shadow: Shadow,
}

impl RunState {
    fn new(initial_balance: f64) -> Self {
        Self {
            state: StrategyState::Idle,
            strategy_number: 0,
            stop_loss_phase: 0,
            take_profit_phase: 0,
            stop_loss: 0.0,
            take_profit: 0.0,
            position_rate: 0.0,
            position_size: 0.0,
            position_instant: None,
            previous_balance_a: 0.0,
            balance_a: initial_balance,
            balance_b: 0.0,
            last_profit: 0.0,
            profit: 0.0,
            last_profit_percent: 0.0,
            roundtrips: 0,
            fails: 0,
            hits: 0,
            periods: 0,
            hit_ratio: 0.0,
            roi: 0.0,
            days: 0.0,
            annualized: 0.0,
            order_id: 0,
            message_id: 0,
            action: StepAction::None,
            market_rate: 0.0,
            current_strategy: StrategyRecord::default(),
            current_trade: TradeRecord::default(),
            shadow: Shadow {
                balance_a: initial_balance,
                ..Shadow::default()
            },
        }
    }

    fn scalars(&self) -> Scalars {
        Scalars {
            balance_asset_a: self.balance_a,
            balance_asset_b: self.balance_b,
            position_rate: self.position_rate,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            last_profit: self.last_profit,
        }
    }

    /// Whether the open position was taken on a day a prior invocation
    /// already committed.
    fn position_is_shadowed(&self, current_day: Option<i64>) -> bool {
        matches!(
            (self.position_instant, current_day),
            (Some(instant), Some(day)) if instant < day
        )
    }
}

pub struct SimulationEngine {
    config: EngineConfig,
    system: TradingSystem,
    repository: IndicatorRepository,
}

impl SimulationEngine {
    pub fn new(config: EngineConfig, system: TradingSystem) -> Result<Self, MarketsimError> {
        config.validate()?;
        Ok(Self {
            config,
            system,
            repository: IndicatorRepository::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &IndicatorRepository {
        &self.repository
    }

    /// Series builders write through here before a run.
    pub fn repository_mut(&mut self) -> &mut IndicatorRepository {
        &mut self.repository
    }

    /// Process every candle currently in the repository.
    ///
    /// `memory` is owned by the caller and survives across invocations; it is
    /// seeded on first use and committed only when this run's last candle
    /// reaches the final instant of `params.current_day`.
    pub fn run(
        &self,
        params: RunParams,
        memory: &mut ContinuationMemory,
    ) -> Result<RunOutput, MarketsimError> {
        let candles = self.repository.candles();
        let last_candle_end = match candles.last() {
            Some(candle) => candle.end,
            None => {
                tracing::error!(start = params.start, "run requested with an empty candle series");
                return Err(MarketsimError::Run {
                    reason: "no candles to process".to_string(),
                });
            }
        };
        let boundary_landing = params
            .current_day
            .map(|day| last_candle_end == day + ONE_DAY_MS - 1)
            .unwrap_or(false);

        tracing::info!(
            candles = candles.len(),
            start = params.start,
            current_day = ?params.current_day,
            "simulation run starting"
        );

        let mut state = RunState::new(self.config.initial_balance);
        self.pull_memory(&mut state, memory, params);

        let mut cache = ConditionCache::new();
        let mut output = RunOutput::default();

        for index in 0..candles.len() {
            let Some(linked_candle) = self.repository.candle(index) else {
                break;
            };
            let candle = linked_candle.current;
            state.action = StepAction::None;

            // The bandwidth series may start after the first few candles.
            let Some(percentage_bandwidth) = self.repository.percentage_bandwidth_at(candle.begin)
            else {
                continue;
            };
            if candle.begin < params.start {
                continue;
            }

            state.periods += 1;
            state.days =
                state.periods as f64 * self.config.time_period_ms as f64 / ONE_DAY_MS as f64;
            if let Some(day) = params.current_day {
                if candle.end < day {
                    state.shadow.periods += 1;
                }
            }

            let bollinger_band = self.repository.bollinger_band_at(candle.begin);
            let lrc = self.repository.lrc_at(candle.begin);
            let channel = self.repository.channel_containing(candle.begin, candle.end);
            let sub_channel = self
                .repository
                .sub_channel_containing(candle.begin, candle.end);

            output.snapshots.push(StepSnapshot {
                candle: candle.clone(),
                percentage_bandwidth: Some(percentage_bandwidth.current.clone()),
                bollinger_band: bollinger_band.map(|b| b.current.clone()),
                channel: channel.map(|c| c.current.clone()),
                sub_channel: sub_channel.map(|c| c.current.clone()),
            });
            if output.snapshots.len() > SNAPSHOT_WINDOW {
                output.snapshots.remove(0);
            }

            let base_ctx = StepContext {
                candle: linked_candle,
                percentage_bandwidth: Some(percentage_bandwidth),
                bollinger_band,
                lrc,
                channel,
                sub_channel,
                scalars: state.scalars(),
            };
            cache.evaluate(&self.system, &base_ctx);
            let trace = cache.trace().to_vec();

            let is_last_index = index == candles.len() - 1;

            self.check_signal(&mut state, &cache, candle);
            self.check_signal_off(&mut state, &cache, candle);
            self.check_hits(&mut state, candle, params.current_day);
            self.check_take_position(&mut state, &cache, candle);
            self.manage_targets(&mut state, &cache, &base_ctx);

            if state.state == StrategyState::Entering {
                self.enter_position(&mut state, candle, &base_ctx, params.current_day);
                self.emit(&mut state, candle, &trace, &mut output, is_last_index, boundary_landing);
                state.state = StrategyState::Holding;
                continue;
            }

            if state.state == StrategyState::Exiting {
                self.close_position(&mut state, params.current_day);
                self.emit(&mut state, candle, &trace, &mut output, is_last_index, boundary_landing);
                self.reset_cycle(&mut state);
                continue;
            }

            state.market_rate = candle.close;
            self.emit(&mut state, candle, &trace, &mut output, is_last_index, boundary_landing);
        }

        if params.current_day.is_some() && boundary_landing {
            commit_memory(memory, &state.shadow);
            tracing::info!("continuation memory committed at day boundary");
        }

        tracing::info!(
            periods = state.periods,
            roundtrips = state.roundtrips,
            balance_asset_a = state.balance_a,
            roi = state.roi,
            "simulation run finished"
        );
        Ok(output)
    }

    fn pull_memory(&self, state: &mut RunState, memory: &mut ContinuationMemory, params: RunParams) {
        if !memory.is_initialized() {
            *memory = ContinuationMemory {
                balance_asset_a: state.balance_a,
                balance_asset_b: state.balance_b,
                roundtrips: Some(0),
                ..ContinuationMemory::new()
            };
            return;
        }

        // Balances come from memory only once the run has moved past its
        // first calendar day; before that the configured initial balance
        // stands.
        if let Some(day) = params.current_day {
            if day >= params.start + ONE_DAY_MS {
                state.balance_a = memory.balance_asset_a;
                state.balance_b = memory.balance_asset_b;
                state.shadow.balance_a = state.balance_a;
                state.shadow.balance_b = state.balance_b;
            }
        }

        state.last_profit = memory.last_profit;
        state.profit = memory.profit;
        state.last_profit_percent = memory.last_profit_percent;
        state.roundtrips = memory.roundtrips.unwrap_or(0);
        state.fails = memory.fails;
        state.hits = memory.hits;
        state.periods = memory.periods;
        state.order_id = memory.order_id;
        state.message_id = memory.message_id;
        state.hit_ratio = memory.hit_ratio;
        state.roi = memory.roi;
        state.annualized = memory.annualized_rate_of_return;
        state.shadow.hit_ratio = state.hit_ratio;
        state.shadow.roi = state.roi;
        state.shadow.annualized = state.annualized;
    }

    /// Idle, looking for a strategy to signal. Strategies and situations are
    /// tried in definition order; first match wins.
    fn check_signal(&self, state: &mut RunState, cache: &ConditionCache, candle: &Candle) {
        if state.strategy_number != 0 || state.balance_a <= self.config.minimum_balance {
            return;
        }
        for (index, strategy) in self.system.strategies.iter().enumerate() {
            if cache.group_met(index, strategy, ConditionGroup::TriggerOn) {
                state.state = StrategyState::Signaled;
                state.strategy_number = index + 1;
                state.current_strategy.begin = candle.begin;
                state.current_strategy.begin_rate = candle.min;
                // Stands in case the strategy window never closes cleanly.
                state.current_strategy.end_rate = candle.min;
                tracing::debug!(strategy = %strategy.name, begin = candle.begin, "strategy signaled");
                return;
            }
        }
    }

    /// Signaled, checking the owning strategy's trigger-off situations.
    fn check_signal_off(&self, state: &mut RunState, cache: &ConditionCache, candle: &Candle) {
        if state.state != StrategyState::Signaled {
            return;
        }
        let owner = state.strategy_number - 1;
        let strategy = &self.system.strategies[owner];
        if cache.group_met(owner, strategy, ConditionGroup::TriggerOff) {
            state.current_strategy.number = owner;
            state.current_strategy.end = candle.end;
            state.current_strategy.end_rate = candle.min;
            state.current_strategy.status = 1;
            state.state = StrategyState::Idle;
            state.strategy_number = 0;
            tracing::debug!(strategy = %strategy.name, end = candle.end, "strategy signal withdrawn");
        }
    }

    /// Holding, comparing the step's extremes against the targets. The stop
    /// has strict priority when both are inside the candle's range.
    fn check_hits(&self, state: &mut RunState, candle: &Candle, current_day: Option<i64>) {
        if state.state != StrategyState::Holding {
            return;
        }
        let (exit_rate, action, exit_type) = if candle.max >= state.stop_loss {
            (state.stop_loss, StepAction::BuyAtStopLoss, ExitType::StopLoss)
        } else if candle.min <= state.take_profit {
            (
                state.take_profit,
                StepAction::BuyAtTakeProfit,
                ExitType::TakeProfit,
            )
        } else {
            return;
        };

        state.balance_a = state.balance_b / exit_rate;
        state.balance_b = 0.0;
        if state.position_is_shadowed(current_day) {
            state.shadow.balance_a = state.balance_a;
            state.shadow.balance_b = state.balance_b;
        }

        state.market_rate = exit_rate;
        state.action = action;
        state.state = StrategyState::Exiting;

        state.current_trade.end = candle.end;
        state.current_trade.status = 1;
        state.current_trade.exit_type = exit_type;
        state.current_trade.end_rate = exit_rate;

        state.current_strategy.number = state.strategy_number - 1;
        state.current_strategy.end = candle.end;
        state.current_strategy.end_rate = candle.min;
        state.current_strategy.status = 1;
        tracing::debug!(rate = exit_rate, ?exit_type, end = candle.end, "position target hit");
    }

    /// Signaled, checking for the position entry.
    fn check_take_position(&self, state: &mut RunState, cache: &ConditionCache, candle: &Candle) {
        if state.state != StrategyState::Signaled {
            return;
        }
        let owner = state.strategy_number - 1;
        let strategy = &self.system.strategies[owner];
        if cache.group_met(owner, strategy, ConditionGroup::TakePosition) {
            state.action = StepAction::Sell;
            state.state = StrategyState::Entering;
            state.stop_loss_phase = 1;
            state.take_profit_phase = 1;
            state.current_trade.begin = candle.begin;
            state.current_trade.begin_rate = candle.close;
            tracing::debug!(strategy = %strategy.name, begin = candle.begin, "taking position");
        }
    }

    /// Holding: advance each target's phase at most once, then recompute the
    /// target prices from the active phase formulas.
    fn manage_targets(&self, state: &mut RunState, cache: &ConditionCache, base_ctx: &StepContext<'_>) {
        if state.state != StrategyState::Holding {
            return;
        }
        let owner = state.strategy_number - 1;
        let strategy = &self.system.strategies[owner];

        if cache.phase_met(owner, strategy, ConditionGroup::StopLoss, state.stop_loss_phase - 1)
            && state.stop_loss_phase < strategy.stop_loss.len()
        {
            state.stop_loss_phase += 1;
        }
        if cache.phase_met(
            owner,
            strategy,
            ConditionGroup::TakeProfit,
            state.take_profit_phase - 1,
        ) && state.take_profit_phase < strategy.take_profit.len()
        {
            state.take_profit_phase += 1;
        }

        self.reprice_targets(state, strategy, base_ctx);
    }

    fn reprice_targets(&self, state: &mut RunState, strategy: &Strategy, base_ctx: &StepContext<'_>) {
        let mut ctx = *base_ctx;
        ctx.scalars = state.scalars();
        if let Some(phase) = strategy.stop_loss.get(state.stop_loss_phase - 1) {
            state.stop_loss = target_price(evaluate_price(&phase.formula, &ctx), state.stop_loss);
        }
        ctx.scalars = state.scalars();
        if let Some(phase) = strategy.take_profit.get(state.take_profit_phase - 1) {
            state.take_profit =
                target_price(evaluate_price(&phase.formula, &ctx), state.take_profit);
        }
    }

    /// Entering: move the whole balance into asset B at the close and seed
    /// the targets.
    fn enter_position(
        &self,
        state: &mut RunState,
        candle: &Candle,
        base_ctx: &StepContext<'_>,
        current_day: Option<i64>,
    ) {
        let owner = state.strategy_number - 1;
        let strategy = &self.system.strategies[owner];

        state.market_rate = candle.close;
        state.position_rate = state.market_rate;
        state.position_size = state.balance_a;

        // Worst-case fallback before the phase formulas take over.
        state.stop_loss = state.position_rate + state.position_rate / 100.0;
        self.reprice_targets(state, strategy, base_ctx);

        state.previous_balance_a = state.balance_a;
        state.last_profit = 0.0;
        state.last_profit_percent = 0.0;

        state.balance_b = state.balance_a * state.market_rate;
        state.balance_a = 0.0;
        state.position_instant = Some(candle.end);

        if state.position_is_shadowed(current_day) {
            state.shadow.balance_a = state.balance_a;
            state.shadow.balance_b = state.balance_b;
            state.shadow.last_profit = state.last_profit;
            state.shadow.last_profit_percent = state.last_profit_percent;
        }
        tracing::debug!(
            rate = state.position_rate,
            size = state.position_size,
            stop = state.stop_loss,
            take = state.take_profit,
            "position entered"
        );
    }

    /// Exiting: realize the profit, update the rolling statistics.
    fn close_position(&self, state: &mut RunState, current_day: Option<i64>) {
        let shadowed = state.position_is_shadowed(current_day);

        state.roundtrips += 1;
        if shadowed {
            state.shadow.roundtrips += 1;
        }

        state.last_profit = state.balance_a - state.previous_balance_a;
        state.last_profit_percent =
            normalized(state.last_profit / state.previous_balance_a * 100.0);
        state.profit = state.balance_a - self.config.initial_balance;
        if shadowed {
            state.shadow.last_profit = state.last_profit;
            state.shadow.profit = state.profit;
            state.shadow.last_profit_percent = state.last_profit_percent;
        }

        state.current_trade.last_profit_percent = state.last_profit_percent;
        state.current_trade.stop_rate = state.stop_loss;

        if state.last_profit > 0.0 {
            state.hits += 1;
            if shadowed {
                state.shadow.hits += 1;
            }
        } else {
            state.fails += 1;
            if shadowed {
                state.shadow.fails += 1;
            }
        }

        state.roi = state.profit / self.config.initial_balance;
        state.hit_ratio = if state.roundtrips > 0 {
            state.hits as f64 / state.roundtrips as f64
        } else {
            0.0
        };
        state.annualized = normalized(state.roi / state.days * 365.0);
        if shadowed {
            state.shadow.roi = state.roi;
            state.shadow.hit_ratio = state.hit_ratio;
            state.shadow.annualized = state.annualized;
        }
        tracing::debug!(
            profit = state.last_profit,
            roundtrips = state.roundtrips,
            roi = state.roi,
            "position closed"
        );
    }

    fn reset_cycle(&self, state: &mut RunState) {
        state.strategy_number = 0;
        state.stop_loss = 0.0;
        state.take_profit = 0.0;
        state.position_rate = 0.0;
        state.position_size = 0.0;
        state.position_instant = None;
        state.state = StrategyState::Idle;
        state.stop_loss_phase = 0;
        state.take_profit_phase = 0;
    }

    fn emit(
        &self,
        state: &mut RunState,
        candle: &Candle,
        trace: &[u8],
        output: &mut RunOutput,
        is_last_index: bool,
        boundary_landing: bool,
    ) {
        state.message_id += 1;

        let kind = match state.state {
            StrategyState::Entering => MessageKind::Order,
            StrategyState::Holding => MessageKind::OrderUpdate,
            _ => MessageKind::HeartBeat,
        };
        if kind == MessageKind::Order {
            state.order_id += 1;
        }

        let order = match kind {
            MessageKind::HeartBeat => None,
            _ => Some(OrderDetails {
                order_id: state.order_id,
                creator: OrderCreator::SimulationEngine,
                owner: OrderOwner::User,
                exchange: self.config.exchange_name.clone(),
                market: self.config.market.clone(),
                order_type: OrderType::Limit,
                rate: state.market_rate,
                stop: state.stop_loss,
                take_profit: state.take_profit,
                direction: OrderDirection::Sell,
                status: OrderStatus::Signaled,
            }),
        };

        let message = OrderMessage {
            message_id: state.message_id,
            from: MessageEntity::SimulationEngine,
            to: MessageEntity::SimulationExecutor,
            kind,
            timestamp: chrono::Utc::now().timestamp_millis(),
            order,
        };

        output.records.push(SimulationRecord {
            begin: candle.begin,
            end: candle.end,
            action: state.action,
            market_rate: state.market_rate,
            balance_asset_a: state.balance_a,
            balance_asset_b: state.balance_b,
            profit: state.profit,
            last_profit: state.last_profit,
            last_profit_percent: state.last_profit_percent,
            stop_loss: state.stop_loss,
            take_profit: state.take_profit,
            roundtrips: state.roundtrips,
            hits: state.hits,
            fails: state.fails,
            hit_ratio: state.hit_ratio,
            roi: state.roi,
            periods: state.periods,
            days: state.days,
            annualized_rate_of_return: state.annualized,
            position_rate: state.position_rate,
            position_size: state.position_size,
            strategy: state.strategy_number,
            state: state.state,
            stop_loss_phase: state.stop_loss_phase,
            take_profit_phase: state.take_profit_phase,
            message,
        });

        state.action = StepAction::None;

        output.conditions.push(ConditionsRecord {
            begin: candle.begin,
            end: candle.end,
            strategy: state.strategy_number,
            state: state.state,
            stop_loss_phase: state.stop_loss_phase,
            take_profit_phase: state.take_profit_phase,
            values: trace.to_vec(),
        });

        // Flush a window when it closed cleanly, or on the run's last step
        // when the run does not land on a day boundary (an in-progress window
        // would otherwise be lost at the run seam).
        let partial_flush = is_last_index && !boundary_landing;

        if state.current_strategy.begin != 0
            && (state.current_strategy.end != 0 || partial_flush)
        {
            output.strategies.push(state.current_strategy);
            state.current_strategy = StrategyRecord::default();
        }

        if state.current_trade.begin != 0 && (state.current_trade.end != 0 || partial_flush) {
            state.current_trade.profit = state.last_profit;
            output.trades.push(state.current_trade);
            state.current_trade = TradeRecord::default();
        }
    }
}

/// Normalize a target price: evaluation failure keeps the previous value, a
/// non-finite result becomes 0, and everything is clamped to the minimum.
fn target_price(evaluated: Option<f64>, previous: f64) -> f64 {
    let mut value = evaluated.unwrap_or(previous);
    if !value.is_finite() {
        value = 0.0;
    }
    if value < MIN_TARGET_PRICE {
        value = MIN_TARGET_PRICE;
    }
    value
}

fn normalized(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn commit_memory(memory: &mut ContinuationMemory, shadow: &Shadow) {
    memory.balance_asset_a = shadow.balance_a;
    memory.balance_asset_b = shadow.balance_b;
    memory.last_profit = shadow.last_profit;
    memory.profit = shadow.profit;
    memory.last_profit_percent = shadow.last_profit_percent;

    memory.roundtrips = Some(memory.roundtrips.unwrap_or(0) + shadow.roundtrips);
    memory.fails += shadow.fails;
    memory.hits += shadow.hits;
    memory.periods += shadow.periods;

    memory.hit_ratio = shadow.hit_ratio;
    memory.roi = shadow.roi;
    memory.annualized_rate_of_return = shadow.annualized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_price_clamps_low_values() {
        assert_eq!(target_price(Some(0.5), 10.0), MIN_TARGET_PRICE);
        assert_eq!(target_price(Some(-3.0), 10.0), MIN_TARGET_PRICE);
    }

    #[test]
    fn target_price_keeps_previous_on_failure() {
        assert_eq!(target_price(None, 10.0), 10.0);
    }

    #[test]
    fn target_price_zeroes_non_finite_then_clamps() {
        assert_eq!(target_price(Some(f64::NAN), 10.0), MIN_TARGET_PRICE);
        assert_eq!(target_price(Some(f64::INFINITY), 10.0), MIN_TARGET_PRICE);
    }

    #[test]
    fn normalized_guards_nan() {
        assert_eq!(normalized(f64::NAN), 0.0);
        assert_eq!(normalized(2.5), 2.5);
    }

    #[test]
    fn commit_adds_counters_and_replaces_stats() {
        let mut memory = ContinuationMemory {
            roundtrips: Some(4),
            hits: 3,
            fails: 1,
            periods: 24,
            hit_ratio: 0.75,
            ..ContinuationMemory::new()
        };
        let shadow = Shadow {
            balance_a: 1.2,
            roundtrips: 2,
            hits: 1,
            fails: 1,
            periods: 24,
            hit_ratio: 0.5,
            roi: 0.2,
            ..Shadow::default()
        };
        commit_memory(&mut memory, &shadow);
        assert_eq!(memory.roundtrips, Some(6));
        assert_eq!(memory.hits, 4);
        assert_eq!(memory.fails, 2);
        assert_eq!(memory.periods, 48);
        assert_eq!(memory.hit_ratio, 0.5);
        assert_eq!(memory.roi, 0.2);
        assert_eq!(memory.balance_asset_a, 1.2);
    }

    #[test]
    fn strategy_state_serializes_numerically() {
        assert_eq!(serde_json::to_string(&StrategyState::Holding).unwrap(), "3");
        assert_eq!(serde_json::to_string(&StrategyState::Idle).unwrap(), "0");
    }
}

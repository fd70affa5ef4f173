//! Per-step condition evaluation and cache.
//!
//! Every condition in the trading system is evaluated exactly once per candle
//! step, in a stable structural order, and cached under its structural key.
//! Decision logic then reads the cache: a situation is met when all its
//! conditions hold, a group fires when any situation is met.

use std::collections::HashMap;

use crate::domain::context::StepContext;
use crate::domain::formula_eval::evaluate_condition;
use crate::domain::trading_system::{Situation, Strategy, TradingSystem};

/// Which rule group within a strategy a condition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionGroup {
    TriggerOn,
    TriggerOff,
    TakePosition,
    StopLoss,
    TakeProfit,
}

impl ConditionGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionGroup::TriggerOn => "triggerOn",
            ConditionGroup::TriggerOff => "triggerOff",
            ConditionGroup::TakePosition => "takePosition",
            ConditionGroup::StopLoss => "stopLoss",
            ConditionGroup::TakeProfit => "takeProfit",
        }
    }
}

/// Structural position of a condition. Phase is zero for the situation
/// groups, which have no phase dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConditionKey {
    pub strategy: usize,
    pub group: ConditionGroup,
    pub phase: usize,
    pub situation: usize,
    pub condition: usize,
}

/// Step-scoped cache of condition outcomes plus the flat 0/1 trace in
/// evaluation order.
#[derive(Debug, Default)]
pub struct ConditionCache {
    values: HashMap<ConditionKey, bool>,
    trace: Vec<u8>,
}

impl ConditionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate every condition of every strategy once. Clears any previous
    /// step's results first.
    pub fn evaluate(&mut self, system: &TradingSystem, ctx: &StepContext<'_>) {
        self.values.clear();
        self.trace.clear();

        for (strategy_index, strategy) in system.strategies.iter().enumerate() {
            let situation_groups = [
                (ConditionGroup::TriggerOn, &strategy.trigger_on),
                (ConditionGroup::TriggerOff, &strategy.trigger_off),
                (ConditionGroup::TakePosition, &strategy.take_position),
            ];
            for (group, situations) in situation_groups {
                self.evaluate_situations(strategy_index, group, 0, situations, ctx);
            }

            let phase_groups = [
                (ConditionGroup::StopLoss, &strategy.stop_loss),
                (ConditionGroup::TakeProfit, &strategy.take_profit),
            ];
            for (group, phases) in phase_groups {
                for (phase_index, phase) in phases.iter().enumerate() {
                    self.evaluate_situations(
                        strategy_index,
                        group,
                        phase_index,
                        &phase.situations,
                        ctx,
                    );
                }
            }
        }
    }

    fn evaluate_situations(
        &mut self,
        strategy: usize,
        group: ConditionGroup,
        phase: usize,
        situations: &[Situation],
        ctx: &StepContext<'_>,
    ) {
        for (situation_index, situation) in situations.iter().enumerate() {
            for (condition_index, condition) in situation.conditions.iter().enumerate() {
                let outcome = evaluate_condition(&condition.expr, ctx);
                self.values.insert(
                    ConditionKey {
                        strategy,
                        group,
                        phase,
                        situation: situation_index,
                        condition: condition_index,
                    },
                    outcome,
                );
                self.trace.push(outcome as u8);
            }
        }
    }

    /// Cached outcome for a key. Unknown keys read as false.
    pub fn get(&self, key: ConditionKey) -> bool {
        self.values.get(&key).copied().unwrap_or(false)
    }

    /// The 0/1 outcomes in evaluation order for the whole step.
    pub fn trace(&self) -> &[u8] {
        &self.trace
    }

    fn situation_met(
        &self,
        strategy: usize,
        group: ConditionGroup,
        phase: usize,
        situation_index: usize,
        situation: &Situation,
    ) -> bool {
        (0..situation.conditions.len()).all(|condition| {
            self.get(ConditionKey {
                strategy,
                group,
                phase,
                situation: situation_index,
                condition,
            })
        })
    }

    /// Whether any situation of a trigger or entry group is met.
    pub fn group_met(&self, strategy_index: usize, strategy: &Strategy, group: ConditionGroup) -> bool {
        let situations = match group {
            ConditionGroup::TriggerOn => &strategy.trigger_on,
            ConditionGroup::TriggerOff => &strategy.trigger_off,
            ConditionGroup::TakePosition => &strategy.take_position,
            _ => return false,
        };
        situations
            .iter()
            .enumerate()
            .any(|(i, situation)| self.situation_met(strategy_index, group, 0, i, situation))
    }

    /// Whether any situation of a stop or take-profit phase is met.
    pub fn phase_met(
        &self,
        strategy_index: usize,
        strategy: &Strategy,
        group: ConditionGroup,
        phase_index: usize,
    ) -> bool {
        let phases = match group {
            ConditionGroup::StopLoss => &strategy.stop_loss,
            ConditionGroup::TakeProfit => &strategy.take_profit,
            _ => return false,
        };
        let Some(phase) = phases.get(phase_index) else {
            return false;
        };
        phase.situations.iter().enumerate().any(|(i, situation)| {
            self.situation_met(strategy_index, group, phase_index, i, situation)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use crate::domain::context::Scalars;
    use crate::domain::repository::Linked;
    use crate::domain::trading_system::{TradingSystem, TradingSystemDef};

    fn system_json() -> &'static str {
        r#"{
            "strategies": [{
                "name": "s",
                "triggerOn": [{
                    "name": "on",
                    "conditions": [
                        { "name": "c0", "formula": "candle.close > 100" },
                        { "name": "c1", "formula": "candle.direction == 'up'" }
                    ]
                }],
                "triggerOff": [{
                    "name": "off",
                    "conditions": [
                        { "name": "c0", "formula": "candle.close < 50" }
                    ]
                }],
                "takePosition": [{
                    "name": "go",
                    "conditions": [
                        { "name": "c0", "formula": "candle.close > 104" }
                    ]
                }],
                "stopLoss": [
                    { "name": "p0", "formula": "positionRate - 1",
                      "situations": [{
                          "name": "tighten",
                          "conditions": [{ "name": "c0", "formula": "candle.close > 200" }]
                      }]
                    }
                ],
                "takeProfit": [
                    { "name": "p0", "formula": "positionRate + 1" }
                ]
            }]
        }"#
    }

    fn compiled() -> TradingSystem {
        let def: TradingSystemDef = serde_json::from_str(system_json()).unwrap();
        TradingSystem::compile(&def).unwrap()
    }

    fn candle(close: f64) -> Candle {
        Candle {
            open: 100.0,
            close,
            min: 100.0_f64.min(close),
            max: 100.0_f64.max(close),
            begin: 0,
            end: 59_999,
            direction: Candle::body_direction(100.0, close),
        }
    }

    fn ctx(current: &Candle) -> StepContext<'_> {
        StepContext {
            candle: Linked {
                current,
                previous: None,
            },
            percentage_bandwidth: None,
            bollinger_band: None,
            lrc: None,
            channel: None,
            sub_channel: None,
            scalars: Scalars::default(),
        }
    }

    #[test]
    fn trace_is_ordered_and_complete() {
        let system = compiled();
        let current = candle(105.0);
        let mut cache = ConditionCache::new();
        cache.evaluate(&system, &ctx(&current));

        // triggerOn c0, c1; triggerOff c0; takePosition c0; stopLoss p0 c0.
        assert_eq!(cache.trace(), &[1, 1, 0, 1, 0]);
    }

    #[test]
    fn group_met_requires_all_conditions_in_a_situation() {
        let system = compiled();
        // Close above 100 but a down candle: c0 true, c1 false.
        let current = candle(90.0);
        let mut cache = ConditionCache::new();
        cache.evaluate(&system, &ctx(&current));
        assert!(!cache.group_met(0, &system.strategies[0], ConditionGroup::TriggerOn));

        let current = candle(105.0);
        cache.evaluate(&system, &ctx(&current));
        assert!(cache.group_met(0, &system.strategies[0], ConditionGroup::TriggerOn));
    }

    #[test]
    fn phase_met_reads_phase_situations() {
        let system = compiled();
        let current = candle(205.0);
        let mut cache = ConditionCache::new();
        cache.evaluate(&system, &ctx(&current));
        assert!(cache.phase_met(0, &system.strategies[0], ConditionGroup::StopLoss, 0));
        // The take profit phase has no situations, so it can never be met.
        assert!(!cache.phase_met(0, &system.strategies[0], ConditionGroup::TakeProfit, 0));
    }

    #[test]
    fn unknown_key_reads_false() {
        let cache = ConditionCache::new();
        assert!(!cache.get(ConditionKey {
            strategy: 9,
            group: ConditionGroup::TriggerOn,
            phase: 0,
            situation: 0,
            condition: 0,
        }));
    }

    #[test]
    fn reevaluation_replaces_previous_step() {
        let system = compiled();
        let mut cache = ConditionCache::new();
        let first = candle(105.0);
        cache.evaluate(&system, &ctx(&first));
        let second = candle(90.0);
        cache.evaluate(&system, &ctx(&second));
        assert_eq!(cache.trace().len(), 5);
        assert!(!cache.get(ConditionKey {
            strategy: 0,
            group: ConditionGroup::TakePosition,
            phase: 0,
            situation: 0,
            condition: 0,
        }));
    }
}

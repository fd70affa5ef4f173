//! Trading system definition and compilation.
//!
//! A trading system arrives as JSON: strategies holding situation lists for
//! the trigger and entry decisions, and phased formula lists for the stop and
//! take-profit targets. `TradingSystem::compile` parses every formula once up
//! front so the engine never touches text again; a bad formula fails the whole
//! system with a location string naming the offending node.

use serde::Deserialize;

use crate::domain::error::MarketsimError;
use crate::domain::formula::Expr;
use crate::domain::formula_parser;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TradingSystemDef {
    pub strategies: Vec<StrategyDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StrategyDef {
    pub name: String,
    pub trigger_on: Vec<SituationDef>,
    pub trigger_off: Vec<SituationDef>,
    pub take_position: Vec<SituationDef>,
    pub stop_loss: Vec<PhaseDef>,
    pub take_profit: Vec<PhaseDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PhaseDef {
    pub name: String,
    pub formula: String,
    #[serde(default)]
    pub situations: Vec<SituationDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SituationDef {
    pub name: String,
    pub conditions: Vec<ConditionDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConditionDef {
    pub name: String,
    pub formula: String,
}

/// Compiled condition: name plus parsed expression.
#[derive(Debug, Clone)]
pub struct Condition {
    pub name: String,
    pub expr: Expr,
}

/// A situation is met when every one of its conditions holds.
#[derive(Debug, Clone)]
pub struct Situation {
    pub name: String,
    pub conditions: Vec<Condition>,
}

/// One phase of a stop or take-profit ladder: a target formula plus the
/// situations that advance to the next phase.
#[derive(Debug, Clone)]
pub struct Phase {
    pub name: String,
    pub formula: Expr,
    pub situations: Vec<Situation>,
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: String,
    pub trigger_on: Vec<Situation>,
    pub trigger_off: Vec<Situation>,
    pub take_position: Vec<Situation>,
    pub stop_loss: Vec<Phase>,
    pub take_profit: Vec<Phase>,
}

#[derive(Debug, Clone)]
pub struct TradingSystem {
    pub strategies: Vec<Strategy>,
}

fn compile_formula(text: &str, location: &str) -> Result<Expr, MarketsimError> {
    formula_parser::parse(text).map_err(|source| MarketsimError::Formula {
        location: location.to_string(),
        source,
    })
}

fn compile_situations(
    defs: &[SituationDef],
    location: &str,
) -> Result<Vec<Situation>, MarketsimError> {
    defs.iter()
        .map(|situation| {
            let conditions = situation
                .conditions
                .iter()
                .map(|condition| {
                    let where_ = format!(
                        "{} situation '{}' condition '{}'",
                        location, situation.name, condition.name
                    );
                    Ok(Condition {
                        name: condition.name.clone(),
                        expr: compile_formula(&condition.formula, &where_)?,
                    })
                })
                .collect::<Result<Vec<_>, MarketsimError>>()?;
            Ok(Situation {
                name: situation.name.clone(),
                conditions,
            })
        })
        .collect()
}

fn compile_phases(defs: &[PhaseDef], location: &str) -> Result<Vec<Phase>, MarketsimError> {
    defs.iter()
        .map(|phase| {
            let where_ = format!("{} phase '{}'", location, phase.name);
            Ok(Phase {
                name: phase.name.clone(),
                formula: compile_formula(&phase.formula, &where_)?,
                situations: compile_situations(&phase.situations, &where_)?,
            })
        })
        .collect()
}

impl TradingSystem {
    /// Compile a definition, parsing every formula. Fails on the first bad
    /// formula or structural problem.
    pub fn compile(def: &TradingSystemDef) -> Result<TradingSystem, MarketsimError> {
        if def.strategies.is_empty() {
            return Err(MarketsimError::SystemInvalid {
                reason: "a trading system needs at least one strategy".to_string(),
            });
        }

        let strategies = def
            .strategies
            .iter()
            .map(|strategy| {
                let at = |group: &str| format!("strategy '{}' {}", strategy.name, group);

                if strategy.stop_loss.is_empty() {
                    return Err(MarketsimError::SystemInvalid {
                        reason: format!("strategy '{}' has no stop loss phases", strategy.name),
                    });
                }
                if strategy.take_profit.is_empty() {
                    return Err(MarketsimError::SystemInvalid {
                        reason: format!("strategy '{}' has no take profit phases", strategy.name),
                    });
                }

                Ok(Strategy {
                    name: strategy.name.clone(),
                    trigger_on: compile_situations(&strategy.trigger_on, &at("triggerOn"))?,
                    trigger_off: compile_situations(&strategy.trigger_off, &at("triggerOff"))?,
                    take_position: compile_situations(&strategy.take_position, &at("takePosition"))?,
                    stop_loss: compile_phases(&strategy.stop_loss, &at("stopLoss"))?,
                    take_profit: compile_phases(&strategy.take_profit, &at("takeProfit"))?,
                })
            })
            .collect::<Result<Vec<_>, MarketsimError>>()?;

        tracing::info!(strategies = strategies.len(), "trading system compiled");
        Ok(TradingSystem { strategies })
    }
}

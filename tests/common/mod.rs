//! Shared helpers for integration tests.

#![allow(dead_code)]

use marketsim::domain::config::EngineConfig;
use marketsim::domain::engine::{SimulationEngine, ONE_DAY_MS};
use marketsim::domain::trading_system::{TradingSystem, TradingSystemDef};

pub const HOUR_MS: i64 = 3_600_000;

/// Day boundary the test candles start at (2023-12-09 00:00 UTC).
pub const DAY0_MS: i64 = 19_700 * ONE_DAY_MS;

/// (open, close, min, max) of one hourly candle.
pub type CandleSpec = (f64, f64, f64, f64);

pub fn compile_system(json: &str) -> TradingSystem {
    let def: TradingSystemDef = serde_json::from_str(json).unwrap();
    TradingSystem::compile(&def).unwrap()
}

/// One strategy with a single situation/condition per rule group and single
/// phase stop and take ladders.
pub fn simple_system(
    trigger_on: &str,
    trigger_off: &str,
    take_position: &str,
    stop_formula: &str,
    take_formula: &str,
) -> TradingSystem {
    let json = format!(
        r#"{{
            "strategies": [{{
                "name": "test strategy",
                "triggerOn": [{{
                    "name": "on",
                    "conditions": [{{ "name": "c", "formula": "{trigger_on}" }}]
                }}],
                "triggerOff": [{{
                    "name": "off",
                    "conditions": [{{ "name": "c", "formula": "{trigger_off}" }}]
                }}],
                "takePosition": [{{
                    "name": "go",
                    "conditions": [{{ "name": "c", "formula": "{take_position}" }}]
                }}],
                "stopLoss": [{{ "name": "initial", "formula": "{stop_formula}" }}],
                "takeProfit": [{{ "name": "initial", "formula": "{take_formula}" }}]
            }}]
        }}"#
    );
    compile_system(&json)
}

pub fn hourly_config() -> EngineConfig {
    EngineConfig {
        time_period_ms: HOUR_MS,
        ..EngineConfig::default()
    }
}

/// Engine preloaded with hourly candles starting at `DAY0_MS` and a matching
/// percentage bandwidth series.
pub fn engine_with_candles(system: TradingSystem, candles: &[CandleSpec]) -> SimulationEngine {
    let mut engine = SimulationEngine::new(hourly_config(), system).unwrap();
    let repo = engine.repository_mut();

    let mut candle_rows = Vec::with_capacity(candles.len());
    let mut pb_rows = Vec::with_capacity(candles.len());
    for (i, (open, close, min, max)) in candles.iter().enumerate() {
        let begin = DAY0_MS + i as i64 * HOUR_MS;
        let end = begin + HOUR_MS - 1;
        candle_rows.push(vec![*min, *max, *open, *close, begin as f64, end as f64]);
        pb_rows.push(vec![begin as f64, end as f64, 50.0, 100.0, 2.5]);
    }
    repo.build_candles(&candle_rows).unwrap();
    repo.build_percentage_bandwidth(&pb_rows).unwrap();
    engine
}

/// Repeating two-candle pattern around 100: a tight candle the engine enters
/// on, then a wide candle whose high reaches the 1% stop target.
pub fn entry_exit_pattern(count: usize) -> Vec<CandleSpec> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                (100.0, 100.0, 99.9, 100.1)
            } else {
                (100.0, 100.0, 99.5, 102.0)
            }
        })
        .collect()
}

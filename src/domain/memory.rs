//! Continuation memory: state carried between daily runs.
//!
//! One simulation day ends with the engine committing balances and counters
//! here; the next day's run pulls them back in before its first step. The
//! `roundtrips` option doubles as the initialization marker: a memory that
//! has never been committed carries `None` and is seeded by the engine on
//! first use.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinuationMemory {
    pub balance_asset_a: f64,
    pub balance_asset_b: f64,
    pub last_profit: f64,
    pub profit: f64,
    pub last_profit_percent: f64,
    pub roundtrips: Option<u64>,
    pub fails: u64,
    pub hits: u64,
    pub periods: u64,
    pub order_id: u64,
    pub message_id: u64,
    pub hit_ratio: f64,
    pub roi: f64,
    pub annualized_rate_of_return: f64,
}

impl ContinuationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this memory has been seeded by a previous run.
    pub fn is_initialized(&self) -> bool {
        self.roundtrips.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_memory_is_uninitialized() {
        let memory = ContinuationMemory::new();
        assert!(!memory.is_initialized());
        assert_eq!(memory.balance_asset_a, 0.0);
    }

    #[test]
    fn seeded_memory_is_initialized() {
        let memory = ContinuationMemory {
            roundtrips: Some(0),
            ..ContinuationMemory::new()
        };
        assert!(memory.is_initialized());
    }

    #[test]
    fn json_round_trip_preserves_marker() {
        let memory = ContinuationMemory {
            balance_asset_a: 0.25,
            roundtrips: Some(3),
            hits: 2,
            fails: 1,
            hit_ratio: 2.0 / 3.0,
            ..ContinuationMemory::new()
        };
        let json = serde_json::to_string(&memory).unwrap();
        assert!(json.contains("balanceAssetA"));
        let back: ContinuationMemory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, memory);
    }

    #[test]
    fn missing_fields_default() {
        let back: ContinuationMemory = serde_json::from_str("{}").unwrap();
        assert!(!back.is_initialized());
        assert_eq!(back.periods, 0);
    }
}

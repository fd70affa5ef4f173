//! Engine configuration.

use crate::domain::error::MarketsimError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_INITIAL_BALANCE: f64 = 1.0;
pub const DEFAULT_MINIMUM_BALANCE: f64 = 0.5;
pub const DEFAULT_TIME_PERIOD_MS: i64 = 3_600_000;

/// Static parameters of one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Asset A balance the simulation starts with.
    pub initial_balance: f64,
    /// Entry gate: no new strategy is signaled while asset A is at or below
    /// this.
    pub minimum_balance: f64,
    pub exchange_name: String,
    pub market: String,
    /// Candle duration in milliseconds.
    pub time_period_ms: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_balance: DEFAULT_INITIAL_BALANCE,
            minimum_balance: DEFAULT_MINIMUM_BALANCE,
            exchange_name: "backtest".to_string(),
            market: "BTC_USDT".to_string(),
            time_period_ms: DEFAULT_TIME_PERIOD_MS,
        }
    }
}

impl EngineConfig {
    /// Load from the `[simulation]` section of a config source, falling back
    /// to defaults for absent keys.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MarketsimError> {
        let defaults = Self::default();
        let loaded = Self {
            initial_balance: config.get_double(
                "simulation",
                "initial_balance",
                defaults.initial_balance,
            ),
            minimum_balance: config.get_double(
                "simulation",
                "minimum_balance",
                defaults.minimum_balance,
            ),
            exchange_name: config
                .get_string("simulation", "exchange_name")
                .unwrap_or(defaults.exchange_name),
            market: config
                .get_string("simulation", "market")
                .unwrap_or(defaults.market),
            time_period_ms: config.get_int(
                "simulation",
                "time_period_ms",
                defaults.time_period_ms,
            ),
        };
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), MarketsimError> {
        let invalid = |key: &str, reason: &str| {
            Err(MarketsimError::ConfigInvalid {
                section: "simulation".to_string(),
                key: key.to_string(),
                reason: reason.to_string(),
            })
        };
        if !(self.initial_balance > 0.0) {
            return invalid("initial_balance", "must be greater than zero");
        }
        if !(self.minimum_balance >= 0.0) {
            return invalid("minimum_balance", "must not be negative");
        }
        if self.minimum_balance >= self.initial_balance {
            return invalid("minimum_balance", "must be below initial_balance");
        }
        if self.time_period_ms <= 0 {
            return invalid("time_period_ms", "must be greater than zero");
        }
        Ok(())
    }
}

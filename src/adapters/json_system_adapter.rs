//! JSON trading system adapter.

use crate::domain::error::MarketsimError;
use crate::domain::trading_system::TradingSystemDef;
use crate::ports::strategy_port::StrategyPort;
use std::fs;
use std::path::PathBuf;

pub struct JsonSystemAdapter {
    path: PathBuf,
}

impl JsonSystemAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl StrategyPort for JsonSystemAdapter {
    fn fetch_trading_system(&self) -> Result<TradingSystemDef, MarketsimError> {
        let content = fs::read_to_string(&self.path).map_err(|e| MarketsimError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| MarketsimError::SystemInvalid {
            reason: format!("{}: {}", self.path.display(), e),
        })
    }
}

//! Strategy source port trait.

use crate::domain::error::MarketsimError;
use crate::domain::trading_system::TradingSystemDef;

pub trait StrategyPort {
    /// Fetch the trading system definition, once per run.
    fn fetch_trading_system(&self) -> Result<TradingSystemDef, MarketsimError>;
}

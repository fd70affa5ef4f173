//! Indicator entry types: the four series families consumed by the engine.
//!
//! Point entries (one per candle period) carry a direction classified against
//! the previous entry's tracked field at build time. Channel entries are
//! intervals that may span many candle periods and carry their direction in
//! the source row itself.

use crate::domain::candle::Direction;
use serde::Serialize;

/// Linear-regression-channel entry: three channel values at different depths.
/// Direction is classified per value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearRegressionChannel {
    pub begin: i64,
    pub end: i64,
    pub value_15: f64,
    pub value_30: f64,
    pub value_60: f64,
    pub direction_15: Option<Direction>,
    pub direction_30: Option<Direction>,
    pub direction_60: Option<Direction>,
}

/// Percentage-bandwidth entry; direction tracks the moving average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentageBandwidth {
    pub begin: i64,
    pub end: i64,
    pub value: f64,
    pub moving_average: f64,
    pub bandwidth: f64,
    pub direction: Option<Direction>,
}

/// Bollinger-band entry; direction tracks the moving average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BollingerBand {
    pub begin: i64,
    pub end: i64,
    pub moving_average: f64,
    pub standard_deviation: f64,
    pub deviation: f64,
    pub direction: Option<Direction>,
}

/// Bollinger-channel interval entry. `begin..=end` covers every candle period
/// the channel spans; direction comes decoded from the source row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BollingerChannel {
    pub begin: i64,
    pub end: i64,
    pub direction: Direction,
    pub period: f64,
    pub first_moving_average: f64,
    pub last_moving_average: f64,
    pub first_deviation: f64,
    pub last_deviation: f64,
}

/// Bollinger-sub-channel interval entry; adds a slope reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BollingerSubChannel {
    pub begin: i64,
    pub end: i64,
    pub direction: Direction,
    pub slope: f64,
    pub period: f64,
    pub first_moving_average: f64,
    pub last_moving_average: f64,
    pub first_deviation: f64,
    pub last_deviation: f64,
}

/// Decode the numeric direction code used by channel rows.
pub fn decode_direction(code: f64) -> Option<Direction> {
    if code == 1.0 {
        Some(Direction::Up)
    } else if code == -1.0 {
        Some(Direction::Down)
    } else if code == 0.0 {
        Some(Direction::Side)
    } else {
        None
    }
}

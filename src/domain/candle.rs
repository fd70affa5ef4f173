//! Candle representation and direction classification.

use serde::Serialize;
use std::fmt;

/// Movement of a tracked value relative to the previous entry in its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Side,
}

impl Direction {
    /// Classify `current` against `previous`: strictly greater is `Up`,
    /// strictly smaller is `Down`, equal is `Side`.
    pub fn classify(previous: f64, current: f64) -> Direction {
        if current > previous {
            Direction::Up
        } else if current < previous {
            Direction::Down
        } else {
            Direction::Side
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Side => "side",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fixed-duration price observation. `begin`/`end` are millisecond
/// timestamps; data files use an inclusive end (`end = begin + period - 1`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub open: f64,
    pub close: f64,
    pub min: f64,
    pub max: f64,
    pub begin: i64,
    pub end: i64,
    pub direction: Direction,
}

impl Candle {
    /// Direction of the candle body: close against open.
    pub fn body_direction(open: f64, close: f64) -> Direction {
        Direction::classify(open, close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_up() {
        assert_eq!(Direction::classify(100.0, 101.0), Direction::Up);
    }

    #[test]
    fn classify_down() {
        assert_eq!(Direction::classify(101.0, 100.0), Direction::Down);
    }

    #[test]
    fn classify_side() {
        assert_eq!(Direction::classify(100.0, 100.0), Direction::Side);
    }

    #[test]
    fn body_direction_from_open_close() {
        assert_eq!(Candle::body_direction(100.0, 105.0), Direction::Up);
        assert_eq!(Candle::body_direction(105.0, 100.0), Direction::Down);
        assert_eq!(Candle::body_direction(100.0, 100.0), Direction::Side);
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Up.to_string(), "up");
        assert_eq!(Direction::Down.to_string(), "down");
        assert_eq!(Direction::Side.to_string(), "side");
    }
}

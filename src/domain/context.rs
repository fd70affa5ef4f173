//! Step context: the values a formula may reference during one candle step.
//!
//! Path resolution is whitelist based. Unknown roots and unknown fields
//! resolve to `None`, which the evaluator reports as an error rather than
//! silently producing a value. One level of `previous` is supported on every
//! series root.

use crate::domain::candle::{Candle, Direction};
use crate::domain::formula::Value;
use crate::domain::indicator::{
    BollingerBand, BollingerChannel, BollingerSubChannel, LinearRegressionChannel,
    PercentageBandwidth,
};
use crate::domain::repository::Linked;

/// Position and account scalars visible to formulas.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scalars {
    pub balance_asset_a: f64,
    pub balance_asset_b: f64,
    pub position_rate: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub last_profit: f64,
}

/// Everything resolvable at one simulation step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub candle: Linked<'a, Candle>,
    pub percentage_bandwidth: Option<Linked<'a, PercentageBandwidth>>,
    pub bollinger_band: Option<Linked<'a, BollingerBand>>,
    pub lrc: Option<Linked<'a, LinearRegressionChannel>>,
    pub channel: Option<Linked<'a, BollingerChannel>>,
    pub sub_channel: Option<Linked<'a, BollingerSubChannel>>,
    pub scalars: Scalars,
}

fn direction_value(direction: Direction) -> Value {
    Value::Text(direction.as_str().to_string())
}

fn candle_field(candle: &Candle, field: &str) -> Option<Value> {
    let value = match field {
        "open" => Value::Number(candle.open),
        "close" => Value::Number(candle.close),
        "min" => Value::Number(candle.min),
        "max" => Value::Number(candle.max),
        "begin" => Value::Number(candle.begin as f64),
        "end" => Value::Number(candle.end as f64),
        "direction" => direction_value(candle.direction),
        _ => return None,
    };
    Some(value)
}

fn percentage_bandwidth_field(entry: &PercentageBandwidth, field: &str) -> Option<Value> {
    let value = match field {
        "value" => Value::Number(entry.value),
        "movingAverage" => Value::Number(entry.moving_average),
        "bandwidth" => Value::Number(entry.bandwidth),
        "direction" => direction_value(entry.direction?),
        _ => return None,
    };
    Some(value)
}

fn bollinger_band_field(entry: &BollingerBand, field: &str) -> Option<Value> {
    let value = match field {
        "movingAverage" => Value::Number(entry.moving_average),
        "standardDeviation" => Value::Number(entry.standard_deviation),
        "deviation" => Value::Number(entry.deviation),
        "direction" => direction_value(entry.direction?),
        _ => return None,
    };
    Some(value)
}

fn channel_field(entry: &BollingerChannel, field: &str) -> Option<Value> {
    let value = match field {
        "direction" => direction_value(entry.direction),
        "period" => Value::Number(entry.period),
        "firstMovingAverage" => Value::Number(entry.first_moving_average),
        "lastMovingAverage" => Value::Number(entry.last_moving_average),
        "firstDeviation" => Value::Number(entry.first_deviation),
        "lastDeviation" => Value::Number(entry.last_deviation),
        _ => return None,
    };
    Some(value)
}

fn sub_channel_field(entry: &BollingerSubChannel, field: &str) -> Option<Value> {
    let value = match field {
        "direction" => direction_value(entry.direction),
        "slope" => Value::Number(entry.slope),
        "period" => Value::Number(entry.period),
        "firstMovingAverage" => Value::Number(entry.first_moving_average),
        "lastMovingAverage" => Value::Number(entry.last_moving_average),
        "firstDeviation" => Value::Number(entry.first_deviation),
        "lastDeviation" => Value::Number(entry.last_deviation),
        _ => return None,
    };
    Some(value)
}

fn lrc_field(entry: &LinearRegressionChannel, field: &str) -> Option<Value> {
    let value = match field {
        "value15" => Value::Number(entry.value_15),
        "value30" => Value::Number(entry.value_30),
        "value60" => Value::Number(entry.value_60),
        "direction15" => direction_value(entry.direction_15?),
        "direction30" => direction_value(entry.direction_30?),
        "direction60" => direction_value(entry.direction_60?),
        _ => return None,
    };
    Some(value)
}

/// Resolve `previous` hops, then the field, against a linked entry.
fn resolve_series<T>(
    linked: Linked<'_, T>,
    rest: &[String],
    field: fn(&T, &str) -> Option<Value>,
) -> Option<Value> {
    match rest {
        [name] => field(linked.current, name),
        [prev, name] if prev == "previous" => field(linked.previous?, name),
        _ => None,
    }
}

impl<'a> StepContext<'a> {
    /// Resolve a dotted path to a value. `None` means the path does not name
    /// anything known at this step.
    pub fn resolve(&self, path: &[String]) -> Option<Value> {
        let (root, rest) = path.split_first()?;
        match root.as_str() {
            "candle" => resolve_series(self.candle, rest, candle_field),
            "percentageBandwidth" => {
                resolve_series(self.percentage_bandwidth?, rest, percentage_bandwidth_field)
            }
            "bollingerBand" => resolve_series(self.bollinger_band?, rest, bollinger_band_field),
            "channel" => resolve_series(self.channel?, rest, channel_field),
            "subChannel" => resolve_series(self.sub_channel?, rest, sub_channel_field),
            "lrc" => resolve_series(self.lrc?, rest, lrc_field),
            "balanceAssetA" if rest.is_empty() => Some(Value::Number(self.scalars.balance_asset_a)),
            "balanceAssetB" if rest.is_empty() => Some(Value::Number(self.scalars.balance_asset_b)),
            "positionRate" if rest.is_empty() => Some(Value::Number(self.scalars.position_rate)),
            "stopLoss" if rest.is_empty() => Some(Value::Number(self.scalars.stop_loss)),
            "takeProfit" if rest.is_empty() => Some(Value::Number(self.scalars.take_profit)),
            "lastProfit" if rest.is_empty() => Some(Value::Number(self.scalars.last_profit)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(begin: i64, open: f64, close: f64) -> Candle {
        Candle {
            open,
            close,
            min: open.min(close),
            max: open.max(close),
            begin,
            end: begin + 59_999,
            direction: Candle::body_direction(open, close),
        }
    }

    fn context<'a>(current: &'a Candle, previous: Option<&'a Candle>) -> StepContext<'a> {
        StepContext {
            candle: Linked { current, previous },
            percentage_bandwidth: None,
            bollinger_band: None,
            lrc: None,
            channel: None,
            sub_channel: None,
            scalars: Scalars {
                balance_asset_a: 1.0,
                position_rate: 105.5,
                ..Scalars::default()
            },
        }
    }

    fn path(s: &str) -> Vec<String> {
        s.split('.').map(str::to_string).collect()
    }

    #[test]
    fn resolves_candle_fields() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        assert_eq!(ctx.resolve(&path("candle.close")), Some(Value::Number(105.0)));
        assert_eq!(
            ctx.resolve(&path("candle.direction")),
            Some(Value::Text("up".into()))
        );
    }

    #[test]
    fn resolves_previous_candle() {
        let prev = candle(0, 90.0, 100.0);
        let current = candle(60_000, 100.0, 105.0);
        let ctx = context(&current, Some(&prev));
        assert_eq!(
            ctx.resolve(&path("candle.previous.close")),
            Some(Value::Number(100.0))
        );
    }

    #[test]
    fn previous_without_predecessor_is_unresolved() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        assert_eq!(ctx.resolve(&path("candle.previous.close")), None);
    }

    #[test]
    fn resolves_scalars() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        assert_eq!(ctx.resolve(&path("balanceAssetA")), Some(Value::Number(1.0)));
        assert_eq!(ctx.resolve(&path("positionRate")), Some(Value::Number(105.5)));
    }

    #[test]
    fn missing_series_is_unresolved() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        assert_eq!(ctx.resolve(&path("bollingerBand.movingAverage")), None);
    }

    #[test]
    fn unknown_root_and_field_are_unresolved() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        assert_eq!(ctx.resolve(&path("window.location")), None);
        assert_eq!(ctx.resolve(&path("candle.volume")), None);
    }

    #[test]
    fn unset_direction_is_unresolved() {
        let current = candle(0, 100.0, 105.0);
        let entry = PercentageBandwidth {
            begin: 0,
            end: 59_999,
            value: 50.0,
            moving_average: 100.0,
            bandwidth: 2.5,
            direction: None,
        };
        let mut ctx = context(&current, None);
        ctx.percentage_bandwidth = Some(Linked {
            current: &entry,
            previous: None,
        });
        assert_eq!(ctx.resolve(&path("percentageBandwidth.direction")), None);
        assert_eq!(
            ctx.resolve(&path("percentageBandwidth.bandwidth")),
            Some(Value::Number(2.5))
        );
    }
}

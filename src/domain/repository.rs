//! Indicator repository: raw row ingestion and time-keyed series access.
//!
//! All series live in contiguous ordered buffers owned by one repository
//! instance; "previous entry" access goes through [`Linked`] lookups instead
//! of per-entry back-references. Builders accumulate across calls until
//! [`IndicatorRepository::initialize_data`] resets every container, which must
//! happen once per logical simulation run.

use std::collections::HashMap;

use crate::domain::candle::{Candle, Direction};
use crate::domain::error::MarketsimError;
use crate::domain::indicator::{
    decode_direction, BollingerBand, BollingerChannel, BollingerSubChannel,
    LinearRegressionChannel, PercentageBandwidth,
};

/// An entry paired with its predecessor in the same series, if any.
#[derive(Debug)]
pub struct Linked<'a, T> {
    pub current: &'a T,
    pub previous: Option<&'a T>,
}

// Manual impls: the derives would demand `T: Copy` even though only
// references are held.
impl<T> Clone for Linked<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Linked<'_, T> {}

#[derive(Debug, Default)]
pub struct IndicatorRepository {
    candles: Vec<Candle>,
    lrc: Vec<LinearRegressionChannel>,
    lrc_index: HashMap<i64, usize>,
    percentage_bandwidth: Vec<PercentageBandwidth>,
    percentage_bandwidth_index: HashMap<i64, usize>,
    bollinger_bands: Vec<BollingerBand>,
    bollinger_band_index: HashMap<i64, usize>,
    bollinger_channels: Vec<BollingerChannel>,
    bollinger_sub_channels: Vec<BollingerSubChannel>,
}

fn build_error(series: &str, reason: String) -> MarketsimError {
    MarketsimError::Build {
        series: series.to_string(),
        reason,
    }
}

fn check_arity(series: &str, row_index: usize, row: &[f64], expected: usize) -> Result<(), MarketsimError> {
    if row.len() != expected {
        return Err(build_error(
            series,
            format!("row {} has {} fields, expected {}", row_index, row.len(), expected),
        ));
    }
    Ok(())
}

fn check_interval(series: &str, row_index: usize, begin: f64, end: f64) -> Result<(), MarketsimError> {
    if !begin.is_finite() || !end.is_finite() || end < begin {
        return Err(build_error(
            series,
            format!("row {} has invalid interval [{}, {}]", row_index, begin, end),
        ));
    }
    Ok(())
}

impl IndicatorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all containers to empty. Entries otherwise accumulate across
    /// build calls.
    pub fn initialize_data(&mut self) {
        self.candles.clear();
        self.lrc.clear();
        self.lrc_index.clear();
        self.percentage_bandwidth.clear();
        self.percentage_bandwidth_index.clear();
        self.bollinger_bands.clear();
        self.bollinger_band_index.clear();
        self.bollinger_channels.clear();
        self.bollinger_sub_channels.clear();
    }

    /// Candle row layout: `[low, high, open, close, beginMs, endMs]`.
    pub fn build_candles(&mut self, rows: &[Vec<f64>]) -> Result<(), MarketsimError> {
        tracing::debug!(rows = rows.len(), "building candle series");
        let mut pending = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            check_arity("candles", i, row, 6)?;
            check_interval("candles", i, row[4], row[5])?;
            pending.push(Candle {
                min: row[0],
                max: row[1],
                open: row[2],
                close: row[3],
                begin: row[4] as i64,
                end: row[5] as i64,
                direction: Candle::body_direction(row[2], row[3]),
            });
        }
        self.candles.extend(pending);
        Ok(())
    }

    /// Linear-regression row layout: `[beginMs, endMs, value15, value30, value60]`.
    pub fn build_lrc(&mut self, rows: &[Vec<f64>]) -> Result<(), MarketsimError> {
        tracing::debug!(rows = rows.len(), "building linear regression channel series");
        let mut pending: Vec<LinearRegressionChannel> = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            check_arity("lrc", i, row, 5)?;
            check_interval("lrc", i, row[0], row[1])?;
            let previous = pending.last().or(self.lrc.last());
            let entry = LinearRegressionChannel {
                begin: row[0] as i64,
                end: row[1] as i64,
                value_15: row[2],
                value_30: row[3],
                value_60: row[4],
                direction_15: previous.map(|p| Direction::classify(p.value_15, row[2])),
                direction_30: previous.map(|p| Direction::classify(p.value_30, row[3])),
                direction_60: previous.map(|p| Direction::classify(p.value_60, row[4])),
            };
            pending.push(entry);
        }
        for entry in pending {
            self.lrc_index.insert(entry.begin, self.lrc.len());
            self.lrc.push(entry);
        }
        Ok(())
    }

    /// Percentage-bandwidth row layout: `[beginMs, endMs, value, movingAverage, bandwidth]`.
    pub fn build_percentage_bandwidth(&mut self, rows: &[Vec<f64>]) -> Result<(), MarketsimError> {
        tracing::debug!(rows = rows.len(), "building percentage bandwidth series");
        let mut pending: Vec<PercentageBandwidth> = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            check_arity("percentageBandwidth", i, row, 5)?;
            check_interval("percentageBandwidth", i, row[0], row[1])?;
            let previous = pending.last().or(self.percentage_bandwidth.last());
            pending.push(PercentageBandwidth {
                begin: row[0] as i64,
                end: row[1] as i64,
                value: row[2],
                moving_average: row[3],
                bandwidth: row[4],
                direction: previous.map(|p| Direction::classify(p.moving_average, row[3])),
            });
        }
        for entry in pending {
            self.percentage_bandwidth_index
                .insert(entry.begin, self.percentage_bandwidth.len());
            self.percentage_bandwidth.push(entry);
        }
        Ok(())
    }

    /// Bollinger-band row layout: `[beginMs, endMs, movingAverage, standardDeviation, deviation]`.
    pub fn build_bollinger_bands(&mut self, rows: &[Vec<f64>]) -> Result<(), MarketsimError> {
        tracing::debug!(rows = rows.len(), "building bollinger band series");
        let mut pending: Vec<BollingerBand> = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            check_arity("bollingerBands", i, row, 5)?;
            check_interval("bollingerBands", i, row[0], row[1])?;
            let previous = pending.last().or(self.bollinger_bands.last());
            pending.push(BollingerBand {
                begin: row[0] as i64,
                end: row[1] as i64,
                moving_average: row[2],
                standard_deviation: row[3],
                deviation: row[4],
                direction: previous.map(|p| Direction::classify(p.moving_average, row[2])),
            });
        }
        for entry in pending {
            self.bollinger_band_index
                .insert(entry.begin, self.bollinger_bands.len());
            self.bollinger_bands.push(entry);
        }
        Ok(())
    }

    /// Bollinger-channel row layout:
    /// `[beginMs, endMs, direction, period, firstMA, lastMA, firstDev, lastDev]`.
    pub fn build_bollinger_channels(&mut self, rows: &[Vec<f64>]) -> Result<(), MarketsimError> {
        tracing::debug!(rows = rows.len(), "building bollinger channel series");
        let mut pending = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            check_arity("bollingerChannels", i, row, 8)?;
            check_interval("bollingerChannels", i, row[0], row[1])?;
            let direction = decode_direction(row[2]).ok_or_else(|| {
                build_error(
                    "bollingerChannels",
                    format!("row {} has invalid direction code {}", i, row[2]),
                )
            })?;
            pending.push(BollingerChannel {
                begin: row[0] as i64,
                end: row[1] as i64,
                direction,
                period: row[3],
                first_moving_average: row[4],
                last_moving_average: row[5],
                first_deviation: row[6],
                last_deviation: row[7],
            });
        }
        self.bollinger_channels.extend(pending);
        Ok(())
    }

    /// Bollinger-sub-channel row layout:
    /// `[beginMs, endMs, direction, slope, period, firstMA, lastMA, firstDev, lastDev]`.
    pub fn build_bollinger_sub_channels(&mut self, rows: &[Vec<f64>]) -> Result<(), MarketsimError> {
        tracing::debug!(rows = rows.len(), "building bollinger sub-channel series");
        let mut pending = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            check_arity("bollingerSubChannels", i, row, 9)?;
            check_interval("bollingerSubChannels", i, row[0], row[1])?;
            let direction = decode_direction(row[2]).ok_or_else(|| {
                build_error(
                    "bollingerSubChannels",
                    format!("row {} has invalid direction code {}", i, row[2]),
                )
            })?;
            pending.push(BollingerSubChannel {
                begin: row[0] as i64,
                end: row[1] as i64,
                direction,
                slope: row[3],
                period: row[4],
                first_moving_average: row[5],
                last_moving_average: row[6],
                first_deviation: row[7],
                last_deviation: row[8],
            });
        }
        self.bollinger_sub_channels.extend(pending);
        Ok(())
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Candle at `index` together with its predecessor.
    pub fn candle(&self, index: usize) -> Option<Linked<'_, Candle>> {
        let current = self.candles.get(index)?;
        let previous = index.checked_sub(1).and_then(|i| self.candles.get(i));
        Some(Linked { current, previous })
    }

    pub fn lrc_at(&self, begin: i64) -> Option<Linked<'_, LinearRegressionChannel>> {
        let index = *self.lrc_index.get(&begin)?;
        Some(Linked {
            current: &self.lrc[index],
            previous: index.checked_sub(1).map(|i| &self.lrc[i]),
        })
    }

    pub fn percentage_bandwidth_at(&self, begin: i64) -> Option<Linked<'_, PercentageBandwidth>> {
        let index = *self.percentage_bandwidth_index.get(&begin)?;
        Some(Linked {
            current: &self.percentage_bandwidth[index],
            previous: index.checked_sub(1).map(|i| &self.percentage_bandwidth[i]),
        })
    }

    pub fn bollinger_band_at(&self, begin: i64) -> Option<Linked<'_, BollingerBand>> {
        let index = *self.bollinger_band_index.get(&begin)?;
        Some(Linked {
            current: &self.bollinger_bands[index],
            previous: index.checked_sub(1).map(|i| &self.bollinger_bands[i]),
        })
    }

    /// Channel whose interval contains `[begin, end]`.
    pub fn channel_containing(&self, begin: i64, end: i64) -> Option<Linked<'_, BollingerChannel>> {
        let index = self
            .bollinger_channels
            .iter()
            .position(|c| begin >= c.begin && end <= c.end)?;
        Some(Linked {
            current: &self.bollinger_channels[index],
            previous: index.checked_sub(1).map(|i| &self.bollinger_channels[i]),
        })
    }

    /// Sub-channel whose interval contains `[begin, end]`.
    pub fn sub_channel_containing(
        &self,
        begin: i64,
        end: i64,
    ) -> Option<Linked<'_, BollingerSubChannel>> {
        let index = self
            .bollinger_sub_channels
            .iter()
            .position(|c| begin >= c.begin && end <= c.end)?;
        Some(Linked {
            current: &self.bollinger_sub_channels[index],
            previous: index.checked_sub(1).map(|i| &self.bollinger_sub_channels[i]),
        })
    }
}

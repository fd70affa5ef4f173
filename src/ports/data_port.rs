//! Series data port trait: where the raw tabular rows come from.

use crate::domain::error::MarketsimError;

/// The series families the engine ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Candles,
    LinearRegressionChannel,
    PercentageBandwidth,
    BollingerBands,
    BollingerChannels,
    BollingerSubChannels,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 6] = [
        SeriesKind::Candles,
        SeriesKind::LinearRegressionChannel,
        SeriesKind::PercentageBandwidth,
        SeriesKind::BollingerBands,
        SeriesKind::BollingerChannels,
        SeriesKind::BollingerSubChannels,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Candles => "candles",
            SeriesKind::LinearRegressionChannel => "lrc",
            SeriesKind::PercentageBandwidth => "percentage_bandwidth",
            SeriesKind::BollingerBands => "bollinger_bands",
            SeriesKind::BollingerChannels => "bollinger_channels",
            SeriesKind::BollingerSubChannels => "bollinger_sub_channels",
        }
    }
}

pub trait SeriesDataPort {
    /// Fetch the raw rows of one series, in chronological order. A missing
    /// optional series returns an empty row set.
    fn fetch_series(&self, kind: SeriesKind) -> Result<Vec<Vec<f64>>, MarketsimError>;
}

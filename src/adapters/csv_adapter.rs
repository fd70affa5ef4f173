//! CSV series data adapter.
//!
//! One headerless CSV file per series under a base directory, named after
//! [`SeriesKind::as_str`]. Every cell is a float; row arity is validated by
//! the repository builders, not here.

use crate::domain::error::MarketsimError;
use crate::ports::data_port::{SeriesDataPort, SeriesKind};
use std::fs;
use std::path::PathBuf;

pub struct CsvSeriesAdapter {
    base_path: PathBuf,
}

impl CsvSeriesAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn series_path(&self, kind: SeriesKind) -> PathBuf {
        self.base_path.join(format!("{}.csv", kind.as_str()))
    }
}

impl SeriesDataPort for CsvSeriesAdapter {
    fn fetch_series(&self, kind: SeriesKind) -> Result<Vec<Vec<f64>>, MarketsimError> {
        let path = self.series_path(kind);
        if !path.exists() {
            // Only candles are mandatory; the engine tolerates absent
            // indicator series.
            if kind == SeriesKind::Candles {
                return Err(MarketsimError::Data {
                    reason: format!("missing candle file {}", path.display()),
                });
            }
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).map_err(|e| MarketsimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(content.as_bytes());
        let mut rows = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| MarketsimError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let mut row = Vec::with_capacity(record.len());
            for (column, field) in record.iter().enumerate() {
                let value: f64 = field.trim().parse().map_err(|e| MarketsimError::Data {
                    reason: format!(
                        "{}: row {} column {}: invalid number '{}': {}",
                        path.display(),
                        line,
                        column,
                        field,
                        e
                    ),
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        tracing::debug!(series = kind.as_str(), rows = rows.len(), "series loaded");
        Ok(rows)
    }
}

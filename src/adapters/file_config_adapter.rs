//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;
use std::str::FromStr;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// Numeric keys parse from the raw string value; an unparseable value
    /// reads as absent.
    fn parsed<T: FromStr>(&self, section: &str, key: &str) -> Option<T> {
        self.config
            .get(section, key)
            .and_then(|value| value.trim().parse().ok())
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.parsed(section, key).unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.parsed(section, key).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[simulation]
initial_balance = 2.0
exchange_name = poloniex
market = BTC_USDT
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("simulation", "exchange_name"),
            Some("poloniex".to_string())
        );
        assert_eq!(adapter.get_double("simulation", "initial_balance", 0.0), 2.0);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[simulation]\nmarket = BTC_USDT\n").unwrap();
        assert_eq!(adapter.get_string("simulation", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_and_default() {
        let adapter =
            FileConfigAdapter::from_string("[simulation]\ntime_period_ms = 60000\n").unwrap();
        assert_eq!(adapter.get_int("simulation", "time_period_ms", 0), 60_000);
        assert_eq!(adapter.get_int("simulation", "missing", 42), 42);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[simulation]\ntime_period_ms = soon\n").unwrap();
        assert_eq!(adapter.get_int("simulation", "time_period_ms", 42), 42);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[simulation]\ninitial_balance = plenty\n").unwrap();
        assert_eq!(adapter.get_double("simulation", "initial_balance", 9.5), 9.5);
    }

    #[test]
    fn numeric_values_tolerate_surrounding_whitespace() {
        let adapter =
            FileConfigAdapter::from_string("[simulation]\ninitial_balance =  1.5 \n").unwrap();
        assert_eq!(adapter.get_double("simulation", "initial_balance", 0.0), 1.5);
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[simulation]\nmarket = ETH_USDT\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("simulation", "market"),
            Some("ETH_USDT".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        assert!(FileConfigAdapter::from_file("/nonexistent/path/config.ini").is_err());
    }
}

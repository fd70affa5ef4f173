//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvSeriesAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_system_adapter::JsonSystemAdapter;
use crate::adapters::memory_store::FileMemoryStore;
use crate::domain::config::EngineConfig;
use crate::domain::engine::{RunOutput, RunParams, SimulationEngine};
use crate::domain::error::MarketsimError;
use crate::domain::memory::ContinuationMemory;
use crate::domain::trading_system::TradingSystem;
use crate::ports::data_port::{SeriesDataPort, SeriesKind};
use crate::ports::memory_port::MemoryPort;
use crate::ports::strategy_port::StrategyPort;

#[derive(Parser, Debug)]
#[command(name = "marketsim", about = "Trading strategy simulation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation over a candle range
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        /// Trading system definition (JSON)
        #[arg(short, long)]
        system: PathBuf,
        /// Directory holding the series CSV files
        #[arg(short, long)]
        data: PathBuf,
        /// Directory the output records are written into
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Continuation memory file, carried across daily invocations
        #[arg(long)]
        memory: Option<PathBuf>,
        /// First simulated date (YYYY-MM-DD); earlier candles are skipped
        #[arg(long)]
        start: Option<String>,
        /// The calendar day this invocation covers (YYYY-MM-DD)
        #[arg(long)]
        current_day: Option<String>,
    },
    /// Validate a trading system definition
    Validate {
        #[arg(short, long)]
        system: PathBuf,
    },
    /// Show row counts for the series files in a data directory
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Simulate {
            config,
            system,
            data,
            output,
            memory,
            start,
            current_day,
        } => run_simulate(
            &config,
            &system,
            &data,
            output.as_ref(),
            memory.as_ref(),
            start.as_deref(),
            current_day.as_deref(),
        ),
        Command::Validate { system } => run_validate(&system),
        Command::Info { data } => run_info(&data),
    }
}

fn fail(err: &MarketsimError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn parse_date_ms(value: &str, flag: &str) -> Result<i64, MarketsimError> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        MarketsimError::ConfigInvalid {
            section: "cli".into(),
            key: flag.into(),
            reason: "invalid date format (expected YYYY-MM-DD)".into(),
        }
    })?;
    Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
}

fn load_system(path: &PathBuf) -> Result<TradingSystem, MarketsimError> {
    let def = JsonSystemAdapter::new(path.clone()).fetch_trading_system()?;
    TradingSystem::compile(&def)
}

fn build_series(engine: &mut SimulationEngine, data: &PathBuf) -> Result<(), MarketsimError> {
    let adapter = CsvSeriesAdapter::new(data.clone());
    let repo = engine.repository_mut();
    repo.initialize_data();
    repo.build_candles(&adapter.fetch_series(SeriesKind::Candles)?)?;
    repo.build_lrc(&adapter.fetch_series(SeriesKind::LinearRegressionChannel)?)?;
    repo.build_percentage_bandwidth(&adapter.fetch_series(SeriesKind::PercentageBandwidth)?)?;
    repo.build_bollinger_bands(&adapter.fetch_series(SeriesKind::BollingerBands)?)?;
    repo.build_bollinger_channels(&adapter.fetch_series(SeriesKind::BollingerChannels)?)?;
    repo.build_bollinger_sub_channels(&adapter.fetch_series(SeriesKind::BollingerSubChannels)?)?;
    Ok(())
}

fn write_json<T: serde::Serialize>(
    dir: &PathBuf,
    name: &str,
    value: &[T],
) -> Result<(), MarketsimError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| MarketsimError::Data {
        reason: format!("failed to encode {}: {}", name, e),
    })?;
    fs::write(dir.join(name), json)?;
    Ok(())
}

fn write_output(output: &RunOutput, dir: &PathBuf) -> Result<(), MarketsimError> {
    fs::create_dir_all(dir)?;
    write_json(dir, "records.json", &output.records)?;
    write_json(dir, "conditions.json", &output.conditions)?;
    write_json(dir, "strategies.json", &output.strategies)?;
    write_json(dir, "trades.json", &output.trades)?;
    write_json(dir, "snapshots.json", &output.snapshots)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_simulate(
    config_path: &PathBuf,
    system_path: &PathBuf,
    data_path: &PathBuf,
    output_path: Option<&PathBuf>,
    memory_path: Option<&PathBuf>,
    start: Option<&str>,
    current_day: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match FileConfigAdapter::from_file(config_path) {
        Ok(a) => a,
        Err(e) => {
            return fail(&MarketsimError::ConfigParse {
                file: config_path.display().to_string(),
                reason: e.to_string(),
            });
        }
    };
    let config = match EngineConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    eprintln!("Loading trading system from {}", system_path.display());
    let system = match load_system(system_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let mut engine = match SimulationEngine::new(config, system) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };
    if let Err(e) = build_series(&mut engine, data_path) {
        return fail(&e);
    }

    let params = {
        let start_ms = match start {
            Some(s) => match parse_date_ms(s, "start") {
                Ok(ms) => ms,
                Err(e) => return fail(&e),
            },
            None => 0,
        };
        let current_day_ms = match current_day {
            Some(s) => match parse_date_ms(s, "current_day") {
                Ok(ms) => Some(ms),
                Err(e) => return fail(&e),
            },
            None => None,
        };
        RunParams {
            start: start_ms,
            current_day: current_day_ms,
        }
    };

    let store = memory_path.map(|p| FileMemoryStore::new(p.clone()));
    let mut memory = match &store {
        Some(store) => match store.load() {
            Ok(m) => m,
            Err(e) => return fail(&e),
        },
        None => ContinuationMemory::new(),
    };

    let output = match engine.run(params, &mut memory) {
        Ok(o) => o,
        Err(e) => return fail(&e),
    };

    if let Some(store) = &store {
        if let Err(e) = store.save(&memory) {
            return fail(&e);
        }
    }

    eprintln!("\n=== Simulation Results ===");
    eprintln!("Records:          {}", output.records.len());
    eprintln!("Strategies:       {}", output.strategies.len());
    eprintln!("Trades:           {}", output.trades.len());
    if let Some(last) = output.records.last() {
        eprintln!("Roundtrips:       {}", last.roundtrips);
        eprintln!("Hit Ratio:        {:.2}", last.hit_ratio);
        eprintln!("ROI:              {:.4}", last.roi);
        eprintln!("Balance A:        {:.6}", last.balance_asset_a);
        eprintln!("Balance B:        {:.6}", last.balance_asset_b);
    }

    if let Some(dir) = output_path {
        if let Err(e) = write_output(&output, dir) {
            return fail(&e);
        }
        eprintln!("\nOutput written to: {}", dir.display());
    }

    ExitCode::SUCCESS
}

fn run_validate(system_path: &PathBuf) -> ExitCode {
    eprintln!("Validating trading system: {}", system_path.display());
    let system = match load_system(system_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    for strategy in &system.strategies {
        let condition_count: usize = strategy
            .trigger_on
            .iter()
            .chain(&strategy.trigger_off)
            .chain(&strategy.take_position)
            .map(|s| s.conditions.len())
            .sum();
        eprintln!(
            "  {}: {} trigger/entry conditions, {} stop phases, {} take phases",
            strategy.name,
            condition_count,
            strategy.stop_loss.len(),
            strategy.take_profit.len()
        );
    }

    eprintln!("\nTrading system is valid.");
    ExitCode::SUCCESS
}

fn run_info(data_path: &PathBuf) -> ExitCode {
    let adapter = CsvSeriesAdapter::new(data_path.clone());

    for kind in SeriesKind::ALL {
        match adapter.fetch_series(kind) {
            Ok(rows) => {
                if rows.is_empty() {
                    eprintln!("{:<24} (absent)", kind.as_str());
                } else {
                    eprintln!("{:<24} {} rows", kind.as_str(), rows.len());
                }
            }
            Err(e) => {
                eprintln!("{:<24} error: {}", kind.as_str(), e);
            }
        }
    }

    ExitCode::SUCCESS
}

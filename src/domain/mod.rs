pub mod candle;
pub mod conditions;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod formula;
pub mod formula_eval;
pub mod formula_parser;
pub mod indicator;
pub mod memory;
pub mod records;
pub mod repository;
pub mod trading_system;

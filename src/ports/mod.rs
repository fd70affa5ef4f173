pub mod config_port;
pub mod data_port;
pub mod memory_port;
pub mod strategy_port;

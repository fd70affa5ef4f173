pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_system_adapter;
pub mod memory_store;

// src/config/mod.rs
pub mod monitor;

pub use monitor::{load_config_default, load_config_from, MonitorConfig, ENV_CONFIG_PATH};

//! Configuration system for Aegis.
//! TOML (or JSON) document, 4-layer resolution: CLI > env > config file > defaults.

pub mod aegis_config;
pub mod rule_config;
pub mod scan_config;

pub use aegis_config::{AegisConfig, CliOverrides};
pub use rule_config::RuleSetting;
pub use scan_config::ScanConfig;

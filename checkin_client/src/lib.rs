pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use frameworks::config::StationConfig;
pub use frameworks::station::{StationError, run, run_with_config};

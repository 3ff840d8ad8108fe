// Frameworks layer: environment configuration and the scan-station runner.

pub mod config;
pub mod station;

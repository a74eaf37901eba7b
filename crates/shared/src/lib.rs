// navgen - Shared Library
// Logging and configuration used by the exporter binary

pub mod config;
pub mod log;

//! Command-line options.

use std::path::PathBuf;

use clap::Parser;

use crate::config::VtnConfig;

/// Demand-response VTN: VEN fleet registry and event administration API.
#[derive(Debug, Parser)]
#[command(name = "vtn-fleet", version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// API server port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Registry data directory (overrides config)
    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); RUST_LOG takes precedence
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    pub log_level: String,

    /// Write the fleet as CSV to PATH and exit instead of serving
    #[arg(long = "export-fleet", value_name = "PATH")]
    pub export_fleet: Option<PathBuf>,
}

impl Cli {
    /// Applies command-line overrides on top of a loaded config.
    pub fn apply(&self, config: &mut VtnConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.data_dir {
            config.registry.data_dir = dir.clone();
        }
    }
}

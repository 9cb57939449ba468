use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Basic (process-level) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Assessment report (JSON) to export when no path is given on the command line.
    /// TOML: `basic.report_path`. Default: `report.json`.
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            loglevel: default_loglevel(),
            report_path: default_report_path(),
        }
    }
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_report_path() -> PathBuf {
    PathBuf::from("report.json")
}

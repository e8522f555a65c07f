//! Layered configuration for the dataforge bridge.
//!
//! [`Config`] is resolved by `ortho_config` from, in increasing precedence:
//! built-in defaults, a TOML file named by `--config-path` (or
//! `DATAFORGE_BRIDGE_CONFIG_PATH`), `DATAFORGE_BRIDGE_*` environment
//! variables, and command-line flags.
//!
//! Flags whose value starts with a hyphen must use the `=` form, as in
//! `--path-flag=--path`.

mod defaults;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_EXECUTABLE, DEFAULT_GRACE_PERIOD_MS, DEFAULT_LOG_FILTER, default_executable,
    default_grace_period_ms, default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DATAFORGE_BRIDGE")]
pub struct Config {
    /// Program name or path of the dataforge tool.
    #[ortho_config(default = defaults::default_executable())]
    #[serde(default = "defaults::default_executable")]
    executable: String,
    /// Flag inserted before the target path, e.g. `--path`.
    #[serde(default)]
    path_flag: Option<String>,
    /// Directory the tool runs in; the bridge's own directory when unset.
    #[serde(default)]
    working_dir: Option<Utf8PathBuf>,
    /// Milliseconds between the termination request and the forced kill.
    #[ortho_config(default = defaults::DEFAULT_GRACE_PERIOD_MS)]
    #[serde(default = "defaults::default_grace_period_ms")]
    grace_period_ms: u64,
    /// Seconds a run may take before it is stopped; unset or zero disables
    /// the limit.
    #[serde(default)]
    timeout_secs: Option<u64>,
    /// `tracing-subscriber` filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    #[serde(default = "defaults::default_log_filter_string")]
    log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    #[serde(default = "defaults::default_log_format")]
    log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            path_flag: None,
            working_dir: None,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            timeout_secs: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Program name or path of the dataforge tool.
    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Flag placed before the target path, ignoring blank values.
    #[must_use]
    pub fn path_flag(&self) -> Option<&str> {
        self.path_flag
            .as_deref()
            .filter(|flag| !flag.trim().is_empty())
    }

    /// Working directory override.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.working_dir.as_deref()
    }

    /// Delay between the termination request and the forced kill.
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Run timeout, if one is configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Filter expression for log events.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_run_dataforge_with_no_flag() {
        let config = Config::default();
        assert_eq!(config.executable(), "dataforge");
        assert_eq!(config.path_flag(), None);
        assert_eq!(config.working_dir(), None);
        assert_eq!(config.grace_period(), Duration::from_secs(2));
        assert_eq!(config.timeout(), None);
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Compact);
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(0), None)]
    #[case(Some(45), Some(Duration::from_secs(45)))]
    fn zero_timeout_disables_the_limit(
        #[case] secs: Option<u64>,
        #[case] expected: Option<Duration>,
    ) {
        let config = Config {
            timeout_secs: secs,
            ..Config::default()
        };
        assert_eq!(config.timeout(), expected);
    }

    #[rstest]
    #[case(Some(""), None)]
    #[case(Some("  "), None)]
    #[case(Some("--path"), Some("--path"))]
    fn blank_path_flags_are_ignored(#[case] flag: Option<&str>, #[case] expected: Option<&str>) {
        let config = Config {
            path_flag: flag.map(str::to_owned),
            ..Config::default()
        };
        assert_eq!(config.path_flag(), expected);
    }
}

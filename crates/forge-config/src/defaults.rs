//! Built-in configuration defaults.

use crate::logging::LogFormat;

/// Program run when no executable is configured.
pub const DEFAULT_EXECUTABLE: &str = "dataforge";

/// Milliseconds a terminated tool may take to exit before it is killed.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2_000;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default executable as an owned value for serde and the derive.
#[must_use]
pub fn default_executable() -> String {
    DEFAULT_EXECUTABLE.to_owned()
}

/// Default grace period in milliseconds.
#[must_use]
pub const fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

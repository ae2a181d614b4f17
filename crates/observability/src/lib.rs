//! Tracing/logging setup shared by every binary in the workspace.

use serde::Deserialize;

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Output format of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line (production).
    #[default]
    Json,
    /// Human-readable, for local development.
    Pretty,
}

/// Initialize process-wide observability (tracing/logging).
///
/// `default_level` is used when `RUST_LOG` is not set.
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init(default_level: &str, format: LogFormat) {
    tracing::init(default_level, format);
}

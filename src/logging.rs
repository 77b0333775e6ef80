//! Logging infrastructure - structured tracing for the marshalling layer
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Level filtering through `EnvFilter` (`RUST_LOG` wins over config)
//! - Zero cost when disabled
//! - Pretty, compact or JSON output
//! - Optional file output through a non-blocking appender
//!
//! Push paths log at `trace`, registrations and lifecycle at `debug`.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Compact
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    /// Log file path; console output when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Show span events (enter/exit)
    #[serde(default)]
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            file: None,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // STACKBIND_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level) = std::env::var("STACKBIND_LOG_LEVEL") {
            config.level = LogLevel::parse(&level).unwrap_or_default();
        }

        // STACKBIND_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("STACKBIND_LOG_FILE") {
            config.file = Some(PathBuf::from(path));
        }

        if std::env::var("STACKBIND_LOG_JSON").is_ok() {
            config.format = LogFormat::Json;
        }

        config.show_spans = std::env::var("STACKBIND_LOG_SPANS").is_ok();

        config
    }

    /// Verbose config for debugging marshalling problems
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Trace,
            format: LogFormat::Pretty,
            file: None,
            show_spans: true,
        }
    }
}

/// Initialize logging from the environment
///
/// Keep the returned guard alive while logging to a file; dropping it flushes.
pub fn init() -> Option<WorkerGuard> {
    init_with_config(&LogConfig::from_env())
}

/// Initialize logging with custom configuration (first call wins)
pub fn init_with_config(config: &LogConfig) -> Option<WorkerGuard> {
    let mut guard = None;
    LOGGER_INITIALIZED.get_or_init(|| {
        guard = install(config);
    });
    guard
}

fn install(config: &LogConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stackbind={}", config.level.as_str())));

    let span_events = if config.show_spans {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (writer, guard) = match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "stackbind.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(io::stdout), None),
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events)
        .with_target(true)
        .with_line_number(cfg!(debug_assertions));

    let layer = match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    // Another subscriber may already be installed (tests, host application)
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .is_err()
    {
        return None;
    }
    guard
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Marshalling events
// ============================================================================

/// Log a completed push
#[inline]
pub fn log_push(type_name: &str, slots: i32) {
    trace!(event = "push", ty = type_name, slots = slots, "Value pushed");
}

/// Log a null pointer or empty wrapper pushed as nil
#[inline]
pub fn log_null_collapse(type_name: &str) {
    trace!(event = "null_collapse", ty = type_name, "Null pushed as nil");
}

/// Log a userdata block allocation
#[inline]
pub fn log_handle_alloc(key: &str, pointee: &str, owned: bool) {
    trace!(
        event = "handle_alloc",
        key = key,
        pointee = pointee,
        owned = owned,
        "Userdata allocated"
    );
}

/// Log the first finalizer registration of an identifier
pub fn log_finalizer_registered(key: &str) {
    debug!(event = "finalizer_registered", key = key, "Finalizer registered");
}

/// Log a push that found its finalizer already registered
#[inline]
pub fn log_finalizer_reused(key: &str, reuses: usize) {
    trace!(
        event = "finalizer_reused",
        key = key,
        reuses = reuses,
        "Finalizer already registered"
    );
}

/// Log a `__gc` invocation
pub fn log_finalizer_run(key: &str, pointee: &str) {
    debug!(
        event = "finalizer_run",
        key = key,
        pointee = pointee,
        "Finalizer ran"
    );
}

/// Log a native call
#[inline]
pub fn log_call(nargs: usize, upvalues: usize) {
    trace!(
        event = "call",
        args = nargs,
        upvalues = upvalues,
        "Native function called"
    );
}

/// Log garbage collection results
pub fn log_gc_cycle(collected: usize, live: usize) {
    debug!(
        event = "gc_cycle",
        collected = collected,
        live = live,
        "Garbage collection complete"
    );
}

/// Log state creation
pub fn log_state_created(initial_capacity: usize, max_slots: usize) {
    debug!(
        event = "state_created",
        initial_capacity = initial_capacity,
        max_slots = max_slots,
        "Runtime state created"
    );
}

/// Log state shutdown
pub fn log_state_closed(finalized: usize) {
    debug!(
        event = "state_closed",
        finalized = finalized,
        "Runtime state closed"
    );
}

/// Log runtime error
pub fn log_runtime_error(error: &str) {
    error!(event = "runtime_error", error = error, "Runtime error occurred");
}

/// Log runtime warning
pub fn log_runtime_warning(warning: &str) {
    warn!(event = "runtime_warning", warning = warning, "Runtime warning");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.file.is_none());

        let debug_config = LogConfig::debug();
        assert_eq!(debug_config.level, LogLevel::Trace);
        assert_eq!(debug_config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogLevel::Debug.as_str(), "debug");
    }

    #[test]
    fn test_init_idempotent() {
        let _first = init_with_config(&LogConfig::default());
        let second = init_with_config(&LogConfig::debug());
        assert!(second.is_none());
        assert!(is_initialized());
    }
}

//! Logging bootstrap shared by the ecunet binaries
//!
//! Console output uses a compact `timestamp [LEVEL] message` layout; an optional
//! daily rolling log file receives the same events without ANSI colors.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::error::{Error, Result};

/// Bracketed tag and ANSI color of a level
fn level_style(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::ERROR => ("[ERROR]", "\x1b[31m"),
        Level::WARN => ("[WARN]", "\x1b[33m"),
        Level::INFO => ("[INFO]", "\x1b[32m"),
        Level::DEBUG => ("[DEBUG]", "\x1b[34m"),
        Level::TRACE => ("[TRACE]", "\x1b[35m"),
    }
}

/// `2025-12-02T00:50:44.809123Z [INFO] message`, optionally with the target
/// between level and message
struct LineFormat {
    with_target: bool,
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let (tag, color) = level_style(*metadata.level());
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");

        if writer.has_ansi_escapes() {
            write!(writer, "{} {}{}\x1b[0m ", stamp, color, tag)?;
        } else {
            write!(writer, "{} {} ", stamp, tag)?;
        }
        if self.with_target {
            write!(writer, "{}: ", metadata.target())?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// Keeps the non-blocking file writer alive for the life of the process
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Used as the log file prefix
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is not set (e.g. "info", "debug,ecunet_model=trace")
    pub level: String,
    /// Emit JSON lines on the console instead of the bracketed layout
    pub enable_json: bool,
    /// Disable ANSI colors on the console
    pub no_color: bool,
    /// Prefix messages with the module path that emitted them
    pub with_target: bool,
    /// Write a daily rolling log file into this directory
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "ecunet".to_string(),
            level: "info".to_string(),
            enable_json: false,
            no_color: false,
            with_target: false,
            log_dir: None,
        }
    }
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    match std::env::var("RUST_LOG") {
        Ok(env_str) if !env_str.is_empty() => EnvFilter::try_new(&env_str)
            .map_err(|e| Error::Logging(format!("Invalid RUST_LOG '{}': {}", env_str, e))),
        _ => EnvFilter::try_new(level)
            .map_err(|e| Error::Logging(format!("Invalid log level '{}': {}", level, e))),
    }
}

/// Install the global subscriber
///
/// Fails instead of panicking when a subscriber is already installed.
pub fn init_with_config(config: &LogConfig) -> Result<()> {
    let env_filter = build_filter(&config.level)?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.enable_json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .event_format(LineFormat {
                    with_target: config.with_target,
                })
                .with_ansi(!config.no_color)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let appender =
            tracing_appender::rolling::daily(log_dir, format!("{}.log", config.service_name));
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
        match guards.lock() {
            Ok(mut guards) => guards.push(guard),
            Err(poisoned) => poisoned.into_inner().push(guard),
        }
        layers.push(
            fmt::layer()
                .event_format(LineFormat { with_target: true })
                .with_ansi(false)
                .with_writer(non_blocking)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| Error::Logging(format!("Logging already initialized: {}", e)))
}

/// Console-only logging at `level`
pub fn init(level: &str) -> Result<()> {
    init_with_config(&LogConfig {
        level: level.to_string(),
        ..LogConfig::default()
    })
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_level_style() {
        assert_eq!(level_style(Level::INFO).0, "[INFO]");
        assert_eq!(level_style(Level::ERROR), ("[ERROR]", "\x1b[31m"));
    }

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let err = build_filter("ecunet=notalevel").unwrap_err();
        assert!(matches!(err, Error::Logging(_)));
    }

    #[test]
    fn test_second_init_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            log_dir: Some(dir.path().to_path_buf()),
            ..LogConfig::default()
        };
        // The first call may race other tests in this binary; the second never succeeds
        let _ = init_with_config(&config);
        assert!(init_with_config(&config).is_err());
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: LogConfig = serde_json::from_str(r#"{"level": "debug"}"#).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.service_name, "ecunet");
        assert!(config.log_dir.is_none());
    }
}

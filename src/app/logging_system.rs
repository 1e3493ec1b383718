// Process-wide tracing setup
use super::config::{LogFormat, LogLevel};
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Logging initialization failed: {details}")]
    LoggingInitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Minimum level per target, applied unless `RUST_LOG` is set.
const DEFAULT_DIRECTIVES: &[(&str, LogLevel)] = &[("rask_haproxy_ingest::parser", LogLevel::Warn)];

/// Filter string for `level`. Parser mismatch warnings stay visible at every level.
pub fn build_filter_string(level: LogLevel) -> String {
    let mut parts = Vec::with_capacity(DEFAULT_DIRECTIVES.len() + 1);
    parts.push(level.as_str().to_string());

    for (target, directive_level) in DEFAULT_DIRECTIVES {
        let effective = if (*directive_level as u8) > (level as u8) {
            *directive_level
        } else {
            level
        };
        parts.push(format!("{target}={}", effective.as_str()));
    }

    parts.join(",")
}

fn build_env_filter(level: LogLevel) -> Result<EnvFilter, InitializationError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let filter_string = build_filter_string(level);
    EnvFilter::try_new(&filter_string).map_err(|e| InitializationError::LoggingInitFailed {
        details: format!("Failed to create EnvFilter with '{filter_string}'"),
        source: Box::new(e),
    })
}

/// Install the global subscriber, writing to stderr. Only the first call
/// takes effect; later calls return the first call's outcome.
pub fn setup_logging(level: LogLevel, format: LogFormat) -> Result<(), InitializationError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let outcome = INIT.get_or_init(|| {
        let filter = build_env_filter(level).map_err(|e| e.to_string())?;

        let fmt_layer = match format {
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_current_span(false)
                .with_writer(std::io::stderr)
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter)
            .try_init()
            .map_err(|e| format!("Failed to set global tracing subscriber: {e}"))
    });

    outcome
        .clone()
        .map_err(|details| InitializationError::LoggingInitFailed {
            source: Box::new(std::io::Error::other(details.clone())),
            details,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_string() {
        assert_eq!(
            build_filter_string(LogLevel::Info),
            "info,rask_haproxy_ingest::parser=info"
        );
        assert_eq!(
            build_filter_string(LogLevel::Error),
            "error,rask_haproxy_ingest::parser=warn"
        );
        assert_eq!(
            build_filter_string(LogLevel::Trace),
            "trace,rask_haproxy_ingest::parser=trace"
        );
    }

    #[test]
    fn test_filter_strings_are_valid() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert!(EnvFilter::try_new(build_filter_string(level)).is_ok());
        }
    }

    #[test]
    fn test_setup_logging_is_idempotent() {
        let first = setup_logging(LogLevel::Info, LogFormat::Compact).is_ok();
        let second = setup_logging(LogLevel::Debug, LogFormat::Json).is_ok();

        assert_eq!(first, second);
    }
}

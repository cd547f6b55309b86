//! Logging initialisation for the engawa CLI.
//!
//! Installs a global `tracing` subscriber and bridges the `log` facade so
//! crates using either API emit structured events. Diagnostics go to stderr
//! so CLI payloads on stdout remain parseable.

use std::{env, str::FromStr, sync::OnceLock};

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

const LOG_FORMAT_ENV: &str = "ENGAWA_LOG_FORMAT";

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Output format of the installed subscriber.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum LogFormat {
    /// Human-readable single-line events.
    #[default]
    Human,
    /// Newline-delimited JSON events.
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnsupportedFormat {
                provided: other.to_owned(),
            }),
        }
    }
}

/// Errors raised while initialising structured logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// `ENGAWA_LOG_FORMAT` contained invalid UTF-8 data.
    #[error("environment variable `{LOG_FORMAT_ENV}` contained invalid UTF-8")]
    InvalidUnicode,
    /// Unsupported log format requested via `ENGAWA_LOG_FORMAT`.
    #[error("unsupported log format `{provided}`; expected `human` or `json`")]
    UnsupportedFormat {
        /// Raw value supplied by the user.
        provided: String,
    },
}

fn requested_format() -> Result<LogFormat, LoggingError> {
    match env::var(LOG_FORMAT_ENV) {
        Ok(raw) => raw.parse(),
        Err(env::VarError::NotPresent) => Ok(LogFormat::default()),
        Err(env::VarError::NotUnicode(_)) => Err(LoggingError::InvalidUnicode),
    }
}

/// Install global structured logging if it has not already been configured.
///
/// The format defaults to human-readable output and switches to JSON when
/// `ENGAWA_LOG_FORMAT=json`. The level is controlled via `RUST_LOG` and
/// defaults to `info`.
///
/// # Errors
/// Returns [`LoggingError`] when `ENGAWA_LOG_FORMAT` holds invalid Unicode or
/// an unsupported value. A subscriber installed elsewhere is tolerated.
pub fn init_logging() -> Result<(), LoggingError> {
    if INITIALISED.get().is_some() {
        return Ok(());
    }
    let format = requested_format()?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let fmt_layer = match format {
        LogFormat::Human => fmt_layer.boxed(),
        LogFormat::Json => fmt_layer.json().with_current_span(true).boxed(),
    };

    // The log bridge and the subscriber slot are both global; losing the race
    // to another installer keeps the existing configuration.
    let _ = LogTracer::init();
    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        eprintln!("structured logging already configured elsewhere: {err}");
    }

    let _ = INITIALISED.set(());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("human", LogFormat::Human)]
    #[case("HUMAN", LogFormat::Human)]
    #[case(" json ", LogFormat::Json)]
    fn known_formats_parse(#[case] raw: &str, #[case] expected: LogFormat) {
        let format: LogFormat = raw.parse().expect("format must parse");
        assert_eq!(format, expected);
    }

    #[test]
    fn unknown_formats_are_rejected() {
        let err = "xml".parse::<LogFormat>().expect_err("xml is not supported");
        match err {
            LoggingError::UnsupportedFormat { provided } => assert_eq!(provided, "xml"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging().expect("logging must initialise");
        init_logging().expect("subsequent calls must be no-ops");
    }
}

//! Tracing bootstrap for the portal engine. Reconciliation job ticks and the
//! HTTP surface both log through the subscriber installed here; output is
//! compact single-line with ANSI disabled so tick logs stay grep-able when
//! captured by a service manager.

use std::fmt;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

#[derive(Debug)]
pub enum TelemetryError {
    InvalidFilter { value: String, source: ParseError },
    Init(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidFilter { value, .. } => {
                write!(f, "invalid log level/filter '{value}'")
            }
            TelemetryError::Init(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidFilter { source, .. } => Some(source),
            TelemetryError::Init(err) => Some(&**err),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level,
/// so an operator can turn a single job's spans up without touching config.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Init)
}

/// Build a filter from the configured level. Accepts both a bare level
/// ("info") and full directive syntax ("info,tower=warn"), the same forms
/// `RUST_LOG` takes.
fn parse_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(level).map_err(|source| TelemetryError::InvalidFilter {
        value: level.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_levels_and_directive_lists_both_parse() {
        assert!(parse_filter("debug").is_ok());
        assert!(parse_filter("info,tower=warn,yojana_engine=trace").is_ok());
    }

    #[test]
    fn malformed_directives_report_the_offending_value() {
        let err = parse_filter("scheduler=info=extra").expect_err("directive must be rejected");
        match err {
            TelemetryError::InvalidFilter { value, .. } => {
                assert_eq!(value, "scheduler=info=extra");
            }
            other => panic!("expected invalid filter, got {other:?}"),
        }
    }
}

//! Structured telemetry for hosts embedding the dispatch core.
//!
//! The routers log one event per dispatched command. A bare global level
//! more verbose than `info` caps the router targets at `info` unless the
//! expression names them, so `debug` for the host does not flood its logs
//! with per-command events. `debug,courier::net=debug` opts back in.

use std::io::{self, IsTerminal};

use courier_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{LevelFilter, ParseError};
use tracing_subscriber::fmt;

use crate::local::LOCAL_TARGET;
use crate::net::NET_TARGET;
use crate::registry::REGISTRY_TARGET;
use crate::transport::TRANSPORT_TARGET;

const ROUTER_TARGETS: [&str; 4] = [LOCAL_TARGET, NET_TARGET, REGISTRY_TARGET, TRANSPORT_TARGET];

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned once telemetry is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors raised while installing telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression is invalid.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another global subscriber is already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Later calls return a handle without touching the global subscriber, so
/// hosts may call this from every entry point.
///
/// # Examples
///
/// ```rust
/// use courier::telemetry;
/// use courier_config::Config;
///
/// # fn main() -> Result<(), courier::telemetry::TelemetryError> {
/// let config = Config::default();
/// let _first = telemetry::initialise(&config)?;
/// let _second = telemetry::initialise(&config)?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter does not parse or another
/// subscriber was installed first.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn build_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    let invalid = |error: ParseError| TelemetryError::Filter(error.to_string());
    let mut filter = EnvFilter::try_new(expression).map_err(invalid)?;
    for cap in router_caps(expression) {
        filter = filter.add_directive(cap.parse().map_err(invalid)?);
    }
    Ok(filter)
}

/// `target=info` directives for router targets the expression leaves to a
/// global level more verbose than `info`.
fn router_caps(expression: &str) -> Vec<String> {
    let directives: Vec<&str> = expression
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .collect();

    let global = directives
        .iter()
        .filter(|directive| !directive.contains(['=', '[']))
        .filter_map(|directive| directive.parse::<LevelFilter>().ok())
        .max();
    if global.is_none_or(|level| level <= LevelFilter::INFO) {
        return Vec::new();
    }

    let named: Vec<&str> = directives
        .iter()
        .filter(|directive| directive.contains(['=', '[']))
        .map(|directive| directive.split(['=', '[']).next().unwrap_or_default().trim())
        .collect();

    ROUTER_TARGETS
        .iter()
        .filter(|target| {
            !named.iter().any(|name| {
                !name.is_empty()
                    && (**target == *name
                        || target
                            .strip_prefix(*name)
                            .is_some_and(|rest| rest.starts_with("::")))
            })
        })
        .map(|target| format!("{target}=info"))
        .collect()
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = build_filter(config.log_filter())?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

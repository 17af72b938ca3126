//! Tracing subscriber setup
//!
//! Libraries in this workspace only emit `tracing` events. Binaries and test
//! harnesses call [`init_tracing`] once to install a subscriber.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable single-line output
    #[default]
    Plain,
    /// One JSON object per event
    Json,
}

/// Install a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once: later calls leave the first subscriber in
/// place and return `false`.
pub fn init_tracing(format: LogFormat) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true);

    let installed = match format {
        LogFormat::Plain => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };

    if installed {
        tracing::debug!(?format, "Tracing subscriber installed");
    }
    installed
}

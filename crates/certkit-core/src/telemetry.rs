//! Tracing initialisation for certkit binaries.
//!
//! The library only emits events; installing a subscriber is left to the
//! binary, which calls [`init_tracing`] once at startup.
//!
//! Log lines go to stderr. Stdout carries rendered reports (JSON, Markdown,
//! HTML) that callers pipe into files or other tools, so it must stay free of
//! log output.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` is the default filter. With
/// `json` every event is a newline-delimited JSON object. Later calls are
/// no-ops.
pub fn init_tracing(json: bool, level: Level) {
    tracing_subscriber::registry()
        .with(stderr_layer(json))
        .with(filter(level))
        .try_init()
        .ok();
}

fn filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

fn stderr_layer(json: bool) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::DEBUG);
        tracing::info!(event = "telemetry.test");
    }

    #[test]
    fn test_filter_falls_back_to_level() {
        if std::env::var("RUST_LOG").is_err() {
            assert!(filter(Level::DEBUG).to_string().eq_ignore_ascii_case("debug"));
        }
    }
}

/*!
 * Tracing Setup
 * Structured logging for binaries and tests using the tracing crate
 *
 * The library itself only emits events; installing a subscriber is left to
 * the embedding program.
 */

use tracing::info;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Output format for [`init_tracing_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    /// Compact human-readable lines
    Pretty,
    /// One JSON object per event
    Json,
}

impl TraceFormat {
    /// `TASKMESH_TRACE_JSON=1|true` selects JSON
    pub fn from_env() -> Self {
        let json = std::env::var("TASKMESH_TRACE_JSON")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);
        if json {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Initialize tracing from the environment
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - TASKMESH_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    init_tracing_with(TraceFormat::from_env())
}

pub fn init_tracing_with(format: TraceFormat) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        TraceFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .is_ok(),
        TraceFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok(),
    };

    if installed {
        info!(?format, "Tracing initialized");
    }
    installed
}

//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; those records are forwarded
//! into the `tracing` subscriber installed here, so both appear in one stream
//! with the same filter.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use bracket_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    // Console layer for development
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a bracket change made through the API
///
/// # Arguments
///
/// * `event_type` - What happened, e.g. `bracket_generated`
/// * `tournament_id` - Tournament the change belongs to, if known
/// * `match_id` - Match the change belongs to, if any
/// * `request_id` - Correlation ID of the request that caused it
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use bracket_server::logging::log_bracket_event;
///
/// log_bracket_event(
///     "result_recorded",
///     None,
///     Some(12),
///     "3f2b0c4e-request",
///     "team 4 wins 3-1",
/// );
/// ```
pub fn log_bracket_event(
    event_type: &str,
    tournament_id: Option<i64>,
    match_id: Option<i64>,
    request_id: &str,
    message: &str,
) {
    tracing::info!(
        event_type = event_type,
        tournament_id = tournament_id,
        match_id = match_id,
        request_id = request_id,
        "BRACKET: {}",
        message
    );
}

/// Log a request that failed inside the engine
///
/// Storage faults are logged at `error` with the full cause, which is never
/// sent to the client; everything else is a client mistake and logged at `debug`.
pub fn log_engine_error(request_id: &str, status_code: u16, error: &dyn std::fmt::Display) {
    if status_code >= 500 {
        tracing::error!(
            request_id = request_id,
            http_status = status_code,
            "Engine failure: {}",
            error
        );
    } else {
        tracing::debug!(
            request_id = request_id,
            http_status = status_code,
            "Request rejected: {}",
            error
        );
    }
}

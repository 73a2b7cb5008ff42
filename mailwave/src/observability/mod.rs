//! Tracing initialization
//!
//! Every failure the platform absorbs (adapter errors, per-recipient send
//! failures, delivery-record write failures) is logged through `tracing`
//! with enough context for later auditing: campaign id, recipient email,
//! provider, error text. Logging is fire-and-forget; a failure to log never
//! aborts an operation.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber
///
/// Respects `RUST_LOG` (defaulting to `info`). Safe to call once at process
/// start; subsequent calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

//! Tracing initialization (EnvFilter + fmt subscriber).
//!
//! Log verbosity is controlled with the standard `RUST_LOG` environment
//! variable; the default filter keeps sqlx statement logging quiet.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber. Safe to call more than once;
/// subsequent calls are no-ops (relevant under test harnesses that install
/// their own subscriber).
pub fn init_telemetry() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

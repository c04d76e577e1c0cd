//! Tracing subscriber initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "crewdesk_backend=debug,tower_http=debug,sqlx::query=info";

/// Install the global subscriber: `RUST_LOG` filter plus a stdout fmt layer.
/// `json` switches the fmt layer to JSON lines.
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

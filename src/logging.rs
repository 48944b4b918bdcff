use crate::config::AppConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber from application config.
/// `RUST_LOG` overrides the configured level filter. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.log_json {
        let _ = fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global fmt subscriber.
/// Defaults to `info` when RUST_LOG is not set so [CAPTURE]/[AUTH] lines are visible.
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .try_init();
    });
}

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use xbind_config::Configurable;

pub const DEFAULT_LEVEL: &str = "info";

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_level`. Returns false when a subscriber was already installed.
pub fn init_tracing_with(default_level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_LEVEL)
}

/// Same as [`init_tracing`] with the default taken from `log.level`.
pub fn init_tracing_from_config(config: &toml::Value) -> bool {
    let level = config
        .get_config_value("log.level")
        .and_then(|value| value.as_str())
        .unwrap_or(DEFAULT_LEVEL);
    init_tracing_with(level)
}

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "PROTOC_GEN_DOC_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber. Logs go to stderr because stdout carries
/// the plugin response.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

use tracing::Level;

/// Installs the fmt subscriber used by the `roomcast` binary.
///
/// `level` comes from `--log-level`; names `tracing` does not know fall back
/// to `info`.
pub fn init(level: &str) {
    let max_level = level.trim().parse::<Level>().unwrap_or(Level::INFO);

    // Repeated calls keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .try_init();
}

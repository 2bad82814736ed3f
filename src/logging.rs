use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Installs the process-wide subscriber. Later calls are ignored.
pub(crate) fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

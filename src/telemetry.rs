use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

/// Installs the global subscriber writing to a daily rolling file under `log_dir`.
/// Keep the returned guard alive for the life of the process or buffered lines are lost.
pub fn init(log_dir: &str, file_name: &str) -> WorkerGuard {
    let file_appender = rolling::daily(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    guard
}

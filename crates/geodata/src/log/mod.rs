// Logging setup
//
// The engine itself only emits `tracing` events; this helper wires up the
// subscriber for host processes and integration harnesses that have no
// logging of their own. Console output always, plus a daily-rolling file
// when a directory is given.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the global tracing subscriber. `log_level` is the fallback
/// filter when RUST_LOG is not set.
pub fn initialize_logging(log_dir: Option<&str>, log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if let Some(dir) = log_dir {
        let path = Path::new(dir);
        if !path.exists() {
            let _ = std::fs::create_dir_all(path);
        }

        let file_appender = tracing_appender::rolling::daily(dir, "geodata.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // the writer guard must outlive the process
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .with(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .init();
    }
}

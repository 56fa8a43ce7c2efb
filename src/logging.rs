use crate::error::{ErrorContext, SyncError};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, Once};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

static LOGGER_INITIALIZED: Once = Once::new();

// Keep the guard alive for the lifetime of the program
static FILE_APPENDER_GUARD: LazyLock<Mutex<Option<WorkerGuard>>> =
    LazyLock::new(|| Mutex::new(None));

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Split a log file path into the directory and file name the appender wants
fn appender_location(log_file: &Path) -> Result<(PathBuf, String), SyncError> {
    let file_name = log_file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            SyncError::Config(format!("Invalid log file path: {}", log_file.display()))
        })?
        .to_string();

    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((dir, file_name))
}

/// Install the global subscriber: timestamped compact lines on stderr, plus an
/// optional plain-text copy in `log_file`. Level comes from `RUST_LOG`
/// (default `info`).
pub fn init_logging(log_file: Option<&Path>) -> Result<(), SyncError> {
    let file_writer = match log_file {
        Some(path) => {
            let (dir, file_name) = appender_location(path)?;
            std::fs::create_dir_all(&dir)
                .context(&format!("Failed to create log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::never(&dir, file_name);
            Some(tracing_appender::non_blocking(file_appender))
        }
        None => None,
    };

    LOGGER_INITIALIZED.call_once(|| {
        let console_layer = fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_timer(ChronoLocal::rfc_3339())
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_filter(env_filter());

        let file_layer = file_writer.map(|(non_blocking, guard)| {
            if let Ok(mut guard_mutex) = FILE_APPENDER_GUARD.lock() {
                *guard_mutex = Some(guard);
            }

            fmt::layer()
                .with_writer(non_blocking)
                .with_timer(ChronoLocal::rfc_3339())
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter())
        });

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .init();
    });

    Ok(())
}

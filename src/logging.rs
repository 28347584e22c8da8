use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "wdrive";
const LOG_FILE_SUFFIX: &str = "log";
const KEPT_LOG_FILES: usize = 5;

/// Daily-rotated `wdrive.<date>.log` files under `log_dir`, oldest pruned
/// past five.
pub fn file_appender(log_dir: &Path) -> io::Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(KEPT_LOG_FILES)
        .build(log_dir)
        .map_err(io::Error::other)
}

/// Installs console output plus the audit file under `log_dir`.
///
/// The returned guard flushes the file writer; keep it alive until shutdown.
pub fn init(log_dir: &Path) -> io::Result<WorkerGuard> {
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(log_dir)?);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!("Log directory: {}", log_dir.display());
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_appender_writes_under_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        let mut appender = file_appender(&log_dir).unwrap();
        appender.write_all(b"LOGIN_SUCCESS 10.0.0.7\n").unwrap();
        appender.flush().unwrap();

        let files: Vec<_> = std::fs::read_dir(&log_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("wdrive.") && files[0].ends_with(".log"), "{:?}", files);

        let content = std::fs::read_to_string(log_dir.join(&files[0])).unwrap();
        assert!(content.contains("LOGIN_SUCCESS"));
    }

    #[test]
    fn test_file_appender_rejects_unusable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        std::fs::write(&blocker, b"not a directory").unwrap();

        assert!(file_appender(&blocker).is_err());
    }
}

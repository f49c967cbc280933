//! Logging setup for cloudshelf.
//!
//! `RUST_LOG` takes precedence over the configured level. Without it the
//! configured level applies to cloudshelf and sqlx statement logging is
//! held at `warn`.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{Result, ShelfError};

/// Filter directives for a configured level name.
///
/// Unknown names fall back to `info`.
fn filter_directives(level: &str) -> String {
    let level = match level.trim().to_lowercase().as_str() {
        "warning" => Level::WARN,
        other => other.parse().unwrap_or(Level::INFO),
    };
    format!("{},sqlx=warn", level.as_str().to_lowercase())
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(level)))
}

/// Open the log file for appending, creating its directory if needed.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Log to stdout and append to `config.file`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let file = Arc::new(open_log_file(Path::new(&config.file))?);

    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(file))
                .with_ansi(false),
        )
        .try_init()
        .map_err(|e| ShelfError::Config(format!("logging: {e}")))
}

/// Log to stdout only. Used when the log file cannot be opened.
pub fn init_console_only(level: &str) {
    // A subscriber may already be installed; keep it.
    let _ = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_filter_directives() {
        assert_eq!(filter_directives("debug"), "debug,sqlx=warn");
        assert_eq!(filter_directives(" ERROR "), "error,sqlx=warn");
        assert_eq!(filter_directives("warning"), "warn,sqlx=warn");
        assert_eq!(filter_directives("verbose"), "info,sqlx=warn");
        assert_eq!(filter_directives(""), "info,sqlx=warn");
    }

    #[test]
    fn test_open_log_file_creates_dir_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/nested/cloudshelf.log");

        open_log_file(&path).unwrap().write_all(b"one\n").unwrap();
        open_log_file(&path).unwrap().write_all(b"two\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }
}

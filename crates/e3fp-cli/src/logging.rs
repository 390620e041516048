use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Installs the global subscriber: a compact stderr layer filtered by
/// verbosity, plus an optional verbose file layer.
///
/// `--quiet` keeps errors visible; per-file batch failures must still reach
/// the console.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let level_filter = if quiet {
        LevelFilter::ERROR
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer);

    match log_file {
        Some(path) => {
            let file = File::create(&path).map_err(CliError::Io)?;
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_target(true);
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, error, info, warn};

    static INIT: Once = Once::new();

    fn install_global_logger() {
        INIT.call_once(|| {
            setup_logging(3, false, None).expect("global logger installation failed");
        });
    }

    #[test]
    #[serial]
    fn macros_emit_through_the_installed_subscriber() {
        install_global_logger();
        error!("error line");
        warn!("warn line");
        info!("info line");
        debug!("debug line");
    }

    #[test]
    #[serial]
    fn file_layer_captures_messages_with_thread_ids() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("run.log");

        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            info!("message bound for the log file");
        });

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("message bound for the log file"));
        assert!(content.contains("INFO"));
        assert!(content.contains("ThreadId"));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_is_reported() {
        let unwritable = PathBuf::from("/");
        if cfg!(unix) && unwritable.is_dir() {
            let result = setup_logging(0, false, Some(unwritable));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}

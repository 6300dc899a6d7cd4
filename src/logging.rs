use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialise logging. Debug logging enables the `debug` level and lets
/// `RUST_LOG` override it; otherwise the level is forced to `info`.
///
/// When `file` is given, output goes to that file instead of stdout.
pub fn init(debug: bool, file: Option<PathBuf>) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match file {
        Some(path) => {
            let dir = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "keyed_messages.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            builder.with_ansi(false).with_writer(appender).try_init()
        }
        None => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("global subscriber already set; keeping the existing one");
    }
}

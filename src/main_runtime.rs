use fixture_analyst::config::LoggingConfig;
use std::path::Path;
use tokio::signal;
use tracing::error;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "fixture-analyst.log";

/// Full logging for long-running commands (evaluate, schedule, serve)
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},fixture_analyst=debug,sqlx=warn", config.level))
    });

    let log_dir = std::env::var("ANALYST_LOG_DIR").ok();
    let file_layer = log_dir.as_deref().and_then(file_writer).map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
    });
    let file_logging = file_layer.is_some();

    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_target(true));
    let plain_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging, log_dir) {
        eprintln!("Logging to: {}/{}", dir, LOG_FILE);
    }
}

/// Daily-rotating writer under `dir`, or `None` when the directory is unusable.
///
/// `rolling::daily` panics when it cannot create its first file, so a
/// scratch file is written to the directory first.
fn file_writer(dir: &str) -> Option<NonBlocking> {
    let scratch = Path::new(dir).join(".analyst_write_test");
    let usable = std::fs::create_dir_all(dir).and_then(|_| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&scratch)
            .map(drop)
    });
    if let Err(e) = usable {
        eprintln!(
            "Warning: log directory {} is not writable ({}), file logging disabled",
            dir, e
        );
        return None;
    }
    let _ = std::fs::remove_file(&scratch);

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Flushes on drop; must outlive every span
    std::mem::forget(guard);
    Some(writer)
}

/// WARN-level console logging for one-shot commands
pub fn init_logging_simple() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

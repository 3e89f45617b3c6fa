use thiserror::Error;

/// Main error type for the fixture analyst
#[derive(Error, Debug)]
pub enum AnalystError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Evaluation store connection is closed")]
    StoreClosed,

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    UpstreamStatus {
        service: String,
        status: u16,
        body: String,
    },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Model / capability errors
    #[error("Model error: {0}")]
    Model(String),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AnalystError {
    /// Whether this failure came from store connectivity or a server-side timeout,
    /// i.e. the operation may succeed on a fresh connection.
    pub fn is_transient(&self) -> bool {
        match self {
            AnalystError::StoreClosed => true,
            AnalystError::Database(err) => is_transient_sqlx(err),
            _ => false,
        }
    }
}

fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| is_transient_sqlstate(&code))
            .unwrap_or(false),
        _ => false,
    }
}

/// SQLSTATE class 08 (connection exception), statement timeout and
/// server shutdown codes.
fn is_transient_sqlstate(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57014" | "57P01" | "57P02" | "57P03")
}

/// Result type alias for AnalystError
pub type Result<T> = std::result::Result<T, AnalystError>;

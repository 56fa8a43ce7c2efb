use thiserror::Error;

/// Errors raised while configuring or running the file sync
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration errors (missing or malformed settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (path shape, file presence, etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an unexpected status
    #[error("Store returned status {status}: {body}")]
    Store { status: u16, body: String },

    /// Config file parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parse errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T, SyncError>;
}

impl<T, E: Into<SyncError>> ErrorContext<T> for Result<T, E> {
    fn context(self, msg: &str) -> Result<T, SyncError> {
        self.map_err(|e| match e.into() {
            SyncError::Config(s) => SyncError::Config(format!("{}: {}", msg, s)),
            SyncError::Validation(s) => SyncError::Validation(format!("{}: {}", msg, s)),
            SyncError::Io(e) => SyncError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", msg, e),
            )),
            other => other,
        })
    }
}

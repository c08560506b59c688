use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
    #[error("settings error: {0}")]
    Settings(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Failures reported by the native window layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// A window with this label still exists, usually because the previous
    /// instance's destroy has not been acknowledged yet.
    #[error("window `{0}` already exists")]
    AlreadyExists(String),
    #[error("failed to create window `{label}`: {message}")]
    Create { label: String, message: String },
    #[error("failed to close window `{label}`: {message}")]
    Close { label: String, message: String },
    #[error("failed to move window `{label}`: {message}")]
    Position { label: String, message: String },
    #[error("failed to resize window `{label}`: {message}")]
    Size { label: String, message: String },
    #[error("failed to query window `{label}`: {message}")]
    Query { label: String, message: String },
    #[error("monitor work area unavailable: {0}")]
    MonitorUnavailable(String),
}

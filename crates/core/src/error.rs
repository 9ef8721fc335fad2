/// Result alias that carries the custom [`CintError`] type.
pub type Result<T> = std::result::Result<T, CintError>;

/// Common error type for the core crate.
///
/// Only reading a score and writing output can fail. Interval and module
/// problems never surface here; they degrade to placeholder tokens.
#[derive(Debug, thiserror::Error)]
pub enum CintError {
    /// Free-form error raised by the application layer.
    #[error("{0}")]
    Message(String),
    /// A score line that does not fit the active spine layout.
    #[error("line {line}: {message}")]
    Structure { line: usize, message: String },
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration file that could not be decoded.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl CintError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a structural error for the zero-based score line `line`.
    pub fn structure<T: Into<String>>(line: usize, message: T) -> Self {
        Self::Structure {
            line: line + 1,
            message: message.into(),
        }
    }
}

impl From<&str> for CintError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for CintError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

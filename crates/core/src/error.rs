/// Result alias that carries the custom [`PinwheelError`] type.
pub type Result<T> = std::result::Result<T, PinwheelError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum PinwheelError {
    /// Free-form failure that does not fit the other variants.
    #[error("{0}")]
    Message(String),
    /// The microphone input stream could not be opened. Fatal for the
    /// level sensor.
    #[error("audio input unavailable: {0}")]
    AudioInput(String),
    /// A bundled model or audio clip failed to load during setup.
    #[error("failed to load resource `{name}`: {reason}")]
    Resource { name: String, reason: String },
    /// Configuration values that cannot drive the loop.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Malformed configuration or script JSON.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl PinwheelError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn resource(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resource {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<&str> for PinwheelError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PinwheelError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// An entity is missing fields the protocol requires.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Whether the error happened before any bytes were built.
    pub fn is_rejected_input(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Configuration(_))
    }
}

use thiserror::Error;

/// Coarse failure category, stable enough for a request boundary to map
/// onto response codes without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Query,
    Persistence,
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input, rejected before any work is done.
    #[error("validation error: {0}")]
    Validation(String),

    /// A read against the event source failed, or the window was malformed.
    #[error("query error: {0:#}")]
    Query(anyhow::Error),

    /// The aggregate store rejected a write or could not be reached.
    #[error("persistence error: {0:#}")]
    Persistence(anyhow::Error),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Query(_) => ErrorKind::Query,
            CoreError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

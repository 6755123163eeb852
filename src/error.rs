use thiserror::Error;

use crate::models::{ErrorInfo, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinderError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("location error: {0}")]
    Location(String),
    /// Well-formed response without an embedded events collection.
    #[error("not found: {0}")]
    NotFound(String),
}

impl FinderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FinderError::Network(_) => ErrorKind::NetworkError,
            FinderError::Api(_) => ErrorKind::ApiError,
            FinderError::Location(_) => ErrorKind::LocationError,
            FinderError::NotFound(_) => ErrorKind::NotFoundError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FinderError::Network(msg)
            | FinderError::Api(msg)
            | FinderError::Location(msg)
            | FinderError::NotFound(msg) => msg,
        }
    }
}

impl From<&FinderError> for ErrorInfo {
    fn from(err: &FinderError) -> Self {
        ErrorInfo {
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_info_keeps_kind_and_bare_message() {
        let err = FinderError::NotFound("No events found near Boise.".to_string());
        let info = ErrorInfo::from(&err);
        assert_eq!(info.kind, ErrorKind::NotFoundError);
        assert_eq!(info.message, "No events found near Boise.");
        assert_eq!(err.to_string(), "not found: No events found near Boise.");
    }
}

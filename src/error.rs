use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        AppError::WebSocket(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_from_rusqlite() {
        let err: AppError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[test]
    fn test_error_display() {
        let err = AppError::Http {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }
}

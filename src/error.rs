use poem::error::ResponseError;
use poem::http::StatusCode;
use poem::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("a file named {0} already exists")]
    AlreadyExists(String),

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("file type not allowed: {0}")]
    ExtensionNotAllowed(String),

    #[error("file exceeds the {limit} byte upload limit")]
    TooLarge { limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// The client gets the message for everything except Io, whose details stay in the log.
impl ResponseError for StorageError {
    fn status(&self) -> StatusCode {
        match self {
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::AlreadyExists(_) => StatusCode::CONFLICT,
            StorageError::InvalidName(_) => StatusCode::BAD_REQUEST,
            StorageError::ExtensionNotAllowed(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StorageError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn as_response(&self) -> Response
    where
        Self: std::error::Error + Send + Sync + 'static,
    {
        let body = match self {
            StorageError::Io(err) => {
                tracing::error!("filesystem error: {}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        body.with_status(self.status()).into_response()
    }
}

impl StorageError {
    /// Reason string reported back for a file the upload handler skipped.
    pub fn client_message(&self) -> String {
        match self {
            StorageError::Io(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

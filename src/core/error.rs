//! Errors surfaced by round selection and catalog maintenance

use thiserror::Error;

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, ShuffleError>;

#[derive(Error, Debug)]
pub enum ShuffleError {
    /// Ordinary requester tried to advance a frozen round
    #[error("Shuffle is locked by the host")]
    Locked,

    /// Requester lacks the privileged role
    #[error("Only the host can do that")]
    Forbidden,

    /// Duplicate song name or short code
    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Bad input from the caller
    #[error("{0}")]
    Validation(String),

    /// Media host rejected or failed an upload/release
    #[error("Media host error: {0}")]
    Media(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ShuffleError {
    /// HTTP status this error should be reported with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Locked | Self::Forbidden => 403,
            Self::Conflict(_) => 409,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Media(_) => 502,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Whether the failure is on our side rather than the caller's
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

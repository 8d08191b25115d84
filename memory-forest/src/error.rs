//! Error taxonomy for the memory lifecycle.

use axum::http::StatusCode;

pub type ForestResult<T> = Result<T, ForestError>;

#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Missing or malformed form input. Raised before any network call.
    #[error("{0}")]
    Validation(String),

    /// Sign-in / sign-up / session failures, message as given by the auth service.
    #[error("{0}")]
    Auth(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("{0}")]
    Upload(String),

    #[error("{0}")]
    Insert(String),

    /// Feed or count fetch failed.
    #[error("{0}")]
    Read(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ForestError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForestError::Validation(_) => StatusCode::BAD_REQUEST,
            ForestError::Auth(_) | ForestError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ForestError::Upload(_) | ForestError::Insert(_) | ForestError::Read(_) => {
                StatusCode::BAD_GATEWAY
            }
            ForestError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ForestError::Validation(_))
    }
}

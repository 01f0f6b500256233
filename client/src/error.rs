use std::time::Duration;

use payloads::{StoreError, requests::ValidationError};

/// Errors surfaced by queries and mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// No signed-in user for an operation that needs one. Raised before any
    /// write is attempted.
    #[error("You need to sign in to do that.")]
    AuthRequired,
    /// Caller-supplied data failed a local precondition. Raised before any
    /// remote call.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("The request timed out after {}ms.", .0.as_millis())]
    Timeout(Duration),
}

impl ClientError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Store(StoreError::Permission(_)) => {
                "You don't have permission to do that.".to_string()
            }
            ClientError::Store(StoreError::Conflict(_)) => {
                "That already exists.".to_string()
            }
            ClientError::Store(StoreError::NotFound(_)) => {
                "That item no longer exists.".to_string()
            }
            ClientError::Store(StoreError::Decode(_) | StoreError::Encode(_)) => {
                "Something went wrong talking to the server.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether the error came from a local check rather than the store.
    pub fn is_local(&self) -> bool {
        matches!(self, ClientError::AuthRequired | ClientError::Validation(_))
    }
}

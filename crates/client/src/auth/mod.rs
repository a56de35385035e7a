//! Authentication: token inspection, the refresh timer and the token manager.

mod manager;
mod timer;
pub mod token;

pub use manager::TokenManager;
pub use token::{TokenError, access_token_expiry};

use thiserror::Error;

use crate::error::ApiError;
use crate::storage::StorageError;

/// Errors from the calls that mint a new session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend rejected the request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session could not be persisted.
    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),

    /// The backend issued an access token without a readable expiry. The
    /// session has been torn down.
    #[error("Invalid access token: {0}")]
    InvalidToken(#[from] TokenError),
}

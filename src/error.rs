//! Unified error handling for relayd.
//!
//! Service faults map 1:1 onto the wire-visible error descriptions; the
//! dispatcher turns each variant into an error reply that preserves the
//! request's service tag and carries a freshly ticked clock.

use crate::state::store::StoreError;
use thiserror::Error;

/// Errors that can occur while handling one service request.
///
/// None of these are fatal: every variant becomes exactly one error reply
/// and the request-reply loop continues.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("missing username")]
    MissingUser,

    #[error("user already exists")]
    DuplicateUser,

    #[error("missing channel name")]
    MissingChannel,

    #[error("channel already exists")]
    DuplicateChannel,

    #[error("channel does not exist")]
    NoSuchChannel,

    #[error("user does not exist")]
    NoSuchUser,

    #[error("unrecognized service")]
    UnrecognizedService,

    #[error("malformed request: {0}")]
    Malformed(String),

    /// Persistence failed after the in-memory mutation; state is not
    /// rolled back (documented limitation).
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Result type for service handlers.
pub type ServiceResult<T> = Result<T, ServiceError>;

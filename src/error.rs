//! Error taxonomy of remote operations and the battle.

use thiserror::Error;

use crate::common::BoardError;

/// Failure of a remote operation or of a battle.
///
/// Domain failures travel inside responses as their wire string (see
/// [`ServiceError::wire`]) and are rebuilt on the caller side with
/// [`ServiceError::from_wire`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("bad request")]
    BadRequest,
    #[error("internal error")]
    Internal,
    #[error("timeout")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
    #[error("wrong password")]
    WrongPassword,
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error("game not found")]
    GameNotFound,
    #[error("no opponent")]
    NoOpponent,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("transport: {0}")]
    Transport(String),
    /// Error string from the peer that matches no known kind.
    #[error("{0}")]
    Remote(String),
}

impl ServiceError {
    /// The string placed in a response's `error` field.
    pub fn wire(&self) -> String {
        self.to_string()
    }

    /// Rebuild an error from a response's `error` field.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "bad request" => ServiceError::BadRequest,
            "internal error" => ServiceError::Internal,
            "timeout" => ServiceError::Timeout,
            "wrong password" => ServiceError::WrongPassword,
            "user already exists" => ServiceError::UserExists,
            "user not found" => ServiceError::UserNotFound,
            "game not found" => ServiceError::GameNotFound,
            "no opponent" => ServiceError::NoOpponent,
            other => ServiceError::Remote(other.to_string()),
        }
    }

    /// Errors the caller may show as-is; everything else is reported to
    /// them as `Internal`.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            ServiceError::BadRequest
                | ServiceError::WrongPassword
                | ServiceError::UserExists
                | ServiceError::UserNotFound
                | ServiceError::GameNotFound
                | ServiceError::NoOpponent
        )
    }
}

impl From<crate::broker::TransportError> for ServiceError {
    fn from(err: crate::broker::TransportError) -> Self {
        use crate::broker::TransportError;
        match err {
            TransportError::Codec(msg) => {
                log::error!("malformed message on the wire: {}", msg);
                ServiceError::Internal
            }
            other => ServiceError::Transport(other.to_string()),
        }
    }
}

impl From<crate::stats::StoreError> for ServiceError {
    fn from(err: crate::stats::StoreError) -> Self {
        use crate::stats::StoreError;
        match err {
            StoreError::UserNotFound => ServiceError::UserNotFound,
            StoreError::UserExists => ServiceError::UserExists,
            StoreError::Backend(_) => ServiceError::Internal,
        }
    }
}

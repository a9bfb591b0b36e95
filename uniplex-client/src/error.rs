//! Error types for the session engine.

use thiserror::Error;
use uniplex_proto::ReasonCode;

/// Top-level error type for all client operations.
///
/// Router-internal failures (bad attribute reads, lost correlations) are
/// never surfaced through this type; they are logged and dropped so the
/// transport's delivery thread keeps running. Application-facing operations
/// fail by resolving with one of these variants instead.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A command was issued before a universe connection existed.
    #[error("not connected to a universe")]
    NotConnected,

    /// A command that requires an active world was issued outside one.
    #[error("not in a world")]
    NotInWorld,

    /// No response arrived within the configured deadline.
    #[error("request timed out")]
    Timeout,

    /// The configured username and password are not a valid login.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A payload exceeds the transport limit for its slot.
    #[error("string too long: {what}")]
    StringTooLong {
        /// Which payload exceeded the limit.
        what: &'static str,
    },

    /// A referenced object, world, or user does not exist.
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// The underlying connection failed.
    #[error("transport error: {0}")]
    TransportError(String),

    /// A same-kind request was already in flight.
    #[error("duplicate in-flight request: {0}")]
    DuplicateRequest(&'static str),

    /// The configuration is missing a value the operation needs.
    #[error("incomplete configuration: {0}")]
    IncompleteConfig(String),

    /// No tokio runtime was available to drive the engine.
    #[error("runtime unavailable: {0}")]
    Runtime(String),

    /// The transport returned a code the operation did not expect.
    #[error("protocol error: {0}")]
    Protocol(ReasonCode),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Map an immediate command outcome: success becomes `Ok(())`, anything
/// else the corresponding error.
pub(crate) fn from_reason(reason: ReasonCode) -> Result<()> {
    if reason.is_success() {
        Ok(())
    } else {
        Err(ClientError::from_reason(reason))
    }
}

impl ClientError {
    /// Generic reason-code mapping for operations without a more specific
    /// translation of their own.
    pub(crate) fn from_reason(reason: ReasonCode) -> Self {
        match reason {
            ReasonCode::NotInUniverse => Self::NotConnected,
            ReasonCode::NotInWorld => Self::NotInWorld,
            ReasonCode::Timeout => Self::Timeout,
            ReasonCode::InvalidLogin => Self::InvalidCredentials,
            ReasonCode::StringTooLong => Self::StringTooLong { what: "payload" },
            ReasonCode::ConnectionError => {
                Self::TransportError("the connection was lost".into())
            }
            other => Self::Protocol(other),
        }
    }
}

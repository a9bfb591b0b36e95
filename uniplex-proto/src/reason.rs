//! Transport-level outcome codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome code returned by transport commands and delivered with callbacks.
///
/// Codes the engine does not recognize are preserved as [`Unknown`] rather
/// than dropped, so they can still be logged and surfaced.
///
/// [`Unknown`]: ReasonCode::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    /// The command or request completed successfully.
    Success,
    /// Client and server protocol versions do not match.
    VersionMismatch,
    /// A string payload exceeds the transport limit for its slot.
    StringTooLong,
    /// The underlying connection failed.
    ConnectionError,
    /// The command requires a universe connection that does not exist.
    NotInUniverse,
    /// The command requires an active world.
    NotInWorld,
    /// The named world does not exist on this universe.
    WorldNotFound,
    /// Connecting to the world server failed after the universe handed it off.
    WorldLoginError,
    /// The request did not complete within the transport deadline.
    Timeout,
    /// The supplied credentials are not a valid login.
    InvalidLogin,
    /// The referenced user does not exist.
    NoSuchUser,
    /// The invited user declined the invitation.
    InviteDeclined,
    /// The joined user declined the join request.
    JoinDeclined,
    /// The universe server reported a persistent-storage failure.
    DatabaseError,
    /// The referenced object does not exist.
    ObjectNotFound,
    /// A code the engine does not recognize; the raw value is preserved.
    Unknown(i32),
}

impl ReasonCode {
    /// Decode a raw wire code.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Success,
            1 => Self::VersionMismatch,
            2 => Self::StringTooLong,
            3 => Self::ConnectionError,
            4 => Self::NotInUniverse,
            5 => Self::NotInWorld,
            6 => Self::WorldNotFound,
            7 => Self::WorldLoginError,
            8 => Self::Timeout,
            9 => Self::InvalidLogin,
            10 => Self::NoSuchUser,
            11 => Self::InviteDeclined,
            12 => Self::JoinDeclined,
            13 => Self::DatabaseError,
            14 => Self::ObjectNotFound,
            other => Self::Unknown(other),
        }
    }

    /// Encode back to the raw wire code.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::VersionMismatch => 1,
            Self::StringTooLong => 2,
            Self::ConnectionError => 3,
            Self::NotInUniverse => 4,
            Self::NotInWorld => 5,
            Self::WorldNotFound => 6,
            Self::WorldLoginError => 7,
            Self::Timeout => 8,
            Self::InvalidLogin => 9,
            Self::NoSuchUser => 10,
            Self::InviteDeclined => 11,
            Self::JoinDeclined => 12,
            Self::DatabaseError => 13,
            Self::ObjectNotFound => 14,
            Self::Unknown(other) => other,
        }
    }

    /// Whether this code denotes success.
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) => write!(f, "Unknown({raw})"),
            other => write!(f, "{other:?}"),
        }
    }
}

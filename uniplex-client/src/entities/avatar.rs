//! Avatars: online instances of users within a world.

use crate::types::{Application, Location, SessionId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An online instance of a user (or bot) within a world.
///
/// Identified by a session id that is only valid for this world visit. A
/// bot is recognized structurally: its name is framed in `[` and `]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    /// Per-world-visit session id.
    pub session: SessionId,
    /// Display name.
    pub name: String,
    /// Where the avatar currently is.
    pub location: Location,
    /// The application the avatar reports itself as running.
    pub application: Application,
    /// Numeric type/posture code.
    pub avatar_type: i32,
    /// Account id of the owning user, when known.
    pub user_id: Option<UserId>,
}

impl Avatar {
    /// Whether this avatar is a bot, judged by name framing.
    #[must_use]
    pub fn is_bot(&self) -> bool {
        let name = self.name.as_bytes();
        name.len() > 1 && name[0] == b'[' && name[name.len() - 1] == b']'
    }
}

impl fmt::Display for Avatar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Avatar [Session={}, Name={}]", self.session, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar(name: &str) -> Avatar {
        Avatar {
            session: 1,
            name: name.to_string(),
            location: Location::nowhere(),
            application: Application::default(),
            avatar_type: 0,
            user_id: None,
        }
    }

    #[test]
    fn framed_names_are_bots() {
        assert!(avatar("[Greeter]").is_bot());
        assert!(!avatar("Greeter").is_bot());
        assert!(!avatar("[Greeter").is_bot());
        assert!(!avatar("Greeter]").is_bot());
    }

    #[test]
    fn a_lone_bracket_is_not_a_bot() {
        assert!(!avatar("[").is_bot());
        assert!(!avatar("]").is_bot());
    }
}

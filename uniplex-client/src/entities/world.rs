//! Worlds: named virtual-space instances.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Availability state of a listed world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorldState {
    /// State not reported by the universe.
    #[default]
    Unknown,
    /// The world server is running.
    Online,
    /// The world server is stopped.
    Stopped,
}

impl WorldState {
    /// Decode the raw wire state code.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Online,
            2 => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

/// A named world instance.
///
/// Distinct from the session's *current* world: the cache may hold worlds
/// only ever seen in a directory listing, never joined.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct World {
    /// World name, which is also the cache key.
    pub name: String,
    /// Side length, known only after entering.
    pub size: Option<i32>,
    /// Availability state.
    pub state: WorldState,
    /// Number of avatars currently inside, per the last listing.
    pub avatar_count: i32,
    /// Raw key/value settings, populated on entry.
    pub settings: BTreeMap<String, String>,
}

impl World {
    /// A world known only by name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "World [Name={}]", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_decoding() {
        assert_eq!(WorldState::from_raw(1), WorldState::Online);
        assert_eq!(WorldState::from_raw(2), WorldState::Stopped);
        assert_eq!(WorldState::from_raw(0), WorldState::Unknown);
        assert_eq!(WorldState::from_raw(99), WorldState::Unknown);
    }
}

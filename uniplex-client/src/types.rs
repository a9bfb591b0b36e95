//! Core value types shared across the session engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transient per-world-visit identifier for an avatar. Not a stable account
/// id: the same user gets a fresh session on every world entry.
pub type SessionId = i32;

/// Stable account id of a user, scoped to the universe.
pub type UserId = i32;

/// Id of an object, unique within a world for the lifetime of the object.
pub type ObjectId = i32;

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 3D position inside a world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Vector3 {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Construct from components.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// An orientation expressed as yaw/pitch, matching the transport's native
/// angle representation so values round-trip without loss.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    /// Yaw in degrees.
    pub yaw: f64,
    /// Pitch in degrees.
    pub pitch: f64,
}

impl Rotation {
    /// Facing straight ahead.
    pub const ZERO: Self = Self { yaw: 0.0, pitch: 0.0 };

    /// Construct from yaw and pitch.
    #[must_use]
    pub fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }
}

/// Integer-floor spatial bucket of a position, used to group object queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Floored X coordinate.
    pub x: i32,
    /// Floored Z coordinate.
    pub z: i32,
}

impl Cell {
    /// The cell containing the given position.
    #[must_use]
    pub fn containing(position: Vector3) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            x: position.x.floor() as i32,
            z: position.z.floor() as i32,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// An immutable place: a world (by name), a position, and a rotation.
///
/// The "nowhere" sentinel (no world) describes an avatar that is logged in
/// but not currently in any world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Name of the world, or `None` for nowhere.
    pub world: Option<String>,
    /// Position within the world.
    pub position: Vector3,
    /// Orientation within the world.
    pub rotation: Rotation,
}

impl Location {
    /// A location inside the named world.
    #[must_use]
    pub fn new(world: impl Into<String>, position: Vector3, rotation: Rotation) -> Self {
        Self {
            world: Some(world.into()),
            position,
            rotation,
        }
    }

    /// The location that corresponds to no world at all.
    #[must_use]
    pub fn nowhere() -> Self {
        Self::default()
    }

    /// Whether this is the nowhere sentinel.
    #[must_use]
    pub fn is_nowhere(&self) -> bool {
        self.world.is_none()
    }

    /// The cell this location falls into.
    #[must_use]
    pub fn cell(&self) -> Cell {
        Cell::containing(self.position)
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// The application an avatar reports itself as running.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Application {
    /// Application name.
    #[serde(default)]
    pub name: String,
    /// Application version.
    #[serde(default)]
    pub version: String,
}

/// An RGB color for console messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl Color {
    /// Black, the console default.
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
}

/// Font-effect flags for console messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextEffects(pub i32);

impl TextEffects {
    /// No styling.
    pub const NONE: Self = Self(0);
    /// Bold text.
    pub const BOLD: Self = Self(1);
    /// Italic text.
    pub const ITALIC: Self = Self(2);

    /// Combine two effect sets.
    #[must_use]
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

/// Where the session currently stands in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No universe connection.
    #[default]
    Disconnected,
    /// A universe connection attempt is in flight.
    Connecting,
    /// Connected (and possibly logged in) to a universe, not in a world.
    ConnectedToUniverse,
    /// A world entry is in flight.
    EnteringWorld,
    /// Inside a world.
    InWorld,
    /// A world exit is in flight.
    Leaving,
}

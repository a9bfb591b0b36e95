//! Objects placed in a world.

use crate::types::{Cell, ObjectId, Rotation, UserId, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A placed object: model, position, and behavior fields.
///
/// The id is stable for the lifetime of the object within its world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// World-unique object id.
    pub id: ObjectId,
    /// Account id of the owner, when known.
    pub owner: Option<UserId>,
    /// Position within the world.
    pub position: Vector3,
    /// Orientation within the world.
    pub rotation: Rotation,
    /// Model identifier.
    pub model: String,
    /// Description text.
    pub description: String,
    /// Action script.
    pub action: String,
}

impl Object {
    /// The spatial bucket this object falls into.
    #[must_use]
    pub fn cell(&self) -> Cell {
        Cell::containing(self.position)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object [Id={}, Model={}]", self.id, self.model)
    }
}

//! Typed entities the engine maintains a cached view of.
//!
//! Identity is always `(namespace, id)`: avatars by session id, objects by
//! object id, users by account id, worlds by name. Everything handed out by
//! the public API is a snapshot; the cache merges updates in place behind
//! the scenes.

mod avatar;
mod object;
mod user;
mod world;

pub use avatar::Avatar;
pub use object::Object;
pub use user::User;
pub use world::{World, WorldState};

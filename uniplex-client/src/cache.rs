//! The concurrent entity cache.
//!
//! One map per namespace, each keyed by that namespace's id. All writes are
//! insert-or-merge ("upsert") or remove-by-key; there is never iteration
//! while mutating from more than one path. Public accessors return
//! snapshots, so readers can never race a router-side merge.

use crate::entities::{Avatar, Object, User, World};
use crate::types::{ObjectId, SessionId, UserId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Result of an avatar upsert: the merged entry plus the value it replaced.
///
/// The previous snapshot is what delta gating compares against: it is
/// captured atomically with the overwrite, so a concurrent change callback
/// can never observe a half-merged entry.
#[derive(Debug, Clone)]
pub(crate) struct AvatarUpsert {
    /// The entry as stored after the merge.
    pub current: Avatar,
    /// The entry as stored before the merge, if it existed.
    pub previous: Option<Avatar>,
}

#[derive(Debug, Default)]
pub(crate) struct EntityCache {
    avatars: DashMap<SessionId, Avatar>,
    objects: DashMap<ObjectId, Object>,
    users: DashMap<UserId, User>,
    worlds: DashMap<String, World>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the avatar, or merge its fields into the existing entry.
    ///
    /// A merge replaces everything the wire reported; the owning user link
    /// survives unless the incoming value carries its own.
    pub fn upsert_avatar(&self, incoming: Avatar) -> AvatarUpsert {
        match self.avatars.entry(incoming.session) {
            Entry::Occupied(mut entry) => {
                let previous = entry.get().clone();
                let stored = entry.get_mut();
                stored.name = incoming.name;
                stored.location = incoming.location;
                stored.application = incoming.application;
                stored.avatar_type = incoming.avatar_type;
                if incoming.user_id.is_some() {
                    stored.user_id = incoming.user_id;
                }
                AvatarUpsert {
                    current: stored.clone(),
                    previous: Some(previous),
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(incoming.clone());
                AvatarUpsert {
                    current: incoming,
                    previous: None,
                }
            }
        }
    }

    pub fn avatar(&self, session: SessionId) -> Option<Avatar> {
        self.avatars.get(&session).map(|entry| entry.clone())
    }

    /// Snapshot of every known avatar, ordered by session id.
    pub fn avatars(&self) -> Vec<Avatar> {
        let mut all: Vec<Avatar> = self.avatars.iter().map(|entry| entry.clone()).collect();
        all.sort_by_key(|avatar| avatar.session);
        all
    }

    pub fn remove_avatar(&self, session: SessionId) -> Option<Avatar> {
        self.avatars.remove(&session).map(|(_, avatar)| avatar)
    }

    /// Insert the user, or refresh the existing entry's profile fields in
    /// place. Identity (the id) is never replaced.
    pub fn upsert_user(&self, incoming: User) -> User {
        match self.users.entry(incoming.id) {
            Entry::Occupied(mut entry) => {
                let stored = entry.get_mut();
                stored.name = incoming.name;
                stored.email = incoming.email;
                stored.registered_at = incoming.registered_at;
                stored.last_login = incoming.last_login;
                stored.online_time = incoming.online_time;
                stored.clone()
            }
            Entry::Vacant(entry) => {
                entry.insert(incoming.clone());
                incoming
            }
        }
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|entry| entry.clone())
    }

    pub fn upsert_object(&self, incoming: Object) -> Object {
        match self.objects.entry(incoming.id) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() = incoming.clone();
                incoming
            }
            Entry::Vacant(entry) => {
                entry.insert(incoming.clone());
                incoming
            }
        }
    }

    pub fn object(&self, id: ObjectId) -> Option<Object> {
        self.objects.get(&id).map(|entry| entry.clone())
    }

    pub fn remove_object(&self, id: ObjectId) -> Option<Object> {
        self.objects.remove(&id).map(|(_, object)| object)
    }

    /// Insert the world, or merge it into the existing entry. Listing
    /// refreshes never erase settings or size learned by entering.
    pub fn upsert_world(&self, incoming: World) -> World {
        match self.worlds.entry(incoming.name.clone()) {
            Entry::Occupied(mut entry) => {
                let stored = entry.get_mut();
                stored.state = incoming.state;
                stored.avatar_count = incoming.avatar_count;
                if incoming.size.is_some() {
                    stored.size = incoming.size;
                }
                if !incoming.settings.is_empty() {
                    stored.settings = incoming.settings;
                }
                stored.clone()
            }
            Entry::Vacant(entry) => {
                entry.insert(incoming.clone());
                incoming
            }
        }
    }

    pub fn world(&self, name: &str) -> Option<World> {
        self.worlds.get(name).map(|entry| entry.clone())
    }

    /// Drop everything scoped to the current world visit. Users and worlds
    /// are universe-scoped and survive.
    pub fn clear_world_scoped(&self) {
        self.avatars.clear();
        self.objects.clear();
    }
}

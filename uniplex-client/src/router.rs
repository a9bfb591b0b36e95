//! Translation from raw transport callbacks and events into engine effects.
//!
//! The transport invokes the sink on its own delivery thread. Handling
//! always follows the same shape: take the dispatch lock, read the typed
//! locals the slot addresses, release the lock, then mutate caches, resolve
//! pending requests, and emit, in that order. Subscribers therefore never
//! run under the dispatch lock, and cache state is current by the time an
//! event reaches them.
//!
//! The router holds only a weak reference to the engine; callbacks and
//! events arriving after the client is gone are silently dropped.

use crate::client::Inner;
use crate::correlator::{Resolution, SlotKind};
use crate::entities::{Avatar, Object, User, World, WorldState};
use crate::events::{
    AvatarClick, ChatMessage, Disconnect, Event, MessageKind, ObjectClick, ObjectCreation,
    ObjectRemoval, Teleport, TeleportAcceptance,
};
use crate::requests::{InviteRequest, JoinRequest};
use crate::types::{Application, Cell, Color, ConnectionState, Location, Rotation, TextEffects, Vector3};
use std::sync::{Arc, Weak};
use tracing::debug;
use uniplex_proto::{
    CallbackSink, CallbackSlot, EventSlot, FloatAttribute, IntAttribute, ReasonCode, Reference,
    StringAttribute, Transport,
};

pub(crate) struct Router {
    inner: Weak<Inner>,
}

impl Router {
    pub fn new(inner: Weak<Inner>) -> Self {
        Self { inner }
    }
}

impl CallbackSink for Router {
    fn callback(&self, slot: CallbackSlot, reason: ReasonCode, reference: Reference) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        match slot {
            CallbackSlot::ConnectUniverse => {
                inner.correlator.resolve_single(SlotKind::Connect, reason);
            }
            CallbackSlot::Login => {
                if reason.is_success()
                    && let Some(id) =
                        inner.session.try_with(|t| t.int(IntAttribute::MyUserId))
                {
                    inner.state.lock().my_user_id = Some(id);
                }
                inner.correlator.resolve_single(SlotKind::Login, reason);
            }
            CallbackSlot::Enter => {
                if reason.is_success()
                    && let Some((size, session)) = inner
                        .session
                        .try_with(|t| (t.int(IntAttribute::WorldSize), t.int(IntAttribute::MySession)))
                {
                    let mut state = inner.state.lock();
                    state.pending_world_size = Some(size);
                    state.self_session = Some(session);
                }
                inner.correlator.resolve_single(SlotKind::Enter, reason);
            }
            CallbackSlot::WorldList => inner.streams.end_world_stream(),
            CallbackSlot::Join => {
                let location = if reason.is_success() {
                    inner.session.try_with(|t| {
                        Location::new(
                            t.string(StringAttribute::JoinWorld),
                            Vector3::new(
                                t.float(FloatAttribute::JoinX),
                                t.float(FloatAttribute::JoinY),
                                t.float(FloatAttribute::JoinZ),
                            ),
                            Rotation {
                                yaw: t.float(FloatAttribute::JoinYaw),
                                pitch: t.float(FloatAttribute::JoinPitch),
                            },
                        )
                    })
                } else {
                    None
                };
                inner
                    .correlator
                    .resolve(reference, Resolution::Join { reason, location });
            }
            CallbackSlot::Invite
            | CallbackSlot::ObjectAdd
            | CallbackSlot::ObjectChange
            | CallbackSlot::ObjectDelete => {
                inner.correlator.resolve(reference, Resolution::Reason(reason));
            }
        }
    }

    fn event(&self, slot: EventSlot) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        match slot {
            EventSlot::Chat => on_chat(&inner),
            EventSlot::AvatarAdd => on_avatar_add(&inner),
            EventSlot::AvatarChange => on_avatar_change(&inner),
            EventSlot::AvatarDelete => on_avatar_delete(&inner),
            EventSlot::AvatarClick => on_avatar_click(&inner),
            EventSlot::Object => on_object(&inner),
            EventSlot::ObjectDelete => on_object_delete(&inner),
            EventSlot::ObjectClick => on_object_click(&inner),
            EventSlot::WorldList => on_world_list(&inner),
            EventSlot::WorldSetting => on_world_setting(&inner),
            EventSlot::WorldSettingsChanged => on_world_settings_changed(&inner),
            EventSlot::UserAttributes => on_user_attributes(&inner),
            EventSlot::QueryCellEnd => on_query_cell_end(&inner),
            EventSlot::Teleport => on_teleport(&inner, self.inner.clone()),
            EventSlot::Join => on_join_request(&inner, self.inner.clone()),
            EventSlot::Invite => on_invite_request(&inner, self.inner.clone()),
            EventSlot::UniverseDisconnect => on_universe_disconnect(&inner),
            EventSlot::WorldDisconnect => on_world_disconnect(&inner),
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute readers
// ---------------------------------------------------------------------------

fn channel(value: i32) -> u8 {
    u8::try_from(value.clamp(0, 255)).unwrap_or(0)
}

fn avatar_position(t: &dyn Transport) -> (Vector3, Rotation) {
    (
        Vector3::new(
            t.float(FloatAttribute::AvatarX),
            t.float(FloatAttribute::AvatarY),
            t.float(FloatAttribute::AvatarZ),
        ),
        Rotation {
            yaw: t.float(FloatAttribute::AvatarYaw),
            pitch: t.float(FloatAttribute::AvatarPitch),
        },
    )
}

/// The avatar an avatar-scoped event describes, located in the current
/// world.
fn read_avatar(inner: &Arc<Inner>, t: &dyn Transport) -> Avatar {
    let (position, rotation) = avatar_position(t);
    let world = inner
        .state
        .lock()
        .current_world
        .as_ref()
        .map(|w| w.name.clone());
    let user_id = t.int(IntAttribute::UserId);
    Avatar {
        session: t.int(IntAttribute::AvatarSession),
        name: t.string(StringAttribute::AvatarName),
        location: Location {
            world,
            position,
            rotation,
        },
        application: Application {
            name: t.string(StringAttribute::AvatarApplicationName),
            version: t.string(StringAttribute::AvatarApplicationVersion),
        },
        avatar_type: t.int(IntAttribute::AvatarType),
        user_id: (user_id != 0).then_some(user_id),
    }
}

fn read_object(t: &dyn Transport) -> Object {
    let owner = t.int(IntAttribute::ObjectUserId);
    Object {
        id: t.int(IntAttribute::ObjectId),
        owner: (owner != 0).then_some(owner),
        position: Vector3::new(
            t.float(FloatAttribute::ObjectX),
            t.float(FloatAttribute::ObjectY),
            t.float(FloatAttribute::ObjectZ),
        ),
        rotation: Rotation {
            yaw: t.float(FloatAttribute::ObjectYaw),
            pitch: t.float(FloatAttribute::ObjectPitch),
        },
        model: t.string(StringAttribute::ObjectModel),
        description: t.string(StringAttribute::ObjectDescription),
        action: t.string(StringAttribute::ObjectAction),
    }
}

fn hit_point(t: &dyn Transport) -> Vector3 {
    Vector3::new(
        t.float(FloatAttribute::ClickHitX),
        t.float(FloatAttribute::ClickHitY),
        t.float(FloatAttribute::ClickHitZ),
    )
}

// ---------------------------------------------------------------------------
// Event handlers
// ---------------------------------------------------------------------------

fn on_chat(inner: &Arc<Inner>) {
    let Some(chat) = inner.session.try_with(|t| {
        let kind = MessageKind::from_raw(t.int(IntAttribute::ChatType));
        // Styling registers are only valid for console messages.
        let (color, effects) = match kind {
            MessageKind::Console => (
                Color {
                    r: channel(t.int(IntAttribute::ChatColorRed)),
                    g: channel(t.int(IntAttribute::ChatColorGreen)),
                    b: channel(t.int(IntAttribute::ChatColorBlue)),
                },
                TextEffects(t.int(IntAttribute::ChatEffects)),
            ),
            MessageKind::Chat => (Color::BLACK, TextEffects::NONE),
        };
        ChatMessage {
            session: t.int(IntAttribute::AvatarSession),
            name: t.string(StringAttribute::AvatarName),
            message: t.string(StringAttribute::ChatMessage),
            kind,
            color,
            effects,
        }
    }) else {
        return;
    };
    // The speaker may never have entered the cache (console-only sources);
    // the line is delivered regardless.
    inner.bus.emit(Event::MessageReceived(chat));
}

fn on_avatar_add(inner: &Arc<Inner>) {
    let Some(avatar) = inner.session.try_with(|t| read_avatar(inner, t)) else {
        return;
    };
    let upsert = inner.cache.upsert_avatar(avatar);
    inner.bus.emit(Event::AvatarJoined(upsert.current));
}

fn on_avatar_change(inner: &Arc<Inner>) {
    let Some(avatar) = inner.session.try_with(|t| read_avatar(inner, t)) else {
        return;
    };
    let upsert = inner.cache.upsert_avatar(avatar);
    match upsert.previous {
        Some(previous) => {
            if upsert.current.avatar_type != previous.avatar_type {
                inner
                    .bus
                    .emit(Event::AvatarTypeChanged(upsert.current.clone()));
            }
            if upsert.current.location.position != previous.location.position
                || upsert.current.location.rotation != previous.location.rotation
            {
                inner.bus.emit(Event::AvatarMoved(upsert.current));
            }
        }
        None => {
            debug!(
                session = upsert.current.session,
                "change for an unseen avatar, treating as a move"
            );
            inner.bus.emit(Event::AvatarMoved(upsert.current));
        }
    }
}

fn on_avatar_delete(inner: &Arc<Inner>) {
    let Some(session) = inner
        .session
        .try_with(|t| t.int(IntAttribute::AvatarSession))
    else {
        return;
    };
    match inner.cache.remove_avatar(session) {
        Some(last) => inner.bus.emit(Event::AvatarLeft(last)),
        None => debug!(session, "delete for an unseen avatar, nothing to report"),
    }
}

fn on_avatar_click(inner: &Arc<Inner>) {
    let Some(click) = inner.session.try_with(|t| AvatarClick {
        clicker_session: t.int(IntAttribute::AvatarSession),
        clicked_session: t.int(IntAttribute::ClickedSession),
        hit: hit_point(t),
    }) else {
        return;
    };
    inner.bus.emit(Event::AvatarClicked(click));
}

fn on_object(inner: &Arc<Inner>) {
    let Some((object, builder_session)) = inner
        .session
        .try_with(|t| (read_object(t), t.int(IntAttribute::AvatarSession)))
    else {
        return;
    };
    if builder_session == 0 {
        // Bulk load answering a cell query, not a build.
        inner.cache.upsert_object(object.clone());
        inner.streams.push_cell_object(object);
        return;
    }
    let existed = inner.cache.object(object.id).is_some();
    let object = inner.cache.upsert_object(object);
    if existed {
        inner.bus.emit(Event::ObjectChanged(object));
    } else {
        inner.bus.emit(Event::ObjectCreated(ObjectCreation {
            object,
            builder_session,
        }));
    }
}

fn on_object_delete(inner: &Arc<Inner>) {
    let Some(object_id) = inner.session.try_with(|t| t.int(IntAttribute::ObjectId)) else {
        return;
    };
    // An id alone is still a reportable deletion.
    let object = inner.cache.remove_object(object_id);
    inner
        .bus
        .emit(Event::ObjectDeleted(ObjectRemoval { object_id, object }));
}

fn on_object_click(inner: &Arc<Inner>) {
    let Some(click) = inner.session.try_with(|t| ObjectClick {
        object_id: t.int(IntAttribute::ObjectId),
        clicker_session: t.int(IntAttribute::AvatarSession),
        hit: hit_point(t),
    }) else {
        return;
    };
    inner.bus.emit(Event::ObjectClicked(click));
}

fn on_world_list(inner: &Arc<Inner>) {
    let Some(world) = inner.session.try_with(|t| World {
        name: t.string(StringAttribute::WorldName),
        size: None,
        state: WorldState::from_raw(t.int(IntAttribute::WorldState)),
        avatar_count: t.int(IntAttribute::WorldUsers),
        settings: std::collections::BTreeMap::new(),
    }) else {
        return;
    };
    let merged = inner.cache.upsert_world(world);
    inner.streams.push_world(merged);
}

fn on_world_setting(inner: &Arc<Inner>) {
    let Some((key, value)) = inner.session.try_with(|t| {
        (
            t.string(StringAttribute::WorldSettingKey),
            t.string(StringAttribute::WorldSettingValue),
        )
    }) else {
        return;
    };
    inner.state.lock().pending_settings.insert(key, value);
}

fn on_world_settings_changed(inner: &Arc<Inner>) {
    // While in a world this is a live settings update; during entry it is
    // the "settings complete" marker the enter sequence awaits.
    let updated = {
        let mut state = inner.state.lock();
        if state.connection == ConnectionState::InWorld {
            let pending = std::mem::take(&mut state.pending_settings);
            if let Some(world) = state.current_world.as_mut() {
                world.settings.extend(pending);
            }
            state.current_world.clone()
        } else {
            None
        }
    };
    if let Some(world) = updated {
        inner.cache.upsert_world(world);
    }
    inner
        .correlator
        .resolve_single(SlotKind::WorldSettings, ReasonCode::Success);
}

fn on_user_attributes(inner: &Arc<Inner>) {
    let Some(user) = inner.session.try_with(|t| {
        User::from_attributes(
            t.int(IntAttribute::UserId),
            t.string(StringAttribute::UserName),
            t.string(StringAttribute::UserEmail),
            i64::from(t.int(IntAttribute::UserRegistrationTime)),
            i64::from(t.int(IntAttribute::UserLastLogin)),
            i64::from(t.int(IntAttribute::UserOnlineTime)),
        )
    }) else {
        return;
    };
    let user = inner.cache.upsert_user(user);
    inner.correlator.resolve_lookup(&user);
}

fn on_query_cell_end(inner: &Arc<Inner>) {
    let Some(cell) = inner.session.try_with(|t| Cell {
        x: t.int(IntAttribute::CellX),
        z: t.int(IntAttribute::CellZ),
    }) else {
        return;
    };
    inner.streams.end_cell_stream(cell);
}

fn on_teleport(inner: &Arc<Inner>, weak: Weak<Inner>) {
    let Some((source_session, world, position, rotation)) = inner.session.try_with(|t| {
        (
            t.int(IntAttribute::AvatarSession),
            t.string(StringAttribute::TeleportWorld),
            Vector3::new(
                t.float(FloatAttribute::TeleportX),
                t.float(FloatAttribute::TeleportY),
                t.float(FloatAttribute::TeleportZ),
            ),
            Rotation {
                yaw: t.float(FloatAttribute::TeleportYaw),
                pitch: t.float(FloatAttribute::TeleportPitch),
            },
        )
    }) else {
        return;
    };
    // Empty world means "within the current world".
    let world = if world.is_empty() {
        inner
            .state
            .lock()
            .current_world
            .as_ref()
            .map(|w| w.name.clone())
    } else {
        Some(world)
    };
    let location = Location {
        world,
        position,
        rotation,
    };
    let acceptance = TeleportAcceptance::default();
    let teleport = Teleport {
        source: inner.cache.avatar(source_session),
        location: location.clone(),
        acceptance: acceptance.clone(),
    };
    inner
        .bus
        .emit_with_followup(Event::Teleported(teleport), move || {
            if acceptance.is_declined() {
                return;
            }
            let Some(inner) = weak.upgrade() else { return };
            let crossed = {
                let mut state = inner.state.lock();
                let crossed = match (&location.world, &state.current_world) {
                    (Some(target), Some(current)) => *target != current.name,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if let Some(avatar) = state.current_avatar.as_mut() {
                    avatar.location = location.clone();
                }
                crossed
            };
            if !crossed {
                return;
            }
            let Some(name) = location.world else { return };
            // Crossing worlds also moves the current-world pointer. The
            // destination may need a wire lookup, hence the task.
            let weak = Arc::downgrade(&inner);
            inner.runtime.spawn(async move {
                let Some(inner) = weak.upgrade() else { return };
                match inner.resolve_world(&name).await {
                    Ok(world) => {
                        let mut state = inner.state.lock();
                        let still_there = state
                            .current_avatar
                            .as_ref()
                            .is_some_and(|avatar| {
                                avatar.location.world.as_deref() == Some(name.as_str())
                            });
                        if still_there {
                            state.current_world = Some(world);
                        }
                    }
                    Err(error) => {
                        debug!(world = %name, %error, "teleport destination world could not be resolved");
                    }
                }
            });
        });
}

fn on_join_request(inner: &Arc<Inner>, weak: Weak<Inner>) {
    let Some((request_id, user_id, name)) = inner.session.try_with(|t| {
        (
            t.int(IntAttribute::JoinId),
            t.int(IntAttribute::UserId),
            t.string(StringAttribute::JoinName),
        )
    }) else {
        return;
    };
    let here = {
        let state = inner.state.lock();
        state
            .current_avatar
            .as_ref()
            .map_or_else(Location::nowhere, |avatar| avatar.location.clone())
    };
    let session = Arc::downgrade(&inner.session);
    // The requester's account is resolved before the event goes out, so
    // subscribers see who is asking. Resolution needs a round trip, hence
    // the task.
    inner.runtime.spawn(async move {
        let Some(inner) = weak.upgrade() else { return };
        let user = match inner.resolve_user(user_id).await {
            Ok(user) => Some(user),
            Err(error) => {
                debug!(user_id, %error, "join requester could not be resolved");
                None
            }
        };
        let request = JoinRequest::new(request_id, name, user, here, session);
        inner.bus.emit(Event::JoinRequestReceived(request));
    });
}

fn on_invite_request(inner: &Arc<Inner>, weak: Weak<Inner>) {
    let Some((request_id, user_id, name, location)) = inner.session.try_with(|t| {
        (
            t.int(IntAttribute::InviteId),
            t.int(IntAttribute::InviteUserId),
            t.string(StringAttribute::InviteName),
            Location::new(
                t.string(StringAttribute::InviteWorld),
                Vector3::new(
                    t.float(FloatAttribute::InviteX),
                    t.float(FloatAttribute::InviteY),
                    t.float(FloatAttribute::InviteZ),
                ),
                Rotation {
                    yaw: t.float(FloatAttribute::InviteYaw),
                    pitch: t.float(FloatAttribute::InvitePitch),
                },
            ),
        )
    }) else {
        return;
    };
    let session = Arc::downgrade(&inner.session);
    inner.runtime.spawn(async move {
        let Some(inner) = weak.upgrade() else { return };
        let user = match inner.resolve_user(user_id).await {
            Ok(user) => Some(user),
            Err(error) => {
                debug!(user_id, %error, "inviter could not be resolved");
                None
            }
        };
        let request = InviteRequest::new(request_id, name, user, location, session);
        inner.bus.emit(Event::InviteRequestReceived(request));
    });
}

fn on_universe_disconnect(inner: &Arc<Inner>) {
    let code = inner
        .session
        .try_with(|t| t.int(IntAttribute::DisconnectErrorCode))
        .unwrap_or(0);
    inner.correlator.fail_all();
    inner.streams.fail_all();
    inner.cache.clear_world_scoped();
    {
        let mut state = inner.state.lock();
        state.connection = ConnectionState::Disconnected;
        state.current_world = None;
        state.current_avatar = None;
        state.current_user = None;
        state.self_session = None;
        state.my_user_id = None;
    }
    inner
        .bus
        .emit(Event::UniverseDisconnected(Disconnect { code }));
}

fn on_world_disconnect(inner: &Arc<Inner>) {
    let code = inner
        .session
        .try_with(|t| t.int(IntAttribute::DisconnectErrorCode))
        .unwrap_or(0);
    inner.correlator.fail_all();
    inner.streams.fail_all();
    inner.cache.clear_world_scoped();
    {
        let mut state = inner.state.lock();
        state.connection = ConnectionState::ConnectedToUniverse;
        state.current_world = None;
        state.self_session = None;
        if let Some(avatar) = state.current_avatar.as_mut() {
            avatar.session = 0;
            avatar.location = Location::nowhere();
        }
    }
    inner.bus.emit(Event::WorldDisconnected(Disconnect { code }));
}

//! The public client handle and the shared engine internals.

use crate::cache::EntityCache;
use crate::config::ClientConfig;
use crate::correlator::{Correlator, LookupTicket, Resolution, SlotKind};
use crate::entities::{Avatar, Object, User, World, WorldState};
use crate::error::{ClientError, Result, from_reason};
use crate::events::{Event, EventBus, EventKind, SubscriptionId};
use crate::router::Router;
use crate::session::Session;
use crate::streams::{ObjectStream, StreamRegistry, WorldStream};
use crate::types::{
    Cell, Color, ConnectionState, Location, ObjectId, Rotation, SessionId, TextEffects, UserId,
    Vector3,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};
use uniplex_proto::{
    CallbackSink, FloatAttribute, ReasonCode, StringAttribute, Transport, UrlTarget,
};

/// Longest chat or console line the wire accepts, in bytes.
const MAX_CHAT_BYTES: usize = 255;

/// Outcome of an outbound invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteOutcome {
    /// The invitee accepted.
    Accepted,
    /// The invitee declined.
    Declined,
}

/// Outcome of an outbound join request.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// The host accepted; this is where they are.
    Accepted(Location),
    /// The host declined.
    Declined,
}

/// Mutable self-describing state, guarded by one short-held lock.
///
/// Never held across an await or while the dispatch lock is taken.
#[derive(Default)]
pub(crate) struct SelfState {
    pub connection: ConnectionState,
    pub current_user: Option<User>,
    pub current_world: Option<World>,
    pub current_avatar: Option<Avatar>,
    pub self_session: Option<SessionId>,
    pub my_user_id: Option<UserId>,
    pub pending_world_size: Option<i32>,
    pub pending_settings: BTreeMap<String, String>,
}

pub(crate) struct Inner {
    pub config: ClientConfig,
    pub session: Arc<Session>,
    pub cache: EntityCache,
    pub correlator: Correlator,
    pub streams: StreamRegistry,
    pub bus: Arc<EventBus>,
    pub state: parking_lot::Mutex<SelfState>,
    pub world_list_gate: Arc<tokio::sync::Mutex<()>>,
    pub runtime: tokio::runtime::Handle,
}

impl Inner {
    pub(crate) fn bot_avatar_name(&self) -> String {
        format!("[{}]", self.config.bot_name)
    }

    /// Cache-first user resolution with per-id command deduplication.
    pub(crate) async fn resolve_user(self: &Arc<Self>, user_id: UserId) -> Result<User> {
        if let Some(user) = self.cache.user(user_id) {
            return Ok(user);
        }
        let ticket = self.correlator.register_lookup(user_id);
        let first = matches!(ticket, LookupTicket::First(_));
        if first {
            // The attributes event may have landed between the miss and the
            // registration; serve it and drain any co-waiters.
            if let Some(user) = self.cache.user(user_id) {
                self.correlator.resolve_lookup(&user);
            } else {
                let reason = self
                    .session
                    .with(|transport| transport.user_attributes_by_id(user_id))?;
                from_reason(reason)?;
            }
        }
        match timeout(self.config.request_timeout(), ticket.into_receiver()).await {
            Ok(Ok(user)) => Ok(user),
            Ok(Err(_)) => Err(ClientError::TransportError("connection lost".into())),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Cache-first world resolution, falling back to a fresh enumeration.
    /// Listed worlds feed the cache as they stream, so a second resolution
    /// of the same name is free.
    pub(crate) async fn resolve_world(self: &Arc<Self>, name: &str) -> Result<World> {
        if let Some(world) = self.cache.world(name) {
            return Ok(world);
        }
        let _gate = Arc::clone(&self.world_list_gate).lock_owned().await;
        let mut rx = self.streams.begin_world_stream();
        let reason = self.session.with(|transport| transport.world_list(0))?;
        if let Err(error) = from_reason(reason) {
            self.streams.end_world_stream();
            return Err(error);
        }
        while let Some(world) = rx.recv().await {
            if world.name == name {
                return Ok(world);
            }
        }
        Err(ClientError::EntityNotFound(format!("world {name}")))
    }

    /// Tear everything down: transport, pending requests, open streams.
    pub(crate) fn shut_down(&self) {
        self.session.destroy();
        self.correlator.fail_all();
        self.streams.fail_all();
        let mut state = self.state.lock();
        *state = SelfState::default();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.session.destroy();
    }
}

/// A session engine handle. Cloning is cheap; all clones drive the same
/// session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Build a client over a transport.
    ///
    /// The factory receives the callback sink the transport must invoke
    /// from its delivery thread. Must be called within a tokio runtime;
    /// event dispatch tasks are spawned on it.
    pub fn new(
        config: ClientConfig,
        factory: impl FnOnce(Arc<dyn CallbackSink>) -> Box<dyn Transport>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ClientError::Runtime("no tokio runtime on this thread".into()))?;
        let inner = Arc::new_cyclic(|weak| {
            let sink: Arc<dyn CallbackSink> = Arc::new(Router::new(weak.clone()));
            let transport = factory(sink);
            Inner {
                config,
                session: Arc::new(Session::new(transport)),
                cache: EntityCache::new(),
                correlator: Correlator::new(),
                streams: StreamRegistry::new(),
                bus: EventBus::new(runtime.clone()),
                state: parking_lot::Mutex::new(SelfState::default()),
                world_list_gate: Arc::new(tokio::sync::Mutex::new(())),
                runtime,
            }
        });
        Ok(Self { inner })
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Connect to the configured universe server.
    pub async fn connect(&self) -> Result<()> {
        let (host, port) = {
            let config = &self.inner.config;
            (config.universe_host.clone(), config.universe_port)
        };
        self.connect_to(&host, port).await
    }

    /// Connect to an explicit universe server.
    pub async fn connect_to(&self, host: &str, port: u16) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.connection != ConnectionState::Disconnected {
                return Err(ClientError::DuplicateRequest("connect"));
            }
            state.connection = ConnectionState::Connecting;
        }
        let result = self.connect_inner(host, port).await;
        if result.is_err() {
            let mut state = self.inner.state.lock();
            if state.connection == ConnectionState::Connecting {
                state.connection = ConnectionState::Disconnected;
            }
        }
        result
    }

    async fn connect_inner(&self, host: &str, port: u16) -> Result<()> {
        let rx = self
            .inner
            .correlator
            .register_single(SlotKind::Connect)
            .map_err(ClientError::DuplicateRequest)?;
        let reason = self
            .inner
            .session
            .with(|transport| transport.connect_universe(host, port))?;
        from_reason(reason)?;

        match timeout(self.inner.config.request_timeout(), rx).await {
            Ok(Ok(reason)) => {
                from_reason(reason)?;
                self.inner.state.lock().connection = ConnectionState::ConnectedToUniverse;
                Ok(())
            }
            Ok(Err(_)) => Err(ClientError::TransportError("connection lost".into())),
            Err(_) => {
                self.inner.correlator.abandon_single(SlotKind::Connect);
                Err(ClientError::Timeout)
            }
        }
    }

    /// Authenticate with the configured credentials.
    pub async fn login(&self) -> Result<()> {
        self.require_state(ConnectionState::ConnectedToUniverse)?;
        self.inner.config.require_credentials()?;
        let (username, password, bot_name, application) = {
            let config = &self.inner.config;
            (
                config.username.clone(),
                config.password.clone(),
                config.bot_name.clone(),
                config.application.clone(),
            )
        };

        let rx = self
            .inner
            .correlator
            .register_single(SlotKind::Login)
            .map_err(ClientError::DuplicateRequest)?;
        let reason = self.inner.session.with(|transport| {
            transport.set_string(StringAttribute::ApplicationName, &application.name);
            transport.set_string(StringAttribute::ApplicationVersion, &application.version);
            transport.login(&username, &password, &bot_name)
        })?;
        from_reason(reason)?;

        match timeout(self.inner.config.request_timeout(), rx).await {
            Ok(Ok(reason)) => from_reason(reason)?,
            Ok(Err(_)) => return Err(ClientError::TransportError("connection lost".into())),
            Err(_) => {
                self.inner.correlator.abandon_single(SlotKind::Login);
                return Err(ClientError::Timeout);
            }
        }

        // The router stashed our account id while handling the callback.
        let my_user_id = self
            .inner
            .state
            .lock()
            .my_user_id
            .ok_or_else(|| ClientError::TransportError("login reported no user id".into()))?;
        let user = self.inner.resolve_user(my_user_id).await?;

        let mut state = self.inner.state.lock();
        state.current_user = Some(user);
        state.current_avatar = Some(Avatar {
            session: 0,
            name: self.inner.bot_avatar_name(),
            location: Location::nowhere(),
            application,
            avatar_type: 0,
            user_id: Some(my_user_id),
        });
        Ok(())
    }

    /// Enter the named world, leaving any current world first.
    pub async fn enter(&self, world_name: &str) -> Result<()> {
        {
            let state = self.inner.state.lock();
            match state.connection {
                ConnectionState::ConnectedToUniverse | ConnectionState::InWorld => {}
                ConnectionState::Disconnected | ConnectionState::Connecting => {
                    return Err(ClientError::NotConnected);
                }
                ConnectionState::EnteringWorld | ConnectionState::Leaving => {
                    return Err(ClientError::DuplicateRequest("enter"));
                }
            }
        }
        if self.connection_state() == ConnectionState::InWorld {
            self.leave()?;
        }

        let enter_rx = self
            .inner
            .correlator
            .register_single(SlotKind::Enter)
            .map_err(ClientError::DuplicateRequest)?;
        let settings_rx = self
            .inner
            .correlator
            .register_single(SlotKind::WorldSettings)
            .map_err(ClientError::DuplicateRequest)?;
        {
            let mut state = self.inner.state.lock();
            state.connection = ConnectionState::EnteringWorld;
            state.pending_settings.clear();
            state.pending_world_size = None;
        }

        let result = self
            .enter_inner(world_name, enter_rx, settings_rx)
            .await;
        if result.is_err() {
            let mut state = self.inner.state.lock();
            if state.connection == ConnectionState::EnteringWorld {
                state.connection = ConnectionState::ConnectedToUniverse;
            }
        }
        result
    }

    async fn enter_inner(
        &self,
        world_name: &str,
        enter_rx: tokio::sync::oneshot::Receiver<ReasonCode>,
        settings_rx: tokio::sync::oneshot::Receiver<ReasonCode>,
    ) -> Result<()> {
        let reason = self
            .inner
            .session
            .with(|transport| transport.enter(world_name))?;
        from_reason(reason)?;

        let deadline = self.inner.config.request_timeout();
        match timeout(deadline, enter_rx).await {
            Ok(Ok(reason)) => from_reason(reason)?,
            Ok(Err(_)) => return Err(ClientError::TransportError("connection lost".into())),
            Err(_) => {
                self.inner.correlator.abandon_single(SlotKind::Enter);
                self.inner.correlator.abandon_single(SlotKind::WorldSettings);
                return Err(ClientError::Timeout);
            }
        }
        // Settings stream in as events and the settings-changed marker
        // resolves this second slot.
        match timeout(deadline, settings_rx).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => return Err(ClientError::TransportError("connection lost".into())),
            Err(_) => {
                self.inner.correlator.abandon_single(SlotKind::WorldSettings);
                return Err(ClientError::Timeout);
            }
        }

        let bot_name = self.inner.bot_avatar_name();
        let application = self.inner.config.application.clone();
        let world = {
            let mut state = self.inner.state.lock();
            let world = World {
                name: world_name.to_string(),
                size: state.pending_world_size.take(),
                state: WorldState::Online,
                avatar_count: 0,
                settings: std::mem::take(&mut state.pending_settings),
            };
            let session = state.self_session.unwrap_or(0);
            state.current_world = Some(world.clone());
            state.current_avatar = Some(Avatar {
                session,
                name: bot_name,
                location: Location::new(world_name, Vector3::ZERO, Rotation::ZERO),
                application,
                avatar_type: 0,
                user_id: state.my_user_id,
            });
            state.connection = ConnectionState::InWorld;
            world
        };
        self.inner.cache.upsert_world(world);

        if self.inner.config.auto_query {
            let client = self.clone();
            self.inner.runtime.spawn(async move {
                match client.query_cell(Cell { x: 0, z: 0 }) {
                    // The router caches each streamed object; draining is all
                    // that is needed here.
                    Ok(stream) => {
                        let _ = stream.collect().await;
                    }
                    Err(error) => debug!(%error, "auto query failed"),
                }
            });
        }
        Ok(())
    }

    /// Leave the current world. World-scoped caches are dropped.
    pub fn leave(&self) -> Result<()> {
        self.require_state(ConnectionState::InWorld)?;
        {
            self.inner.state.lock().connection = ConnectionState::Leaving;
        }
        let reason = self.inner.session.with(|transport| transport.leave())?;
        self.inner.cache.clear_world_scoped();
        {
            let mut state = self.inner.state.lock();
            state.current_world = None;
            state.self_session = None;
            if let Some(avatar) = state.current_avatar.as_mut() {
                avatar.session = 0;
                avatar.location = Location::nowhere();
            }
            state.connection = ConnectionState::ConnectedToUniverse;
        }
        from_reason(reason)
    }

    /// Destroy the session. Pending requests fail; the handle is inert
    /// afterwards.
    pub fn dispose(&self) {
        self.inner.shut_down();
    }

    // -----------------------------------------------------------------------
    // World chat
    // -----------------------------------------------------------------------

    /// Say a chat line in the current world.
    pub fn say(&self, message: &str) -> Result<()> {
        self.require_state(ConnectionState::InWorld)?;
        if message.len() > MAX_CHAT_BYTES {
            return Err(ClientError::StringTooLong { what: "chat message" });
        }
        let reason = self.inner.session.with(|transport| transport.say(message))?;
        from_reason(reason)
    }

    /// Send a styled console line; `target` of `None` broadcasts to the
    /// whole world.
    pub fn console_message(
        &self,
        target: Option<SessionId>,
        name: &str,
        message: &str,
        color: Color,
        effects: TextEffects,
    ) -> Result<()> {
        self.require_state(ConnectionState::InWorld)?;
        if message.len() > MAX_CHAT_BYTES {
            return Err(ClientError::StringTooLong { what: "console message" });
        }
        let reason = self.inner.session.with(|transport| {
            transport.console_message(
                target.unwrap_or(0),
                name,
                message,
                effects.0,
                color.r,
                color.g,
                color.b,
            )
        })?;
        from_reason(reason)
    }

    // -----------------------------------------------------------------------
    // Users and worlds
    // -----------------------------------------------------------------------

    /// Look up a user account, served from the cache when possible.
    /// Concurrent lookups of one id share a single wire command.
    pub async fn get_user(&self, user_id: UserId) -> Result<User> {
        self.inner.resolve_user(user_id).await
    }

    /// Begin a world-list enumeration. Enumerations serialize: a second
    /// caller waits until the returned stream is dropped.
    pub async fn enumerate_worlds(&self) -> Result<WorldStream> {
        self.require_connected()?;
        let gate = Arc::clone(&self.inner.world_list_gate).lock_owned().await;
        let rx = self.inner.streams.begin_world_stream();
        let reason = self
            .inner
            .session
            .with(|transport| transport.world_list(0))?;
        if let Err(error) = from_reason(reason) {
            self.inner.streams.end_world_stream();
            return Err(error);
        }
        Ok(WorldStream::new(rx, gate))
    }

    /// All worlds the universe currently lists.
    pub async fn worlds(&self) -> Result<Vec<World>> {
        Ok(self.enumerate_worlds().await?.collect().await)
    }

    /// One world by name: from the cache when seen before, otherwise by
    /// scanning a fresh enumeration.
    pub async fn get_world(&self, name: &str) -> Result<World> {
        self.require_connected()?;
        self.inner.resolve_world(name).await
    }

    /// Query all objects in one cell. Results stream in; each streamed
    /// object is also cached.
    pub fn query_cell(&self, cell: Cell) -> Result<ObjectStream> {
        self.require_state(ConnectionState::InWorld)?;
        let rx = self
            .inner
            .streams
            .begin_cell_stream(cell)
            .map_err(ClientError::DuplicateRequest)?;
        let reason = self
            .inner
            .session
            .with(|transport| transport.query_cell(cell.x, cell.z))?;
        if let Err(error) = from_reason(reason) {
            self.inner.streams.end_cell_stream(cell);
            return Err(error);
        }
        Ok(ObjectStream::new(cell, rx))
    }

    // -----------------------------------------------------------------------
    // Invitations and joins
    // -----------------------------------------------------------------------

    /// Invite a user to `location` and await their answer.
    pub async fn invite(&self, user_id: UserId, location: Location) -> Result<InviteOutcome> {
        self.require_connected()?;
        let world = location.world.clone().unwrap_or_default();
        let reference = self.inner.correlator.next_reference();
        let rx = self.inner.correlator.register(reference);
        let reason = self.inner.session.with(|transport| {
            transport.set_reference(reference);
            transport.invite(
                user_id,
                &world,
                location.position.x,
                location.position.y,
                location.position.z,
                location.rotation.yaw,
                location.rotation.pitch,
            )
        })?;
        if let Err(error) = from_reason(reason) {
            self.inner.correlator.abandon(reference);
            return Err(error);
        }

        match timeout(self.inner.config.request_timeout(), rx).await {
            Ok(Ok(Resolution::Reason(reason))) => match reason {
                ReasonCode::Success => Ok(InviteOutcome::Accepted),
                ReasonCode::InviteDeclined => Ok(InviteOutcome::Declined),
                other => Err(ClientError::from_reason(other)),
            },
            Ok(Ok(other)) => {
                warn!(?other, "invite resolved with a mismatched payload");
                Err(ClientError::TransportError("mismatched response".into()))
            }
            Ok(Err(_)) => Err(ClientError::TransportError("connection lost".into())),
            Err(_) => {
                self.inner.correlator.abandon(reference);
                Err(ClientError::Timeout)
            }
        }
    }

    /// Ask to join a user wherever they are and await their answer.
    pub async fn join(&self, user_id: UserId) -> Result<JoinOutcome> {
        self.require_connected()?;
        let reference = self.inner.correlator.next_reference();
        let rx = self.inner.correlator.register(reference);
        let reason = self.inner.session.with(|transport| {
            transport.set_reference(reference);
            transport.join(user_id)
        })?;
        if let Err(error) = from_reason(reason) {
            self.inner.correlator.abandon(reference);
            return Err(error);
        }

        match timeout(self.inner.config.request_timeout(), rx).await {
            Ok(Ok(Resolution::Join { reason, location })) => match reason {
                ReasonCode::Success => {
                    let location = location.ok_or_else(|| {
                        ClientError::TransportError("join accepted without a location".into())
                    })?;
                    Ok(JoinOutcome::Accepted(location))
                }
                ReasonCode::JoinDeclined => Ok(JoinOutcome::Declined),
                other => Err(ClientError::from_reason(other)),
            },
            Ok(Ok(other)) => {
                warn!(?other, "join resolved with a mismatched payload");
                Err(ClientError::TransportError("mismatched response".into()))
            }
            Ok(Err(_)) => Err(ClientError::TransportError("connection lost".into())),
            Err(_) => {
                self.inner.correlator.abandon(reference);
                Err(ClientError::Timeout)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Objects and interaction
    // -----------------------------------------------------------------------

    /// Delete an object by id.
    pub async fn delete_object(&self, object_id: ObjectId) -> Result<()> {
        self.require_state(ConnectionState::InWorld)?;
        let reference = self.inner.correlator.next_reference();
        let rx = self.inner.correlator.register(reference);
        let reason = self.inner.session.with(|transport| {
            transport.set_reference(reference);
            transport.object_delete(object_id)
        })?;
        if let Err(error) = from_reason(reason) {
            self.inner.correlator.abandon(reference);
            return Err(error);
        }
        self.await_reason(reference, rx).await
    }

    /// Rewrite an object's fields.
    pub async fn change_object(&self, object: &Object) -> Result<()> {
        self.require_state(ConnectionState::InWorld)?;
        let reference = self.inner.correlator.next_reference();
        let rx = self.inner.correlator.register(reference);
        let reason = self.inner.session.with(|transport| {
            transport.set_reference(reference);
            transport.set_float(FloatAttribute::ObjectX, object.position.x);
            transport.set_float(FloatAttribute::ObjectY, object.position.y);
            transport.set_float(FloatAttribute::ObjectZ, object.position.z);
            transport.set_float(FloatAttribute::ObjectYaw, object.rotation.yaw);
            transport.set_float(FloatAttribute::ObjectPitch, object.rotation.pitch);
            transport.set_string(StringAttribute::ObjectModel, &object.model);
            transport.set_string(StringAttribute::ObjectDescription, &object.description);
            transport.set_string(StringAttribute::ObjectAction, &object.action);
            transport.object_change(object.id)
        })?;
        if let Err(error) = from_reason(reason) {
            self.inner.correlator.abandon(reference);
            return Err(error);
        }
        self.await_reason(reference, rx).await
    }

    async fn await_reason(
        &self,
        reference: i64,
        rx: tokio::sync::oneshot::Receiver<Resolution>,
    ) -> Result<()> {
        match timeout(self.inner.config.request_timeout(), rx).await {
            Ok(Ok(Resolution::Reason(reason))) => from_reason(reason),
            Ok(Ok(other)) => {
                warn!(?other, "object command resolved with a mismatched payload");
                Err(ClientError::TransportError("mismatched response".into()))
            }
            Ok(Err(_)) => Err(ClientError::TransportError("connection lost".into())),
            Err(_) => {
                self.inner.correlator.abandon(reference);
                Err(ClientError::Timeout)
            }
        }
    }

    /// Click an object at a hit point.
    pub fn click_object(&self, object_id: ObjectId, hit: Vector3) -> Result<()> {
        self.require_state(ConnectionState::InWorld)?;
        let reason = self.inner.session.with(|transport| {
            transport.set_float(FloatAttribute::ClickHitX, hit.x);
            transport.set_float(FloatAttribute::ClickHitY, hit.y);
            transport.set_float(FloatAttribute::ClickHitZ, hit.z);
            transport.object_click(object_id)
        })?;
        from_reason(reason)
    }

    /// Click an avatar, optionally at a hit point.
    pub fn click_avatar(&self, session: SessionId, hit: Option<Vector3>) -> Result<()> {
        self.require_state(ConnectionState::InWorld)?;
        let point = hit.unwrap_or(Vector3::ZERO);
        let reason = self.inner.session.with(|transport| {
            transport.set_float(FloatAttribute::ClickHitX, point.x);
            transport.set_float(FloatAttribute::ClickHitY, point.y);
            transport.set_float(FloatAttribute::ClickHitZ, point.z);
            transport.avatar_click(session)
        })?;
        from_reason(reason)
    }

    /// Push a URL to another session's client.
    pub fn send_url(&self, session: SessionId, url: &str, target: UrlTarget) -> Result<()> {
        self.require_state(ConnectionState::InWorld)?;
        let reason = self
            .inner
            .session
            .with(|transport| transport.url_send(session, url, target))?;
        from_reason(reason)
    }

    /// Move the current avatar. Coordinates and the announcing state change
    /// go out in one dispatch-lock scope.
    pub fn move_to(&self, position: Vector3, rotation: Rotation) -> Result<()> {
        self.require_state(ConnectionState::InWorld)?;
        let reason = self.inner.session.with(|transport| {
            transport.set_float(FloatAttribute::AvatarX, position.x);
            transport.set_float(FloatAttribute::AvatarY, position.y);
            transport.set_float(FloatAttribute::AvatarZ, position.z);
            transport.set_float(FloatAttribute::AvatarYaw, rotation.yaw);
            transport.set_float(FloatAttribute::AvatarPitch, rotation.pitch);
            transport.state_change()
        })?;
        from_reason(reason)?;
        let mut state = self.inner.state.lock();
        if let Some(avatar) = state.current_avatar.as_mut() {
            avatar.location.position = position;
            avatar.location.rotation = rotation;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Current lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    /// This client's own avatar, once logged in.
    #[must_use]
    pub fn current_avatar(&self) -> Option<Avatar> {
        self.inner.state.lock().current_avatar.clone()
    }

    /// The logged-in account.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.lock().current_user.clone()
    }

    /// The entered world, while in one.
    #[must_use]
    pub fn current_world(&self) -> Option<World> {
        self.inner.state.lock().current_world.clone()
    }

    /// Whether a session id denotes this client's own avatar.
    #[must_use]
    pub fn is_self(&self, session: SessionId) -> bool {
        self.inner.state.lock().self_session == Some(session)
    }

    /// Snapshot of one cached avatar.
    #[must_use]
    pub fn avatar(&self, session: SessionId) -> Option<Avatar> {
        self.inner.cache.avatar(session)
    }

    /// Snapshot of every cached avatar, ordered by session.
    #[must_use]
    pub fn avatars(&self) -> Vec<Avatar> {
        self.inner.cache.avatars()
    }

    /// Cached user account, without a wire round trip.
    #[must_use]
    pub fn cached_user(&self, user_id: UserId) -> Option<User> {
        self.inner.cache.user(user_id)
    }

    /// Cached world, without a wire round trip.
    #[must_use]
    pub fn cached_world(&self, name: &str) -> Option<World> {
        self.inner.cache.world(name)
    }

    /// Register an event handler. Handlers of one kind run in registration
    /// order, off the transport thread.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.bus.subscribe(kind, handler)
    }

    /// Remove a previously registered handler.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe(kind, id)
    }

    // -----------------------------------------------------------------------

    fn require_state(&self, expected: ConnectionState) -> Result<()> {
        let actual = self.inner.state.lock().connection;
        if actual == expected {
            return Ok(());
        }
        match expected {
            ConnectionState::InWorld => Err(ClientError::NotInWorld),
            _ => Err(ClientError::NotConnected),
        }
    }

    fn require_connected(&self) -> Result<()> {
        match self.inner.state.lock().connection {
            ConnectionState::ConnectedToUniverse
            | ConnectionState::EnteringWorld
            | ConnectionState::InWorld
            | ConnectionState::Leaving => Ok(()),
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                Err(ClientError::NotConnected)
            }
        }
    }
}

//! Typed events and the subscriber bus.
//!
//! Raw wire events are translated by the router into the typed payloads
//! here, then dispatched through one unbounded lane per event kind. Each
//! lane is drained by its own task, so:
//!
//! - events of one kind reach subscribers in emission order;
//! - subscribers never run while the dispatch lock is held;
//! - a panicking subscriber is caught and logged, not propagated.

use crate::entities::{Avatar, Object};
use crate::requests::{InviteRequest, JoinRequest};
use crate::types::{Color, Location, ObjectId, SessionId, TextEffects, Vector3};
use dashmap::DashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// How an incoming message was delivered.
///
/// Only console messages carry styling; for plain chat the wire color and
/// effect registers are stale and must be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A spoken chat line.
    Chat,
    /// A styled console broadcast.
    Console,
}

impl MessageKind {
    /// Decode the raw wire message-type code.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        if raw == 1 { Self::Console } else { Self::Chat }
    }
}

/// A chat line. The sender may be an avatar the cache has never seen; the
/// session and name here come straight off the wire.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Session of the speaking avatar.
    pub session: SessionId,
    /// Name of the speaking avatar.
    pub name: String,
    /// The spoken text.
    pub message: String,
    /// Chat or console delivery.
    pub kind: MessageKind,
    /// Text color. Black for plain chat.
    pub color: Color,
    /// Text styling flags. None for plain chat.
    pub effects: TextEffects,
}

/// An avatar was clicked.
#[derive(Debug, Clone)]
pub struct AvatarClick {
    /// Who clicked.
    pub clicker_session: SessionId,
    /// Who was clicked.
    pub clicked_session: SessionId,
    /// World-space hit point.
    pub hit: Vector3,
}

/// An object was clicked.
#[derive(Debug, Clone)]
pub struct ObjectClick {
    /// The clicked object.
    pub object_id: ObjectId,
    /// Who clicked.
    pub clicker_session: SessionId,
    /// World-space hit point.
    pub hit: Vector3,
}

/// A newly created (not bulk-loaded) object.
#[derive(Debug, Clone)]
pub struct ObjectCreation {
    /// The object as reported.
    pub object: Object,
    /// Session of the builder.
    pub builder_session: SessionId,
}

/// An object was removed. `object` is the last cached state, when there was
/// one; deletion of a never-seen object still reports the id.
#[derive(Debug, Clone)]
pub struct ObjectRemoval {
    /// Id of the removed object.
    pub object_id: ObjectId,
    /// Last known state, if the object was cached.
    pub object: Option<Object>,
}

/// A forced move of the current avatar.
///
/// Unless a subscriber calls [`TeleportAcceptance::decline`] before
/// returning, the engine applies `location` to the current avatar after all
/// subscribers have run.
#[derive(Debug, Clone)]
pub struct Teleport {
    /// Avatar that requested the move, when known.
    pub source: Option<Avatar>,
    /// Destination.
    pub location: Location,
    /// Handle to suppress the default location update.
    pub acceptance: TeleportAcceptance,
}

/// Decline handle for a [`Teleport`]. Cheap to clone; all clones share one
/// decision.
#[derive(Debug, Clone, Default)]
pub struct TeleportAcceptance {
    declined: Arc<AtomicBool>,
}

impl TeleportAcceptance {
    /// Suppress the engine's default location update for this teleport.
    /// Only effective before the subscriber returns.
    pub fn decline(&self) {
        self.declined.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_declined(&self) -> bool {
        self.declined.load(Ordering::SeqCst)
    }
}

/// A lost connection, with the raw wire error code.
#[derive(Debug, Clone)]
pub struct Disconnect {
    /// Transport-reported error code.
    pub code: i32,
}

// ---------------------------------------------------------------------------
// Event enum
// ---------------------------------------------------------------------------

/// Everything the engine pushes to subscribers.
#[derive(Debug, Clone)]
pub enum Event {
    /// A chat line arrived.
    MessageReceived(ChatMessage),
    /// An avatar entered the world.
    AvatarJoined(Avatar),
    /// An avatar left the world; payload is the last known state.
    AvatarLeft(Avatar),
    /// An avatar's position or orientation changed.
    AvatarMoved(Avatar),
    /// An avatar's type code changed.
    AvatarTypeChanged(Avatar),
    /// An avatar was clicked.
    AvatarClicked(AvatarClick),
    /// An object was built or pasted.
    ObjectCreated(ObjectCreation),
    /// An object's fields changed.
    ObjectChanged(Object),
    /// An object was removed.
    ObjectDeleted(ObjectRemoval),
    /// An object was clicked.
    ObjectClicked(ObjectClick),
    /// Another user asked to join us.
    JoinRequestReceived(JoinRequest),
    /// Another user invited us somewhere.
    InviteRequestReceived(InviteRequest),
    /// The server moved (or asked to move) the current avatar.
    Teleported(Teleport),
    /// The universe connection dropped.
    UniverseDisconnected(Disconnect),
    /// The world connection dropped.
    WorldDisconnected(Disconnect),
}

/// Discriminant for subscription routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`Event::MessageReceived`]
    MessageReceived,
    /// [`Event::AvatarJoined`]
    AvatarJoined,
    /// [`Event::AvatarLeft`]
    AvatarLeft,
    /// [`Event::AvatarMoved`]
    AvatarMoved,
    /// [`Event::AvatarTypeChanged`]
    AvatarTypeChanged,
    /// [`Event::AvatarClicked`]
    AvatarClicked,
    /// [`Event::ObjectCreated`]
    ObjectCreated,
    /// [`Event::ObjectChanged`]
    ObjectChanged,
    /// [`Event::ObjectDeleted`]
    ObjectDeleted,
    /// [`Event::ObjectClicked`]
    ObjectClicked,
    /// [`Event::JoinRequestReceived`]
    JoinRequestReceived,
    /// [`Event::InviteRequestReceived`]
    InviteRequestReceived,
    /// [`Event::Teleported`]
    Teleported,
    /// [`Event::UniverseDisconnected`]
    UniverseDisconnected,
    /// [`Event::WorldDisconnected`]
    WorldDisconnected,
}

impl Event {
    /// The kind this event dispatches under.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MessageReceived(_) => EventKind::MessageReceived,
            Self::AvatarJoined(_) => EventKind::AvatarJoined,
            Self::AvatarLeft(_) => EventKind::AvatarLeft,
            Self::AvatarMoved(_) => EventKind::AvatarMoved,
            Self::AvatarTypeChanged(_) => EventKind::AvatarTypeChanged,
            Self::AvatarClicked(_) => EventKind::AvatarClicked,
            Self::ObjectCreated(_) => EventKind::ObjectCreated,
            Self::ObjectChanged(_) => EventKind::ObjectChanged,
            Self::ObjectDeleted(_) => EventKind::ObjectDeleted,
            Self::ObjectClicked(_) => EventKind::ObjectClicked,
            Self::JoinRequestReceived(_) => EventKind::JoinRequestReceived,
            Self::InviteRequestReceived(_) => EventKind::InviteRequestReceived,
            Self::Teleported(_) => EventKind::Teleported,
            Self::UniverseDisconnected(_) => EventKind::UniverseDisconnected,
            Self::WorldDisconnected(_) => EventKind::WorldDisconnected,
        }
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// Handle for removing a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct LaneItem {
    event: Event,
    followup: Option<Box<dyn FnOnce() + Send>>,
}

/// Per-kind ordered event dispatch.
pub(crate) struct EventBus {
    runtime: tokio::runtime::Handle,
    next_id: AtomicU64,
    subscribers: DashMap<EventKind, Vec<(SubscriptionId, Handler)>>,
    lanes: DashMap<EventKind, mpsc::UnboundedSender<LaneItem>>,
}

impl EventBus {
    pub fn new(runtime: tokio::runtime::Handle) -> Arc<Self> {
        Arc::new(Self {
            runtime,
            next_id: AtomicU64::new(1),
            subscribers: DashMap::new(),
            lanes: DashMap::new(),
        })
    }

    /// Register a handler for one event kind. Handlers of a kind run in
    /// registration order.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a previously registered handler. Returns whether it existed.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        match self.subscribers.get_mut(&kind) {
            Some(mut handlers) => {
                let before = handlers.len();
                handlers.retain(|(existing, _)| *existing != id);
                handlers.len() != before
            }
            None => false,
        }
    }

    pub fn emit(self: &Arc<Self>, event: Event) {
        self.push(LaneItem {
            event,
            followup: None,
        });
    }

    /// Emit an event and run `followup` on the lane task after every
    /// subscriber of *this* event has returned.
    pub fn emit_with_followup(self: &Arc<Self>, event: Event, followup: impl FnOnce() + Send + 'static) {
        self.push(LaneItem {
            event,
            followup: Some(Box::new(followup)),
        });
    }

    fn push(self: &Arc<Self>, item: LaneItem) {
        let kind = item.event.kind();
        let sender = self
            .lanes
            .entry(kind)
            .or_insert_with(|| self.spawn_lane(kind))
            .clone();
        if sender.send(item).is_err() {
            debug!(?kind, "event lane closed, dropping event");
        }
    }

    fn spawn_lane(self: &Arc<Self>, kind: EventKind) -> mpsc::UnboundedSender<LaneItem> {
        let (tx, mut rx) = mpsc::unbounded_channel::<LaneItem>();
        let bus = Arc::downgrade(self);
        self.runtime.spawn(async move {
            while let Some(item) = rx.recv().await {
                let Some(bus) = bus.upgrade() else { break };
                bus.deliver(kind, item);
            }
        });
        tx
    }

    fn deliver(&self, kind: EventKind, item: LaneItem) {
        let handlers: Vec<Handler> = self
            .subscribers
            .get(&kind)
            .map(|entry| entry.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        for handler in handlers {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&item.event)));
            if outcome.is_err() {
                error!(?kind, "event subscriber panicked");
            }
        }
        if let Some(followup) = item.followup {
            followup();
        }
    }
}

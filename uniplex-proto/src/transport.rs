//! The transport command surface and the callback surface it drives.

use crate::attributes::{FloatAttribute, IntAttribute, StringAttribute};
use crate::reason::ReasonCode;

/// Application-chosen correlation token echoed back by the transport.
///
/// 64 bits wide so that a monotonically increasing counter never has to
/// reuse a value within a realistic session lifetime.
pub type Reference = i64;

/// Where a pushed URL should be opened on the receiving client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlTarget {
    /// The client's external browser.
    Browser,
    /// An in-client overlay surface.
    Overlay,
}

/// Response callbacks: delivered once per issued command, either correlated
/// by the echoed [`Reference`] or as the "last operation of this kind".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackSlot {
    /// Outcome of `connect_universe`.
    ConnectUniverse,
    /// Outcome of `login`.
    Login,
    /// Outcome of `enter`.
    Enter,
    /// Terminal signal for a `world_list` enumeration.
    WorldList,
    /// Outcome of a reference-correlated `join`.
    Join,
    /// Outcome of a reference-correlated `invite`.
    Invite,
    /// Outcome of a reference-correlated object build.
    ObjectAdd,
    /// Outcome of a reference-correlated `object_change`.
    ObjectChange,
    /// Outcome of a reference-correlated `object_delete`.
    ObjectDelete,
}

/// Server-pushed events, delivered on the transport's own thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSlot {
    /// A chat or console message arrived.
    Chat,
    /// An avatar entered the vicinity.
    AvatarAdd,
    /// An avatar changed its position, rotation, or type.
    AvatarChange,
    /// An avatar left the vicinity.
    AvatarDelete,
    /// An avatar was clicked.
    AvatarClick,
    /// An object was created or loaded.
    Object,
    /// An object was deleted.
    ObjectDelete,
    /// An object was clicked.
    ObjectClick,
    /// One world of a `world_list` enumeration arrived.
    WorldList,
    /// One key/value pair of the entered world's settings arrived.
    WorldSetting,
    /// The entered world's settings are complete.
    WorldSettingsChanged,
    /// A user-attribute lookup response arrived.
    UserAttributes,
    /// A spatial cell query finished streaming its objects.
    QueryCellEnd,
    /// The server instructed this client to teleport.
    Teleport,
    /// Another user asked to join this client.
    Join,
    /// Another user invited this client somewhere.
    Invite,
    /// The universe connection dropped.
    UniverseDisconnect,
    /// The world connection dropped.
    WorldDisconnect,
}

/// The synchronous, single-threaded native session the engine drives.
///
/// None of these methods block beyond the immediate write/read; all
/// asynchronous outcomes arrive later through the [`CallbackSink`]. The
/// transport is **not** safe for concurrent use; the engine serializes
/// every call (including attribute I/O) behind its dispatch lock, and
/// implementations may assume that.
pub trait Transport: Send {
    /// Establish a connection to the universe server.
    fn connect_universe(&mut self, host: &str, port: u16) -> ReasonCode;
    /// Authenticate against the connected universe.
    fn login(&mut self, username: &str, password: &str, bot_name: &str) -> ReasonCode;
    /// Join the named world.
    fn enter(&mut self, world_name: &str) -> ReasonCode;
    /// Leave the current world.
    fn leave(&mut self) -> ReasonCode;

    /// Send a chat message to the current world.
    fn say(&mut self, message: &str) -> ReasonCode;
    /// Send a console message; `target_session` 0 broadcasts to the world.
    #[allow(clippy::too_many_arguments)]
    fn console_message(
        &mut self,
        target_session: i32,
        name: &str,
        message: &str,
        effects: i32,
        red: u8,
        green: u8,
        blue: u8,
    ) -> ReasonCode;

    /// Request the universe's world list; worlds stream in as events.
    fn world_list(&mut self, time: i32) -> ReasonCode;
    /// Request the attributes of a user account by id.
    fn user_attributes_by_id(&mut self, user_id: i32) -> ReasonCode;

    /// Invite a user to the given world location. Correlated by the
    /// reference set with [`set_reference`](Transport::set_reference).
    #[allow(clippy::too_many_arguments)]
    fn invite(
        &mut self,
        user_id: i32,
        world_name: &str,
        x: f64,
        y: f64,
        z: f64,
        yaw: f64,
        pitch: f64,
    ) -> ReasonCode;
    /// Ask to join a user wherever they are. Reference-correlated.
    fn join(&mut self, user_id: i32) -> ReasonCode;
    /// Accept an inbound join request, teleporting the requester here.
    #[allow(clippy::too_many_arguments)]
    fn join_accept(
        &mut self,
        request_id: i32,
        world_name: &str,
        x: f64,
        y: f64,
        z: f64,
        yaw: f64,
        pitch: f64,
    ) -> ReasonCode;
    /// Decline an inbound join request.
    fn join_decline(&mut self, request_id: i32) -> ReasonCode;
    /// Accept an inbound invite request.
    fn invite_accept(&mut self, request_id: i32) -> ReasonCode;
    /// Decline an inbound invite request.
    fn invite_decline(&mut self, request_id: i32) -> ReasonCode;

    /// Query all objects in one cell; they stream in as `Object` events
    /// with a responsible session of 0, terminated by `QueryCellEnd`.
    fn query_cell(&mut self, x: i32, z: i32) -> ReasonCode;
    /// Rewrite an object from the currently staged object attributes.
    /// Reference-correlated.
    fn object_change(&mut self, object_id: i32) -> ReasonCode;
    /// Delete an object by id. Reference-correlated.
    fn object_delete(&mut self, object_id: i32) -> ReasonCode;
    /// Click an object; the hit point is staged in the click attributes.
    fn object_click(&mut self, object_id: i32) -> ReasonCode;
    /// Click an avatar; the hit point is staged in the click attributes.
    fn avatar_click(&mut self, session: i32) -> ReasonCode;
    /// Push a URL to another session.
    fn url_send(&mut self, session: i32, url: &str, target: UrlTarget) -> ReasonCode;
    /// Announce this client's staged avatar position to the world.
    fn state_change(&mut self) -> ReasonCode;

    /// Read an integer attribute of the current command or callback.
    fn int(&self, attribute: IntAttribute) -> i32;
    /// Read a float attribute of the current command or callback.
    fn float(&self, attribute: FloatAttribute) -> f64;
    /// Read a string attribute of the current command or callback.
    fn string(&self, attribute: StringAttribute) -> String;
    /// Stage an integer attribute for the next command.
    fn set_int(&mut self, attribute: IntAttribute, value: i32);
    /// Stage a float attribute for the next command.
    fn set_float(&mut self, attribute: FloatAttribute, value: f64);
    /// Stage a string attribute for the next command.
    fn set_string(&mut self, attribute: StringAttribute, value: &str);
    /// Stage the correlation reference for the next command.
    fn set_reference(&mut self, reference: Reference);
    /// Read the correlation reference echoed by the current callback.
    fn reference(&self) -> Reference;
}

/// Handler surface registered with the transport at session creation.
///
/// The transport invokes both methods from its single delivery thread. For
/// the duration of an [`event`](CallbackSink::event) invocation, the
/// attribute slots addressed by that event remain readable through
/// [`Transport`]; the sink acquires the dispatch lock itself before reading
/// them.
pub trait CallbackSink: Send + Sync {
    /// A command response arrived.
    fn callback(&self, slot: CallbackSlot, reason: ReasonCode, reference: Reference);
    /// A server-pushed event arrived.
    fn event(&self, slot: EventSlot);
}

//! Named attribute slots.
//!
//! The transport exposes the payload of the *current* command or callback
//! through a fixed table of typed slots. A slot value is only meaningful
//! inside the dispatch-lock scope, immediately before a command is issued
//! (for outgoing attributes) or while the triggering callback is being
//! handled (for incoming attributes).

/// Integer-valued attribute slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntAttribute {
    /// Session id of the avatar a callback refers to.
    AvatarSession,
    /// Numeric type/posture code of an avatar.
    AvatarType,
    /// Session id assigned to this client's own avatar on world entry.
    MySession,
    /// Account id of the logged-in user.
    MyUserId,
    /// Id of the object a callback refers to.
    ObjectId,
    /// Account id of an object's owner.
    ObjectUserId,
    /// State code of a listed world.
    WorldState,
    /// Number of avatars currently in a listed world.
    WorldUsers,
    /// Side length of the entered world.
    WorldSize,
    /// Account id of the user a callback refers to.
    UserId,
    /// Unix timestamp of a user's registration.
    UserRegistrationTime,
    /// Cumulative online seconds of a user.
    UserOnlineTime,
    /// Unix timestamp of a user's most recent login.
    UserLastLogin,
    /// X coordinate of a spatial query cell.
    CellX,
    /// Z coordinate of a spatial query cell.
    CellZ,
    /// Session id of the avatar that was clicked.
    ClickedSession,
    /// Kind discriminator of an incoming message (chat or console).
    ChatType,
    /// Red component of a console message color.
    ChatColorRed,
    /// Green component of a console message color.
    ChatColorGreen,
    /// Blue component of a console message color.
    ChatColorBlue,
    /// Font-effect flags of a console message.
    ChatEffects,
    /// Error code attached to a disconnect event.
    DisconnectErrorCode,
    /// Id of an inbound join request.
    JoinId,
    /// Id of an inbound invite request.
    InviteId,
    /// Account id of the user behind an inbound invite.
    InviteUserId,
}

/// Floating-point attribute slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatAttribute {
    /// Avatar position, X component.
    AvatarX,
    /// Avatar position, Y component.
    AvatarY,
    /// Avatar position, Z component.
    AvatarZ,
    /// Avatar rotation, yaw in degrees.
    AvatarYaw,
    /// Avatar rotation, pitch in degrees.
    AvatarPitch,
    /// Object position, X component.
    ObjectX,
    /// Object position, Y component.
    ObjectY,
    /// Object position, Z component.
    ObjectZ,
    /// Object rotation, yaw in degrees.
    ObjectYaw,
    /// Object rotation, pitch in degrees.
    ObjectPitch,
    /// Click hit point, X component.
    ClickHitX,
    /// Click hit point, Y component.
    ClickHitY,
    /// Click hit point, Z component.
    ClickHitZ,
    /// Teleport destination, X component.
    TeleportX,
    /// Teleport destination, Y component.
    TeleportY,
    /// Teleport destination, Z component.
    TeleportZ,
    /// Teleport destination yaw in degrees.
    TeleportYaw,
    /// Teleport destination pitch in degrees.
    TeleportPitch,
    /// Invite target position, X component.
    InviteX,
    /// Invite target position, Y component.
    InviteY,
    /// Invite target position, Z component.
    InviteZ,
    /// Invite target yaw in degrees.
    InviteYaw,
    /// Invite target pitch in degrees.
    InvitePitch,
    /// Join result position, X component.
    JoinX,
    /// Join result position, Y component.
    JoinY,
    /// Join result position, Z component.
    JoinZ,
    /// Join result yaw in degrees.
    JoinYaw,
    /// Join result pitch in degrees.
    JoinPitch,
}

/// String-valued attribute slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringAttribute {
    /// Display name of the avatar a callback refers to.
    AvatarName,
    /// Name of the application an avatar is running.
    AvatarApplicationName,
    /// Version of the application an avatar is running.
    AvatarApplicationVersion,
    /// Content of an incoming chat or console message.
    ChatMessage,
    /// Model identifier of an object.
    ObjectModel,
    /// Action script of an object.
    ObjectAction,
    /// Description text of an object.
    ObjectDescription,
    /// Name of the world a callback refers to.
    WorldName,
    /// Key of a streamed world setting.
    WorldSettingKey,
    /// Value of a streamed world setting.
    WorldSettingValue,
    /// Display name of the user a callback refers to.
    UserName,
    /// Email address of the user a callback refers to.
    UserEmail,
    /// Destination world of a server-pushed teleport.
    TeleportWorld,
    /// World offered by an accepted join.
    JoinWorld,
    /// Display name attached to an inbound join request.
    JoinName,
    /// Avatar name attached to an inbound invite request.
    InviteName,
    /// World an inbound invite points at.
    InviteWorld,
    /// Name this client reports for itself at login.
    ApplicationName,
    /// Version this client reports for itself at login.
    ApplicationVersion,
}

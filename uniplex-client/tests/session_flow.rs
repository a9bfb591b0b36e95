//! Connection lifecycle, request correlation, and streaming scenarios
//! against the scripted mock transport.

mod common;

use common::{
    bring_in_world, connect, enter, harness, login, script_object, script_user, settle,
};
use uniplex_client::types::{Cell, ConnectionState, Location, Rotation, Vector3};
use uniplex_client::{ClientError, InviteOutcome, JoinOutcome};
use uniplex_proto::{
    CallbackSlot, EventSlot, FloatAttribute, IntAttribute, ReasonCode, StringAttribute,
};

#[tokio::test]
async fn connect_login_enter_happy_path() {
    let harness = harness();
    assert_eq!(
        harness.client.connection_state(),
        ConnectionState::Disconnected
    );

    bring_in_world(&harness).await;

    assert_eq!(harness.client.connection_state(), ConnectionState::InWorld);

    let user = harness.client.current_user().expect("current user");
    assert_eq!(user.id, 7);
    assert_eq!(user.name, "operator");

    let world = harness.client.current_world().expect("current world");
    assert_eq!(world.name, "alpha");
    assert_eq!(world.size, Some(32));
    assert_eq!(world.settings.get("sky").map(String::as_str), Some("day"));

    let avatar = harness.client.current_avatar().expect("current avatar");
    assert_eq!(avatar.session, 5);
    assert_eq!(avatar.name, "[Scout]");
    assert!(avatar.is_bot());
    assert_eq!(avatar.location.world.as_deref(), Some("alpha"));

    assert!(harness.client.is_self(5));
    assert!(!harness.client.is_self(6));
}

#[tokio::test]
async fn login_resolution_is_served_from_the_cache_afterwards() {
    let harness = harness();
    connect(&harness).await;
    login(&harness).await;

    // The login sequence already resolved account 7; asking again must not
    // touch the wire.
    assert_eq!(harness.control.command_count("user_attributes 7"), 1);
    let user = harness.client.get_user(7).await.expect("cached user");
    assert_eq!(user.name, "operator");
    assert_eq!(harness.control.command_count("user_attributes 7"), 1);
    assert!(harness.client.cached_user(7).is_some());
}

#[tokio::test]
async fn concurrent_lookups_share_one_command() {
    let harness = harness();
    connect(&harness).await;

    let first = harness.client.clone();
    let second = harness.client.clone();
    let first = tokio::spawn(async move { first.get_user(9).await });
    let second = tokio::spawn(async move { second.get_user(9).await });

    harness.control.wait_for_command("user_attributes 9").await;
    script_user(&harness.control, 9, "nine", "nine@example.org");
    harness.control.event(EventSlot::UserAttributes);

    let first = first.await.expect("task").expect("first");
    let second = second.await.expect("task").expect("second");
    assert_eq!(first, second);
    assert_eq!(harness.control.command_count("user_attributes 9"), 1);
}

#[tokio::test]
async fn duplicate_connect_is_rejected_while_in_flight() {
    let harness = harness();
    let client = harness.client.clone();
    let pending = tokio::spawn(async move { client.connect().await });
    harness.control.wait_for_command("connect_universe").await;

    let result = harness.client.connect().await;
    assert!(matches!(result, Err(ClientError::DuplicateRequest(_))));

    harness
        .control
        .callback(CallbackSlot::ConnectUniverse, ReasonCode::Success, 0);
    pending.await.expect("task").expect("connect");
    assert_eq!(
        harness.client.connection_state(),
        ConnectionState::ConnectedToUniverse
    );
}

#[tokio::test(start_paused = true)]
async fn requests_time_out_and_late_responses_are_ignored() {
    let harness = harness();
    let client = harness.client.clone();
    let pending = tokio::spawn(async move { client.connect().await });
    harness.control.wait_for_command("connect_universe").await;

    // No response: the deadline trips and the client returns to rest.
    let result = pending.await.expect("task");
    assert!(matches!(result, Err(ClientError::Timeout)));
    assert_eq!(
        harness.client.connection_state(),
        ConnectionState::Disconnected
    );

    // The response arriving after the deadline must change nothing.
    harness
        .control
        .callback(CallbackSlot::ConnectUniverse, ReasonCode::Success, 0);
    assert_eq!(
        harness.client.connection_state(),
        ConnectionState::Disconnected
    );

    // And a fresh attempt goes through.
    connect(&harness).await;
    assert_eq!(
        harness.client.connection_state(),
        ConnectionState::ConnectedToUniverse
    );
}

#[tokio::test]
async fn stale_reference_resolution_is_a_no_op() {
    let harness = harness();
    bring_in_world(&harness).await;

    // A correlated response for a reference nobody registered.
    harness
        .control
        .callback(CallbackSlot::Invite, ReasonCode::Success, 424_242);
    settle().await;
    assert_eq!(harness.client.connection_state(), ConnectionState::InWorld);
}

#[tokio::test]
async fn invite_outcomes_follow_the_correlated_reason() {
    let harness = harness();
    bring_in_world(&harness).await;

    let destination = Location::new("alpha", Vector3::new(1.0, 0.0, 1.0), Rotation::ZERO);

    let client = harness.client.clone();
    let target = destination.clone();
    let pending = tokio::spawn(async move { client.invite(9, target).await });
    harness.control.wait_for_command("invite 9 alpha").await;
    let reference = harness.control.staged_reference();
    harness
        .control
        .callback(CallbackSlot::Invite, ReasonCode::Success, reference);
    assert_eq!(
        pending.await.expect("task").expect("invite"),
        InviteOutcome::Accepted
    );

    let client = harness.client.clone();
    let pending = tokio::spawn(async move { client.invite(11, destination).await });
    harness.control.wait_for_command("invite 11 alpha").await;
    let reference = harness.control.staged_reference();
    harness
        .control
        .callback(CallbackSlot::Invite, ReasonCode::InviteDeclined, reference);
    assert_eq!(
        pending.await.expect("task").expect("invite"),
        InviteOutcome::Declined
    );
}

#[tokio::test]
async fn accepted_join_carries_the_host_location() {
    let harness = harness();
    bring_in_world(&harness).await;

    let client = harness.client.clone();
    let pending = tokio::spawn(async move { client.join(9).await });
    harness.control.wait_for_command("join 9").await;
    let reference = harness.control.staged_reference();

    harness
        .control
        .set_string(StringAttribute::JoinWorld, "beta");
    harness.control.set_float(FloatAttribute::JoinX, 4.0);
    harness.control.set_float(FloatAttribute::JoinY, 0.5);
    harness.control.set_float(FloatAttribute::JoinZ, -2.0);
    harness.control.set_float(FloatAttribute::JoinYaw, 90.0);
    harness.control.set_float(FloatAttribute::JoinPitch, 0.0);
    harness
        .control
        .callback(CallbackSlot::Join, ReasonCode::Success, reference);

    match pending.await.expect("task").expect("join") {
        JoinOutcome::Accepted(location) => {
            assert_eq!(location.world.as_deref(), Some("beta"));
            assert_eq!(location.position, Vector3::new(4.0, 0.5, -2.0));
            assert_eq!(location.rotation.yaw, 90.0);
        }
        JoinOutcome::Declined => panic!("join should have been accepted"),
    }
}

#[tokio::test]
async fn declined_join_is_an_outcome_not_an_error() {
    let harness = harness();
    bring_in_world(&harness).await;

    let client = harness.client.clone();
    let pending = tokio::spawn(async move { client.join(9).await });
    harness.control.wait_for_command("join 9").await;
    let reference = harness.control.staged_reference();
    harness
        .control
        .callback(CallbackSlot::Join, ReasonCode::JoinDeclined, reference);

    assert_eq!(
        pending.await.expect("task").expect("join"),
        JoinOutcome::Declined
    );
}

#[tokio::test]
async fn world_list_streams_each_world_exactly_once_and_terminates() {
    let harness = harness();
    connect(&harness).await;

    let client = harness.client.clone();
    let pending = tokio::spawn(async move { client.worlds().await });
    harness.control.wait_for_command("world_list").await;

    harness.control.set_string(StringAttribute::WorldName, "alpha");
    harness.control.set_int(IntAttribute::WorldState, 1);
    harness.control.set_int(IntAttribute::WorldUsers, 3);
    harness.control.event(EventSlot::WorldList);

    harness.control.set_string(StringAttribute::WorldName, "beta");
    harness.control.set_int(IntAttribute::WorldState, 2);
    harness.control.set_int(IntAttribute::WorldUsers, 0);
    harness.control.event(EventSlot::WorldList);

    harness
        .control
        .callback(CallbackSlot::WorldList, ReasonCode::Success, 0);

    let worlds = pending.await.expect("task").expect("worlds");
    let names: Vec<&str> = worlds.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(worlds[0].avatar_count, 3);

    // The listing also fed the world cache; a by-name fetch is free now.
    let beta = harness.client.get_world("beta").await.expect("beta");
    assert_eq!(beta.avatar_count, 0);
    assert_eq!(harness.control.command_count("world_list"), 1);
}

#[tokio::test]
async fn cell_query_streams_objects_and_closes_on_end() {
    let harness = harness();
    bring_in_world(&harness).await;

    let cell = Cell { x: 0, z: 0 };
    let mut stream = harness.client.query_cell(cell).expect("stream");
    assert!(harness.control.has_command("query_cell 0 0"));

    // A second query for the same cell while this one streams is refused.
    assert!(matches!(
        harness.client.query_cell(cell),
        Err(ClientError::DuplicateRequest(_))
    ));

    // Bulk loads carry a builder session of zero.
    script_object(&harness.control, 101, 0, 0.25, 0.75);
    harness.control.event(EventSlot::Object);
    script_object(&harness.control, 102, 0, 0.5, 0.5);
    harness.control.event(EventSlot::Object);

    harness.control.set_int(IntAttribute::CellX, 0);
    harness.control.set_int(IntAttribute::CellZ, 0);
    harness.control.event(EventSlot::QueryCellEnd);

    assert_eq!(stream.next().await.expect("first").id, 101);
    assert_eq!(stream.next().await.expect("second").id, 102);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn leave_clears_world_scoped_state_only() {
    let harness = harness();
    bring_in_world(&harness).await;

    common::script_avatar(&harness.control, 3, "Bob", 1.0, 0);
    harness.control.event(EventSlot::AvatarAdd);
    settle().await;
    assert_eq!(harness.client.avatars().len(), 1);

    harness.client.leave().expect("leave");

    assert_eq!(
        harness.client.connection_state(),
        ConnectionState::ConnectedToUniverse
    );
    assert!(harness.client.avatars().is_empty());
    assert!(harness.client.current_world().is_none());
    let avatar = harness.client.current_avatar().expect("still logged in");
    assert!(avatar.location.is_nowhere());
    // Universe-scoped state survives.
    assert!(harness.client.cached_user(7).is_some());

    // Entering again works from here.
    enter(&harness).await;
    assert_eq!(harness.client.connection_state(), ConnectionState::InWorld);
}

#[tokio::test]
async fn world_commands_require_a_world() {
    let harness = harness();
    connect(&harness).await;

    assert!(matches!(
        harness.client.say("hi"),
        Err(ClientError::NotInWorld)
    ));
    assert!(matches!(
        harness.client.query_cell(Cell { x: 0, z: 0 }),
        Err(ClientError::NotInWorld)
    ));
}

#[tokio::test]
async fn overlong_chat_is_rejected_locally() {
    let harness = harness();
    bring_in_world(&harness).await;

    let long = "x".repeat(300);
    assert!(matches!(
        harness.client.say(&long),
        Err(ClientError::StringTooLong { .. })
    ));
    assert!(!harness.control.has_command("say"));

    harness.client.say("short enough").expect("say");
    assert!(harness.control.has_command("say short enough"));
}

#[tokio::test]
async fn object_commands_resolve_by_reference() {
    let harness = harness();
    bring_in_world(&harness).await;

    let client = harness.client.clone();
    let pending = tokio::spawn(async move { client.delete_object(44).await });
    harness.control.wait_for_command("object_delete 44").await;
    let reference = harness.control.staged_reference();
    harness
        .control
        .callback(CallbackSlot::ObjectDelete, ReasonCode::Success, reference);
    pending.await.expect("task").expect("delete");
}

#[tokio::test]
async fn move_to_updates_the_current_avatar() {
    let harness = harness();
    bring_in_world(&harness).await;

    harness
        .client
        .move_to(Vector3::new(10.0, 0.0, -4.0), Rotation::new(180.0, 0.0))
        .expect("move");
    assert!(harness.control.has_command("state_change"));

    let avatar = harness.client.current_avatar().expect("avatar");
    assert_eq!(avatar.location.position, Vector3::new(10.0, 0.0, -4.0));
    assert_eq!(avatar.location.rotation.yaw, 180.0);
}

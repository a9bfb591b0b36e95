//! Shared test harness: a scriptable in-memory transport and helpers for
//! driving the connect/login/enter sequences.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use uniplex_client::{Client, ClientConfig};
use uniplex_proto::{
    CallbackSink, CallbackSlot, EventSlot, FloatAttribute, IntAttribute, ReasonCode, Reference,
    StringAttribute, Transport, UrlTarget,
};

/// Test-side handle on the mock transport: scripted attribute registers,
/// the command log, and the captured callback sink.
#[derive(Default)]
pub struct MockControl {
    sink: OnceLock<Arc<dyn CallbackSink>>,
    ints: Mutex<HashMap<IntAttribute, i32>>,
    floats: Mutex<HashMap<FloatAttribute, f64>>,
    strings: Mutex<HashMap<StringAttribute, String>>,
    commands: Mutex<Vec<String>>,
    refusals: Mutex<HashMap<&'static str, ReasonCode>>,
    staged_reference: Mutex<Reference>,
}

impl MockControl {
    pub fn set_int(&self, attribute: IntAttribute, value: i32) {
        self.ints.lock().insert(attribute, value);
    }

    pub fn set_float(&self, attribute: FloatAttribute, value: f64) {
        self.floats.lock().insert(attribute, value);
    }

    pub fn set_string(&self, attribute: StringAttribute, value: &str) {
        self.strings.lock().insert(attribute, value.to_string());
    }

    /// Make the named command fail immediately with `reason`.
    pub fn refuse(&self, command: &'static str, reason: ReasonCode) {
        self.refusals.lock().insert(command, reason);
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn has_command(&self, prefix: &str) -> bool {
        self.commands
            .lock()
            .iter()
            .any(|command| command.starts_with(prefix))
    }

    pub fn command_count(&self, prefix: &str) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|command| command.starts_with(prefix))
            .count()
    }

    /// The reference the engine staged for its most recent correlated
    /// command.
    pub fn staged_reference(&self) -> Reference {
        *self.staged_reference.lock()
    }

    fn sink(&self) -> Arc<dyn CallbackSink> {
        Arc::clone(self.sink.get().expect("transport was never built"))
    }

    /// Deliver a command response as the transport thread would.
    pub fn callback(&self, slot: CallbackSlot, reason: ReasonCode, reference: Reference) {
        self.sink().callback(slot, reason, reference);
    }

    /// Deliver a server-pushed event as the transport thread would.
    pub fn event(&self, slot: EventSlot) {
        self.sink().event(slot);
    }

    /// Yield until the command log contains an entry starting with
    /// `prefix`. Panics if it never appears.
    pub async fn wait_for_command(&self, prefix: &str) {
        self.wait_for_commands(prefix, 1).await;
    }

    /// Yield until at least `count` log entries start with `prefix`.
    /// Needed when a scenario issues the same command more than once.
    pub async fn wait_for_commands(&self, prefix: &str, count: usize) {
        for _ in 0..2000 {
            if self.command_count(prefix) >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "command {prefix:?} was not issued {count} times; log: {:?}",
            self.commands()
        );
    }

    fn record(&self, command: String) -> ReasonCode {
        let verb = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        self.commands.lock().push(command);
        self.refusals
            .lock()
            .get(verb.as_str())
            .copied()
            .unwrap_or(ReasonCode::Success)
    }
}

pub struct MockTransport {
    control: Arc<MockControl>,
}

impl Transport for MockTransport {
    fn connect_universe(&mut self, host: &str, port: u16) -> ReasonCode {
        self.control.record(format!("connect_universe {host}:{port}"))
    }

    fn login(&mut self, username: &str, _password: &str, bot_name: &str) -> ReasonCode {
        self.control.record(format!("login {username} {bot_name}"))
    }

    fn enter(&mut self, world_name: &str) -> ReasonCode {
        self.control.record(format!("enter {world_name}"))
    }

    fn leave(&mut self) -> ReasonCode {
        self.control.record("leave".to_string())
    }

    fn say(&mut self, message: &str) -> ReasonCode {
        self.control.record(format!("say {message}"))
    }

    fn console_message(
        &mut self,
        target_session: i32,
        name: &str,
        message: &str,
        _effects: i32,
        _red: u8,
        _green: u8,
        _blue: u8,
    ) -> ReasonCode {
        self.control
            .record(format!("console {target_session} {name} {message}"))
    }

    fn world_list(&mut self, time: i32) -> ReasonCode {
        self.control.record(format!("world_list {time}"))
    }

    fn user_attributes_by_id(&mut self, user_id: i32) -> ReasonCode {
        self.control.record(format!("user_attributes {user_id}"))
    }

    fn invite(
        &mut self,
        user_id: i32,
        world_name: &str,
        _x: f64,
        _y: f64,
        _z: f64,
        _yaw: f64,
        _pitch: f64,
    ) -> ReasonCode {
        self.control.record(format!("invite {user_id} {world_name}"))
    }

    fn join(&mut self, user_id: i32) -> ReasonCode {
        self.control.record(format!("join {user_id}"))
    }

    fn join_accept(
        &mut self,
        request_id: i32,
        world_name: &str,
        _x: f64,
        _y: f64,
        _z: f64,
        _yaw: f64,
        _pitch: f64,
    ) -> ReasonCode {
        self.control
            .record(format!("join_accept {request_id} {world_name}"))
    }

    fn join_decline(&mut self, request_id: i32) -> ReasonCode {
        self.control.record(format!("join_decline {request_id}"))
    }

    fn invite_accept(&mut self, request_id: i32) -> ReasonCode {
        self.control.record(format!("invite_accept {request_id}"))
    }

    fn invite_decline(&mut self, request_id: i32) -> ReasonCode {
        self.control.record(format!("invite_decline {request_id}"))
    }

    fn query_cell(&mut self, x: i32, z: i32) -> ReasonCode {
        self.control.record(format!("query_cell {x} {z}"))
    }

    fn object_change(&mut self, object_id: i32) -> ReasonCode {
        self.control.record(format!("object_change {object_id}"))
    }

    fn object_delete(&mut self, object_id: i32) -> ReasonCode {
        self.control.record(format!("object_delete {object_id}"))
    }

    fn object_click(&mut self, object_id: i32) -> ReasonCode {
        self.control.record(format!("object_click {object_id}"))
    }

    fn avatar_click(&mut self, session: i32) -> ReasonCode {
        self.control.record(format!("avatar_click {session}"))
    }

    fn url_send(&mut self, session: i32, url: &str, _target: UrlTarget) -> ReasonCode {
        self.control.record(format!("url_send {session} {url}"))
    }

    fn state_change(&mut self) -> ReasonCode {
        self.control.record("state_change".to_string())
    }

    fn int(&self, attribute: IntAttribute) -> i32 {
        self.control.ints.lock().get(&attribute).copied().unwrap_or(0)
    }

    fn float(&self, attribute: FloatAttribute) -> f64 {
        self.control
            .floats
            .lock()
            .get(&attribute)
            .copied()
            .unwrap_or(0.0)
    }

    fn string(&self, attribute: StringAttribute) -> String {
        self.control
            .strings
            .lock()
            .get(&attribute)
            .cloned()
            .unwrap_or_default()
    }

    fn set_int(&mut self, attribute: IntAttribute, value: i32) {
        self.control.set_int(attribute, value);
    }

    fn set_float(&mut self, attribute: FloatAttribute, value: f64) {
        self.control.set_float(attribute, value);
    }

    fn set_string(&mut self, attribute: StringAttribute, value: &str) {
        self.control.set_string(attribute, value);
    }

    fn set_reference(&mut self, reference: Reference) {
        *self.control.staged_reference.lock() = reference;
    }

    fn reference(&self) -> Reference {
        *self.control.staged_reference.lock()
    }
}

pub struct Harness {
    pub client: Client,
    pub control: Arc<MockControl>,
}

pub fn test_config() -> ClientConfig {
    ClientConfig::from_toml(
        r#"
            username = "operator"
            password = "hunter2"
            bot_name = "Scout"
            request_timeout_secs = 5

            [application]
            name = "uniplex-tests"
            version = "0.1"
        "#,
    )
    .expect("test config")
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn harness_with(config: ClientConfig) -> Harness {
    init_tracing();
    let control = Arc::new(MockControl::default());
    let captured = Arc::clone(&control);
    let client = Client::new(config, move |sink| {
        captured
            .sink
            .set(sink)
            .unwrap_or_else(|_| panic!("sink captured twice"));
        Box::new(MockTransport { control: captured })
    })
    .expect("client");
    Harness { client, control }
}

/// Let spawned event lanes drain.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
}

/// Drive a successful universe connection.
pub async fn connect(harness: &Harness) {
    let target = harness.control.command_count("connect_universe") + 1;
    let client = harness.client.clone();
    let task = tokio::spawn(async move { client.connect().await });
    harness
        .control
        .wait_for_commands("connect_universe", target)
        .await;
    harness
        .control
        .callback(CallbackSlot::ConnectUniverse, ReasonCode::Success, 0);
    task.await.expect("task").expect("connect");
}

/// Drive a successful login, answering the user lookup for account 7.
pub async fn login(harness: &Harness) {
    let client = harness.client.clone();
    let task = tokio::spawn(async move { client.login().await });
    harness.control.wait_for_command("login operator").await;
    harness.control.set_int(IntAttribute::MyUserId, 7);
    harness
        .control
        .callback(CallbackSlot::Login, ReasonCode::Success, 0);

    harness.control.wait_for_command("user_attributes 7").await;
    script_user(&harness.control, 7, "operator", "op@example.org");
    harness.control.event(EventSlot::UserAttributes);
    task.await.expect("task").expect("login");
}

/// Drive a successful world entry into "alpha".
pub async fn enter(harness: &Harness) {
    let target = harness.control.command_count("enter alpha") + 1;
    let client = harness.client.clone();
    let task = tokio::spawn(async move { client.enter("alpha").await });
    harness.control.wait_for_commands("enter alpha", target).await;
    harness.control.set_int(IntAttribute::WorldSize, 32);
    harness.control.set_int(IntAttribute::MySession, 5);
    harness
        .control
        .callback(CallbackSlot::Enter, ReasonCode::Success, 0);

    harness
        .control
        .set_string(StringAttribute::WorldSettingKey, "sky");
    harness
        .control
        .set_string(StringAttribute::WorldSettingValue, "day");
    harness.control.event(EventSlot::WorldSetting);
    harness.control.event(EventSlot::WorldSettingsChanged);
    task.await.expect("task").expect("enter");
}

/// Full connect + login + enter sequence.
pub async fn bring_in_world(harness: &Harness) {
    connect(harness).await;
    login(harness).await;
    enter(harness).await;
}

/// Stage the attribute registers for a user-attributes event.
pub fn script_user(control: &MockControl, id: i32, name: &str, email: &str) {
    control.set_int(IntAttribute::UserId, id);
    control.set_string(StringAttribute::UserName, name);
    control.set_string(StringAttribute::UserEmail, email);
    control.set_int(IntAttribute::UserRegistrationTime, 1_600_000_000);
    control.set_int(IntAttribute::UserLastLogin, 1_700_000_000);
    control.set_int(IntAttribute::UserOnlineTime, 3_600);
}

/// Stage the attribute registers for an avatar-scoped event.
pub fn script_avatar(control: &MockControl, session: i32, name: &str, x: f64, avatar_type: i32) {
    control.set_int(IntAttribute::AvatarSession, session);
    control.set_string(StringAttribute::AvatarName, name);
    control.set_float(FloatAttribute::AvatarX, x);
    control.set_float(FloatAttribute::AvatarY, 0.0);
    control.set_float(FloatAttribute::AvatarZ, 0.0);
    control.set_float(FloatAttribute::AvatarYaw, 0.0);
    control.set_float(FloatAttribute::AvatarPitch, 0.0);
    control.set_int(IntAttribute::AvatarType, avatar_type);
    control.set_string(StringAttribute::AvatarApplicationName, "viewer");
    control.set_string(StringAttribute::AvatarApplicationVersion, "1.0");
    control.set_int(IntAttribute::UserId, 0);
}

/// Stage the attribute registers for an object event.
pub fn script_object(control: &MockControl, id: i32, builder_session: i32, x: f64, z: f64) {
    control.set_int(IntAttribute::ObjectId, id);
    control.set_int(IntAttribute::ObjectUserId, 7);
    control.set_int(IntAttribute::AvatarSession, builder_session);
    control.set_float(FloatAttribute::ObjectX, x);
    control.set_float(FloatAttribute::ObjectY, 0.0);
    control.set_float(FloatAttribute::ObjectZ, z);
    control.set_float(FloatAttribute::ObjectYaw, 0.0);
    control.set_float(FloatAttribute::ObjectPitch, 0.0);
    control.set_string(StringAttribute::ObjectModel, "box.rwx");
    control.set_string(StringAttribute::ObjectDescription, "a box");
    control.set_string(StringAttribute::ObjectAction, "create sign");
}

//! Client-side session engine for Uniplex virtual-world servers.
//!
//! The engine drives a synchronous, single-threaded [`Transport`] (the
//! native protocol session) from an async application: it serializes all
//! transport access behind one dispatch lock, correlates command responses
//! back to their awaiting callers, maintains a live cache of avatars,
//! objects, users, and worlds, and translates raw wire events into typed
//! events delivered to subscribers off the transport thread.
//!
//! A minimal bot:
//!
//! ```no_run
//! use uniplex_client::{Client, ClientConfig};
//! use uniplex_client::events::{Event, EventKind};
//!
//! # async fn run(factory: impl FnOnce(std::sync::Arc<dyn uniplex_proto::CallbackSink>) -> Box<dyn uniplex_proto::Transport>) -> uniplex_client::Result<()> {
//! let config = ClientConfig::from_toml(
//!     "username = \"operator\"\npassword = \"hunter2\"\nbot_name = \"Greeter\"",
//! )?;
//! let client = Client::new(config, factory)?;
//! client.connect().await?;
//! client.login().await?;
//! client.enter("alpha").await?;
//! client.subscribe(EventKind::AvatarJoined, |event| {
//!     if let Event::AvatarJoined(avatar) = event {
//!         println!("{} arrived", avatar.name);
//!     }
//! });
//! client.say("hello, world")?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Transport`]: uniplex_proto::Transport

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod cache;
mod client;
pub mod config;
mod correlator;
pub mod entities;
pub mod error;
pub mod events;
pub mod requests;
mod router;
mod session;
pub mod streams;
pub mod types;

pub use client::{Client, InviteOutcome, JoinOutcome};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use streams::{ObjectStream, WorldStream};

pub use uniplex_proto;

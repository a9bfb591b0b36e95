//! # uniplex-proto: Transport Boundary Contract
//!
//! The Uniplex session engine sits on top of a connection-oriented
//! virtual-world transport that is single-threaded, callback-driven, and
//! addressed through a fixed table of named attribute slots. This crate
//! defines that boundary and nothing else:
//!
//! - [`ReasonCode`]: outcome codes for commands and callbacks
//! - [`IntAttribute`] / [`FloatAttribute`] / [`StringAttribute`]: the
//!   attribute slot enumerations
//! - [`Transport`]: the command + attribute I/O surface the engine drives
//! - [`CallbackSink`]: the handler surface the engine hands to the
//!   transport at session creation
//!
//! No engine logic lives here. Implementations of [`Transport`] (the real
//! socket transport, test mocks) live outside the engine crate; the engine
//! only ever talks to `dyn Transport` behind its dispatch lock.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attributes;
pub mod reason;
pub mod transport;

pub use attributes::{FloatAttribute, IntAttribute, StringAttribute};
pub use reason::ReasonCode;
pub use transport::{CallbackSink, CallbackSlot, EventSlot, Reference, Transport, UrlTarget};

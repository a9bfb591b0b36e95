//! The dispatch lock around the transport.
//!
//! The transport is single-threaded by contract: commands and the attribute
//! registers they read or write must not interleave. `Session` makes that
//! structural: the only way to touch the transport is inside a closure
//! passed to [`Session::with`], and the lock scope bounds the whole
//! command + attribute sequence.
//!
//! Nothing observable to the application may happen inside the scope:
//! no event emission, no completion resolution, no subscriber code.

use crate::error::{ClientError, Result};
use parking_lot::Mutex;
use uniplex_proto::Transport;

pub(crate) struct Session {
    transport: Mutex<Option<Box<dyn Transport>>>,
}

impl Session {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Mutex::new(Some(transport)),
        }
    }

    /// Run `f` with exclusive access to the transport.
    ///
    /// Fails with `NotConnected` once the session has been destroyed. The
    /// closure is synchronous; the guard is never held across an await.
    pub fn with<T>(&self, f: impl FnOnce(&mut dyn Transport) -> T) -> Result<T> {
        let mut guard = self.transport.lock();
        match guard.as_mut() {
            Some(transport) => Ok(f(transport.as_mut())),
            None => Err(ClientError::NotConnected),
        }
    }

    /// Like [`Session::with`], but silently a no-op when already destroyed.
    /// Router paths use this: a late event against a dead session is not an
    /// error.
    pub fn try_with<T>(&self, f: impl FnOnce(&mut dyn Transport) -> T) -> Option<T> {
        let mut guard = self.transport.lock();
        guard.as_mut().map(|transport| f(transport.as_mut()))
    }

    /// Tear the transport down. Further `with` calls fail with
    /// `NotConnected`. Idempotent.
    pub fn destroy(&self) {
        let mut guard = self.transport.lock();
        *guard = None;
    }
}

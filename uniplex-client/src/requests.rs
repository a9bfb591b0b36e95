//! Answerable inbound requests.
//!
//! Join and invite events carry a server-side request id that must be
//! answered exactly once. The handles here wrap that id together with the
//! session, so a subscriber (or any later holder of the event) can answer
//! from wherever it likes. All clones of one handle share the single
//! answer; a second answer is rejected locally without touching the wire.

use crate::entities::User;
use crate::error::{ClientError, Result, from_reason};
use crate::session::Session;
use crate::types::Location;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

struct Answerable {
    session: Weak<Session>,
    answered: AtomicBool,
}

impl Answerable {
    fn new(session: Weak<Session>) -> Arc<Self> {
        Arc::new(Self {
            session,
            answered: AtomicBool::new(false),
        })
    }

    fn answer<T>(
        &self,
        what: &'static str,
        f: impl FnOnce(&mut dyn uniplex_proto::Transport) -> T,
    ) -> Result<T> {
        if self.answered.swap(true, Ordering::SeqCst) {
            return Err(ClientError::DuplicateRequest(what));
        }
        let session = self.session.upgrade().ok_or(ClientError::NotConnected)?;
        session.with(f)
    }
}

/// An inbound "may I join you?" request from another user.
#[derive(Clone)]
pub struct JoinRequest {
    request_id: i32,
    name: String,
    user: Option<User>,
    /// Where an unqualified accept sends the requester: the current
    /// avatar's location at the moment the request arrived.
    here: Location,
    shared: Arc<Answerable>,
}

impl JoinRequest {
    pub(crate) fn new(
        request_id: i32,
        name: String,
        user: Option<User>,
        here: Location,
        session: Weak<Session>,
    ) -> Self {
        Self {
            request_id,
            name,
            user,
            here,
            shared: Answerable::new(session),
        }
    }

    /// Display name the requester gave.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The requester's resolved account, when the lookup succeeded.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Accept, teleporting the requester to `location` (or to where we were
    /// when the request arrived).
    pub fn accept(&self, location: Option<Location>) -> Result<()> {
        let target = location.unwrap_or_else(|| self.here.clone());
        let world = target.world.clone().unwrap_or_default();
        let reason = self.shared.answer("join response", |transport| {
            transport.join_accept(
                self.request_id,
                &world,
                target.position.x,
                target.position.y,
                target.position.z,
                target.rotation.yaw,
                target.rotation.pitch,
            )
        })?;
        from_reason(reason)
    }

    /// Decline the request.
    pub fn decline(&self) -> Result<()> {
        let reason = self
            .shared
            .answer("join response", |transport| {
                transport.join_decline(self.request_id)
            })?;
        from_reason(reason)
    }
}

impl fmt::Debug for JoinRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinRequest")
            .field("request_id", &self.request_id)
            .field("name", &self.name)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// An inbound "come here" invitation from another user.
#[derive(Clone)]
pub struct InviteRequest {
    request_id: i32,
    name: String,
    user: Option<User>,
    location: Location,
    shared: Arc<Answerable>,
}

impl InviteRequest {
    pub(crate) fn new(
        request_id: i32,
        name: String,
        user: Option<User>,
        location: Location,
        session: Weak<Session>,
    ) -> Self {
        Self {
            request_id,
            name,
            user,
            location,
            shared: Answerable::new(session),
        }
    }

    /// Display name the inviter gave.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The inviter's resolved account, when the lookup succeeded.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Where the inviter wants us to come.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Accept the invitation. Actually travelling there is up to the
    /// caller; this only reports the decision back.
    pub fn accept(&self) -> Result<()> {
        let reason = self
            .shared
            .answer("invite response", |transport| {
                transport.invite_accept(self.request_id)
            })?;
        from_reason(reason)
    }

    /// Decline the invitation.
    pub fn decline(&self) -> Result<()> {
        let reason = self
            .shared
            .answer("invite response", |transport| {
                transport.invite_decline(self.request_id)
            })?;
        from_reason(reason)
    }
}

impl fmt::Debug for InviteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InviteRequest")
            .field("request_id", &self.request_id)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

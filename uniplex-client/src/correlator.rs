//! Request correlation.
//!
//! Three shapes of pending work live here:
//!
//! - reference-multiplexed requests (join, invite, object commands), matched
//!   by the 64-bit reference the transport echoes back;
//! - single-slot requests (connect, login, enter, world settings), where the
//!   transport reports only "the last operation of this kind";
//! - deduplicated user lookups, where any number of callers share one
//!   outstanding wire command per user id.
//!
//! All slots resolve through `oneshot` channels. Dropping a sender closes the
//! channel, which awaiting callers observe as a transport failure.

use crate::entities::User;
use crate::types::{Location, UserId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::oneshot;
use tracing::debug;
use uniplex_proto::{ReasonCode, Reference};

/// What a reference-correlated callback resolved to.
#[derive(Debug)]
pub(crate) enum Resolution {
    /// A plain outcome code.
    Reason(ReasonCode),
    /// A join response, carrying the host's location when accepted.
    Join {
        reason: ReasonCode,
        location: Option<Location>,
    },
}

/// The four request kinds the wire reports without a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SlotKind {
    Connect,
    Login,
    Enter,
    WorldSettings,
}

impl SlotKind {
    fn name(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Login => "login",
            Self::Enter => "enter",
            Self::WorldSettings => "world settings",
        }
    }
}

/// Outcome of registering a deduplicated user lookup.
pub(crate) enum LookupTicket {
    /// This caller is first; it must issue the wire command.
    First(oneshot::Receiver<User>),
    /// A lookup for this user is already in flight; just await it.
    Joined(oneshot::Receiver<User>),
}

impl LookupTicket {
    pub fn into_receiver(self) -> oneshot::Receiver<User> {
        match self {
            Self::First(rx) | Self::Joined(rx) => rx,
        }
    }
}

#[derive(Default)]
pub(crate) struct Correlator {
    next_reference: AtomicI64,
    referenced: DashMap<Reference, oneshot::Sender<Resolution>>,
    singles: DashMap<SlotKind, oneshot::Sender<ReasonCode>>,
    lookups: DashMap<UserId, Vec<oneshot::Sender<User>>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_reference: AtomicI64::new(1),
            ..Self::default()
        }
    }

    /// Allocate a fresh correlation reference. References are never reused
    /// within a session.
    pub fn next_reference(&self) -> Reference {
        self.next_reference.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a reference-correlated request.
    pub fn register(&self, reference: Reference) -> oneshot::Receiver<Resolution> {
        let (tx, rx) = oneshot::channel();
        self.referenced.insert(reference, tx);
        rx
    }

    /// Resolve a reference-correlated request. An unknown reference (already
    /// resolved, timed out, or never ours) is a logged no-op.
    pub fn resolve(&self, reference: Reference, resolution: Resolution) {
        match self.referenced.remove(&reference) {
            Some((_, tx)) => {
                if tx.send(resolution).is_err() {
                    debug!(reference, "correlated response arrived after the caller gave up");
                }
            }
            None => debug!(reference, "response for an unknown reference, dropping"),
        }
    }

    /// Drop a referenced slot without resolving it (timeout cleanup).
    pub fn abandon(&self, reference: Reference) {
        self.referenced.remove(&reference);
    }

    /// Register a single-slot request. Fails while a live same-kind request
    /// is pending; a stale slot whose caller already gave up is replaced.
    pub fn register_single(
        &self,
        kind: SlotKind,
    ) -> Result<oneshot::Receiver<ReasonCode>, &'static str> {
        let (tx, rx) = oneshot::channel();
        match self.singles.entry(kind) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if entry.get().is_closed() {
                    entry.insert(tx);
                    Ok(rx)
                } else {
                    Err(kind.name())
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(tx);
                Ok(rx)
            }
        }
    }

    /// Resolve the pending single-slot request of this kind, if any.
    pub fn resolve_single(&self, kind: SlotKind, reason: ReasonCode) {
        match self.singles.remove(&kind) {
            Some((_, tx)) => {
                if tx.send(reason).is_err() {
                    debug!(kind = kind.name(), "single-slot response arrived after timeout");
                }
            }
            None => debug!(kind = kind.name(), "unsolicited single-slot response, dropping"),
        }
    }

    /// Drop a single slot only if its caller has already gone away. A live
    /// newer request registered in the meantime is left untouched.
    pub fn abandon_single(&self, kind: SlotKind) {
        self.singles.remove_if(&kind, |_, tx| tx.is_closed());
    }

    /// Join (or start) a deduplicated lookup for this user id.
    pub fn register_lookup(&self, user_id: UserId) -> LookupTicket {
        let (tx, rx) = oneshot::channel();
        match self.lookups.entry(user_id) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let waiters = entry.get_mut();
                waiters.retain(|waiter| !waiter.is_closed());
                if waiters.is_empty() {
                    // Every earlier caller timed out; the in-flight command
                    // is gone with them, so this caller starts over.
                    waiters.push(tx);
                    LookupTicket::First(rx)
                } else {
                    waiters.push(tx);
                    LookupTicket::Joined(rx)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(vec![tx]);
                LookupTicket::First(rx)
            }
        }
    }

    /// Deliver a resolved user to every waiter registered for its id.
    pub fn resolve_lookup(&self, user: &User) {
        if let Some((_, waiters)) = self.lookups.remove(&user.id) {
            for waiter in waiters {
                let _ = waiter.send(user.clone());
            }
        }
    }

    /// Drop every pending slot. Awaiting callers observe channel closure.
    pub fn fail_all(&self) {
        self.referenced.clear();
        self.singles.clear();
        self.lookups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_unique_and_start_at_one() {
        let correlator = Correlator::new();
        assert_eq!(correlator.next_reference(), 1);
        assert_eq!(correlator.next_reference(), 2);
        assert_eq!(correlator.next_reference(), 3);
    }

    #[tokio::test]
    async fn resolution_removes_the_slot() {
        let correlator = Correlator::new();
        let reference = correlator.next_reference();
        let rx = correlator.register(reference);

        correlator.resolve(reference, Resolution::Reason(ReasonCode::Success));
        match rx.await.expect("resolved") {
            Resolution::Reason(reason) => assert!(reason.is_success()),
            other => panic!("unexpected resolution: {other:?}"),
        }

        // Second resolution of the same reference must be a no-op.
        correlator.resolve(reference, Resolution::Reason(ReasonCode::Timeout));
    }

    #[test]
    fn duplicate_single_is_rejected_while_live() {
        let correlator = Correlator::new();
        let _rx = correlator.register_single(SlotKind::Connect).expect("first");
        assert!(matches!(
            correlator.register_single(SlotKind::Connect),
            Err("connect")
        ));
        // A different kind is unaffected.
        assert!(correlator.register_single(SlotKind::Login).is_ok());
    }

    #[tokio::test]
    async fn stale_single_slot_is_replaced() {
        let correlator = Correlator::new();
        let rx = correlator.register_single(SlotKind::Enter).expect("first");
        drop(rx);

        let rx = correlator.register_single(SlotKind::Enter).expect("replaced");
        correlator.resolve_single(SlotKind::Enter, ReasonCode::Success);
        assert!(rx.await.expect("resolved").is_success());
    }

    #[tokio::test]
    async fn abandon_single_spares_a_newer_request() {
        let correlator = Correlator::new();
        let rx = correlator.register_single(SlotKind::Login).expect("first");
        drop(rx);
        let rx = correlator.register_single(SlotKind::Login).expect("second");

        // The first caller's timeout cleanup runs late; the live second
        // slot must survive it.
        correlator.abandon_single(SlotKind::Login);
        correlator.resolve_single(SlotKind::Login, ReasonCode::Success);
        assert!(rx.await.expect("resolved").is_success());
    }

    #[tokio::test]
    async fn lookups_deduplicate_and_drain_together() {
        let correlator = Correlator::new();
        let first = correlator.register_lookup(9);
        assert!(matches!(first, LookupTicket::First(_)));
        let second = correlator.register_lookup(9);
        assert!(matches!(second, LookupTicket::Joined(_)));

        let user = User::from_attributes(9, "nine".into(), String::new(), 0, 0, 0);
        correlator.resolve_lookup(&user);

        assert_eq!(first.into_receiver().await.expect("first").name, "nine");
        assert_eq!(second.into_receiver().await.expect("second").name, "nine");
        // The lookup drained; the next caller starts a fresh command.
        assert!(matches!(correlator.register_lookup(9), LookupTicket::First(_)));
    }

    #[test]
    fn abandoned_lookup_restarts_the_command() {
        let correlator = Correlator::new();
        let first = correlator.register_lookup(9);
        drop(first);

        // All prior waiters gone: the next caller is First again.
        assert!(matches!(correlator.register_lookup(9), LookupTicket::First(_)));
    }

    #[tokio::test]
    async fn fail_all_closes_every_channel() {
        let correlator = Correlator::new();
        let reference = correlator.next_reference();
        let referenced = correlator.register(reference);
        let single = correlator.register_single(SlotKind::Connect).expect("single");
        let lookup = correlator.register_lookup(9).into_receiver();

        correlator.fail_all();

        assert!(referenced.await.is_err());
        assert!(single.await.is_err());
        assert!(lookup.await.is_err());
    }
}

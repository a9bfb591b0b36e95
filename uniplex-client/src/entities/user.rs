//! User accounts, universe-scoped.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A user account known to the universe server.
///
/// Identity (the id) is immutable; profile fields are refreshed in place on
/// every lookup. Users stay cached for the lifetime of the session; account
/// identity is universe-scoped, not world-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable account id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// When the account was registered.
    pub registered_at: DateTime<Utc>,
    /// Most recent login time.
    pub last_login: DateTime<Utc>,
    /// Cumulative time spent online.
    pub online_time: Duration,
}

impl User {
    /// Build a user from the raw attribute representation: Unix-second
    /// timestamps and cumulative online seconds.
    #[must_use]
    pub fn from_attributes(
        id: UserId,
        name: String,
        email: String,
        registered_unix: i64,
        last_login_unix: i64,
        online_seconds: i64,
    ) -> Self {
        let to_utc = |secs: i64| {
            DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        };
        Self {
            id,
            name,
            email,
            registered_at: to_utc(registered_unix),
            last_login: to_utc(last_login_unix),
            online_time: Duration::from_secs(online_seconds.max(0).unsigned_abs()),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User [Id={}, Name={}]", self.id, self.name)
    }
}

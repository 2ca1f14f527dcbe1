//! Login sessions keyed by the `sessionId` cookie.
//!
//! Sessions are only dropped on logout; there is no expiry, so abandoned
//! sessions stay in memory for the life of the process.

use std::{fmt, str::FromStr};

use dashmap::DashMap;
use uuid::Uuid;

/// Identifier stored in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Identity attached to a browser after a successful OpenID login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Claimed identifier returned by the OpenID provider.
    pub open_id: String,
}

/// Registry of live sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session for `open_id` and return its identifier.
    pub fn create(&self, open_id: String) -> SessionId {
        let id = SessionId::generate();
        self.sessions.insert(id, Session { open_id });
        id
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Drop a session. Returns the removed session if it existed.
    pub fn remove(&self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

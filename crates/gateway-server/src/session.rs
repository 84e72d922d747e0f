//! In-memory login sessions and pending OAuth states.

use dashmap::DashMap;
use rand::{distributions::Alphanumeric, Rng};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Name of the signed session cookie
pub const SESSION_COOKIE: &str = "router-session";

const SESSION_ID_LEN: usize = 48;
const STATE_LEN: usize = 32;

/// Random alphanumeric string
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A logged-in user
#[derive(Debug, Clone)]
pub struct Session {
    /// Identity-provider login
    pub username: String,
    /// Creation time
    pub created_at: Instant,
}

/// Sessions keyed by the id stored in the session cookie
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store whose sessions live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Start a session and return its id. Expired sessions are dropped first.
    pub fn create(&self, username: impl Into<String>) -> String {
        self.purge_expired();

        let id = random_token(SESSION_ID_LEN);
        self.sessions.insert(
            id.clone(),
            Session {
                username: username.into(),
                created_at: Instant::now(),
            },
        );
        id
    }

    /// Live session for `id`. Expired sessions are dropped.
    pub fn get(&self, id: &str) -> Option<Session> {
        let session = self.sessions.get(id).map(|s| s.clone())?;
        if session.created_at.elapsed() > self.ttl {
            self.sessions.remove(id);
            return None;
        }
        Some(session)
    }

    /// End a session
    pub fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }

    /// Drop every expired session, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.created_at.elapsed() <= self.ttl);
        before - self.sessions.len()
    }

    /// Number of stored sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Single-use `state` values handed out by `/login`
#[derive(Debug, Clone)]
pub struct LoginStates {
    pending: Arc<DashMap<String, Instant>>,
    ttl: Duration,
}

impl LoginStates {
    /// Create an empty set whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Issue a fresh state value
    pub fn begin(&self) -> String {
        let now = Instant::now();
        self.pending
            .retain(|_, issued| now.duration_since(*issued) <= self.ttl);

        let state = random_token(STATE_LEN);
        self.pending.insert(state.clone(), now);
        state
    }

    /// Consume `state`. Returns false for unknown, reused or expired values.
    pub fn complete(&self, state: &str) -> bool {
        self.pending
            .remove(state)
            .is_some_and(|(_, issued)| issued.elapsed() <= self.ttl)
    }
}

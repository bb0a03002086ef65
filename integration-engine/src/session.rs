//! Per-operator session: bearer token, current user and the permission cache.
//!
//! Every login, logout, expiry and role mutation bumps the session
//! `generation` and empties the cache. A permission decision computed under
//! an older generation is dropped instead of stored, so a demotion is never
//! masked by a decision that was still in flight.
//!
//! Sessions opened by one engine share a [`RoleEpoch`]. A role mutation made
//! through any of them advances it, and every other session drops its cached
//! user and decisions the next time it is consulted.

use crate::models::User;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    /// The remote service answered 401.
    Expired,
    RolesChanged,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: Secret<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Secret::new(password.into()),
        }
    }
}

/// Count of role and profile changes seen across every session of an engine.
#[derive(Debug, Clone, Default)]
pub struct RoleEpoch(Arc<AtomicU64>);

impl RoleEpoch {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<Secret<String>>,
    user: Option<User>,
    generation: u64,
    permissions: HashMap<String, bool>,
    /// Last epoch this session caught up with; `None` until first consulted.
    seen_epoch: Option<u64>,
}

impl SessionState {
    fn clear_cache(&mut self) {
        self.permissions.clear();
        self.user = None;
        self.generation += 1;
    }

    /// Returns true when a role change elsewhere emptied the cache.
    fn catch_up(&mut self, epoch: u64) -> bool {
        match self.seen_epoch.replace(epoch) {
            Some(seen) if seen != epoch => {
                self.clear_cache();
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    epoch: RoleEpoch,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::from_state(SessionState::default())
    }

    /// Resume a session from a token kept elsewhere (e.g. a server-side web session).
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::from_state(SessionState {
            token: Some(Secret::new(token.into())),
            ..SessionState::default()
        })
    }

    fn from_state(state: SessionState) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(RwLock::new(state)),
            events,
            epoch: RoleEpoch::default(),
        }
    }

    /// Share `epoch` with the other sessions of the same engine.
    pub fn joined(mut self, epoch: RoleEpoch) -> Self {
        self.epoch = epoch;
        self
    }

    /// Write access to the state, after dropping whatever a role change
    /// made through another session invalidated.
    async fn current_state(&self) -> tokio::sync::RwLockWriteGuard<'_, SessionState> {
        let mut state = self.state.write().await;
        if state.catch_up(self.epoch.current()) {
            tracing::debug!("Roles changed in another session, permission cache cleared");
            let _ = self.events.send(SessionEvent::RolesChanged);
        }
        state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn token(&self) -> Option<Secret<String>> {
        self.state.read().await.token.clone()
    }

    /// Plain token, for hosts that persist it between calls.
    pub async fn token_value(&self) -> Option<String> {
        self.state
            .read()
            .await
            .token
            .as_ref()
            .map(|t| t.expose_secret().clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.token.is_some()
    }

    pub async fn user(&self) -> Option<User> {
        self.current_state().await.user.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.current_state().await.generation
    }

    pub async fn establish(&self, token: String, user: Option<User>) {
        {
            let mut state = self.state.write().await;
            state.token = Some(Secret::new(token));
            state.user = user;
            state.permissions.clear();
            state.generation += 1;
        }
        tracing::info!("Session established");
        let _ = self.events.send(SessionEvent::LoggedIn);
    }

    /// Remember the current user unless the session moved on in the meantime.
    pub async fn remember_user(&self, user: User, generation: u64) -> bool {
        let mut state = self.current_state().await;
        if state.generation != generation || state.token.is_none() {
            return false;
        }
        state.user = Some(user);
        true
    }

    pub async fn teardown(&self, event: SessionEvent) {
        {
            let mut state = self.state.write().await;
            state.token = None;
            state.user = None;
            state.permissions.clear();
            state.generation += 1;
        }
        match event {
            SessionEvent::Expired => tracing::warn!("Session expired, credentials cleared"),
            _ => tracing::info!(event = ?event, "Session closed"),
        }
        let _ = self.events.send(event);
    }

    /// Drop cached decisions and the cached user after a role change, here
    /// and in every session sharing this one's epoch.
    pub async fn invalidate_permissions(&self) {
        {
            let mut state = self.state.write().await;
            let epoch = self.epoch.advance();
            state.seen_epoch = Some(epoch);
            state.clear_cache();
        }
        tracing::debug!("Permission cache cleared");
        let _ = self.events.send(SessionEvent::RolesChanged);
    }

    pub async fn cached_decision(&self, module: &str) -> Option<bool> {
        self.current_state().await.permissions.get(module).copied()
    }

    /// Store a decision computed under `generation`. Returns false when the
    /// session was invalidated while the decision was being computed.
    pub async fn store_decision(&self, module: &str, decision: bool, generation: u64) -> bool {
        let mut state = self.current_state().await;
        if state.generation != generation {
            return false;
        }
        state.permissions.insert(module.to_string(), decision);
        true
    }
}

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod startup;

use dashmap::DashMap;
use integration_engine::lifecycle::AnalyzedIntake;
use integration_engine::models::UserId;
use integration_engine::{Engine, EngineContext};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How long an analyzed file waits for submission before it is dropped.
const INTAKE_TTL: Duration = Duration::from_secs(30 * 60);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub operators: Arc<OperatorSessions>,
    pub intakes: Arc<IntakeStore>,
}

impl AppState {
    /// `session_idle` should match the web session's inactivity expiry.
    pub fn new(engine: Engine, session_idle: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            operators: Arc::new(OperatorSessions::new(session_idle)),
            intakes: Arc::new(IntakeStore::default()),
        }
    }
}

struct OpenOperator {
    context: EngineContext,
    last_seen: Instant,
}

/// Engine contexts keyed by bearer token, so one operator's permission
/// cache survives across HTTP requests for the life of the session.
///
/// Contexts idle for longer than the web session are dropped on the next
/// sign-in, since their cookie can no longer reach them.
pub struct OperatorSessions {
    contexts: DashMap<String, OpenOperator>,
    idle: Duration,
}

impl OperatorSessions {
    pub fn new(idle: Duration) -> Self {
        Self {
            contexts: DashMap::new(),
            idle,
        }
    }

    pub fn get_or_open(&self, engine: &Engine, token: &str) -> EngineContext {
        let mut entry = self
            .contexts
            .entry(token.to_string())
            .or_insert_with(|| OpenOperator {
                context: engine.open_session(integration_engine::session::Session::with_token(token)),
                last_seen: Instant::now(),
            });
        entry.last_seen = Instant::now();
        entry.context.clone()
    }

    pub fn insert(&self, token: String, context: EngineContext) {
        self.prune();
        self.contexts.insert(
            token,
            OpenOperator {
                context,
                last_seen: Instant::now(),
            },
        );
    }

    pub fn remove(&self, token: &str) -> Option<EngineContext> {
        self.contexts.remove(token).map(|(_, open)| open.context)
    }

    /// Drop contexts whose web session has expired from inactivity.
    pub fn prune(&self) {
        let before = self.contexts.len();
        self.contexts
            .retain(|_, open| open.last_seen.elapsed() < self.idle);
        let dropped = before.saturating_sub(self.contexts.len());
        if dropped > 0 {
            tracing::debug!(dropped, "Idle operator contexts dropped");
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

struct PendingIntake {
    owner: UserId,
    intake: AnalyzedIntake,
    stored_at: Instant,
}

/// Analyzed files waiting for the operator to confirm submission.
#[derive(Default)]
pub struct IntakeStore {
    entries: DashMap<Uuid, PendingIntake>,
}

impl IntakeStore {
    pub fn put(&self, owner: UserId, intake: AnalyzedIntake) -> Uuid {
        self.entries
            .retain(|_, pending| pending.stored_at.elapsed() < INTAKE_TTL);

        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            PendingIntake {
                owner,
                intake,
                stored_at: Instant::now(),
            },
        );
        id
    }

    /// Hand a refused submission back so the operator can retry it.
    pub fn restore(&self, id: Uuid, owner: UserId, intake: AnalyzedIntake) {
        self.entries.insert(
            id,
            PendingIntake {
                owner,
                intake,
                stored_at: Instant::now(),
            },
        );
    }

    /// Remove the intake if it exists and belongs to `owner`.
    pub fn take(&self, id: Uuid, owner: UserId) -> Option<AnalyzedIntake> {
        self.entries
            .remove_if(&id, |_, pending| {
                pending.owner == owner && pending.stored_at.elapsed() < INTAKE_TTL
            })
            .map(|(_, pending)| pending.intake)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

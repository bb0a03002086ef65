//! integration-engine: lifecycle and access control for bulk integration requests.
//!
//! [`Engine`] is built once per process from [`EngineSettings`]. Each operator
//! session gets an [`EngineContext`], which bundles the remote adapters with
//! that session's token and permission cache.

pub mod access;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod query;
pub mod services;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

use access::{PermissionResolver, RoleProfileAssignment};
use dashmap::DashSet;
use lifecycle::{CancelOutcome, IntakeDraft, RequestStateMachine, ValidationOutcome};
use models::{FileType, IntegrationRequest, RequestId, UploadFile};
use query::{DebouncedSearch, PageRequest, RequestFilter, RequestQueryService};
use services::{
    ApiClient, FilePipeline, HttpFilePipeline, HttpIdentityStore, HttpRequestStore, IdentityStore,
    RequestStore,
};
use session::{Credentials, RoleEpoch, Session, SessionEvent};
use std::sync::Arc;

pub use config::EngineSettings;
pub use error::{EngineError, ErrorKind};

pub struct Engine {
    settings: Arc<EngineSettings>,
    http: reqwest::Client,
    in_flight: Arc<DashSet<RequestId>>,
    role_epoch: RoleEpoch,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(settings.api.timeout())
            .build()?;

        Ok(Self {
            settings: Arc::new(settings),
            http,
            in_flight: Arc::new(DashSet::new()),
            role_epoch: RoleEpoch::default(),
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Sessions opened here share one role epoch, so a role change made by
    /// one operator reaches every other operator's permission cache.
    pub fn open_session(&self, session: Session) -> EngineContext {
        let session = session.joined(self.role_epoch.clone());
        let api = ApiClient::new(
            self.http.clone(),
            &self.settings.api.base_url,
            self.settings.api.timeout(),
            session.clone(),
        );

        EngineContext::from_parts(
            session,
            Arc::clone(&self.settings),
            Arc::new(HttpFilePipeline::new(api.clone())),
            Arc::new(HttpRequestStore::new(api.clone())),
            Arc::new(HttpIdentityStore::new(api)),
            Arc::clone(&self.in_flight),
        )
    }

    /// Authenticate and open a session for the operator.
    pub async fn login(&self, credentials: &Credentials) -> Result<EngineContext, EngineError> {
        let context = self.open_session(Session::new());
        let token = context.identity.login(credentials).await?;
        context.session.establish(token, None).await;

        match context.permissions.current_user().await {
            Ok(user) => tracing::info!(user_id = user.id, "Operator signed in"),
            Err(e) => tracing::warn!(error = %e, "Signed in but the current user could not be loaded"),
        }

        Ok(context)
    }
}

/// Everything one operator session can do.
#[derive(Clone)]
pub struct EngineContext {
    session: Session,
    settings: Arc<EngineSettings>,
    files: Arc<dyn FilePipeline>,
    identity: Arc<dyn IdentityStore>,
    requests: RequestStateMachine,
    queries: RequestQueryService,
    permissions: PermissionResolver,
    assignments: RoleProfileAssignment,
}

impl EngineContext {
    pub fn from_parts(
        session: Session,
        settings: Arc<EngineSettings>,
        files: Arc<dyn FilePipeline>,
        requests: Arc<dyn RequestStore>,
        identity: Arc<dyn IdentityStore>,
        in_flight: Arc<DashSet<RequestId>>,
    ) -> Self {
        Self {
            requests: RequestStateMachine::new(Arc::clone(&requests), in_flight),
            queries: RequestQueryService::new(requests, Arc::clone(&identity)),
            permissions: PermissionResolver::new(
                Arc::clone(&identity),
                session.clone(),
                settings.access.model,
            ),
            assignments: RoleProfileAssignment::new(Arc::clone(&identity), session.clone()),
            files,
            identity,
            session,
            settings,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn files(&self) -> &dyn FilePipeline {
        self.files.as_ref()
    }

    pub fn requests(&self) -> &RequestStateMachine {
        &self.requests
    }

    pub fn queries(&self) -> &RequestQueryService {
        &self.queries
    }

    pub fn permissions(&self) -> &PermissionResolver {
        &self.permissions
    }

    pub fn assignments(&self) -> &RoleProfileAssignment {
        &self.assignments
    }

    /// Start a new intake, checking the file locally.
    pub fn draft(&self, file: UploadFile, file_type: Option<FileType>) -> Result<IntakeDraft, EngineError> {
        IntakeDraft::new(file, file_type, &self.settings.upload)
    }

    /// Validate on behalf of the signed-in user.
    pub async fn validate(&self, id: RequestId) -> Result<ValidationOutcome, EngineError> {
        let actor = self.permissions.current_user().await?;
        self.requests.validate(id, &actor).await
    }

    pub async fn cancel(&self, id: RequestId) -> Result<CancelOutcome, EngineError> {
        self.requests.cancel(id).await
    }

    /// Request search debounced by the configured quiet period.
    pub fn debounced_search(&self) -> DebouncedSearch<(RequestFilter, PageRequest), IntegrationRequest> {
        self.queries.debounced(self.settings.search.debounce())
    }

    /// Close the session. The local session is cleared even if the remote
    /// logout fails.
    pub async fn logout(&self) {
        if let Err(e) = self.identity.logout().await {
            tracing::warn!(error = %e, "Remote logout failed, clearing the session anyway");
        }
        self.session.teardown(SessionEvent::LoggedOut).await;
    }
}

use super::permissions::{self, AccessModel};
use crate::error::EngineError;
use crate::models::User;
use crate::services::IdentityStore;
use crate::session::Session;
use std::sync::Arc;

/// Answers "may the current user open this module?" for one session.
///
/// Fails closed: any lookup error is a denial. Decisions are cached in the
/// session and dropped whenever the session generation moves.
#[derive(Clone)]
pub struct PermissionResolver {
    identity: Arc<dyn IdentityStore>,
    session: Session,
    model: AccessModel,
}

impl PermissionResolver {
    pub fn new(identity: Arc<dyn IdentityStore>, session: Session, model: AccessModel) -> Self {
        Self {
            identity,
            session,
            model,
        }
    }

    pub fn model(&self) -> AccessModel {
        self.model
    }

    /// The signed-in user, loaded once per session generation.
    pub async fn current_user(&self) -> Result<User, EngineError> {
        if !self.session.is_authenticated().await {
            return Err(EngineError::NotAuthenticated);
        }
        if let Some(user) = self.session.user().await {
            return Ok(user);
        }

        let generation = self.session.generation().await;
        let user = self.identity.current_user().await?;
        self.session.remember_user(user.clone(), generation).await;
        Ok(user)
    }

    pub async fn can_access(&self, module: &str) -> bool {
        if !self.session.is_authenticated().await {
            return false;
        }

        let generation = self.session.generation().await;
        if let Some(decision) = self.session.cached_decision(module).await {
            return decision;
        }

        let user = match self.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(module = %module, error = %e, "Permission lookup failed, denying access");
                return false;
            }
        };

        let decision = permissions::can_access(&user, module, self.model);
        if !self.session.store_decision(module, decision, generation).await {
            tracing::debug!(module = %module, "Session changed during permission check, decision not cached");
        }
        tracing::debug!(user_id = user.id, module = %module, granted = decision, "Permission resolved");
        decision
    }

    /// Like `can_access`, as an error for handlers to propagate.
    pub async fn require(&self, module: &str) -> Result<(), EngineError> {
        if self.can_access(module).await {
            return Ok(());
        }
        if !self.session.is_authenticated().await {
            return Err(EngineError::NotAuthenticated);
        }
        Err(EngineError::AccessDenied(module.to_string()))
    }

    pub async fn granted_modules(&self) -> Vec<String> {
        match self.current_user().await {
            Ok(user) => permissions::granted_modules(&user, self.model),
            Err(e) => {
                tracing::warn!(error = %e, "Could not list modules");
                Vec::new()
            }
        }
    }

    pub async fn clear_permission_cache(&self) {
        self.session.invalidate_permissions().await;
    }
}

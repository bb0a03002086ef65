//! Role ↔ profile and user ↔ role membership.
//!
//! Assignments replace the whole set: the full desired membership is sent
//! every time and the service works out the difference. Every mutation that
//! reached the service invalidates the session's permission cache, whether
//! or not it succeeded.

use crate::error::EngineError;
use crate::models::{Profile, ProfileId, Role, RoleId, UserId};
use crate::services::IdentityStore;
use crate::session::Session;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct RoleProfileAssignment {
    identity: Arc<dyn IdentityStore>,
    session: Session,
}

impl RoleProfileAssignment {
    pub fn new(identity: Arc<dyn IdentityStore>, session: Session) -> Self {
        Self { identity, session }
    }

    /// Make `profile_ids` the exact profile set of the role. An empty set is valid.
    pub async fn assign_profiles(
        &self,
        role_id: RoleId,
        profile_ids: impl IntoIterator<Item = ProfileId>,
    ) -> Result<BTreeSet<ProfileId>, EngineError> {
        let profile_ids: BTreeSet<ProfileId> = profile_ids.into_iter().collect();
        let result = self.identity.assign_profiles(role_id, &profile_ids).await;
        self.session.invalidate_permissions().await;
        result?;

        tracing::info!(role_id, profiles = ?profile_ids, "Role profiles replaced");
        Ok(profile_ids)
    }

    /// Make `role_ids` the exact role set of the user. An empty set is valid.
    pub async fn assign_roles(
        &self,
        user_id: UserId,
        role_ids: impl IntoIterator<Item = RoleId>,
    ) -> Result<BTreeSet<RoleId>, EngineError> {
        let role_ids: BTreeSet<RoleId> = role_ids.into_iter().collect();
        let result = self.identity.assign_roles(user_id, &role_ids).await;
        self.session.invalidate_permissions().await;
        result?;

        tracing::info!(user_id, roles = ?role_ids, "User roles replaced");
        Ok(role_ids)
    }

    pub async fn create_role(&self, name: &str) -> Result<Role, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput("role name is required".into()));
        }

        let result = self.identity.create_role(name).await;
        self.session.invalidate_permissions().await;
        let role = result?;

        tracing::info!(role_id = role.id, name = %role.name, "Role created");
        Ok(role)
    }

    /// Delete the role entity. Users keep their other roles.
    pub async fn delete_role(&self, role_id: RoleId) -> Result<(), EngineError> {
        let result = self.identity.delete_role(role_id).await;
        self.session.invalidate_permissions().await;
        result?;

        tracing::info!(role_id, "Role deleted");
        Ok(())
    }
}

/// The membership being edited on an assignment screen before it is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDraft {
    selected: BTreeSet<i64>,
}

impl MembershipDraft {
    pub fn new(initial: impl IntoIterator<Item = i64>) -> Self {
        Self {
            selected: initial.into_iter().collect(),
        }
    }

    /// Flip membership of `id`; returns whether it is now selected.
    pub fn toggle(&mut self, id: i64) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn remove(&mut self, id: i64) -> bool {
        self.selected.remove(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.selected.contains(&id)
    }

    pub fn ids(&self) -> &BTreeSet<i64> {
        &self.selected
    }

    pub fn into_ids(self) -> BTreeSet<i64> {
        self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Something listed on an assignment screen.
pub trait Assignable {
    fn assignable_id(&self) -> i64;
}

impl Assignable for Role {
    fn assignable_id(&self) -> i64 {
        self.id
    }
}

impl Assignable for Profile {
    fn assignable_id(&self) -> i64 {
        self.id
    }
}

/// Candidates not yet in the draft.
pub fn available<'a, T: Assignable>(all: &'a [T], draft: &MembershipDraft) -> Vec<&'a T> {
    all.iter()
        .filter(|item| !draft.contains(item.assignable_id()))
        .collect()
}

/// Case-insensitive search over profile code and label. A blank term matches all.
pub fn search_profiles<'a>(profiles: &'a [Profile], term: &str) -> Vec<&'a Profile> {
    let term = term.trim().to_lowercase();
    profiles
        .iter()
        .filter(|p| {
            term.is_empty()
                || p.code.to_lowercase().contains(&term)
                || p.libelle.to_lowercase().contains(&term)
        })
        .collect()
}

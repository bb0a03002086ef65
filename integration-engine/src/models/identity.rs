use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type UserId = i64;
pub type RoleId = i64;
pub type ProfileId = i64;

/// Atomic permission grant, sourced from the external profile directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub code: String,
    #[serde(default)]
    pub libelle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(alias = "roleId", alias = "role_id")]
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Role {
    pub fn profile_ids(&self) -> BTreeSet<ProfileId> {
        self.profiles.iter().map(|p| p.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub matricule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    pub fn role_ids(&self) -> BTreeSet<RoleId> {
        self.roles.iter().map(|r| r.id).collect()
    }

    pub fn full_name(&self) -> String {
        join_names(&self.first_name, &self.last_name)
    }
}

/// The reduced user shape embedded in requests (`createdBy`, `validatedBy`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matricule: Option<String>,
}

impl UserRef {
    pub fn full_name(&self) -> String {
        join_names(&self.first_name, &self.last_name)
    }
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            matricule: Some(user.matricule.clone()).filter(|m| !m.is_empty()),
        }
    }
}

fn join_names(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

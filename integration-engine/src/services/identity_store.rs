use super::api_client::{decode, ApiAck, ApiClient};
use crate::error::EngineError;
use crate::models::{Page, Profile, ProfileId, Role, RoleId, User, UserId};
use crate::query::{ProfileFilter, RemotePage, RoleFilter, UserFilter};
use crate::session::Credentials;
use async_trait::async_trait;
use reqwest::Method;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Remote users, roles and profiles directory, plus authentication.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, credentials: &Credentials) -> Result<String, EngineError>;

    async fn logout(&self) -> Result<(), EngineError>;

    async fn current_user(&self) -> Result<User, EngineError>;

    async fn list_users(&self, filter: &UserFilter, page: RemotePage) -> Result<Page<User>, EngineError>;

    async fn list_roles(&self, filter: &RoleFilter, page: RemotePage) -> Result<Page<Role>, EngineError>;

    async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        page: RemotePage,
    ) -> Result<Page<Profile>, EngineError>;

    async fn assign_profiles(
        &self,
        role_id: RoleId,
        profile_ids: &BTreeSet<ProfileId>,
    ) -> Result<(), EngineError>;

    async fn assign_roles(&self, user_id: UserId, role_ids: &BTreeSet<RoleId>) -> Result<(), EngineError>;

    async fn create_role(&self, name: &str) -> Result<Role, EngineError>;

    async fn delete_role(&self, role_id: RoleId) -> Result<(), EngineError>;
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginReply {
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignProfilesBody<'a> {
    role_id: RoleId,
    profile_ids: &'a BTreeSet<ProfileId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignRolesBody<'a> {
    user_id: UserId,
    role_ids: &'a BTreeSet<RoleId>,
}

#[derive(Serialize)]
struct CreateRoleBody<'a> {
    name: &'a str,
}

pub struct HttpIdentityStore {
    api: ApiClient,
}

impl HttpIdentityStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn list<T, F>(&self, path: &str, filter: &F, page: RemotePage) -> Result<Page<T>, EngineError>
    where
        T: serde::de::DeserializeOwned,
        F: Serialize + Sync,
    {
        let value = self
            .api
            .execute(Method::GET, path, |r| r.query(filter).query(&page))
            .await?;
        decode(value)
    }
}

fn confirm(ack: ApiAck, refused: &str) -> Result<(), EngineError> {
    if ack.is_success() {
        Ok(())
    } else {
        Err(EngineError::Rejected(ack.message_or(refused)))
    }
}

#[async_trait]
impl IdentityStore for HttpIdentityStore {
    async fn login(&self, credentials: &Credentials) -> Result<String, EngineError> {
        let body = LoginBody {
            email: credentials.email.trim(),
            password: credentials.password.expose_secret(),
        };
        let reply: LoginReply = self.api.post_json("/auth/login", &body).await?;
        tracing::info!(email = %body.email, "Login accepted");
        Ok(reply.token)
    }

    async fn logout(&self) -> Result<(), EngineError> {
        self.api.post_ack("/auth/logout", &serde_json::json!({})).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<User, EngineError> {
        self.api.get_json("/users/current-user", &()).await
    }

    async fn list_users(&self, filter: &UserFilter, page: RemotePage) -> Result<Page<User>, EngineError> {
        self.list("/users", filter, page).await
    }

    async fn list_roles(&self, filter: &RoleFilter, page: RemotePage) -> Result<Page<Role>, EngineError> {
        self.list("/roles", filter, page).await
    }

    async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        page: RemotePage,
    ) -> Result<Page<Profile>, EngineError> {
        self.list("/profiles", filter, page).await
    }

    async fn assign_profiles(
        &self,
        role_id: RoleId,
        profile_ids: &BTreeSet<ProfileId>,
    ) -> Result<(), EngineError> {
        let body = AssignProfilesBody {
            role_id,
            profile_ids,
        };
        let ack = self.api.post_ack("/roles/assign-profiles", &body).await?;
        confirm(ack, "Profile assignment was refused")
    }

    async fn assign_roles(&self, user_id: UserId, role_ids: &BTreeSet<RoleId>) -> Result<(), EngineError> {
        let body = AssignRolesBody { user_id, role_ids };
        let ack = self.api.post_ack("/users/assign-role", &body).await?;
        confirm(ack, "Role assignment was refused")
    }

    async fn create_role(&self, name: &str) -> Result<Role, EngineError> {
        let ack = self.api.post_ack("/roles", &CreateRoleBody { name }).await?;
        if !ack.is_success() {
            return Err(EngineError::Rejected(ack.message_or("Role creation was refused")));
        }
        match ack.data {
            Some(data) => Ok(serde_json::from_value(data)?),
            None => Err(EngineError::Rejected(ack.message_or("Role creation returned no role"))),
        }
    }

    async fn delete_role(&self, role_id: RoleId) -> Result<(), EngineError> {
        let ack = self.api.delete(&format!("/roles/{}", role_id)).await?;
        confirm(ack, "Role deletion was refused")
    }
}

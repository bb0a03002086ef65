use super::{page_request, page_response};
use crate::models::{Operator, PageResponse};
use axum::{
    extract::{Path, Query},
    Json,
};
use integration_engine::models::{Role, RoleId, User, UserId};
use integration_engine::query::UserFilter;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::collections::BTreeSet;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListParams {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub matricule: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolesRequest {
    pub role_ids: Vec<RoleId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRolesResponse {
    pub user_id: UserId,
    pub role_ids: BTreeSet<RoleId>,
}

pub async fn list_users(
    operator: Operator,
    Query(params): Query<UserListParams>,
) -> Result<Json<PageResponse<User>>, AppError> {
    let page = page_request(params.page, params.size)?;
    let filter = UserFilter {
        first_name: params.first_name,
        last_name: params.last_name,
        matricule: params.matricule,
    };

    let outcome = operator.context.queries().list_users(&filter, page).await;
    page_response(&operator, outcome, |user| user).await
}

/// Every role, for the role picker on the user screen.
pub async fn all_roles(operator: Operator) -> Result<Json<Vec<Role>>, AppError> {
    let roles = operator
        .settle(operator.context.queries().fetch_all_roles().await)
        .await?;
    Ok(Json(roles))
}

/// Replace the user's roles with exactly `roleIds`.
pub async fn assign_roles(
    operator: Operator,
    Path(user_id): Path<UserId>,
    Json(payload): Json<AssignRolesRequest>,
) -> Result<Json<UserRolesResponse>, AppError> {
    let role_ids = operator
        .settle(
            operator
                .context
                .assignments()
                .assign_roles(user_id, payload.role_ids)
                .await,
        )
        .await?;

    Ok(Json(UserRolesResponse { user_id, role_ids }))
}

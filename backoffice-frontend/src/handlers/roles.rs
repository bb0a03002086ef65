use super::{page_request, page_response};
use crate::models::{Operator, PageResponse};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use integration_engine::models::{Profile, ProfileId, Role, RoleId};
use integration_engine::query::{ProfileFilter, RoleFilter};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::collections::BTreeSet;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct RoleListParams {
    pub name: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileListParams {
    pub code: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignProfilesRequest {
    pub profile_ids: Vec<ProfileId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleProfilesResponse {
    pub role_id: RoleId,
    pub profile_ids: BTreeSet<ProfileId>,
}

pub async fn list_roles(
    operator: Operator,
    Query(params): Query<RoleListParams>,
) -> Result<Json<PageResponse<Role>>, AppError> {
    let page = page_request(params.page, params.size)?;
    let filter = RoleFilter { name: params.name };

    let outcome = operator.context.queries().list_roles(&filter, page).await;
    page_response(&operator, outcome, |role| role).await
}

pub async fn create_role(
    operator: Operator,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    payload.validate()?;

    let role = operator
        .settle(operator.context.assignments().create_role(&payload.name).await)
        .await?;
    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn delete_role(
    operator: Operator,
    Path(role_id): Path<RoleId>,
) -> Result<StatusCode, AppError> {
    operator
        .settle(operator.context.assignments().delete_role(role_id).await)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the role's profiles with exactly `profileIds`.
pub async fn assign_profiles(
    operator: Operator,
    Path(role_id): Path<RoleId>,
    Json(payload): Json<AssignProfilesRequest>,
) -> Result<Json<RoleProfilesResponse>, AppError> {
    let profile_ids = operator
        .settle(
            operator
                .context
                .assignments()
                .assign_profiles(role_id, payload.profile_ids)
                .await,
        )
        .await?;

    Ok(Json(RoleProfilesResponse {
        role_id,
        profile_ids,
    }))
}

pub async fn list_profiles(
    operator: Operator,
    Query(params): Query<ProfileListParams>,
) -> Result<Json<PageResponse<Profile>>, AppError> {
    let page = page_request(params.page, params.size)?;
    let filter = ProfileFilter { code: params.code };

    let outcome = operator.context.queries().list_profiles(&filter, page).await;
    page_response(&operator, outcome, |profile| profile).await
}

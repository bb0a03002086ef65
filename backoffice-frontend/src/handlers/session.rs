use crate::models::operator::session_error;
use crate::models::{Operator, SessionView, ACCESS_TOKEN_KEY};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use integration_engine::session::{Credentials, Session as EngineSession};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use tower_sessions::Session;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub module: String,
    pub granted: bool,
}

pub async fn login(
    State(state): State<AppState>,
    web_session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionView>, AppError> {
    payload.validate()?;

    let credentials = Credentials::new(payload.email, payload.password);
    let context = state.engine.login(&credentials).await?;
    let token = context
        .session()
        .token_value()
        .await
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("login returned no token")))?;

    web_session.cycle_id().await.map_err(session_error)?;
    web_session
        .insert(ACCESS_TOKEN_KEY, &token)
        .await
        .map_err(session_error)?;
    state.operators.insert(token, context.clone());

    let view = SessionView::load(&context).await?;
    tracing::info!(user_id = view.user.id, modules = ?view.modules, "Operator session opened");
    Ok(Json(view))
}

pub async fn current(operator: Operator) -> Result<Json<SessionView>, AppError> {
    let view = operator.settle(SessionView::load(&operator.context).await).await?;
    Ok(Json(view))
}

/// Always clears the web session, whatever the remote logout returns.
pub async fn logout(
    State(state): State<AppState>,
    web_session: Session,
) -> Result<StatusCode, AppError> {
    let token: Option<String> = web_session
        .get(ACCESS_TOKEN_KEY)
        .await
        .map_err(session_error)?;

    if let Some(token) = token {
        let context = state
            .operators
            .remove(&token)
            .unwrap_or_else(|| state.engine.open_session(EngineSession::with_token(token)));
        context.logout().await;
    }

    web_session.flush().await.map_err(session_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn access(
    operator: Operator,
    Path(module): Path<String>,
) -> Result<Json<AccessResponse>, AppError> {
    let granted = operator.context.permissions().can_access(&module).await;
    operator.still_signed_in().await?;

    Ok(Json(AccessResponse { module, granted }))
}

use crate::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use integration_engine::models::User;
use integration_engine::{EngineContext, EngineError, ErrorKind};
use service_core::error::AppError;
use tower_sessions::Session;

/// Web-session key holding the remote bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

pub(crate) fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::InternalError(anyhow::Error::new(err))
}

/// A signed-in operator, resolved from the server-side web session.
///
/// Rejects with 401 when there is no token, or when the engine session
/// behind the token has already been torn down.
#[derive(Clone)]
pub struct Operator {
    pub context: EngineContext,
    token: String,
    web_session: Session,
    state: AppState,
}

#[async_trait]
impl FromRequestParts<AppState> for Operator {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved by the module gate
        if let Some(operator) = parts.extensions.get::<Operator>() {
            return Ok(operator.clone());
        }

        let web_session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| AppError::InternalError(anyhow::anyhow!(message)))?;

        let token: Option<String> = web_session
            .get(ACCESS_TOKEN_KEY)
            .await
            .map_err(session_error)?;
        let Some(token) = token else {
            return Err(AppError::Unauthorized(anyhow::anyhow!("not signed in")));
        };

        let context = state.operators.get_or_open(&state.engine, &token);
        let operator = Operator {
            context,
            token,
            web_session,
            state: state.clone(),
        };

        if !operator.context.session().is_authenticated().await {
            operator.end().await;
            return Err(EngineError::SessionExpired.into());
        }

        parts.extensions.insert(operator.clone());
        Ok(operator)
    }
}

impl Operator {
    /// Forget the engine context and flush the web session.
    pub async fn end(&self) {
        self.state.operators.remove(&self.token);
        if let Err(e) = self.web_session.flush().await {
            tracing::warn!(error = %e, "Failed to flush web session");
        }
    }

    /// Convert an engine failure, signing the operator out on auth failures.
    pub async fn fail(&self, error: EngineError) -> AppError {
        if error.kind() == ErrorKind::Auth {
            tracing::info!(error = %error, "Remote session ended, signing operator out");
            self.end().await;
        }
        error.into()
    }

    pub async fn settle<T>(&self, result: Result<T, EngineError>) -> Result<T, AppError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(self.fail(e).await),
        }
    }

    pub async fn require(&self, module: &str) -> Result<(), AppError> {
        self.settle(self.context.permissions().require(module).await)
            .await
    }

    pub async fn user(&self) -> Result<User, AppError> {
        self.settle(self.context.permissions().current_user().await)
            .await
    }

    /// 401 if a fail-closed check ran into an expired session.
    pub async fn still_signed_in(&self) -> Result<(), AppError> {
        if self.context.session().is_authenticated().await {
            Ok(())
        } else {
            Err(self.fail(EngineError::SessionExpired).await)
        }
    }
}

use crate::models::Operator;
use crate::AppState;
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

/// State for [`module_gate`]: the module a group of routes belongs to.
#[derive(Clone)]
pub struct ModuleGate {
    state: AppState,
    module: &'static str,
}

impl ModuleGate {
    pub fn new(state: AppState, module: &'static str) -> Self {
        Self { state, module }
    }
}

/// Let the request through only if the operator may open the module.
/// The resolved [`Operator`] is left in the request extensions for the handler.
pub async fn module_gate(
    State(gate): State<ModuleGate>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let operator = Operator::from_request_parts(&mut parts, &gate.state).await?;

    if let Err(e) = operator.require(gate.module).await {
        tracing::info!(module = gate.module, uri = %parts.uri, "Module access refused");
        return Err(e);
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

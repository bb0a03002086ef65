use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use integration_engine::access::{DEMANDES, GESTION_UTILISATEURS, ROLES_PERMISSIONS};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use service_core::observability::REQUEST_ID_HEADER;
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::Key;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::ServerSettings;
use crate::handlers::{
    app::health_check,
    metrics::metrics,
    requests::{analyze, cancel, list_requests, submit, validate},
    roles::{assign_profiles, create_role, delete_role, list_profiles, list_roles},
    session::{access, current, login, logout},
    users::{all_roles, assign_roles, list_users},
};
use crate::middleware::{module_gate, ModuleGate};
use crate::AppState;

/// Room for multipart framing on top of the largest accepted file, so an
/// oversized file is refused by the engine rather than cut off mid-stream.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState, server: &ServerSettings) -> Result<Router, AppError> {
    let key = Key::try_from(server.session_secret.expose_secret().as_bytes()).map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!(
            "server.session_secret must be at least 64 bytes"
        ))
    })?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(server.secure_cookies)
        .with_signed(key)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            server.session_idle_minutes,
        )));

    let upload_limit =
        state.engine.settings().upload.max_file_size_bytes as usize + MULTIPART_OVERHEAD_BYTES;

    let requests = Router::new()
        .route("/api/requests", get(list_requests))
        .route(
            "/api/requests/analyze",
            post(analyze).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/requests/submit/:intake_id", post(submit))
        .route("/api/requests/:id/validate", put(validate))
        .route("/api/requests/:id/cancel", put(cancel))
        .route_layer(from_fn_with_state(
            ModuleGate::new(state.clone(), DEMANDES),
            module_gate,
        ));

    let users = Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/:id/roles", put(assign_roles))
        .route("/api/roles/all", get(all_roles))
        .route_layer(from_fn_with_state(
            ModuleGate::new(state.clone(), GESTION_UTILISATEURS),
            module_gate,
        ));

    let roles = Router::new()
        .route("/api/roles", get(list_roles).post(create_role))
        .route("/api/roles/:id", delete(delete_role))
        .route("/api/roles/:id/profiles", put(assign_profiles))
        .route("/api/profiles", get(list_profiles))
        .route_layer(from_fn_with_state(
            ModuleGate::new(state.clone(), ROLES_PERMISSIONS),
            module_gate,
        ));

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/api/session", get(current))
        .route("/api/session/login", post(login))
        .route("/api/session/logout", post(logout))
        .route("/api/session/access/:module", get(access))
        .merge(requests)
        .merge(users)
        .merge(roles)
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state);

    Ok(router)
}

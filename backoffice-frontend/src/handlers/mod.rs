pub mod app;
pub mod metrics;
pub mod requests;
pub mod roles;
pub mod session;
pub mod users;

use crate::models::{Operator, PageResponse, QueryError};
use axum::Json;
use integration_engine::query::{PageRequest, QueryOutcome, DEFAULT_PAGE_SIZE};
use integration_engine::{EngineError, ErrorKind};
use service_core::error::AppError;

pub(crate) fn page_request(page: Option<u32>, size: Option<u32>) -> Result<PageRequest, AppError> {
    Ok(PageRequest::new(
        page.unwrap_or(1),
        size.unwrap_or(DEFAULT_PAGE_SIZE),
    )?)
}

/// Render a query outcome. A failed load still answers 200 with an empty
/// page and the reason, except for bad input (422) and lost sessions (401).
pub(crate) async fn page_response<S, T>(
    operator: &Operator,
    outcome: QueryOutcome<S>,
    f: impl FnMut(S) -> T,
) -> Result<Json<PageResponse<T>>, AppError> {
    let QueryOutcome { page, error } = outcome;

    let error = match error {
        Some(e) if matches!(e.kind(), ErrorKind::Auth | ErrorKind::Validation) => {
            return Err(operator.fail(e).await);
        }
        Some(e) => Some(QueryError::from(&e)),
        None => None,
    };

    Ok(Json(PageResponse::from_page(page, error, f)))
}

pub(crate) fn bad_request(err: impl Into<anyhow::Error>) -> AppError {
    AppError::BadRequest(err.into())
}

pub(crate) fn invalid(message: String) -> AppError {
    EngineError::InvalidInput(message).into()
}

use crate::lifecycle::RequestState;
use crate::models::RequestId;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

/// The four failure families an operator can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape, caught before anything goes over the wire.
    Validation,
    /// The action is blocked locally.
    BusinessRule,
    /// Network or remote service failure; local state is left unchanged.
    Remote,
    /// The session is gone and must be re-established.
    Auth,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid file type '{extension}': expected xlsx, xls or csv")]
    InvalidFileType { extension: String },

    #[error("File is too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File is empty")]
    EmptyFile,

    #[error("A file type must be selected")]
    MissingFileType,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File is not balanced: total debit {debit} != total credit {credit}")]
    UnbalancedFile { debit: Decimal, credit: Decimal },

    #[error("Request {request_id}: illegal transition from {from} to {to}")]
    IllegalTransition {
        request_id: RequestId,
        from: RequestState,
        to: RequestState,
    },

    #[error("Request {0} already has an action in progress")]
    MutationInFlight(RequestId),

    #[error("{0}")]
    Rejected(String),

    #[error("Access to module '{0}' denied")]
    AccessDenied(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Remote service returned {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("Resource not found")]
    NotFound,

    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Session expired")]
    SessionExpired,

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidFileType { .. }
            | EngineError::FileTooLarge { .. }
            | EngineError::EmptyFile
            | EngineError::MissingFileType
            | EngineError::InvalidInput(_) => ErrorKind::Validation,
            EngineError::UnbalancedFile { .. }
            | EngineError::IllegalTransition { .. }
            | EngineError::MutationInFlight(_)
            | EngineError::Rejected(_)
            | EngineError::AccessDenied(_) => ErrorKind::BusinessRule,
            EngineError::AnalysisFailed(_)
            | EngineError::RemoteStatus { .. }
            | EngineError::NotFound
            | EngineError::Timeout(_)
            | EngineError::Transport(_)
            | EngineError::Decode(_) => ErrorKind::Remote,
            EngineError::SessionExpired | EngineError::NotAuthenticated => ErrorKind::Auth,
        }
    }

    /// Remote failures may be retried by the operator. An analysis failure
    /// needs a fresh upload instead.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Remote
            && !matches!(self, EngineError::AnalysisFailed(_) | EngineError::NotFound)
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::NotFound => AppError::NotFound(anyhow_msg(message)),
            EngineError::AccessDenied(_) => AppError::Forbidden(anyhow_msg(message)),
            EngineError::Timeout(_) => AppError::GatewayTimeout(message),
            other => match other.kind() {
                ErrorKind::Validation => AppError::Unprocessable(anyhow_msg(message)),
                ErrorKind::BusinessRule => AppError::Conflict(anyhow_msg(message)),
                ErrorKind::Remote => AppError::BadGateway(message),
                ErrorKind::Auth => AppError::Unauthorized(anyhow_msg(message)),
            },
        }
    }
}

fn anyhow_msg(message: String) -> anyhow::Error {
    anyhow::anyhow!(message)
}

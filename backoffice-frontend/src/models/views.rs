use integration_engine::lifecycle::AllowedActions;
use integration_engine::models::{IntegrationRequest, Page, User};
use integration_engine::{EngineContext, EngineError, ErrorKind};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: User,
    pub modules: Vec<String>,
}

impl SessionView {
    pub async fn load(context: &EngineContext) -> Result<Self, EngineError> {
        let user = context.permissions().current_user().await?;
        let modules = context.permissions().granted_modules().await;
        Ok(Self { user, modules })
    }
}

/// A request plus what the operator may do with it right now.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    #[serde(flatten)]
    pub request: IntegrationRequest,
    pub balanced: bool,
    pub allowed_actions: AllowedActions,
    pub busy: bool,
}

impl RequestView {
    pub fn new(context: &EngineContext, request: IntegrationRequest) -> Self {
        let machine = context.requests();
        let busy = machine.is_in_flight(request.id);
        let allowed_actions = if busy {
            AllowedActions::none()
        } else {
            machine.allowed_actions(&request)
        };

        Self {
            balanced: request.is_balanced(),
            allowed_actions,
            busy,
            request,
        }
    }
}

/// Why a page came back empty, when it was a failure rather than no results.
#[derive(Debug, Serialize)]
pub struct QueryError {
    pub kind: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&EngineError> for QueryError {
    fn from(err: &EngineError) -> Self {
        let kind = match err.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::BusinessRule => "business_rule",
            ErrorKind::Remote => "remote",
            ErrorKind::Auth => "auth",
        };
        Self {
            kind,
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
    /// 1-based, as requested.
    pub page: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryError>,
}

impl<T> PageResponse<T> {
    pub fn from_page<S>(page: Page<S>, error: Option<QueryError>, f: impl FnMut(S) -> T) -> Self {
        Self {
            content: page.content.into_iter().map(f).collect(),
            total_pages: page.total_pages,
            total_elements: page.total_elements,
            page: page.number + 1,
            size: page.size,
            error,
        }
    }
}

use super::transitions::{
    apply_cancellation, apply_validation, check_cancel, check_validate, AllowedActions,
    RequestState, Transition,
};
use crate::error::EngineError;
use crate::models::{IntegrationRequest, IntegrationStatus, OperationStatus, RequestId, User, UserRef};
use crate::services::RequestStore;
use dashmap::DashSet;
use metrics::counter;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Validated(IntegrationRequest),
    /// The request was already validated; nothing was sent.
    AlreadyValidated(IntegrationRequest),
}

impl ValidationOutcome {
    pub fn request(&self) -> &IntegrationRequest {
        match self {
            ValidationOutcome::Validated(r) | ValidationOutcome::AlreadyValidated(r) => r,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled(IntegrationRequest),
    /// The request was already cancelled; nothing was sent.
    AlreadyCancelled(IntegrationRequest),
}

impl CancelOutcome {
    pub fn request(&self) -> &IntegrationRequest {
        match self {
            CancelOutcome::Cancelled(r) | CancelOutcome::AlreadyCancelled(r) => r,
        }
    }
}

/// Drives validate and cancel against the remote store.
///
/// At most one mutation per request id is in flight at any time; a second
/// attempt fails fast with `MutationInFlight`. The local copy of a request
/// only changes once the store has confirmed the mutation.
#[derive(Clone)]
pub struct RequestStateMachine {
    store: Arc<dyn RequestStore>,
    in_flight: Arc<DashSet<RequestId>>,
}

struct InFlightGuard {
    in_flight: Arc<DashSet<RequestId>>,
    id: RequestId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}

impl RequestStateMachine {
    pub fn new(store: Arc<dyn RequestStore>, in_flight: Arc<DashSet<RequestId>>) -> Self {
        Self { store, in_flight }
    }

    fn begin(&self, id: RequestId) -> Result<InFlightGuard, EngineError> {
        if !self.in_flight.insert(id) {
            tracing::warn!(request_id = id, "Mutation already in progress");
            return Err(EngineError::MutationInFlight(id));
        }
        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            id,
        })
    }

    pub fn is_in_flight(&self, id: RequestId) -> bool {
        self.in_flight.contains(&id)
    }

    /// Actions the View may offer for this request right now.
    pub fn allowed_actions(&self, request: &IntegrationRequest) -> AllowedActions {
        if self.is_in_flight(request.id) {
            return AllowedActions::none();
        }
        AllowedActions::for_state(RequestState::of(request))
    }

    pub async fn fetch(&self, id: RequestId) -> Result<IntegrationRequest, EngineError> {
        self.store.fetch(id).await
    }

    /// Load the request from the store, then validate it.
    pub async fn validate(&self, id: RequestId, actor: &User) -> Result<ValidationOutcome, EngineError> {
        let _guard = self.begin(id)?;
        let current = self.store.fetch(id).await?;
        self.run_validation(current, actor).await
    }

    /// Validate a request the caller already holds.
    pub async fn validate_request(
        &self,
        current: IntegrationRequest,
        actor: &User,
    ) -> Result<ValidationOutcome, EngineError> {
        let _guard = self.begin(current.id)?;
        self.run_validation(current, actor).await
    }

    pub async fn cancel(&self, id: RequestId) -> Result<CancelOutcome, EngineError> {
        let _guard = self.begin(id)?;
        let current = self.store.fetch(id).await?;
        self.run_cancellation(current).await
    }

    pub async fn cancel_request(&self, current: IntegrationRequest) -> Result<CancelOutcome, EngineError> {
        let _guard = self.begin(current.id)?;
        self.run_cancellation(current).await
    }

    async fn run_validation(
        &self,
        current: IntegrationRequest,
        actor: &User,
    ) -> Result<ValidationOutcome, EngineError> {
        let from = RequestState::of(&current);

        let to = match check_validate(current.id, from)? {
            Transition::NoOp => {
                tracing::info!(request_id = current.id, "Request already validated");
                return Ok(ValidationOutcome::AlreadyValidated(current));
            }
            Transition::Apply(to) => to,
        };

        let reply = self.store.validate(current.id).await?;

        let confirmed = reply.request.filter(|r| {
            r.id == current.id && r.operation_status == OperationStatus::Validee && r.is_consistent()
        });
        let updated = match confirmed {
            Some(request) => request,
            None => {
                let mut local = current;
                apply_validation(&mut local, UserRef::from(actor), chrono::Utc::now().naive_utc());
                local
            }
        };

        counter!("request_transitions_total", "action" => "validate").increment(1);
        tracing::info!(
            request_id = updated.id,
            from = %from,
            to = %to,
            validated_by = actor.id,
            "Request validated"
        );

        Ok(ValidationOutcome::Validated(updated))
    }

    async fn run_cancellation(&self, current: IntegrationRequest) -> Result<CancelOutcome, EngineError> {
        let from = RequestState::of(&current);

        let to = match check_cancel(current.id, from)? {
            Transition::NoOp => {
                tracing::info!(request_id = current.id, "Request already cancelled");
                return Ok(CancelOutcome::AlreadyCancelled(current));
            }
            Transition::Apply(to) => to,
        };

        let reply = self.store.cancel(current.id).await?;

        let confirmed = reply
            .request
            .filter(|r| r.id == current.id && r.integration_status == IntegrationStatus::Annuler);
        let updated = match confirmed {
            Some(request) => request,
            None => {
                let mut local = current;
                apply_cancellation(&mut local);
                local
            }
        };

        counter!("request_transitions_total", "action" => "cancel").increment(1);
        tracing::info!(request_id = updated.id, from = %from, to = %to, "Request cancelled");

        Ok(CancelOutcome::Cancelled(updated))
    }
}

//! Transition table for integration requests.
//!
//! A request's state is the pair (integration status, operation status).
//! Validation moves the operation status to VALIDEE while the batch is still
//! live. Cancellation moves the integration status to ANNULER, which is
//! terminal. Anything else is an illegal transition and is reported as such.

use crate::error::EngineError;
use crate::models::{IntegrationRequest, IntegrationStatus, OperationStatus, RequestId, UserRef};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestState {
    pub integration: IntegrationStatus,
    pub operation: OperationStatus,
}

impl RequestState {
    /// State of a freshly submitted request.
    pub const INITIAL: RequestState = RequestState {
        integration: IntegrationStatus::EnTraitement,
        operation: OperationStatus::EnTraitement,
    };

    pub const fn new(integration: IntegrationStatus, operation: OperationStatus) -> Self {
        Self {
            integration,
            operation,
        }
    }

    pub fn of(request: &IntegrationRequest) -> Self {
        Self::new(request.integration_status, request.operation_status)
    }

    pub fn is_cancelled(&self) -> bool {
        self.integration == IntegrationStatus::Annuler
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.integration.as_str(), self.operation.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to the given state.
    Apply(RequestState),
    /// Already there; nothing to send.
    NoOp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AllowedActions {
    pub validate: bool,
    pub cancel: bool,
}

impl AllowedActions {
    pub fn for_state(state: RequestState) -> Self {
        Self {
            validate: matches!(check_validate(0, state), Ok(Transition::Apply(_))),
            cancel: matches!(check_cancel(0, state), Ok(Transition::Apply(_))),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

pub fn check_validate(request_id: RequestId, from: RequestState) -> Result<Transition, EngineError> {
    let to = RequestState::new(from.integration, OperationStatus::Validee);

    if from.operation == OperationStatus::Validee {
        return Ok(Transition::NoOp);
    }

    let operation_open = matches!(
        from.operation,
        OperationStatus::EnTraitement | OperationStatus::NonValidee
    );
    let batch_live = !matches!(
        from.integration,
        IntegrationStatus::Annuler | IntegrationStatus::Rejetee
    );

    if operation_open && batch_live {
        Ok(Transition::Apply(to))
    } else {
        Err(EngineError::IllegalTransition {
            request_id,
            from,
            to,
        })
    }
}

pub fn check_cancel(_request_id: RequestId, from: RequestState) -> Result<Transition, EngineError> {
    if from.is_cancelled() {
        return Ok(Transition::NoOp);
    }
    Ok(Transition::Apply(RequestState::new(
        IntegrationStatus::Annuler,
        from.operation,
    )))
}

pub fn apply_validation(request: &mut IntegrationRequest, by: UserRef, at: NaiveDateTime) {
    request.operation_status = OperationStatus::Validee;
    request.validated_by = Some(by);
    request.validated_at = Some(at);
}

pub fn apply_cancellation(request: &mut IntegrationRequest) {
    request.integration_status = IntegrationStatus::Annuler;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{request, user_ref};
    use IntegrationStatus as I;
    use OperationStatus as O;

    const INTEGRATIONS: [IntegrationStatus; 5] =
        [I::EnTraitement, I::Integree, I::NonIntegrer, I::Rejetee, I::Annuler];
    const OPERATIONS: [OperationStatus; 4] = [O::EnTraitement, O::Validee, O::NonValidee, O::Rejetee];

    #[test]
    fn test_initial_state() {
        assert_eq!(
            RequestState::INITIAL,
            RequestState::new(I::EnTraitement, O::EnTraitement)
        );
        assert_eq!(RequestState::INITIAL.to_string(), "(EN_TRAITEMENT, EN_TRAITEMENT)");
    }

    #[test]
    fn test_validate_from_pending_and_not_validated() {
        for op in [O::EnTraitement, O::NonValidee] {
            for integration in [I::EnTraitement, I::Integree, I::NonIntegrer] {
                let from = RequestState::new(integration, op);
                assert_eq!(
                    check_validate(1, from).unwrap(),
                    Transition::Apply(RequestState::new(integration, O::Validee))
                );
            }
        }
    }

    #[test]
    fn test_validate_twice_is_noop() {
        for integration in INTEGRATIONS {
            let from = RequestState::new(integration, O::Validee);
            assert_eq!(check_validate(1, from).unwrap(), Transition::NoOp);
        }
    }

    #[test]
    fn test_validate_rejected_or_cancelled_is_illegal() {
        let illegal = [
            RequestState::new(I::EnTraitement, O::Rejetee),
            RequestState::new(I::Annuler, O::EnTraitement),
            RequestState::new(I::Rejetee, O::NonValidee),
        ];
        for from in illegal {
            match check_validate(9, from) {
                Err(EngineError::IllegalTransition { request_id, from: f, to }) => {
                    assert_eq!(request_id, 9);
                    assert_eq!(f, from);
                    assert_eq!(to.operation, O::Validee);
                }
                other => panic!("expected IllegalTransition for {from}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_cancel_from_every_state() {
        for integration in INTEGRATIONS {
            for op in OPERATIONS {
                let from = RequestState::new(integration, op);
                let transition = check_cancel(1, from).unwrap();
                if integration == I::Annuler {
                    assert_eq!(transition, Transition::NoOp);
                } else {
                    assert_eq!(transition, Transition::Apply(RequestState::new(I::Annuler, op)));
                }
            }
        }
    }

    #[test]
    fn test_allowed_actions() {
        let pending = AllowedActions::for_state(RequestState::INITIAL);
        assert!(pending.validate && pending.cancel);

        let cancelled = AllowedActions::for_state(RequestState::new(I::Annuler, O::EnTraitement));
        assert!(!cancelled.validate && !cancelled.cancel);

        let validated = AllowedActions::for_state(RequestState::new(I::Integree, O::Validee));
        assert!(!validated.validate && validated.cancel);
    }

    #[test]
    fn test_apply_validation_keeps_invariant() {
        let mut req = request(4);
        assert!(req.is_consistent());

        let at = chrono::NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        apply_validation(&mut req, user_ref(1), at);

        assert_eq!(req.operation_status, O::Validee);
        assert_eq!(req.validated_at, Some(at));
        assert!(req.is_consistent());
    }
}

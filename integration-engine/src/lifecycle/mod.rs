pub mod intake;
pub mod machine;
pub mod transitions;

pub use intake::{AnalyzedIntake, IntakeDraft, SubmitFailure, SubmittedIntake};
pub use machine::{CancelOutcome, RequestStateMachine, ValidationOutcome};
pub use transitions::{AllowedActions, RequestState, Transition};

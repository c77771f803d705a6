//! Planning error types.
//!
//! Data-quality problems never surface here: they are absorbed with
//! defaults where they occur. Only rejected input and broken plan
//! invariants propagate to the caller.

use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    #[error("Invalid planning input: {}", join_messages(.0))]
    InvalidInput(Vec<ValidationError>),

    #[error("Plan invariant violated: {0}")]
    InvariantViolation(String),
}

impl From<Vec<ValidationError>> for PlanningError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::InvalidInput(errors)
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

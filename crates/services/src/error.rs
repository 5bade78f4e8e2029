//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::ConfigurationError;
use remote::ExamServiceError;

use crate::attempts::AttemptPhase;

/// Errors emitted by the attempt controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("exam service call failed: {0}")]
    Network(#[from] ExamServiceError),
    #[error("active attempt check must complete before starting")]
    ResumeRequired,
    #[error("an attempt is already in progress")]
    AttemptInProgress,
    #[error("no attempt to act on")]
    NotActive,
    #[error("no failed start to retry")]
    NothingToRetry,
    #[error("cannot {operation} while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: AttemptPhase,
    },
}

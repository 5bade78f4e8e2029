use async_trait::async_trait;
use thiserror::Error;

use exam_core::model::{
    AnswerSubmission, AttemptError, AttemptId, ExamAttempt, ExamResult, StartRequest,
    SubjectAvailability, SubjectId,
};

/// Errors surfaced by exam service adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamServiceError {
    #[error("exam service request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("exam service returned an invalid attempt: {0}")]
    InvalidAttempt(#[from] AttemptError),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("exam service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid exam service configuration: {0}")]
    InvalidConfig(String),
}

/// Remote collaborator owning question banks, attempts and grading.
///
/// The service enforces at most one active attempt per user.
#[async_trait]
pub trait ExamService: Send + Sync {
    /// Question counts for a subject and each of its chapters.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` if the request fails.
    async fn subject_availability(
        &self,
        subject_id: SubjectId,
    ) -> Result<SubjectAvailability, ExamServiceError>;

    /// Draw a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` if the request fails or the attempt is malformed.
    async fn start_attempt(&self, request: &StartRequest) -> Result<ExamAttempt, ExamServiceError>;

    /// The user's in-progress attempt, if any.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` if the request fails.
    async fn active_attempt(&self) -> Result<Option<ExamAttempt>, ExamServiceError>;

    /// Submit frozen answers for grading.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` if the request fails.
    async fn submit_attempt(
        &self,
        attempt_id: &AttemptId,
        answers: &[AnswerSubmission],
    ) -> Result<ExamResult, ExamServiceError>;

    /// Abandon an attempt.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` if the request fails.
    async fn cancel_attempt(&self, attempt_id: &AttemptId) -> Result<(), ExamServiceError>;
}

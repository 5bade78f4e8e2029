use serde::Serialize;
use tracing::{debug, info, warn};

use exam_core::model::{AnswerSubmission, AttemptId, ExamResult};

use super::controller::AttemptController;
use super::state::{AttemptPhase, ErrorSource, SessionState};
use crate::error::SessionError;

/// Who asked for the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// This call owned the submission and the attempt is now terminal.
    Submitted(ExamResult),
    /// Another submission already moved the attempt on; nothing was sent.
    Ignored,
}

/// Frozen answers taken at the `Active → Submitting` transition.
pub(crate) struct SubmissionTicket {
    attempt_id: AttemptId,
    answers: Vec<AnswerSubmission>,
    trigger: SubmitTrigger,
}

impl AttemptController {
    /// Submit the collected answers for grading.
    ///
    /// Only the first caller to leave `Active` sends anything; concurrent or
    /// repeated calls return `SubmitOutcome::Ignored`. A manual submit is also
    /// accepted after a failed submission, which is how the user retries.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Network` if the exam service rejects the call.
    /// Answers and cursor are kept for a retry.
    pub async fn submit(&self, trigger: SubmitTrigger) -> Result<SubmitOutcome, SessionError> {
        self.submit_for(trigger, None).await
    }

    /// Submit, but only if `expected` is still the attempt held.
    pub(crate) async fn submit_for(
        &self,
        trigger: SubmitTrigger,
        expected: Option<&AttemptId>,
    ) -> Result<SubmitOutcome, SessionError> {
        let ticket = {
            let mut state = self.lock();
            let ticket = self.begin_submission(&mut state, trigger, expected);
            if ticket.is_some() {
                self.publish(&state);
            }
            ticket
        };

        match ticket {
            Some(ticket) => self.complete_submission(ticket).await,
            None => Ok(SubmitOutcome::Ignored),
        }
    }

    /// Claim the submission under the state lock.
    ///
    /// Stops the countdown before anything is sent.
    pub(crate) fn begin_submission(
        &self,
        state: &mut SessionState,
        trigger: SubmitTrigger,
        expected: Option<&AttemptId>,
    ) -> Option<SubmissionTicket> {
        let phase = state.phase;
        let allowed = match trigger {
            SubmitTrigger::Timeout => phase.is_active(),
            SubmitTrigger::Manual => matches!(
                phase,
                AttemptPhase::Active
                    | AttemptPhase::Errored(ErrorSource::Submit | ErrorSource::Cancel)
            ),
        };

        let attempt = state.attempt.as_ref();
        let matches_expected = match (attempt, expected) {
            (Some(attempt), Some(expected)) => attempt.id() == expected,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if !allowed || !matches_expected {
            debug!(?trigger, %phase, "dropping stale submission");
            return None;
        }

        let attempt = attempt?;
        let ticket = SubmissionTicket {
            attempt_id: attempt.id().clone(),
            answers: state.answers.to_submission(attempt),
            trigger,
        };

        state.stop_countdown();
        state.phase = AttemptPhase::Submitting;
        state.last_error = None;
        info!(
            attempt_id = %ticket.attempt_id,
            ?trigger,
            answered = state.answers.answered_count(),
            "submitting attempt"
        );
        Some(ticket)
    }

    /// Send a claimed submission and apply the outcome.
    pub(crate) async fn complete_submission(
        &self,
        ticket: SubmissionTicket,
    ) -> Result<SubmitOutcome, SessionError> {
        let sent = self
            .shared
            .service
            .submit_attempt(&ticket.attempt_id, &ticket.answers)
            .await;

        let mut state = self.lock();
        match sent {
            Ok(result) => {
                info!(
                    attempt_id = %ticket.attempt_id,
                    trigger = ?ticket.trigger,
                    score = result.score,
                    max_score = result.max_score,
                    "attempt graded"
                );
                state.stop_countdown();
                state.phase = AttemptPhase::Terminal;
                state.answers.clear();
                state.result = Some(result.clone());
                self.publish(&state);
                Ok(SubmitOutcome::Submitted(result))
            }
            Err(err) => {
                warn!(
                    attempt_id = %ticket.attempt_id,
                    trigger = ?ticket.trigger,
                    error = %err,
                    "submission failed"
                );
                state.phase = AttemptPhase::Errored(ErrorSource::Submit);
                state.last_error = Some(err.to_string());
                self.publish(&state);
                Err(err.into())
            }
        }
    }
}

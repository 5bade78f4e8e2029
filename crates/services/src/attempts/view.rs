use serde::Serialize;

use exam_core::model::{AnswerMap, AttemptId, ExamResult, Question};

use super::state::{AttemptPhase, SessionState};

/// Read-only view of the controller for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptSnapshot {
    pub phase: AttemptPhase,
    pub attempt_id: Option<AttemptId>,
    pub current_index: usize,
    pub question_count: usize,
    pub current_question: Option<Question>,
    pub answers: AnswerMap,
    pub answered_count: usize,
    /// Whole seconds left; `None` for untimed attempts or when nothing is running.
    pub remaining_seconds: Option<u64>,
    pub result: Option<ExamResult>,
    pub last_error: Option<String>,
}

impl AttemptSnapshot {
    pub(crate) fn idle() -> Self {
        Self::from_state(&SessionState::new())
    }

    pub(crate) fn from_state(state: &SessionState) -> Self {
        let attempt = state.attempt.as_ref();
        Self {
            phase: state.phase,
            attempt_id: attempt.map(|a| a.id().clone()),
            current_index: state.cursor,
            question_count: attempt.map_or(0, |a| a.question_count()),
            current_question: attempt.and_then(|a| a.question(state.cursor)).cloned(),
            answers: state.answers.clone(),
            answered_count: state.answers.answered_count(),
            remaining_seconds: state.remaining.map(|d| d.as_secs()),
            result: state.result.clone(),
            last_error: state.last_error.clone(),
        }
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.remaining_seconds.is_some()
    }
}

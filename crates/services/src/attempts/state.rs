use std::fmt;
use std::time::Duration;

use serde::Serialize;

use exam_core::model::{AnswerMap, ExamAttempt, ExamResult, StartRequest};

use super::countdown::Countdown;

/// Which operation put the controller into `Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorSource {
    Start,
    Resume,
    Submit,
    Cancel,
}

/// Lifecycle of the attempt controller.
///
/// `Idle → Loading → Active → Submitting → Terminal`, with `Errored` reachable
/// from the network-bound phases. `Cancelling` covers the abandon call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttemptPhase {
    Idle,
    Loading,
    Active,
    Submitting,
    Cancelling,
    Terminal,
    Errored(ErrorSource),
}

impl AttemptPhase {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, AttemptPhase::Active)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptPhase::Terminal)
    }

    /// True while a network call owned by the controller is outstanding.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            AttemptPhase::Loading | AttemptPhase::Submitting | AttemptPhase::Cancelling
        )
    }
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptPhase::Idle => f.write_str("idle"),
            AttemptPhase::Loading => f.write_str("loading"),
            AttemptPhase::Active => f.write_str("active"),
            AttemptPhase::Submitting => f.write_str("submitting"),
            AttemptPhase::Cancelling => f.write_str("cancelling"),
            AttemptPhase::Terminal => f.write_str("terminal"),
            AttemptPhase::Errored(source) => write!(f, "errored ({source:?})"),
        }
    }
}

/// Everything the controller owns for the lifetime of one attempt.
pub(crate) struct SessionState {
    pub(crate) phase: AttemptPhase,
    pub(crate) resume_checked: bool,
    pub(crate) attempt: Option<ExamAttempt>,
    pub(crate) cursor: usize,
    pub(crate) answers: AnswerMap,
    pub(crate) pending_request: Option<StartRequest>,
    pub(crate) result: Option<ExamResult>,
    pub(crate) last_error: Option<String>,
    pub(crate) remaining: Option<Duration>,
    pub(crate) countdown: Option<Countdown>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            phase: AttemptPhase::Idle,
            resume_checked: false,
            attempt: None,
            cursor: 0,
            answers: AnswerMap::new(),
            pending_request: None,
            result: None,
            last_error: None,
            remaining: None,
            countdown: None,
        }
    }

    /// Abort the running countdown, if any, and forget the remaining time.
    /// Safe to call repeatedly.
    pub(crate) fn stop_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.remaining = None;
    }

    /// Whether the controller still holds an attempt that must be submitted or cancelled.
    pub(crate) fn holds_attempt(&self) -> bool {
        self.attempt.is_some() && !self.phase.is_terminal()
    }

    /// Drop everything tied to the current attempt.
    pub(crate) fn reset(&mut self) {
        self.stop_countdown();
        self.phase = AttemptPhase::Idle;
        self.attempt = None;
        self.cursor = 0;
        self.answers.clear();
        self.result = None;
        self.last_error = None;
        self.remaining = None;
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("phase", &self.phase)
            .field("attempt_id", &self.attempt.as_ref().map(ExamAttempt::id))
            .field("cursor", &self.cursor)
            .field("answered", &self.answers.answered_count())
            .field("remaining", &self.remaining)
            .field("timer_running", &self.countdown.is_some())
            .finish_non_exhaustive()
    }
}

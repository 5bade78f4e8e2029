use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use exam_core::model::{
    AnswerMap, AttemptId, ExamAttempt, ExamResult, ExamSettings, ExamSetup, OptionId, Question,
    QuestionId, StartRequest,
};
use remote::ExamService;

use super::countdown::{Countdown, TimeSource};
use super::state::{AttemptPhase, ErrorSource, SessionState};
use super::submission::{SubmitOutcome, SubmitTrigger};
use super::view::AttemptSnapshot;
use crate::error::SessionError;

/// Result of checking the exam service for an in-progress attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    /// Nothing to resume; the controller stays idle.
    NoActiveAttempt,
    /// The server-held attempt is now active.
    Resumed,
    /// The server-held attempt had already expired and was submitted.
    AutoSubmitted(SubmitOutcome),
}

pub(crate) struct Shared {
    pub(crate) service: Arc<dyn ExamService>,
    pub(crate) clock: Arc<dyn TimeSource>,
    pub(crate) tick: Duration,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) snapshots: watch::Sender<AttemptSnapshot>,
}

/// Single owner of the in-progress attempt.
///
/// All writes to the attempt, cursor and answers go through this type. Reads
/// and local edits are synchronous; only the exam service calls are async.
/// Clones share the same state. The countdown is aborted when the last clone
/// is dropped.
#[derive(Clone)]
pub struct AttemptController {
    pub(crate) shared: Arc<Shared>,
}

impl AttemptController {
    #[must_use]
    pub fn new(
        service: Arc<dyn ExamService>,
        clock: Arc<dyn TimeSource>,
        settings: &ExamSettings,
    ) -> Self {
        let (snapshots, _) = watch::channel(AttemptSnapshot::idle());
        Self {
            shared: Arc::new(Shared {
                service,
                clock,
                tick: settings.tick_interval(),
                state: Mutex::new(SessionState::new()),
                snapshots,
            }),
        }
    }

    /// Build a controller and immediately check for a server-held attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Network` if the check fails. Use `new` followed by
    /// `resume` to keep the controller around for a retry.
    pub async fn open(
        service: Arc<dyn ExamService>,
        clock: Arc<dyn TimeSource>,
        settings: &ExamSettings,
    ) -> Result<(Self, ResumeOutcome), SessionError> {
        let controller = Self::new(service, clock, settings);
        let outcome = controller.resume().await?;
        Ok((controller, outcome))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, state: &SessionState) {
        self.shared
            .snapshots
            .send_replace(AttemptSnapshot::from_state(state));
    }

    //
    // ─── READS ─────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn phase(&self) -> AttemptPhase {
        self.lock().phase
    }

    #[must_use]
    pub fn snapshot(&self) -> AttemptSnapshot {
        AttemptSnapshot::from_state(&self.lock())
    }

    /// Observe every state change without polling.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AttemptSnapshot> {
        self.shared.snapshots.subscribe()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.lock().cursor
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.lock()
            .attempt
            .as_ref()
            .map_or(0, ExamAttempt::question_count)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        let state = self.lock();
        state
            .attempt
            .as_ref()
            .and_then(|attempt| attempt.question(state.cursor))
            .cloned()
    }

    #[must_use]
    pub fn answers(&self) -> AnswerMap {
        self.lock().answers.clone()
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u64> {
        self.lock().remaining.map(|d| d.as_secs())
    }

    #[must_use]
    pub fn result(&self) -> Option<ExamResult> {
        self.lock().result.clone()
    }

    /// The start request kept after a failed start, if any.
    #[must_use]
    pub fn pending_request(&self) -> Option<StartRequest> {
        self.lock().pending_request.clone()
    }

    //
    // ─── RESUME / START ────────────────────────────────────────────────────────
    //

    /// Check the exam service for an attempt left in progress.
    ///
    /// Must succeed once before `start` is allowed. An attempt whose expiry has
    /// already passed is submitted right away with `SubmitTrigger::Timeout`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless idle (or errored by a previous
    /// resume), and `SessionError::Network` if the lookup or the expiry
    /// submission fails.
    pub async fn resume(&self) -> Result<ResumeOutcome, SessionError> {
        {
            let mut state = self.lock();
            if !matches!(
                state.phase,
                AttemptPhase::Idle | AttemptPhase::Errored(ErrorSource::Resume)
            ) {
                return Err(SessionError::InvalidState {
                    operation: "resume",
                    phase: state.phase,
                });
            }
            state.phase = AttemptPhase::Loading;
            self.publish(&state);
        }

        let fetched = self.shared.service.active_attempt().await;

        let ticket = {
            let mut state = self.lock();
            let attempt = match fetched {
                Ok(Some(attempt)) => attempt,
                Ok(None) => {
                    state.phase = AttemptPhase::Idle;
                    state.resume_checked = true;
                    state.last_error = None;
                    self.publish(&state);
                    debug!("no attempt to resume");
                    return Ok(ResumeOutcome::NoActiveAttempt);
                }
                Err(err) => {
                    warn!(error = %err, "active attempt lookup failed");
                    state.phase = AttemptPhase::Errored(ErrorSource::Resume);
                    state.last_error = Some(err.to_string());
                    self.publish(&state);
                    return Err(err.into());
                }
            };

            state.resume_checked = true;
            let expired = attempt.is_expired_at(self.shared.clock.now());
            info!(attempt_id = %attempt.id(), expired, "resuming attempt");
            self.activate(&mut state, attempt, !expired);

            if expired {
                let ticket = self.begin_submission(&mut state, SubmitTrigger::Timeout, None);
                self.publish(&state);
                ticket
            } else {
                self.publish(&state);
                None
            }
        };

        match ticket {
            Some(ticket) => {
                let outcome = self.complete_submission(ticket).await?;
                Ok(ResumeOutcome::AutoSubmitted(outcome))
            }
            None => Ok(ResumeOutcome::Resumed),
        }
    }

    /// Finalize `setup` and start an attempt with it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the setup cannot produce a
    /// request, otherwise the errors of [`AttemptController::start`].
    pub async fn start_from_setup(&self, setup: &ExamSetup) -> Result<(), SessionError> {
        let request = setup.build_start_request()?;
        self.start(request).await
    }

    /// Ask the exam service for a new attempt.
    ///
    /// On failure the request is kept so `retry_start` can reuse it.
    ///
    /// # Errors
    ///
    /// Returns `ResumeRequired` before a successful `resume`, `AttemptInProgress`
    /// while an attempt is still held, `InvalidState` outside idle/errored, and
    /// `Network` if the service call fails.
    pub async fn start(&self, request: StartRequest) -> Result<(), SessionError> {
        {
            let mut state = self.lock();
            if !state.resume_checked {
                return Err(SessionError::ResumeRequired);
            }
            if state.holds_attempt() {
                return Err(SessionError::AttemptInProgress);
            }
            if !matches!(state.phase, AttemptPhase::Idle | AttemptPhase::Errored(_)) {
                return Err(SessionError::InvalidState {
                    operation: "start",
                    phase: state.phase,
                });
            }
            state.pending_request = Some(request.clone());
            state.phase = AttemptPhase::Loading;
            state.last_error = None;
            self.publish(&state);
        }

        info!(
            questions = request.question_count,
            subjects = request.subject_selections.len(),
            time_limit = ?request.time_limit_minutes,
            "starting attempt"
        );
        let started = self.shared.service.start_attempt(&request).await;

        let mut state = self.lock();
        match started {
            Ok(attempt) => {
                info!(attempt_id = %attempt.id(), timed = attempt.is_timed(), "attempt started");
                state.pending_request = None;
                self.activate(&mut state, attempt, true);
                self.publish(&state);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "start attempt failed");
                state.phase = AttemptPhase::Errored(ErrorSource::Start);
                state.last_error = Some(err.to_string());
                self.publish(&state);
                Err(err.into())
            }
        }
    }

    /// Re-issue the start request kept from the last failed start.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingToRetry` when there is no failed start,
    /// otherwise the errors of [`AttemptController::start`].
    pub async fn retry_start(&self) -> Result<(), SessionError> {
        let request = {
            let state = self.lock();
            match (&state.phase, &state.pending_request) {
                (AttemptPhase::Errored(ErrorSource::Start), Some(request)) => request.clone(),
                _ => return Err(SessionError::NothingToRetry),
            }
        };
        self.start(request).await
    }

    /// Install a fresh attempt: cursor 0, empty answers, countdown armed if timed.
    fn activate(&self, state: &mut SessionState, attempt: ExamAttempt, arm: bool) {
        state.stop_countdown();
        state.attempt = Some(attempt);
        state.cursor = 0;
        state.answers.clear();
        state.result = None;
        state.last_error = None;
        state.phase = AttemptPhase::Active;
        if arm {
            self.arm_countdown(state);
        }
    }

    pub(crate) fn arm_countdown(&self, state: &mut SessionState) {
        let Some(attempt) = state.attempt.as_ref() else {
            return;
        };
        let Some(expiry) = attempt.expires_at() else {
            state.remaining = None;
            return;
        };

        let attempt_id = attempt.id().clone();
        let tick_id = attempt_id.clone();
        let tick_target = Arc::downgrade(&self.shared);
        let fire_target = Arc::downgrade(&self.shared);

        debug!(attempt_id = %attempt_id, %expiry, "arming countdown");
        state.stop_countdown();
        state.remaining = Some(
            (expiry - self.shared.clock.now())
                .max(chrono::Duration::zero())
                .to_std()
                .unwrap_or_default(),
        );
        state.countdown = Some(Countdown::spawn(
            expiry,
            Arc::clone(&self.shared.clock),
            self.shared.tick,
            move |remaining| {
                if let Some(shared) = tick_target.upgrade() {
                    AttemptController { shared }.record_remaining(&tick_id, remaining);
                }
            },
            move || {
                let Some(shared) = fire_target.upgrade() else {
                    return;
                };
                tokio::spawn(async move {
                    let controller = AttemptController { shared };
                    if let Err(err) = controller
                        .submit_for(SubmitTrigger::Timeout, Some(&attempt_id))
                        .await
                    {
                        warn!(attempt_id = %attempt_id, error = %err, "auto-submit failed");
                    }
                });
            },
        ));
    }

    fn record_remaining(&self, attempt_id: &AttemptId, remaining: Duration) {
        let mut state = self.lock();
        let current = state.attempt.as_ref().map(ExamAttempt::id);
        if state.phase.is_active() && current == Some(attempt_id) {
            state.remaining = Some(remaining);
            self.publish(&state);
        }
    }

    //
    // ─── LOCAL EDITS ───────────────────────────────────────────────────────────
    //

    /// Select an option of a question of the active attempt.
    ///
    /// Single-select questions keep only the new option; multi-select questions
    /// toggle it. Returns `false` (and changes nothing) outside `Active` or for
    /// unknown question/option ids.
    pub fn select_option(&self, question_id: QuestionId, option_id: OptionId) -> bool {
        let mut state = self.lock();
        if !state.phase.is_active() {
            debug!(phase = %state.phase, "dropping selection outside active phase");
            return false;
        }
        let Some(mode) = state
            .attempt
            .as_ref()
            .and_then(|attempt| attempt.find_question(question_id))
            .filter(|question| question.has_option(option_id))
            .map(|question| question.mode)
        else {
            return false;
        };
        state.answers.select(question_id, option_id, mode);
        self.publish(&state);
        true
    }

    /// Remove every selected option of a question. Active only.
    pub fn clear_answer(&self, question_id: QuestionId) -> bool {
        let mut state = self.lock();
        if !state.phase.is_active() || state.answers.selected(question_id).is_none() {
            return false;
        }
        state.answers.clear_question(question_id);
        self.publish(&state);
        true
    }

    /// Move the cursor. No-op outside `Active` or when `index` is out of range.
    pub fn go_to_question(&self, index: usize) -> bool {
        let mut state = self.lock();
        let count = state
            .attempt
            .as_ref()
            .map_or(0, ExamAttempt::question_count);
        if !state.phase.is_active() || index >= count {
            return false;
        }
        state.cursor = index;
        self.publish(&state);
        true
    }

    pub fn next_question(&self) -> bool {
        let next = self.current_index().saturating_add(1);
        self.go_to_question(next)
    }

    pub fn previous_question(&self) -> bool {
        match self.current_index().checked_sub(1) {
            Some(previous) => self.go_to_question(previous),
            None => false,
        }
    }

    //
    // ─── CANCEL / FINISH ───────────────────────────────────────────────────────
    //

    /// Abandon the attempt on the exam service and return to `Idle`.
    ///
    /// Answers are discarded. If the service call fails the attempt is kept and
    /// a timed attempt gets its countdown back.
    ///
    /// # Errors
    ///
    /// Returns `NotActive` when there is no attempt, `InvalidState` while another
    /// call is in flight, and `Network` if the service call fails.
    pub async fn cancel(&self) -> Result<(), SessionError> {
        let (attempt_id, previous) = {
            let mut state = self.lock();
            if !state.holds_attempt() {
                return Err(SessionError::NotActive);
            }
            let previous = state.phase;
            if !matches!(
                previous,
                AttemptPhase::Active
                    | AttemptPhase::Errored(ErrorSource::Submit | ErrorSource::Cancel)
            ) {
                return Err(SessionError::InvalidState {
                    operation: "cancel",
                    phase: previous,
                });
            }
            let Some(attempt_id) = state.attempt.as_ref().map(|a| a.id().clone()) else {
                return Err(SessionError::NotActive);
            };
            state.stop_countdown();
            state.phase = AttemptPhase::Cancelling;
            self.publish(&state);
            (attempt_id, previous)
        };

        let cancelled = self.shared.service.cancel_attempt(&attempt_id).await;

        let mut state = self.lock();
        match cancelled {
            Ok(()) => {
                info!(attempt_id = %attempt_id, "attempt cancelled");
                state.reset();
                self.publish(&state);
                Ok(())
            }
            Err(err) => {
                warn!(attempt_id = %attempt_id, error = %err, "cancel failed");
                state.last_error = Some(err.to_string());
                if previous.is_active() {
                    state.phase = AttemptPhase::Active;
                    self.arm_countdown(&mut state);
                } else {
                    state.phase = AttemptPhase::Errored(ErrorSource::Cancel);
                }
                self.publish(&state);
                Err(err.into())
            }
        }
    }

    /// Dismiss a terminal result and return to `Idle`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the controller is terminal.
    pub fn finish(&self) -> Result<ExamResult, SessionError> {
        let mut state = self.lock();
        if !state.phase.is_terminal() {
            return Err(SessionError::InvalidState {
                operation: "finish",
                phase: state.phase,
            });
        }
        let result = state.result.take().ok_or(SessionError::NotActive)?;
        state.reset();
        self.publish(&state);
        Ok(result)
    }
}

impl fmt::Debug for AttemptController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptController")
            .field("state", &*self.lock())
            .field("tick", &self.shared.tick)
            .finish_non_exhaustive()
    }
}

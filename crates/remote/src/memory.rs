use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use exam_core::model::{
    AnswerSubmission, AttemptId, ExamAttempt, ExamResult, OptionId, QuestionId, QuestionOutcome,
    StartRequest, SubjectAvailability, SubjectId,
};

use crate::service::{ExamService, ExamServiceError};

/// Calls that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Availability,
    Start,
    Active,
    Submit,
    Cancel,
}

#[derive(Default)]
struct State {
    availability: HashMap<SubjectId, SubjectAvailability>,
    queued_attempts: VecDeque<ExamAttempt>,
    active: Option<ExamAttempt>,
    answer_key: HashMap<QuestionId, BTreeSet<OptionId>>,
    failures: HashMap<Operation, usize>,
    always_fail: HashSet<Operation>,
    submit_delay: Option<Duration>,
    start_requests: Vec<StartRequest>,
    submissions: Vec<(AttemptId, Vec<AnswerSubmission>)>,
    cancelled: Vec<AttemptId>,
}

/// In-memory exam service for tests and offline prototyping.
///
/// Attempts are queued up front and handed out by `start_attempt`; grading
/// uses an optional answer key.
#[derive(Clone, Default)]
pub struct InMemoryExamService {
    state: Arc<Mutex<State>>,
}

impl InMemoryExamService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, ExamServiceError> {
        self.state
            .lock()
            .map_err(|e| ExamServiceError::Unavailable(e.to_string()))
    }

    fn guard(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_availability(self, availability: SubjectAvailability) -> Self {
        self.guard()
            .availability
            .insert(availability.subject_id, availability);
        self
    }

    /// Queue an attempt to be returned by the next `start_attempt`.
    #[must_use]
    pub fn with_queued_attempt(self, attempt: ExamAttempt) -> Self {
        self.guard().queued_attempts.push_back(attempt);
        self
    }

    /// Pretend the server already holds this attempt as in progress.
    #[must_use]
    pub fn with_active_attempt(self, attempt: ExamAttempt) -> Self {
        self.guard().active = Some(attempt);
        self
    }

    #[must_use]
    pub fn with_answer_key(self, question_id: QuestionId, options: &[OptionId]) -> Self {
        self.guard()
            .answer_key
            .insert(question_id, options.iter().copied().collect());
        self
    }

    /// Delay every submit call, to widen race windows in tests.
    #[must_use]
    pub fn with_submit_delay(self, delay: Duration) -> Self {
        self.guard().submit_delay = Some(delay);
        self
    }

    /// Make the next `times` calls of `op` fail.
    pub fn fail_next(&self, op: Operation, times: usize) {
        *self.guard().failures.entry(op).or_default() += times;
    }

    /// Make every call of `op` fail until `recover` is called.
    pub fn fail_always(&self, op: Operation) {
        self.guard().always_fail.insert(op);
    }

    pub fn recover(&self, op: Operation) {
        let mut state = self.guard();
        state.always_fail.remove(&op);
        state.failures.remove(&op);
    }

    #[must_use]
    pub fn start_requests(&self) -> Vec<StartRequest> {
        self.guard().start_requests.clone()
    }

    #[must_use]
    pub fn submit_count(&self) -> usize {
        self.guard().submissions.len()
    }

    #[must_use]
    pub fn submissions(&self) -> Vec<(AttemptId, Vec<AnswerSubmission>)> {
        self.guard().submissions.clone()
    }

    #[must_use]
    pub fn cancelled(&self) -> Vec<AttemptId> {
        self.guard().cancelled.clone()
    }

    #[must_use]
    pub fn active(&self) -> Option<ExamAttempt> {
        self.guard().active.clone()
    }

    fn check_failure(state: &mut State, op: Operation) -> Result<(), ExamServiceError> {
        if state.always_fail.contains(&op) {
            return Err(ExamServiceError::Unavailable(format!("{op:?} failed")));
        }
        if let Some(remaining) = state.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ExamServiceError::Unavailable(format!("{op:?} failed")));
            }
        }
        Ok(())
    }

    fn grade(
        key: &HashMap<QuestionId, BTreeSet<OptionId>>,
        attempt: &ExamAttempt,
        answers: &[AnswerSubmission],
    ) -> ExamResult {
        let mut score = 0.0;
        let mut max_score = 0.0;
        let outcomes = attempt
            .questions()
            .iter()
            .map(|question| {
                let points = f64::from(question.points);
                max_score += points;
                let expected = key.get(&question.id).cloned().unwrap_or_default();
                let given: BTreeSet<OptionId> = answers
                    .iter()
                    .find(|answer| answer.question_id == question.id)
                    .map(|answer| answer.selected_option_ids.iter().copied().collect())
                    .unwrap_or_default();
                let correct = !expected.is_empty() && expected == given;
                let earned_points = if correct { points } else { 0.0 };
                score += earned_points;
                QuestionOutcome {
                    question_id: question.id,
                    correct,
                    earned_points,
                    correct_option_ids: expected.into_iter().collect(),
                }
            })
            .collect();

        ExamResult {
            attempt_id: attempt.id().clone(),
            score,
            max_score,
            outcomes,
            duration_secs: 0,
        }
    }
}

#[async_trait]
impl ExamService for InMemoryExamService {
    async fn subject_availability(
        &self,
        subject_id: SubjectId,
    ) -> Result<SubjectAvailability, ExamServiceError> {
        let mut state = self.lock()?;
        Self::check_failure(&mut state, Operation::Availability)?;
        state
            .availability
            .get(&subject_id)
            .cloned()
            .ok_or_else(|| ExamServiceError::Unavailable(format!("unknown subject {subject_id}")))
    }

    async fn start_attempt(&self, request: &StartRequest) -> Result<ExamAttempt, ExamServiceError> {
        let mut state = self.lock()?;
        state.start_requests.push(request.clone());
        Self::check_failure(&mut state, Operation::Start)?;
        if state.active.is_some() {
            return Err(ExamServiceError::Unavailable(
                "an attempt is already in progress".into(),
            ));
        }
        let attempt = state
            .queued_attempts
            .pop_front()
            .ok_or_else(|| ExamServiceError::Unavailable("no attempt queued".into()))?;
        state.active = Some(attempt.clone());
        Ok(attempt)
    }

    async fn active_attempt(&self) -> Result<Option<ExamAttempt>, ExamServiceError> {
        let mut state = self.lock()?;
        Self::check_failure(&mut state, Operation::Active)?;
        Ok(state.active.clone())
    }

    async fn submit_attempt(
        &self,
        attempt_id: &AttemptId,
        answers: &[AnswerSubmission],
    ) -> Result<ExamResult, ExamServiceError> {
        let delay = {
            let mut state = self.lock()?;
            state.submissions.push((attempt_id.clone(), answers.to_vec()));
            Self::check_failure(&mut state, Operation::Submit)?;
            state.submit_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock()?;
        let attempt = match state.active.take() {
            Some(active) if active.id() == attempt_id => active,
            other => {
                state.active = other;
                return Err(ExamServiceError::Unavailable(format!(
                    "attempt {attempt_id} is not active"
                )));
            }
        };
        Ok(Self::grade(&state.answer_key, &attempt, answers))
    }

    async fn cancel_attempt(&self, attempt_id: &AttemptId) -> Result<(), ExamServiceError> {
        let mut state = self.lock()?;
        Self::check_failure(&mut state, Operation::Cancel)?;
        if state.active.as_ref().is_some_and(|a| a.id() == attempt_id) {
            state.active = None;
        }
        state.cancelled.push(attempt_id.clone());
        Ok(())
    }
}

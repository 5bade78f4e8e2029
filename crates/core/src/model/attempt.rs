use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{AttemptId, QuestionId, SubjectId};
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt id cannot be empty")]
    EmptyId,

    #[error("attempt has no questions")]
    NoQuestions,

    #[error("duplicate question id {0} in attempt")]
    DuplicateQuestion(QuestionId),

    #[error("question {0} has duplicate option ids")]
    DuplicateOption(QuestionId),
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// Server-issued exam attempt.
///
/// Immutable once built: the question list and expiry never change. Only the
/// client-side cursor and answers evolve around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamAttempt {
    id: AttemptId,
    questions: Vec<Question>,
    expires_at: Option<DateTime<Utc>>,
    subjects: Vec<SubjectId>,
}

impl ExamAttempt {
    /// Build an attempt from the data returned by the exam service.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` when the id is blank, no questions were drawn,
    /// or question/option ids repeat.
    pub fn new(
        id: AttemptId,
        questions: Vec<Question>,
        expires_at: Option<DateTime<Utc>>,
        subjects: Vec<SubjectId>,
    ) -> Result<Self, AttemptError> {
        if id.as_str().trim().is_empty() {
            return Err(AttemptError::EmptyId);
        }
        if questions.is_empty() {
            return Err(AttemptError::NoQuestions);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(AttemptError::DuplicateQuestion(question.id));
            }
            let mut options = HashSet::with_capacity(question.options.len());
            if !question.options.iter().all(|option| options.insert(option.id)) {
                return Err(AttemptError::DuplicateOption(question.id));
            }
        }

        Ok(Self {
            id,
            questions,
            expires_at,
            subjects,
        })
    }

    #[must_use]
    pub fn id(&self) -> &AttemptId {
        &self.id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn find_question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    /// Absolute expiry instant, `None` for untimed attempts.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.expires_at.is_some()
    }

    #[must_use]
    pub fn subjects(&self) -> &[SubjectId] {
        &self.subjects
    }

    /// Time left at `now`, clamped at zero. `None` when untimed.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .map(|expiry| (expiry - now).max(Duration::zero()))
    }

    /// True once `now` has reached the expiry of a timed attempt.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

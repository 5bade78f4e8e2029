use serde::{Deserialize, Serialize};

use crate::model::ids::{AttemptId, OptionId, QuestionId};

/// Grading detail for a single question, as computed by the exam service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub correct: bool,
    pub earned_points: f64,
    pub correct_option_ids: Vec<OptionId>,
}

/// Outcome of a submitted attempt. Treated as opaque output of the grader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub attempt_id: AttemptId,
    pub score: f64,
    pub max_score: f64,
    pub outcomes: Vec<QuestionOutcome>,
    pub duration_secs: u64,
}

impl ExamResult {
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.correct).count()
    }

    /// Score as a percentage of the maximum, `0.0` when nothing was gradable.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.max_score <= 0.0 {
            return 0.0;
        }
        (self.score / self.max_score) * 100.0
    }
}

//! Wire shapes for the exam service JSON API and their mapping to domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exam_core::model::{
    AnswerOption, AnswerSubmission, AttemptId, ChapterAvailability, ChapterId,
    Difficulty, ExamAttempt, ExamResult, OptionId, Question, QuestionId, QuestionOutcome,
    SelectionMode, StartRequest, SubjectAvailability, SubjectId,
};

use crate::service::ExamServiceError;

fn decode<E: core::fmt::Display>(e: E) -> ExamServiceError {
    ExamServiceError::Decode(e.to_string())
}

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubjectSelectionDto {
    subject_id: u64,
    // Always emitted: `null` selects every chapter, `[]` selects none.
    chapter_ids: Option<Vec<u64>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartAttemptDto {
    subject_selections: Vec<SubjectSelectionDto>,
    question_count: u32,
    difficulty_filter: Option<&'static str>,
    time_limit_minutes: Option<u32>,
}

impl From<&StartRequest> for StartAttemptDto {
    fn from(request: &StartRequest) -> Self {
        Self {
            subject_selections: request
                .subject_selections
                .iter()
                .map(|filter| SubjectSelectionDto {
                    subject_id: filter.subject_id.value(),
                    chapter_ids: filter
                        .chapter_ids
                        .as_ref()
                        .map(|ids| ids.iter().map(ChapterId::value).collect()),
                })
                .collect(),
            question_count: request.question_count,
            difficulty_filter: request.difficulty_filter.map(Difficulty::as_str),
            time_limit_minutes: request.time_limit_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmittedAnswerDto {
    question_id: u64,
    selected_option_ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAttemptDto {
    answers: Vec<SubmittedAnswerDto>,
}

impl From<&[AnswerSubmission]> for SubmitAttemptDto {
    fn from(answers: &[AnswerSubmission]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|answer| SubmittedAnswerDto {
                    question_id: answer.question_id.value(),
                    selected_option_ids: answer
                        .selected_option_ids
                        .iter()
                        .map(OptionId::value)
                        .collect(),
                })
                .collect(),
        }
    }
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChapterDto {
    id: u64,
    question_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AvailabilityDto {
    total_questions: u32,
    #[serde(default)]
    chapters: Vec<ChapterDto>,
}

impl AvailabilityDto {
    pub(crate) fn into_availability(self, subject_id: SubjectId) -> SubjectAvailability {
        SubjectAvailability {
            subject_id,
            total_questions: self.total_questions,
            chapters: self
                .chapters
                .into_iter()
                .map(|chapter| ChapterAvailability {
                    id: ChapterId::new(chapter.id),
                    question_count: chapter.question_count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptionDto {
    id: u64,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionDto {
    id: u64,
    text: String,
    options: Vec<OptionDto>,
    #[serde(default = "default_points")]
    points: u32,
    difficulty: String,
    #[serde(default)]
    is_multiple: bool,
}

fn default_points() -> u32 {
    1
}

impl QuestionDto {
    fn into_question(self) -> Result<Question, ExamServiceError> {
        let difficulty = self.difficulty.parse::<Difficulty>().map_err(decode)?;
        Ok(Question {
            id: QuestionId::new(self.id),
            text: self.text,
            options: self
                .options
                .into_iter()
                .map(|option| AnswerOption {
                    id: OptionId::new(option.id),
                    text: option.text,
                })
                .collect(),
            points: self.points,
            difficulty,
            mode: SelectionMode::from_multiple(self.is_multiple),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttemptDto {
    id: String,
    questions: Vec<QuestionDto>,
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    subject_ids: Vec<u64>,
}

impl AttemptDto {
    pub(crate) fn into_attempt(self) -> Result<ExamAttempt, ExamServiceError> {
        let questions = self
            .questions
            .into_iter()
            .map(QuestionDto::into_question)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExamAttempt::new(
            AttemptId::new(self.id),
            questions,
            self.expires_at,
            self.subject_ids.into_iter().map(SubjectId::new).collect(),
        )?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OutcomeDto {
    question_id: u64,
    correct: bool,
    #[serde(default)]
    earned_points: f64,
    #[serde(default)]
    correct_option_ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultDto {
    score: f64,
    max_score: f64,
    #[serde(default)]
    outcomes: Vec<OutcomeDto>,
    #[serde(default)]
    duration_secs: u64,
}

impl ResultDto {
    pub(crate) fn into_result(self, attempt_id: AttemptId) -> ExamResult {
        ExamResult {
            attempt_id,
            score: self.score,
            max_score: self.max_score,
            outcomes: self
                .outcomes
                .into_iter()
                .map(|outcome| QuestionOutcome {
                    question_id: QuestionId::new(outcome.question_id),
                    correct: outcome.correct,
                    earned_points: outcome.earned_points,
                    correct_option_ids: outcome
                        .correct_option_ids
                        .into_iter()
                        .map(OptionId::new)
                        .collect(),
                })
                .collect(),
            duration_secs: self.duration_secs,
        }
    }
}

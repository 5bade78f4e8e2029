#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use exam_core::model::{
    AnswerOption, AttemptId, Difficulty, ExamAttempt, ExamSettings, OptionId, Question,
    QuestionId, SelectionMode, StartRequest, SubjectFilter, SubjectId,
};
use remote::InMemoryExamService;
use services::AttemptController;

pub use services::testing::TokioClock;

pub fn question(id: u64, mode: SelectionMode) -> Question {
    Question {
        id: QuestionId::new(id),
        text: format!("Question {id}"),
        options: (1..=4)
            .map(|o| AnswerOption {
                id: OptionId::new(o),
                text: format!("Option {o}"),
            })
            .collect(),
        points: 1,
        difficulty: Difficulty::Medium,
        mode,
    }
}

/// Three questions: single, multi, single.
pub fn attempt(id: &str, expires_at: Option<DateTime<Utc>>) -> ExamAttempt {
    ExamAttempt::new(
        AttemptId::new(id),
        vec![
            question(1, SelectionMode::Single),
            question(2, SelectionMode::Multiple),
            question(3, SelectionMode::Single),
        ],
        expires_at,
        vec![SubjectId::new(1)],
    )
    .unwrap()
}

pub fn request(time_limit_minutes: Option<u32>) -> StartRequest {
    StartRequest {
        subject_selections: vec![SubjectFilter {
            subject_id: SubjectId::new(1),
            chapter_ids: None,
        }],
        question_count: 3,
        difficulty_filter: None,
        time_limit_minutes,
    }
}

pub fn controller(remote: &InMemoryExamService, clock: Arc<TokioClock>) -> AttemptController {
    AttemptController::new(Arc::new(remote.clone()), clock, &ExamSettings::default())
}

pub fn q(id: u64) -> QuestionId {
    QuestionId::new(id)
}

pub fn opt(id: u64) -> OptionId {
    OptionId::new(id)
}

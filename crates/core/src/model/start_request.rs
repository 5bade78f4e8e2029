use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChapterId, SubjectId};
use crate::model::question::Difficulty;
use crate::model::selection::ExamSetup;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("no questions available for the current selection")]
    NoQuestionsAvailable,

    #[error("requested {requested} questions, allowed range is 1..={max}")]
    QuestionCountOutOfRange { requested: u32, max: u32 },
}

/// Per-subject filter in a start request.
///
/// `chapter_ids == None` means every chapter of the subject. It is distinct
/// from `Some(vec![])` and is serialized as an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectFilter {
    pub subject_id: SubjectId,
    pub chapter_ids: Option<Vec<ChapterId>>,
}

/// Everything the exam service needs to draw a new attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub subject_selections: Vec<SubjectFilter>,
    pub question_count: u32,
    pub difficulty_filter: Option<Difficulty>,
    pub time_limit_minutes: Option<u32>,
}

impl StartRequest {
    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.time_limit_minutes.is_some()
    }
}

impl ExamSetup {
    /// Finalize the setup into a start request.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::NoQuestionsAvailable` when the pool is empty,
    /// or `QuestionCountOutOfRange` when the requested count does not fit it.
    pub fn build_start_request(&self) -> Result<StartRequest, ConfigurationError> {
        let total = self.total_available();
        if total == 0 {
            return Err(ConfigurationError::NoQuestionsAvailable);
        }

        let max = self.max_requestable();
        let requested = self.requested_count();
        if requested == 0 || requested > max {
            return Err(ConfigurationError::QuestionCountOutOfRange { requested, max });
        }

        let subject_selections = self
            .subjects()
            .iter()
            .map(|subject| SubjectFilter {
                subject_id: subject.subject_id(),
                chapter_ids: subject.chapter_filter(),
            })
            .collect();

        Ok(StartRequest {
            subject_selections,
            question_count: requested,
            difficulty_filter: self.difficulty(),
            time_limit_minutes: self.time_limit_minutes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::selection::{ChapterAvailability, SubjectAvailability, SubjectSelection};
    use crate::model::settings::ExamSettings;

    #[test]
    fn empty_selection_is_rejected() {
        let setup = ExamSetup::new(ExamSettings::default());
        assert_eq!(
            setup.build_start_request(),
            Err(ConfigurationError::NoQuestionsAvailable)
        );
    }

    #[test]
    fn builds_one_filter_per_subject() {
        let mut setup = ExamSetup::new(ExamSettings::default());
        setup.add_subject(SubjectSelection::without_chapters(SubjectId::new(1), 40));
        setup.add_subject(SubjectSelection::from_availability(SubjectAvailability {
            subject_id: SubjectId::new(2),
            total_questions: 25,
            chapters: vec![
                ChapterAvailability {
                    id: ChapterId::new(1),
                    question_count: 10,
                },
                ChapterAvailability {
                    id: ChapterId::new(2),
                    question_count: 15,
                },
            ],
        }));
        setup.toggle_chapter(SubjectId::new(2), ChapterId::new(2));
        setup.set_requested_count(20);
        setup.set_difficulty(Some(Difficulty::Hard));
        setup.set_time_limit(Some(45)).unwrap();

        let request = setup.build_start_request().unwrap();
        assert_eq!(request.question_count, 20);
        assert_eq!(request.difficulty_filter, Some(Difficulty::Hard));
        assert_eq!(request.time_limit_minutes, Some(45));
        assert_eq!(
            request.subject_selections,
            vec![
                SubjectFilter {
                    subject_id: SubjectId::new(1),
                    chapter_ids: None,
                },
                SubjectFilter {
                    subject_id: SubjectId::new(2),
                    chapter_ids: Some(vec![ChapterId::new(2)]),
                },
            ]
        );
    }

    #[test]
    fn all_chapters_serializes_as_null_not_empty_list() {
        let filter = SubjectFilter {
            subject_id: SubjectId::new(3),
            chapter_ids: None,
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert!(json["chapter_ids"].is_null());

        let empty = SubjectFilter {
            subject_id: SubjectId::new(3),
            chapter_ids: Some(Vec::new()),
        };
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["chapter_ids"], serde_json::json!([]));
    }

    #[test]
    fn untimed_request_has_no_limit() {
        let mut setup = ExamSetup::new(ExamSettings::default());
        setup.add_subject(SubjectSelection::without_chapters(SubjectId::new(1), 5));
        let request = setup.build_start_request().unwrap();
        assert!(!request.is_timed());
        assert_eq!(request.question_count, 5);
    }
}

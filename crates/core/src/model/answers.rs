use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::attempt::ExamAttempt;
use crate::model::ids::{OptionId, QuestionId};
use crate::model::question::SelectionMode;

/// Selected options per question for one attempt.
///
/// Single-select questions hold at most one option; multi-select questions
/// hold any subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerMap {
    selections: BTreeMap<QuestionId, BTreeSet<OptionId>>,
}

/// Frozen answer for one question, in the shape sent to the exam service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: QuestionId,
    pub selected_option_ids: Vec<OptionId>,
}

impl AnswerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a user selection.
    ///
    /// Single-select replaces the whole set with `option_id`; multi-select
    /// toggles membership.
    pub fn select(&mut self, question_id: QuestionId, option_id: OptionId, mode: SelectionMode) {
        match mode {
            SelectionMode::Single => {
                let set = self.selections.entry(question_id).or_default();
                set.clear();
                set.insert(option_id);
            }
            SelectionMode::Multiple => {
                let set = self.selections.entry(question_id).or_default();
                if !set.remove(&option_id) {
                    set.insert(option_id);
                }
                if set.is_empty() {
                    self.selections.remove(&question_id);
                }
            }
        }
    }

    pub fn clear_question(&mut self, question_id: QuestionId) {
        self.selections.remove(&question_id);
    }

    pub fn clear(&mut self) {
        self.selections.clear();
    }

    #[must_use]
    pub fn selected(&self, question_id: QuestionId) -> Option<&BTreeSet<OptionId>> {
        self.selections.get(&question_id)
    }

    #[must_use]
    pub fn is_selected(&self, question_id: QuestionId, option_id: OptionId) -> bool {
        self.selections
            .get(&question_id)
            .is_some_and(|set| set.contains(&option_id))
    }

    /// Number of questions with at least one selected option.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.selections.values().filter(|set| !set.is_empty()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answered_count() == 0
    }

    /// Freeze the map into one entry per attempt question, in attempt order.
    ///
    /// Unanswered questions carry an empty option list.
    #[must_use]
    pub fn to_submission(&self, attempt: &ExamAttempt) -> Vec<AnswerSubmission> {
        attempt
            .questions()
            .iter()
            .map(|question| AnswerSubmission {
                question_id: question.id,
                selected_option_ids: self
                    .selections
                    .get(&question.id)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::AttemptId;
    use crate::model::question::{AnswerOption, Difficulty, Question};

    fn q() -> QuestionId {
        QuestionId::new(1)
    }

    fn opt(id: u64) -> OptionId {
        OptionId::new(id)
    }

    #[test]
    fn single_select_replaces_previous_choice() {
        let mut answers = AnswerMap::new();
        answers.select(q(), opt(1), SelectionMode::Single);
        answers.select(q(), opt(2), SelectionMode::Single);

        let selected: Vec<_> = answers.selected(q()).unwrap().iter().copied().collect();
        assert_eq!(selected, vec![opt(2)]);
    }

    #[test]
    fn multi_select_toggles_membership() {
        let mut answers = AnswerMap::new();
        answers.select(q(), opt(1), SelectionMode::Multiple);
        answers.select(q(), opt(2), SelectionMode::Multiple);
        assert!(answers.is_selected(q(), opt(1)));
        assert!(answers.is_selected(q(), opt(2)));

        answers.select(q(), opt(1), SelectionMode::Multiple);
        let selected: Vec<_> = answers.selected(q()).unwrap().iter().copied().collect();
        assert_eq!(selected, vec![opt(2)]);
    }

    #[test]
    fn deselecting_last_multi_option_leaves_question_unanswered() {
        let mut answers = AnswerMap::new();
        answers.select(q(), opt(3), SelectionMode::Multiple);
        answers.select(q(), opt(3), SelectionMode::Multiple);
        assert_eq!(answers.answered_count(), 0);
        assert!(answers.selected(q()).is_none());
    }

    #[test]
    fn submission_covers_every_question_in_order() {
        let question = |id: u64| Question {
            id: QuestionId::new(id),
            text: String::new(),
            options: vec![AnswerOption {
                id: opt(id * 10),
                text: String::new(),
            }],
            points: 1,
            difficulty: Difficulty::Easy,
            mode: SelectionMode::Single,
        };
        let attempt = ExamAttempt::new(
            AttemptId::new("a1"),
            vec![question(3), question(1), question(2)],
            None,
            Vec::new(),
        )
        .unwrap();

        let mut answers = AnswerMap::new();
        answers.select(QuestionId::new(1), opt(10), SelectionMode::Single);

        let frozen = answers.to_submission(&attempt);
        let order: Vec<_> = frozen.iter().map(|a| a.question_id.value()).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert!(frozen[0].selected_option_ids.is_empty());
        assert_eq!(frozen[1].selected_option_ids, vec![opt(10)]);
    }
}

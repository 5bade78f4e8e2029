use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::ids::{ChapterId, SubjectId};
use crate::model::question::Difficulty;
use crate::model::settings::ExamSettings;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("time limit must be between 1 and {max} minutes")]
    InvalidTimeLimit { max: u32 },
}

//
// ─── AVAILABILITY ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterAvailability {
    pub id: ChapterId,
    pub question_count: u32,
}

/// Question availability for one subject, as reported by the exam service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAvailability {
    pub subject_id: SubjectId,
    pub total_questions: u32,
    pub chapters: Vec<ChapterAvailability>,
}

//
// ─── SUBJECT SELECTION ─────────────────────────────────────────────────────────
//

/// A chosen subject plus its optional chapter filter.
///
/// An empty chapter filter means "every chapter": the subject contributes its
/// full question count. A non-empty filter contributes only the selected
/// chapters. Subjects whose chapters could not be loaded never gain a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSelection {
    subject_id: SubjectId,
    question_count: u32,
    chapters: Vec<ChapterAvailability>,
    selected_chapters: BTreeSet<ChapterId>,
}

impl SubjectSelection {
    #[must_use]
    pub fn from_availability(availability: SubjectAvailability) -> Self {
        Self {
            subject_id: availability.subject_id,
            question_count: availability.total_questions,
            chapters: availability.chapters,
            selected_chapters: BTreeSet::new(),
        }
    }

    /// Subject-level selection with no chapter granularity.
    #[must_use]
    pub fn without_chapters(subject_id: SubjectId, question_count: u32) -> Self {
        Self {
            subject_id,
            question_count,
            chapters: Vec::new(),
            selected_chapters: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn chapters(&self) -> &[ChapterAvailability] {
        &self.chapters
    }

    #[must_use]
    pub fn selected_chapters(&self) -> &BTreeSet<ChapterId> {
        &self.selected_chapters
    }

    #[must_use]
    pub fn has_chapters(&self) -> bool {
        !self.chapters.is_empty()
    }

    /// Questions this subject adds to the pool.
    #[must_use]
    pub fn contribution(&self) -> u32 {
        if self.selected_chapters.is_empty() {
            return self.question_count;
        }
        self.chapters
            .iter()
            .filter(|chapter| self.selected_chapters.contains(&chapter.id))
            .fold(0u32, |acc, chapter| acc.saturating_add(chapter.question_count))
    }

    /// Chapter filter for the start request; `None` means all chapters.
    #[must_use]
    pub fn chapter_filter(&self) -> Option<Vec<ChapterId>> {
        if self.selected_chapters.is_empty() {
            None
        } else {
            Some(self.selected_chapters.iter().copied().collect())
        }
    }

    fn toggle(&mut self, chapter_id: ChapterId) -> bool {
        if !self.chapters.iter().any(|chapter| chapter.id == chapter_id) {
            return false;
        }
        if !self.selected_chapters.remove(&chapter_id) {
            self.selected_chapters.insert(chapter_id);
        }
        true
    }

    fn select_all(&mut self) {
        self.selected_chapters = self.chapters.iter().map(|chapter| chapter.id).collect();
    }

    fn deselect_all(&mut self) {
        self.selected_chapters.clear();
    }
}

//
// ─── EXAM SETUP ────────────────────────────────────────────────────────────────
//

/// Pre-start configuration: chosen subjects and user parameters.
///
/// Keeps `requested_count` inside `[1, min(max_question_count, total_available)]`
/// across every selection edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSetup {
    settings: ExamSettings,
    subjects: Vec<SubjectSelection>,
    requested_count: u32,
    difficulty: Option<Difficulty>,
    time_limit_minutes: Option<u32>,
}

impl ExamSetup {
    #[must_use]
    pub fn new(settings: ExamSettings) -> Self {
        let requested_count = settings.default_question_count();
        Self {
            settings,
            subjects: Vec::new(),
            requested_count,
            difficulty: None,
            time_limit_minutes: None,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }

    #[must_use]
    pub fn subjects(&self) -> &[SubjectSelection] {
        &self.subjects
    }

    #[must_use]
    pub fn subject(&self, subject_id: SubjectId) -> Option<&SubjectSelection> {
        self.subjects.iter().find(|s| s.subject_id == subject_id)
    }

    #[must_use]
    pub fn is_selected(&self, subject_id: SubjectId) -> bool {
        self.subject(subject_id).is_some()
    }

    /// Sum of every selected subject's contribution.
    #[must_use]
    pub fn total_available(&self) -> u32 {
        self.subjects
            .iter()
            .fold(0u32, |acc, subject| acc.saturating_add(subject.contribution()))
    }

    /// Highest count the user may request right now.
    #[must_use]
    pub fn max_requestable(&self) -> u32 {
        self.settings
            .max_question_count()
            .min(self.total_available())
    }

    #[must_use]
    pub fn requested_count(&self) -> u32 {
        self.requested_count
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes
    }

    /// Add (or replace) a subject. Returns the new total.
    pub fn add_subject(&mut self, selection: SubjectSelection) -> u32 {
        match self
            .subjects
            .iter_mut()
            .find(|s| s.subject_id == selection.subject_id)
        {
            Some(existing) => *existing = selection,
            None => self.subjects.push(selection),
        }
        self.reclamp()
    }

    /// Drop a subject from the selection. Returns the new total.
    pub fn remove_subject(&mut self, subject_id: SubjectId) -> u32 {
        self.subjects.retain(|s| s.subject_id != subject_id);
        self.reclamp()
    }

    /// Flip one chapter of a selected subject. Unknown ids leave the selection untouched.
    pub fn toggle_chapter(&mut self, subject_id: SubjectId, chapter_id: ChapterId) -> u32 {
        if let Some(subject) = self.subject_mut(subject_id) {
            subject.toggle(chapter_id);
        }
        self.reclamp()
    }

    pub fn select_all_chapters(&mut self, subject_id: SubjectId) -> u32 {
        if let Some(subject) = self.subject_mut(subject_id) {
            subject.select_all();
        }
        self.reclamp()
    }

    pub fn deselect_all_chapters(&mut self, subject_id: SubjectId) -> u32 {
        if let Some(subject) = self.subject_mut(subject_id) {
            subject.deselect_all();
        }
        self.reclamp()
    }

    /// Set the requested question count, clamped into the valid range.
    /// Returns the stored value.
    pub fn set_requested_count(&mut self, count: u32) -> u32 {
        self.requested_count = count;
        self.reclamp();
        self.requested_count
    }

    pub fn set_difficulty(&mut self, difficulty: Option<Difficulty>) {
        self.difficulty = difficulty;
    }

    /// Set the time limit; `None` means unlimited.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::InvalidTimeLimit` when outside `1..=max_time_limit_minutes`.
    pub fn set_time_limit(&mut self, minutes: Option<u32>) -> Result<(), SelectionError> {
        let max = self.settings.max_time_limit_minutes();
        if let Some(value) = minutes {
            if value == 0 || value > max {
                return Err(SelectionError::InvalidTimeLimit { max });
            }
        }
        self.time_limit_minutes = minutes;
        Ok(())
    }

    fn subject_mut(&mut self, subject_id: SubjectId) -> Option<&mut SubjectSelection> {
        self.subjects.iter_mut().find(|s| s.subject_id == subject_id)
    }

    fn reclamp(&mut self) -> u32 {
        let total = self.total_available();
        let cap = self.settings.max_question_count().min(total).max(1);
        self.requested_count = self.requested_count.clamp(1, cap);
        total
    }
}

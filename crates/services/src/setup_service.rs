use std::sync::Arc;

use tracing::{debug, warn};

use exam_core::model::{ExamSetup, SubjectId, SubjectSelection};
use remote::ExamService;

/// Loads subject availability into an `ExamSetup`.
#[derive(Clone)]
pub struct ExamSetupService {
    service: Arc<dyn ExamService>,
}

impl ExamSetupService {
    #[must_use]
    pub fn new(service: Arc<dyn ExamService>) -> Self {
        Self { service }
    }

    /// Add a subject with its chapter breakdown and return the new total.
    ///
    /// When the availability lookup fails the subject is added at subject
    /// level only, contributing `declared_count` questions with no chapter
    /// filter available.
    pub async fn add_subject(
        &self,
        setup: &mut ExamSetup,
        subject_id: SubjectId,
        declared_count: u32,
    ) -> u32 {
        let selection = match self.service.subject_availability(subject_id).await {
            Ok(availability) => {
                debug!(
                    %subject_id,
                    chapters = availability.chapters.len(),
                    total = availability.total_questions,
                    "loaded subject availability"
                );
                SubjectSelection::from_availability(availability)
            }
            Err(err) => {
                warn!(
                    %subject_id,
                    declared_count,
                    error = %err,
                    "availability lookup failed, using subject-level count"
                );
                SubjectSelection::without_chapters(subject_id, declared_count)
            }
        };
        setup.add_subject(selection)
    }
}

mod answers;
mod attempt;
mod ids;
mod question;
mod result;
mod selection;
mod settings;
mod start_request;

pub use ids::{AttemptId, ChapterId, OptionId, ParseIdError, QuestionId, SubjectId};

pub use answers::{AnswerMap, AnswerSubmission};
pub use attempt::{AttemptError, ExamAttempt};
pub use question::{AnswerOption, Difficulty, Question, SelectionMode, UnknownDifficulty};
pub use result::{ExamResult, QuestionOutcome};
pub use selection::{
    ChapterAvailability, ExamSetup, SelectionError, SubjectAvailability, SubjectSelection,
};
pub use settings::{ExamSettings, ExamSettingsDraft, ExamSettingsError};
pub use start_request::{ConfigurationError, StartRequest, SubjectFilter};

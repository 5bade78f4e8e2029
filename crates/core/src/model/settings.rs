use thiserror::Error;

pub const DEFAULT_MAX_QUESTION_COUNT: u32 = 50;
pub const DEFAULT_QUESTION_COUNT: u32 = 10;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_MAX_TIME_LIMIT_MINUTES: u32 = 300;

/// Engine-wide exam settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamSettings {
    max_question_count: u32,
    default_question_count: u32,
    tick_interval_ms: u64,
    max_time_limit_minutes: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ExamSettingsDraft {
    pub max_question_count: Option<u32>,
    pub default_question_count: Option<u32>,
    pub tick_interval_ms: Option<u64>,
    pub max_time_limit_minutes: Option<u32>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamSettingsError {
    #[error("max question count must be > 0")]
    InvalidMaxQuestionCount,

    #[error("default question count must be between 1 and {max}")]
    InvalidDefaultQuestionCount { max: u32 },

    #[error("tick interval must be between 10 and 60000 ms")]
    InvalidTickInterval,

    #[error("max time limit must be > 0 minutes")]
    InvalidMaxTimeLimit,
}

impl ExamSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling unset fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns `ExamSettingsError` if any bound is zero or out of range.
    pub fn validate(self) -> Result<ExamSettings, ExamSettingsError> {
        let max_question_count = self
            .max_question_count
            .unwrap_or(DEFAULT_MAX_QUESTION_COUNT);
        if max_question_count == 0 {
            return Err(ExamSettingsError::InvalidMaxQuestionCount);
        }

        let default_question_count = self
            .default_question_count
            .unwrap_or_else(|| DEFAULT_QUESTION_COUNT.min(max_question_count));
        if default_question_count == 0 || default_question_count > max_question_count {
            return Err(ExamSettingsError::InvalidDefaultQuestionCount {
                max: max_question_count,
            });
        }

        let tick_interval_ms = self.tick_interval_ms.unwrap_or(DEFAULT_TICK_INTERVAL_MS);
        if !(10..=60_000).contains(&tick_interval_ms) {
            return Err(ExamSettingsError::InvalidTickInterval);
        }

        let max_time_limit_minutes = self
            .max_time_limit_minutes
            .unwrap_or(DEFAULT_MAX_TIME_LIMIT_MINUTES);
        if max_time_limit_minutes == 0 {
            return Err(ExamSettingsError::InvalidMaxTimeLimit);
        }

        Ok(ExamSettings {
            max_question_count,
            default_question_count,
            tick_interval_ms,
            max_time_limit_minutes,
        })
    }
}

impl ExamSettings {
    /// Upper bound on questions per attempt, regardless of availability.
    #[must_use]
    pub fn max_question_count(&self) -> u32 {
        self.max_question_count
    }

    #[must_use]
    pub fn default_question_count(&self) -> u32 {
        self.default_question_count
    }

    /// Countdown tick period.
    #[must_use]
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub fn max_time_limit_minutes(&self) -> u32 {
        self.max_time_limit_minutes
    }
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            max_question_count: DEFAULT_MAX_QUESTION_COUNT,
            default_question_count: DEFAULT_QUESTION_COUNT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_time_limit_minutes: DEFAULT_MAX_TIME_LIMIT_MINUTES,
        }
    }
}

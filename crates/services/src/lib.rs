#![forbid(unsafe_code)]

pub mod attempts;
pub mod error;
pub mod setup_service;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use exam_core::Clock;

pub use attempts::{
    AttemptController, AttemptPhase, AttemptSnapshot, ErrorSource, ResumeOutcome, SubmitOutcome,
    SubmitTrigger, TimeSource,
};
pub use error::SessionError;
pub use setup_service::ExamSetupService;

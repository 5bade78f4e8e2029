mod controller;
mod countdown;
mod state;
mod submission;
mod view;

// Public API of the attempt subsystem.
pub use controller::{AttemptController, ResumeOutcome};
pub use countdown::TimeSource;
pub use state::{AttemptPhase, ErrorSource};
pub use submission::{SubmitOutcome, SubmitTrigger};
pub use view::AttemptSnapshot;

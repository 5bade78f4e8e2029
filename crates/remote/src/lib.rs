#![forbid(unsafe_code)]

pub mod config;
pub mod http;
pub mod memory;
pub mod service;

pub use config::ExamApiConfig;
pub use http::HttpExamService;
pub use memory::InMemoryExamService;
pub use service::{ExamService, ExamServiceError};

mod dto;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use exam_core::model::{
    AnswerSubmission, AttemptId, ExamAttempt, ExamResult, StartRequest, SubjectAvailability,
    SubjectId,
};

use crate::config::ExamApiConfig;
use crate::service::{ExamService, ExamServiceError};

use dto::{AttemptDto, AvailabilityDto, ResultDto, StartAttemptDto, SubmitAttemptDto};

/// JSON-over-HTTP adapter for the exam service.
#[derive(Clone)]
pub struct HttpExamService {
    client: Client,
    config: ExamApiConfig,
}

impl HttpExamService {
    /// # Errors
    ///
    /// Returns `ExamServiceError::Http` if the HTTP client cannot be built.
    pub fn new(config: ExamApiConfig) -> Result<Self, ExamServiceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ExamApiConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ExamServiceError> {
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(ExamServiceError::HttpStatus(response.status()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ExamService for HttpExamService {
    async fn subject_availability(
        &self,
        subject_id: SubjectId,
    ) -> Result<SubjectAvailability, ExamServiceError> {
        let subject = subject_id.to_string();
        let url = self
            .config
            .endpoint(&["subjects", &subject, "availability"]);
        let body: AvailabilityDto = self.send(self.client.get(url)).await?.json().await?;
        Ok(body.into_availability(subject_id))
    }

    async fn start_attempt(&self, request: &StartRequest) -> Result<ExamAttempt, ExamServiceError> {
        let url = self.config.endpoint(&["exams", "attempts"]);
        let payload = StartAttemptDto::from(request);
        let body: AttemptDto = self
            .send(self.client.post(url).json(&payload))
            .await?
            .json()
            .await?;
        body.into_attempt()
    }

    async fn active_attempt(&self) -> Result<Option<ExamAttempt>, ExamServiceError> {
        let url = self.config.endpoint(&["exams", "attempts", "active"]);
        let response = self.authorize(self.client.get(url)).send().await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                debug!("no active attempt on server");
                Ok(None)
            }
            status if status.is_success() => {
                let body: AttemptDto = response.json().await?;
                body.into_attempt().map(Some)
            }
            status => Err(ExamServiceError::HttpStatus(status)),
        }
    }

    async fn submit_attempt(
        &self,
        attempt_id: &AttemptId,
        answers: &[AnswerSubmission],
    ) -> Result<ExamResult, ExamServiceError> {
        let url = self
            .config
            .endpoint(&["exams", "attempts", attempt_id.as_str(), "submit"]);
        let payload = SubmitAttemptDto::from(answers);
        let body: ResultDto = self
            .send(self.client.post(url).json(&payload))
            .await?
            .json()
            .await?;
        Ok(body.into_result(attempt_id.clone()))
    }

    async fn cancel_attempt(&self, attempt_id: &AttemptId) -> Result<(), ExamServiceError> {
        let url = self
            .config
            .endpoint(&["exams", "attempts", attempt_id.as_str(), "cancel"]);
        self.send(self.client.post(url)).await?;
        Ok(())
    }
}

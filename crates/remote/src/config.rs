use std::env;
use std::time::Duration;

use url::Url;

use crate::service::ExamServiceError;

pub const BASE_URL_ENV: &str = "STUDY_API_BASE_URL";
pub const TOKEN_ENV: &str = "STUDY_API_TOKEN";
pub const TIMEOUT_ENV: &str = "STUDY_API_TIMEOUT_SECS";

/// Connection settings for the HTTP exam service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamApiConfig {
    base_url: Url,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl ExamApiConfig {
    /// # Errors
    ///
    /// Returns `ExamServiceError::InvalidConfig` if `base_url` is not an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ExamServiceError> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|e| ExamServiceError::InvalidConfig(format!("base url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExamServiceError::InvalidConfig(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: parsed,
            token: None,
            timeout: None,
        })
    }

    /// Read `STUDY_API_BASE_URL`, `STUDY_API_TOKEN` and `STUDY_API_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::InvalidConfig` when the base URL is missing or
    /// invalid, or the timeout is not a positive integer.
    pub fn from_env() -> Result<Self, ExamServiceError> {
        let base_url = env::var(BASE_URL_ENV)
            .map_err(|_| ExamServiceError::InvalidConfig(format!("{BASE_URL_ENV} is not set")))?;
        let mut config = Self::new(&base_url)?;

        if let Ok(token) = env::var(TOKEN_ENV) {
            config = config.with_token(token);
        }
        if let Ok(raw) = env::var(TIMEOUT_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ExamServiceError::InvalidConfig(format!("{TIMEOUT_ENV}: {raw}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Bearer token; blank values are ignored.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.trim();
        self.token = (!token.is_empty()).then(|| token.to_string());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Append path segments to the base URL, keeping any base path prefix.
    ///
    /// Each segment is percent-encoded, so ids cannot add segments or a query.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

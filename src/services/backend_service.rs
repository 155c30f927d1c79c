use crate::config::Config;
use crate::dto::backend_dto::{
    CheckAttemptResponse, ErrorResponse, FailureReason, StartAttemptResponse, SubmitAttemptRequest,
    SubmitAttemptResponse,
};
use crate::error::{Error, Result};
use crate::models::evaluation::Evaluation;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Remote side of the evaluation flow.
#[async_trait]
pub trait EvaluationBackend: Send + Sync + 'static {
    async fn get_evaluation(&self, evaluation_id: &str) -> Result<Evaluation>;

    /// Looks up an unfinished attempt so a reload resumes it instead of
    /// creating a second one.
    async fn check_attempt(&self, evaluation_id: &str) -> Result<CheckAttemptResponse>;

    async fn start_attempt(&self, evaluation_id: &str) -> Result<StartAttemptResponse>;

    async fn submit_attempt(
        &self,
        evaluation_id: &str,
        submission: &SubmitAttemptRequest,
    ) -> Result<SubmitAttemptResponse>;
}

#[derive(Clone)]
pub struct HttpEvaluationBackend {
    client: Client,
    base_url: Url,
    api_token: String,
}

impl HttpEvaluationBackend {
    pub fn new(base_url: &str, api_token: String, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("API base URL cannot be a base: {}", base_url)));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base_url, config.api_token.clone(), config.http_timeout())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("API base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl EvaluationBackend for HttpEvaluationBackend {
    async fn get_evaluation(&self, evaluation_id: &str) -> Result<Evaluation> {
        let url = self.endpoint(&["evaluations", evaluation_id])?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn check_attempt(&self, evaluation_id: &str) -> Result<CheckAttemptResponse> {
        let url = self.endpoint(&["evaluations", evaluation_id, "attempt"])?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn start_attempt(&self, evaluation_id: &str) -> Result<StartAttemptResponse> {
        let url = self.endpoint(&["evaluations", evaluation_id, "attempt", "start"])?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn submit_attempt(
        &self,
        evaluation_id: &str,
        submission: &SubmitAttemptRequest,
    ) -> Result<SubmitAttemptResponse> {
        let url = self.endpoint(&["evaluations", evaluation_id, "submit"])?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_token)
            .json(submission)
            .send()
            .await?;
        read_json(resp).await
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), &body))
}

const EXHAUSTION_MARKERS: &[&str] = &[
    "tentatives atteint",
    "attempts exhausted",
    "maximum number of attempts",
    "no attempts left",
];

/// Maps a failed response to an error kind. An explicit `reason` from the
/// backend decides; older backends only send prose, so the message is
/// searched for known exhaustion wording as a fallback.
pub fn classify_failure(status: u16, body: &str) -> Error {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.text())
        .map(str::to_string)
        .or_else(|| Some(body.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| format!("Request failed with status {}", status));

    match parsed.as_ref().and_then(|b| b.reason) {
        Some(FailureReason::AttemptsExhausted) => return Error::AttemptsExhausted(message),
        Some(FailureReason::Transient) => return Error::Backend { status, message },
        Some(FailureReason::Unknown) | None => {}
    }

    if mentions_exhaustion(&message) {
        return Error::AttemptsExhausted(message);
    }

    match status {
        404 => Error::NotFound(message),
        401 | 403 => Error::Unauthorized(message),
        _ => Error::Backend { status, message },
    }
}

fn mentions_exhaustion(message: &str) -> bool {
    let lowered = message.to_lowercase();
    EXHAUSTION_MARKERS.iter().any(|m| lowered.contains(m))
}

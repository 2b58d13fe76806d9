use std::time::Duration;

use reqwest::Client;
use validator::Validate;

use crate::dto::generator_dto::{
    GenerateExamRequest, GeneratedExam, GeneratorResponse, SUPPORTED_QUESTION_TYPE,
};
use crate::error::{Error, Result};
use crate::services::question_normalizer::QuestionNormalizer;

/// Client for the external exam generator.
///
/// Generation happens before anything is persisted, so a failed or aborted
/// call leaves no trace in the store.
#[derive(Clone)]
pub struct GeneratorService {
    client: Client,
    endpoint: String,
    timeout: Duration,
    max_questions: u32,
}

impl GeneratorService {
    pub fn new(client: Client, endpoint: String, timeout: Duration, max_questions: u32) -> Self {
        Self {
            client,
            endpoint,
            timeout,
            max_questions,
        }
    }

    pub async fn generate(&self, request: &GenerateExamRequest) -> Result<GeneratedExam> {
        self.check_request(request)?;

        tracing::info!(
            question_nbr = request.question_nbr,
            difficulty = %request.difficulty,
            "Requesting exam from generator"
        );
        let body = self.call_generator(request).await?;

        let mut entries = body.questions;
        if entries.len() > request.question_nbr as usize {
            tracing::warn!(
                received = entries.len(),
                requested = request.question_nbr,
                "Generator returned more questions than requested, truncating"
            );
            entries.truncate(request.question_nbr as usize);
        }

        let questions = QuestionNormalizer::normalize_all(&entries);
        let valid_count = questions.iter().filter(|q| q.as_valid().is_some()).count();
        let invalid_count = questions.len() - valid_count;
        tracing::info!(valid_count, invalid_count, "Exam generated");

        Ok(GeneratedExam {
            query: request.query.clone(),
            difficulty: request.difficulty.clone(),
            questions,
            valid_count,
            invalid_count,
        })
    }

    fn check_request(&self, request: &GenerateExamRequest) -> Result<()> {
        request.validate()?;
        if request.query.trim().is_empty() || request.difficulty.trim().is_empty() {
            return Err(Error::BadRequest("Missing required parameters".to_string()));
        }
        if !request.question_type.trim().eq_ignore_ascii_case(SUPPORTED_QUESTION_TYPE) {
            return Err(Error::BadRequest(format!(
                "Unsupported question type '{}', only '{}' is available",
                request.question_type, SUPPORTED_QUESTION_TYPE
            )));
        }
        if request.question_nbr > self.max_questions {
            return Err(Error::BadRequest(format!(
                "question_nbr must be at most {}",
                self.max_questions
            )));
        }
        Ok(())
    }

    async fn call_generator(&self, request: &GenerateExamRequest) -> Result<GeneratorResponse> {
        let payload = serde_json::json!({
            "query": request.query.trim(),
            "question_nbr": request.question_nbr,
            "difficulty": request.difficulty.trim(),
            "question_type": SUPPORTED_QUESTION_TYPE,
        });

        let res = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::error!("Generator timed out after {:?}", self.timeout);
                    Error::Upstream(format!("generator timed out after {}s", self.timeout.as_secs_f32()))
                } else {
                    tracing::error!(error = %e, "Generator unreachable");
                    Error::Reqwest(e)
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            tracing::error!(%status, "Generator returned an error status");
            return Err(Error::Upstream(format!("generator responded with {}", status)));
        }

        let text = res.text().await.map_err(|e| {
            tracing::error!(error = %e, "Generator response body could not be read");
            Error::Upstream("generator response was interrupted".to_string())
        })?;

        serde_json::from_str::<GeneratorResponse>(&text).map_err(|e| {
            tracing::error!(error = %e, "Generator returned a malformed payload");
            Error::Upstream("generator returned a malformed payload".to_string())
        })
    }
}

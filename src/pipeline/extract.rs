//! Company-name extraction: ask the VLM who issued the certificate.
//!
//! ## Retry Strategy
//!
//! Up to `max_attempts` calls per certificate. A service error waits a fixed
//! `retry_delay_ms` before the next attempt; a reply that cleans down to
//! nothing usable is retried immediately, since the service itself is fine.
//! Extraction never fails the file outright: exhausted attempts degrade to
//! [`ExtractionOutcome::Unknown`] or [`ExtractionOutcome::Failed`].

use crate::config::OrganizerConfig;
use crate::pipeline::clean::{clean_company_name, is_usable_label, strip_reply, UNKNOWN_COMPANY};
use crate::prompts::COMPANY_NAME_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// The external model call failed.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

/// Anything that can read text off an image given an instruction.
pub trait VisionService: Send + Sync {
    fn describe<'a>(
        &'a self,
        prompt: &'a str,
        image: &'a ImageData,
    ) -> BoxFuture<'a, Result<String, ServiceError>>;
}

/// [`VisionService`] backed by an `edgequake-llm` provider.
///
/// Sends a single user turn holding the prompt text and the page image.
pub struct LlmVisionService {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmVisionService {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &OrganizerConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

impl VisionService for LlmVisionService {
    fn describe<'a>(
        &'a self,
        prompt: &'a str,
        image: &'a ImageData,
    ) -> BoxFuture<'a, Result<String, ServiceError>> {
        Box::pin(async move {
            let messages = vec![ChatMessage::user_with_images(prompt, vec![image.clone()])];
            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| ServiceError(format!("{}", e)))?;
            Ok::<_, ServiceError>(response.content)
        })
    }
}

fn build_options(config: &OrganizerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// A cleaned, usable folder label.
    Company(String),
    /// Every reply was empty or ambiguous.
    Unknown,
    /// The service call failed on the last attempt.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub outcome: ExtractionOutcome,
    /// Service calls made.
    pub attempts: u32,
    pub duration_ms: u64,
}

impl ExtractionResult {
    /// Text shown in reports: the label, the sentinel, or an error string.
    pub fn label(&self) -> String {
        match &self.outcome {
            ExtractionOutcome::Company(name) => name.clone(),
            ExtractionOutcome::Unknown => UNKNOWN_COMPANY.to_string(),
            ExtractionOutcome::Failed(detail) => {
                format!("Error extracting company name: {detail}")
            }
        }
    }

    pub fn company(&self) -> Option<&str> {
        match &self.outcome {
            ExtractionOutcome::Company(name) => Some(name),
            _ => None,
        }
    }
}

/// Ask `service` for the issuing company of the certificate in `image`.
pub async fn extract_company_name<V>(
    service: &V,
    image: &ImageData,
    file_name: &str,
    config: &OrganizerConfig,
) -> ExtractionResult
where
    V: VisionService + ?Sized,
{
    let start = Instant::now();
    let prompt = config.prompt.as_deref().unwrap_or(COMPANY_NAME_PROMPT);
    let max_attempts = config.max_attempts.max(1);
    let finish = |outcome, attempts| ExtractionResult {
        outcome,
        attempts,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    for attempt in 1..=max_attempts {
        match service.describe(prompt, image).await {
            Ok(reply) => {
                let label = clean_company_name(strip_reply(&reply));
                if is_usable_label(&label) {
                    let result = finish(ExtractionOutcome::Company(label), attempt);
                    info!(
                        "Extracted company name '{}' from {} in {}ms",
                        result.label(),
                        file_name,
                        result.duration_ms
                    );
                    return result;
                }
                warn!(
                    "Attempt {}: no valid company name extracted from {}",
                    attempt, file_name
                );
            }
            Err(e) => {
                error!("Attempt {} failed for {}: {}", attempt, file_name, e);
                if attempt == max_attempts {
                    return finish(ExtractionOutcome::Failed(e.0), attempt);
                }
                sleep(Duration::from_millis(config.retry_delay_ms)).await;
            }
        }
    }

    finish(ExtractionOutcome::Unknown, max_attempts)
}

//! Visa requirement classifier
//!
//! Asks the chat model whether a traveler holding one country's passport
//! needs a visa for a destination country. The model is constrained to a
//! strict JSON object with one of three status values; its occasional
//! hyphenated spellings are normalized before the result leaves this module.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use visadex_common::db::models::VisaStatus;

use crate::services::openai::{OpenAiClient, OpenAiError};
use crate::services::response_log::ResponseLog;

const CLASSIFY_MAX_TOKENS: u32 = 2048;

const CLASSIFY_SYSTEM_PROMPT: &str = "I need you to determine whether or not someone needs a visa \
if they are traveling from Country A going to Country B. \
You will receive a JSON object structured as {\"passport\":\"United States\", \"destination\":\"France\"}. \
Return a JSON object in the format {\"status\":\"VISA_FREE\", \"notes\":\"Any additional notes about the requirements\"}. \
Status options are: VISA_FREE, VISA_REQUIRED, E_VISA.";

/// Classification result for one pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: VisaStatus,
    pub notes: String,
}

/// Classification errors. All are per-pair and recoverable: the caller skips
/// the pair this round and it stays eligible for a later retry.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Model call failed: {0}")]
    Service(#[from] OpenAiError),

    #[error("Unparseable model output: {0}")]
    Parse(String),
}

/// Classifier seam so the enrichment loop can be tested without the network
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        passport: &str,
        destination: &str,
    ) -> Result<Classification, ClassifyError>;
}

/// Classifier backed by the OpenAI chat-completions API
pub struct OpenAiClassifier {
    client: OpenAiClient,
    response_log: Option<ResponseLog>,
}

impl OpenAiClassifier {
    pub fn new(client: OpenAiClient, response_log: Option<ResponseLog>) -> Self {
        Self {
            client,
            response_log,
        }
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(
        &self,
        passport: &str,
        destination: &str,
    ) -> Result<Classification, ClassifyError> {
        let payload = json!({
            "passport": passport,
            "destination": destination,
        });

        let response = self
            .client
            .chat_json(CLASSIFY_SYSTEM_PROMPT, &payload, CLASSIFY_MAX_TOKENS)
            .await?;

        if let Some(log) = &self.response_log {
            log.append(&response);
        }

        let raw_status = response
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ClassifyError::Parse("missing \"status\" field".to_string()))?;

        let status = VisaStatus::parse_external(raw_status).ok_or_else(|| {
            ClassifyError::Parse(format!("unknown status value: {raw_status:?}"))
        })?;

        let notes = response
            .get("notes")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Classification { status, notes })
    }
}

//! LLM-backed city generator
//!
//! Backfills the cities table for countries that have none yet. One model
//! call per country; a failure skips that country only.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use visadex_common::db::models::Country;

use crate::services::openai::{OpenAiClient, OpenAiError};

const CITY_MAX_TOKENS: u32 = 512;

const CITY_SYSTEM_PROMPT: &str = "You will receive a country in this format: \
{ \"id\": number, \"name\": string }. \
Respond ONLY with a JSON object that has a key \"cities\" whose value is an array of 2 to 5 city objects. \
Each city object must look like this: \
{ \"name\": string, \"state_province\": string or null }. \
Pick the destination cities travelers are most likely to visit. \
Do not return a single city or any other fields.";

/// City proposed by the model
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedCity {
    pub name: String,
    #[serde(default)]
    pub state_province: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CityEnvelope {
    cities: Vec<GeneratedCity>,
}

/// City generation errors (per-country, recoverable)
#[derive(Debug, Error)]
pub enum CityGenError {
    #[error("Model call failed: {0}")]
    Service(#[from] OpenAiError),

    #[error("Unparseable model output: {0}")]
    Parse(String),
}

/// Generates cities for countries via the chat model
pub struct CityGenerator {
    client: OpenAiClient,
}

impl CityGenerator {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    /// Ask the model for 2-5 cities for one country
    pub async fn generate_for_country(
        &self,
        country: &Country,
    ) -> Result<Vec<GeneratedCity>, CityGenError> {
        let payload = json!({
            "id": country.id,
            "name": country.name,
        });

        let response = self
            .client
            .chat_json(CITY_SYSTEM_PROMPT, &payload, CITY_MAX_TOKENS)
            .await?;

        let envelope: CityEnvelope = serde_json::from_value(response)
            .map_err(|e| CityGenError::Parse(e.to_string()))?;

        if envelope.cities.is_empty() {
            return Err(CityGenError::Parse("empty cities array".to_string()));
        }

        Ok(envelope.cities)
    }
}

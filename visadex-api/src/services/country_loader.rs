//! REST Countries bulk importer
//!
//! Fetches the full country reference list from the public REST Countries
//! API and maps it to our schema. Only used by the one-shot load endpoint.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const REST_COUNTRIES_BASE_URL: &str = "https://restcountries.com/v3.1";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Country loader errors
#[derive(Debug, Error)]
pub enum CountryLoadError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A country mapped for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCountry {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub sub_region: Option<String>,
    pub flag_img: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestCountry {
    name: RestCountryName,
    #[serde(default)]
    capital: Vec<String>,
    region: Option<String>,
    subregion: Option<String>,
    #[serde(default)]
    flags: RestCountryFlags,
}

#[derive(Debug, Deserialize)]
struct RestCountryName {
    common: String,
}

#[derive(Debug, Default, Deserialize)]
struct RestCountryFlags {
    png: Option<String>,
}

impl From<RestCountry> for NewCountry {
    fn from(c: RestCountry) -> Self {
        Self {
            name: c.name.common,
            capital: c.capital.into_iter().next(),
            region: c.region,
            sub_region: c.subregion,
            flag_img: c.flags.png,
        }
    }
}

/// REST Countries API client
pub struct CountryLoader {
    http_client: reqwest::Client,
    base_url: String,
}

impl CountryLoader {
    pub fn new() -> Result<Self, CountryLoadError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CountryLoadError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: REST_COUNTRIES_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL (for tests against a mock server)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch every country
    pub async fn fetch_all(&self) -> Result<Vec<NewCountry>, CountryLoadError> {
        let url = format!(
            "{}/all?fields=name,capital,region,subregion,flags",
            self.base_url
        );
        tracing::debug!(url = %url, "Fetching countries");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CountryLoadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CountryLoadError::Api(status.as_u16(), error_text));
        }

        let countries: Vec<RestCountry> = response
            .json()
            .await
            .map_err(|e| CountryLoadError::Parse(e.to_string()))?;

        Ok(countries.into_iter().map(NewCountry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_country_mapping() {
        let body = r#"{
            "name": {"common": "France", "official": "French Republic"},
            "capital": ["Paris"],
            "region": "Europe",
            "subregion": "Western Europe",
            "flags": {"png": "https://flagcdn.com/w320/fr.png"}
        }"#;

        let rest: RestCountry = serde_json::from_str(body).unwrap();
        let country = NewCountry::from(rest);
        assert_eq!(country.name, "France");
        assert_eq!(country.capital.as_deref(), Some("Paris"));
        assert_eq!(country.sub_region.as_deref(), Some("Western Europe"));
        assert!(country.flag_img.is_some());
    }

    #[test]
    fn test_missing_capital_and_flags_tolerated() {
        let body = r#"{"name": {"common": "Antarctica"}, "region": "Antarctic"}"#;

        let rest: RestCountry = serde_json::from_str(body).unwrap();
        let country = NewCountry::from(rest);
        assert_eq!(country.name, "Antarctica");
        assert!(country.capital.is_none());
        assert!(country.flag_img.is_none());
    }
}

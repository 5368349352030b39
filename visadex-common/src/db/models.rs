//! Database models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visa requirement classification for one (passport, destination) pair.
///
/// Serialized canonically as `VISA_FREE` / `VISA_REQUIRED` / `E_VISA`.
/// The external model occasionally emits hyphenated variants; those are
/// accepted only through [`VisaStatus::parse_external`] and rewritten to the
/// canonical form before anything reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisaStatus {
    #[serde(rename = "VISA_FREE")]
    VisaFree,
    #[serde(rename = "VISA_REQUIRED")]
    VisaRequired,
    #[serde(rename = "E_VISA")]
    EVisa,
}

impl VisaStatus {
    /// Canonical storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            VisaStatus::VisaFree => "VISA_FREE",
            VisaStatus::VisaRequired => "VISA_REQUIRED",
            VisaStatus::EVisa => "E_VISA",
        }
    }

    /// Parse a canonical storage string
    pub fn parse_canonical(s: &str) -> Option<Self> {
        match s {
            "VISA_FREE" => Some(VisaStatus::VisaFree),
            "VISA_REQUIRED" => Some(VisaStatus::VisaRequired),
            "E_VISA" => Some(VisaStatus::EVisa),
            _ => None,
        }
    }

    /// Parse an external model response.
    ///
    /// Accepted formats are exactly the three canonical strings plus their
    /// hyphenated variants (`VISA-FREE`, `VISA-REQUIRED`, `E-VISA`).
    /// Anything else is unparseable and must not be persisted.
    pub fn parse_external(s: &str) -> Option<Self> {
        match s {
            "VISA_FREE" | "VISA-FREE" => Some(VisaStatus::VisaFree),
            "VISA_REQUIRED" | "VISA-REQUIRED" => Some(VisaStatus::VisaRequired),
            "E_VISA" | "E-VISA" => Some(VisaStatus::EVisa),
            _ => None,
        }
    }
}

impl fmt::Display for VisaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Country reference record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub sub_region: Option<String>,
    pub flag_img: Option<String>,
}

/// One (passport, destination) row with country names joined in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisaStatusRecord {
    pub id: i64,
    pub passport: String,
    pub destination: String,
    pub status: Option<VisaStatus>,
    pub notes: Option<String>,
}

/// An unresolved (status IS NULL) pair selected for enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedPair {
    pub id: i64,
    pub passport: String,
    pub destination: String,
}

/// City record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub country_id: i64,
    pub name: String,
    pub state_province: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip() {
        for status in [
            VisaStatus::VisaFree,
            VisaStatus::VisaRequired,
            VisaStatus::EVisa,
        ] {
            assert_eq!(VisaStatus::parse_canonical(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_canonical_rejects_hyphenated() {
        assert_eq!(VisaStatus::parse_canonical("VISA-FREE"), None);
    }

    #[test]
    fn test_external_accepts_hyphenated_variants() {
        assert_eq!(
            VisaStatus::parse_external("VISA-FREE"),
            Some(VisaStatus::VisaFree)
        );
        assert_eq!(
            VisaStatus::parse_external("VISA-REQUIRED"),
            Some(VisaStatus::VisaRequired)
        );
        assert_eq!(VisaStatus::parse_external("E-VISA"), Some(VisaStatus::EVisa));
    }

    #[test]
    fn test_external_rejects_unknown() {
        assert_eq!(VisaStatus::parse_external("NO_VISA"), None);
        assert_eq!(VisaStatus::parse_external("visa_free"), None);
        assert_eq!(VisaStatus::parse_external(""), None);
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let json = serde_json::to_string(&VisaStatus::EVisa).unwrap();
        assert_eq!(json, "\"E_VISA\"");

        let parsed: VisaStatus = serde_json::from_str("\"VISA_FREE\"").unwrap();
        assert_eq!(parsed, VisaStatus::VisaFree);
    }
}

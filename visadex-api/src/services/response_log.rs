//! Append-only diagnostic log of raw model responses
//!
//! Each entry is `[<RFC3339 timestamp>] <pretty-printed JSON>` followed by a
//! blank line. Write failures must never affect the classification path, so
//! they are logged as warnings and swallowed.

use chrono::Utc;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

/// Diagnostic response log
#[derive(Debug, Clone)]
pub struct ResponseLog {
    path: PathBuf,
}

impl ResponseLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one raw response. Infallible by contract.
    pub fn append(&self, response: &Value) {
        let pretty =
            serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string());
        let entry = format!("[{}] {}\n\n", Utc::now().to_rfc3339(), pretty);

        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));

        if let Err(e) = result {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to write response log entry"
            );
        }
    }
}

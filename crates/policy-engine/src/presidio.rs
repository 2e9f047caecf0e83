//! HTTP client for a Presidio-compatible analyzer service.

use std::time::Duration;

use async_trait::async_trait;
use redaction::EntitySpan;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detector::EntityDetector;
use crate::error::DetectionError;

/// Request body for `POST /analyze`.
#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    score_threshold: Option<f64>,
}

/// One recognizer result. Extra fields (explanations, metadata) are ignored.
#[derive(Debug, Deserialize)]
struct RecognizerResult {
    entity_type: String,
    start: usize,
    end: usize,
    score: f64,
}

/// [`EntityDetector`] backed by the analyzer's REST API.
pub struct PresidioDetector {
    client: reqwest::Client,
    analyze_url: String,
    timeout: Duration,
    score_threshold: Option<f64>,
}

impl std::fmt::Debug for PresidioDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresidioDetector")
            .field("analyze_url", &self.analyze_url)
            .field("timeout", &self.timeout)
            .field("score_threshold", &self.score_threshold)
            .finish()
    }
}

impl PresidioDetector {
    /// Client for the analyzer at `base_url` (e.g. `http://127.0.0.1:5002`).
    /// Every request is bounded by `timeout`.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        score_threshold: Option<f64>,
    ) -> Result<Self, DetectionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectionError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            analyze_url: format!("{}/analyze", base_url.trim_end_matches('/')),
            timeout,
            score_threshold,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> DetectionError {
        if err.is_timeout() {
            DetectionError::Timeout(self.timeout)
        } else {
            DetectionError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl EntityDetector for PresidioDetector {
    async fn detect(&self, text: &str, language: &str) -> Result<Vec<EntitySpan>, DetectionError> {
        let request = AnalyzeRequest {
            text,
            language,
            score_threshold: self.score_threshold,
        };

        let response = self
            .client
            .post(&self.analyze_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|e| self.transport_error(e))?;
            return Err(DetectionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let results: Vec<RecognizerResult> = serde_json::from_slice(&bytes)
            .map_err(|e| DetectionError::Malformed(e.to_string()))?;

        debug!(entities = results.len(), "analyzer responded");

        Ok(results
            .into_iter()
            .map(|r| EntitySpan::new(r.entity_type, r.start, r.end, r.score))
            .collect())
    }
}

//! Detected entity spans.

use serde::{Deserialize, Serialize};

/// Errors raised for spans that violate the detector contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpanError {
    #[error("invalid {entity_type} span: start {start} is not before end {end}")]
    InvalidSpan {
        entity_type: String,
        start: usize,
        end: usize,
    },
}

/// A region of text identified as a PII instance.
///
/// `start` and `end` are character (Unicode scalar value) offsets, end
/// exclusive. Serialized with the key `type` for the entity label; `entity_type`
/// is accepted on input as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    #[serde(rename = "type", alias = "entity_type")]
    entity_type: String,
    start: usize,
    end: usize,
    score: f64,
}

impl EntitySpan {
    pub fn new(entity_type: impl Into<String>, start: usize, end: usize, score: f64) -> Self {
        Self {
            entity_type: entity_type.into(),
            start,
            end,
            score,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Detector confidence in `[0, 1]`.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Number of characters covered, before any clamping to the text.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject spans with `start >= end`.
    pub fn validate(&self) -> Result<(), SpanError> {
        if self.is_empty() {
            return Err(SpanError::InvalidSpan {
                entity_type: self.entity_type.clone(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

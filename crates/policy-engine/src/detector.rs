use async_trait::async_trait;
use redaction::EntitySpan;

use crate::error::DetectionError;

/// An external PII analyzer.
///
/// The gateway makes no assumption about how spans are found; it only relies
/// on the returned offsets being character offsets into `text`.
#[async_trait]
pub trait EntityDetector: Send + Sync {
    async fn detect(&self, text: &str, language: &str) -> Result<Vec<EntitySpan>, DetectionError>;
}

use std::time::Duration;

use output_filter::FilterError;
use redaction::SpanError;

/// Why the entity detector could not produce spans.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("entity detector unreachable: {0}")]
    Unreachable(String),

    #[error("entity detector did not answer within {0:?}")]
    Timeout(Duration),

    #[error("entity detector returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("entity detector returned malformed data: {0}")]
    Malformed(String),
}

/// Errors surfaced by [`PolicyGateway`](crate::PolicyGateway) operations.
///
/// None of these are retried inside the gateway; callers decide whether to
/// fail the request or pass text through.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The detector reported a span with `start >= end`.
    #[error(transparent)]
    InvalidSpan(#[from] SpanError),

    #[error("detection failed: {0}")]
    DetectionFailure(#[from] DetectionError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<FilterError> for GatewayError {
    fn from(err: FilterError) -> Self {
        Self::Configuration(err.to_string())
    }
}

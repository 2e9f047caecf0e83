use std::sync::Arc;
use std::time::Duration;

use output_filter::OutputFilter;
use redaction::{anonymize, AnonymizeResult, EntitySpan};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::allowlist::ToolAllowlist;
use crate::decision::ToolDecision;
use crate::detector::EntityDetector;
use crate::error::{DetectionError, GatewayError};
use crate::schema::PolicyConfig;

// ---------------------------------------------------------------------------
// PiiReport
// ---------------------------------------------------------------------------

/// Response shape for PII checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiReport {
    pub has_pii: bool,
    pub entities: Vec<EntitySpan>,
    /// Present after anonymization; `None` for plain detection.
    pub anonymized_text: Option<String>,
}

impl From<AnonymizeResult> for PiiReport {
    fn from(result: AnonymizeResult) -> Self {
        Self {
            has_pii: result.has_pii,
            entities: result.entities,
            anonymized_text: Some(result.anonymized_text),
        }
    }
}

// ---------------------------------------------------------------------------
// PolicyGateway
// ---------------------------------------------------------------------------

/// Composes the detector, the redaction engine, the output filter and the
/// tool allowlist into the operations exposed to callers.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use policy_engine::{PolicyConfig, PolicyGateway, PresidioDetector};
///
/// # async fn example() -> anyhow::Result<()> {
/// let detector = PresidioDetector::new("http://127.0.0.1:5002", Duration::from_secs(5), Some(0.5))?;
/// let gateway = PolicyGateway::new(&PolicyConfig::default(), Arc::new(detector), Duration::from_secs(5))?;
/// let report = gateway.anonymize_text("Call John at 555-0100").await?;
/// println!("{report:?}");
/// # Ok(())
/// # }
/// ```
pub struct PolicyGateway {
    detector: Arc<dyn EntityDetector>,
    filter: OutputFilter,
    tools: ToolAllowlist,
    language: String,
    detection_timeout: Duration,
}

impl std::fmt::Debug for PolicyGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyGateway")
            .field("filter", &self.filter)
            .field("tools", &self.tools)
            .field("language", &self.language)
            .field("detection_timeout", &self.detection_timeout)
            .finish()
    }
}

impl PolicyGateway {
    /// Build a gateway from a validated policy. Every detector call is bounded
    /// by `detection_timeout`.
    ///
    /// Fails with [`GatewayError::Configuration`] if a filter pattern does not
    /// compile.
    pub fn new(
        policy: &PolicyConfig,
        detector: Arc<dyn EntityDetector>,
        detection_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let filter = OutputFilter::new(policy.filter.enabled, policy.filter.patterns.clone())?;
        let tools = ToolAllowlist::new(&policy.tools.allowed);

        Ok(Self {
            detector,
            filter,
            tools,
            language: policy.pii.language.clone(),
            detection_timeout,
        })
    }

    /// The live output filter, for pattern administration.
    pub fn output_filter(&self) -> &OutputFilter {
        &self.filter
    }

    /// The live tool allowlist.
    pub fn tools(&self) -> &ToolAllowlist {
        &self.tools
    }

    /// Run the detector and report what it found. The text is never
    /// anonymized here; `anonymized_text` is always `None`.
    pub async fn detect(&self, text: &str) -> Result<PiiReport, GatewayError> {
        let entities = self.run_detector(text).await?;

        for span in &entities {
            span.validate()?;
        }

        Ok(PiiReport {
            has_pii: !entities.is_empty(),
            entities,
            anonymized_text: None,
        })
    }

    /// Run the detector and redact every span it reports.
    pub async fn anonymize_text(&self, text: &str) -> Result<AnonymizeResult, GatewayError> {
        let entities = self.run_detector(text).await?;
        let result = anonymize(text, &entities)?;
        debug!(
            has_pii = result.has_pii,
            entities = result.entities.len(),
            "text anonymized"
        );
        Ok(result)
    }

    /// Scrub model output with the current filter configuration. Never
    /// consults the detector.
    pub fn filter_output(&self, text: &str) -> String {
        self.filter.filter(text)
    }

    /// Check a tool request against the allowlist.
    pub fn check_tool(&self, tool_name: &str, user_id: Option<&str>) -> ToolDecision {
        let decision = self.tools.check(tool_name, user_id);
        if !decision.allowed {
            info!(tool = tool_name, user_id, "tool request denied");
        }
        decision
    }

    async fn run_detector(&self, text: &str) -> Result<Vec<EntitySpan>, GatewayError> {
        let call = self.detector.detect(text, &self.language);
        let spans = match tokio::time::timeout(self.detection_timeout, call).await {
            Ok(Ok(spans)) => spans,
            Ok(Err(err)) => {
                warn!(%err, "entity detection failed");
                return Err(err.into());
            }
            Err(_) => {
                warn!(timeout = ?self.detection_timeout, "entity detection timed out");
                return Err(DetectionError::Timeout(self.detection_timeout).into());
            }
        };

        debug!(entities = spans.len(), "entities detected");
        Ok(spans)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

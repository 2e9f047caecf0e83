use serde::{Deserialize, Serialize};

/// One audited gateway event.
///
/// Details carry counts, entity types and decisions only; raw request text
/// never goes into the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    pub source: AuditSource,
    pub details: serde_json::Value,
}

impl AuditEntry {
    /// New entry stamped with a fresh v4 id and the current UTC time.
    pub fn new(
        event_type: AuditEventType,
        source: AuditSource,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            event_type,
            source,
            details,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ProcessStarted,
    ProcessStopped,
    PiiChecked,
    TextAnonymized,
    OutputFiltered,
    ToolAllowed,
    ToolDenied,
    ToolAdded,
    ToolRemoved,
    FilterPatternAdded,
    FilterPatternRemoved,
    DetectionFailed,
}

/// Which component produced the event, and for which caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSource {
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl AuditSource {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            user_id: None,
        }
    }

    /// Attach the caller-supplied user id, if any.
    pub fn with_user(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(str::to_string);
        self
    }
}

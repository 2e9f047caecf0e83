use serde::{Deserialize, Serialize};

/// Reason attached to every denied tool request.
pub const NOT_IN_ALLOWLIST: &str = "Tool not in allowlist";

/// The outcome of checking a tool request against the allowlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDecision {
    pub allowed: bool,
    /// Human-readable reason; present only when the tool is denied.
    pub reason: Option<String>,
}

impl ToolDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_has_no_reason() {
        let d = ToolDecision::allow();
        assert!(d.allowed);
        assert!(d.reason.is_none());
    }

    #[test]
    fn deny_carries_reason() {
        let d = ToolDecision::deny(NOT_IN_ALLOWLIST);
        assert!(!d.allowed);
        assert_eq!(d.reason.as_deref(), Some("Tool not in allowlist"));
    }

    #[test]
    fn serializes_reason_as_null_when_allowed() {
        let json = serde_json::to_value(ToolDecision::allow()).unwrap();
        assert_eq!(json, serde_json::json!({"allowed": true, "reason": null}));
    }
}

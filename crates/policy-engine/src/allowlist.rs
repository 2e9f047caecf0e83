use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::decision::{ToolDecision, NOT_IN_ALLOWLIST};

/// The set of tools an agent may invoke.
///
/// Membership is exact and case-sensitive. Insertion order is kept so
/// listings read the way the configuration was written.
pub struct ToolAllowlist {
    tools: RwLock<Vec<String>>,
}

impl std::fmt::Debug for ToolAllowlist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolAllowlist")
            .field("tools", &*self.read())
            .finish()
    }
}

impl ToolAllowlist {
    pub fn new(tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut list: Vec<String> = Vec::new();
        for tool in tools {
            let tool = tool.into().trim().to_string();
            if !tool.is_empty() && !list.contains(&tool) {
                list.push(tool);
            }
        }
        info!(tools = ?list, "tool allowlist initialized");
        Self {
            tools: RwLock::new(list),
        }
    }

    /// Parse a comma-separated list such as `"web_search,calculator"`.
    pub fn from_comma_separated(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Whether `tool_name` may be used. `user_id` is reserved for per-user
    /// rules; today every user shares the same list.
    pub fn is_allowed(&self, tool_name: &str, user_id: Option<&str>) -> bool {
        let allowed = self.read().iter().any(|t| t == tool_name);
        debug!(tool = tool_name, user_id, allowed, "tool allowlist check");
        allowed
    }

    /// [`is_allowed`](Self::is_allowed) packaged as a [`ToolDecision`].
    pub fn check(&self, tool_name: &str, user_id: Option<&str>) -> ToolDecision {
        if self.is_allowed(tool_name, user_id) {
            ToolDecision::allow()
        } else {
            ToolDecision::deny(NOT_IN_ALLOWLIST)
        }
    }

    /// Returns whether the tool was newly added.
    pub fn add_tool(&self, tool_name: &str) -> bool {
        let mut tools = self.write();
        if tools.iter().any(|t| t == tool_name) {
            return false;
        }
        tools.push(tool_name.to_string());
        info!(tool = tool_name, "added tool to allowlist");
        true
    }

    /// Returns whether the tool was present.
    pub fn remove_tool(&self, tool_name: &str) -> bool {
        let mut tools = self.write();
        let before = tools.len();
        tools.retain(|t| t != tool_name);
        let removed = tools.len() != before;
        if removed {
            info!(tool = tool_name, "removed tool from allowlist");
        }
        removed
    }

    /// A copy of the allowlist.
    pub fn list_tools(&self) -> Vec<String> {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<String>> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<String>> {
        self.tools.write().unwrap_or_else(PoisonError::into_inner)
    }
}

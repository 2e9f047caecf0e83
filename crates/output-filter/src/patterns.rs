//! Filter pattern definitions.
//!
//! User-configurable patterns are modelled by [`FilterPattern`]; the fixed
//! catalogue that always runs after them lives in [`BUILTIN_PATTERNS`].

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

/// Replacement token for matches of user-configured patterns.
pub const FILTERED: &str = "[FILTERED]";

/// Replacement token for credit-card-like digit groups.
pub const CREDIT_CARD: &str = "[CREDIT_CARD]";

/// Replacement token for long alphanumeric tokens.
pub const API_KEY: &str = "[API_KEY]";

// ---------------------------------------------------------------------------
// User patterns
// ---------------------------------------------------------------------------

/// A single user-configured filter pattern.
///
/// Serialized as a single-key map so policy files read naturally; a bare
/// string is accepted as a literal:
///
/// ```yaml
/// patterns:
///   - literal: password
///   - regex: "sk-[a-z0-9]{20,}"
///   - token
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PatternRepr", into = "PatternRepr")]
pub enum FilterPattern {
    /// Matched as a literal substring (metacharacters are escaped).
    Literal(String),
    /// Compiled as a regular expression.
    Regex(String),
}

/// Wire form of [`FilterPattern`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PatternRepr {
    Bare(String),
    Keyed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        literal: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regex: Option<String>,
    },
}

impl TryFrom<PatternRepr> for FilterPattern {
    type Error = String;

    fn try_from(repr: PatternRepr) -> Result<Self, Self::Error> {
        match repr {
            PatternRepr::Bare(s) => Ok(Self::Literal(s)),
            PatternRepr::Keyed {
                literal: Some(s),
                regex: None,
            } => Ok(Self::Literal(s)),
            PatternRepr::Keyed {
                literal: None,
                regex: Some(s),
            } => Ok(Self::Regex(s)),
            PatternRepr::Keyed { .. } => {
                Err("filter pattern needs exactly one of `literal` or `regex`".to_string())
            }
        }
    }
}

impl From<FilterPattern> for PatternRepr {
    fn from(pattern: FilterPattern) -> Self {
        match pattern {
            FilterPattern::Literal(s) => Self::Keyed {
                literal: Some(s),
                regex: None,
            },
            FilterPattern::Regex(s) => Self::Keyed {
                literal: None,
                regex: Some(s),
            },
        }
    }
}

impl FilterPattern {
    /// Shorthand for [`FilterPattern::Literal`].
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Shorthand for [`FilterPattern::Regex`].
    pub fn regex(value: impl Into<String>) -> Self {
        Self::Regex(value.into())
    }

    /// The raw text of the pattern as configured.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) | Self::Regex(s) => s,
        }
    }

    /// Regex source for this pattern. Literals are escaped so they keep their
    /// literal-substring meaning.
    pub(crate) fn regex_source(&self) -> String {
        match self {
            Self::Literal(s) => regex::escape(s),
            Self::Regex(s) => s.clone(),
        }
    }
}

impl fmt::Display for FilterPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "literal:{s}"),
            Self::Regex(s) => write!(f, "regex:{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in passes
// ---------------------------------------------------------------------------

/// A fixed pass applied after every user pattern.
pub struct BuiltinPattern {
    /// Short, snake_case identifier used in logs.
    pub name: &'static str,
    /// Regex source, compiled once on first use.
    pub pattern: &'static str,
    /// Token substituted for every match.
    pub placeholder: &'static str,
}

/// Built-in passes, in application order. Order matters: a 16-digit card
/// number is consumed before the API-key pass could see it.
pub static BUILTIN_PATTERNS: &[BuiltinPattern] = &[
    BuiltinPattern {
        name: "credit_card",
        pattern: r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
        placeholder: CREDIT_CARD,
    },
    BuiltinPattern {
        name: "api_key",
        pattern: r"\b[A-Za-z0-9]{32,}\b",
        placeholder: API_KEY,
    },
];

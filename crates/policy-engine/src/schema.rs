use output_filter::FilterPattern;
use serde::{Deserialize, Serialize};

/// Top-level policy loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Schema version; currently must be "1.0".
    pub version: String,
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub pii: PiiSettings,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            filter: FilterSettings::default(),
            tools: ToolSettings::default(),
            pii: PiiSettings::default(),
        }
    }
}

/// Output filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Applied in order, before the built-in credit card and API key passes.
    #[serde(default = "default_filter_patterns")]
    pub patterns: Vec<FilterPattern>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            patterns: default_filter_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_allowed_tools")]
    pub allowed: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            allowed: default_allowed_tools(),
        }
    }
}

/// PII detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiSettings {
    /// Language code passed to the detector.
    #[serde(default = "default_language")]
    pub language: String,
    /// Minimum detector confidence, in `[0, 1]`.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
}

impl Default for PiiSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            score_threshold: default_score_threshold(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_filter_patterns() -> Vec<FilterPattern> {
    ["api_key", "password", "secret", "token"]
        .into_iter()
        .map(FilterPattern::literal)
        .collect()
}

fn default_allowed_tools() -> Vec<String> {
    ["web_search", "calculator", "code_interpreter"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_score_threshold() -> f64 {
    0.5
}

use std::path::Path;

use anyhow::{bail, Context, Result};
use output_filter::CompiledPattern;
use tracing::warn;

use crate::schema::PolicyConfig;

/// Load a [`PolicyConfig`] from a YAML file on disk.
///
/// A missing file yields the default policy with a warning, so the gateway can
/// start before a policy has been written.
pub fn load_policy(path: impl AsRef<Path>) -> Result<PolicyConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "policy file not found; using defaults");
        return Ok(PolicyConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy file: {}", path.display()))?;
    load_policy_from_str(&contents)
        .with_context(|| format!("failed to parse policy file: {}", path.display()))
}

/// Parse and validate a [`PolicyConfig`] from a YAML string.
pub fn load_policy_from_str(yaml: &str) -> Result<PolicyConfig> {
    let config: PolicyConfig = serde_yml::from_str(yaml).context("YAML deserialization failed")?;
    validate(&config)?;
    Ok(config)
}

/// Post-deserialization checks. Also run after CLI/env overrides are merged.
pub fn validate(config: &PolicyConfig) -> Result<()> {
    if config.version != "1.0" {
        bail!(
            "unsupported policy version '{}'; only '1.0' is supported",
            config.version
        );
    }

    let threshold = config.pii.score_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        bail!("pii.score_threshold must be within [0, 1], got {threshold}");
    }

    if config.pii.language.trim().is_empty() {
        bail!("pii.language must not be empty");
    }

    for pattern in &config.filter.patterns {
        CompiledPattern::compile(pattern.clone())
            .with_context(|| format!("invalid filter pattern {pattern}"))?;
    }

    if config.tools.allowed.iter().any(|t| t.trim().is_empty()) {
        bail!("tool names must not be empty");
    }

    Ok(())
}

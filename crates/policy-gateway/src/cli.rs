use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "policy-gateway",
    version,
    about = "PII check, tool allowlist and output filter gateway for agent pipelines"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Path to the policy file (overrides config file setting)
    #[arg(short, long)]
    pub policy: Option<PathBuf>,

    /// Listen address (overrides config file setting)
    #[arg(long)]
    pub listen: Option<String>,

    /// Base URL of the PII analyzer service (overrides config file setting)
    #[arg(long, env = "ANALYZER_URL")]
    pub detector_url: Option<String>,

    /// Enable or disable output filtering (overrides policy)
    #[arg(long, env = "FILTER_ENABLED", value_parser = BoolishValueParser::new())]
    pub filter_enabled: Option<bool>,

    /// Comma-separated literal filter patterns (replaces the policy's list)
    #[arg(long, env = "FILTER_PATTERNS")]
    pub filter_patterns: Option<String>,

    /// Comma-separated tool allowlist (replaces the policy's list)
    #[arg(long, env = "ALLOWED_TOOLS")]
    pub allowed_tools: Option<String>,

    /// Minimum analyzer confidence for reported entities (overrides policy)
    #[arg(long, env = "PII_THRESHOLD")]
    pub pii_threshold: Option<f64>,
}

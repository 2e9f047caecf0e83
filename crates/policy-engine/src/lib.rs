//! # policy-engine
//!
//! Policy facade for the gateway. Loads the YAML policy, wires the external
//! entity detector to the redaction engine, and owns the live output filter
//! and tool allowlist.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use policy_engine::{loader, PolicyGateway, PresidioDetector};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let policy = loader::load_policy("policy.yaml")?;
//! let detector = PresidioDetector::new("http://127.0.0.1:5002", Duration::from_secs(5), None)?;
//! let gateway = PolicyGateway::new(&policy, Arc::new(detector), Duration::from_secs(5))?;
//!
//! println!("{}", gateway.filter_output("my password is hunter2"));
//! println!("{:?}", gateway.check_tool("calculator", None));
//! # Ok(())
//! # }
//! ```

mod allowlist;
mod decision;
mod detector;
mod error;
mod gateway;
pub mod loader;
mod presidio;
mod schema;

pub use allowlist::ToolAllowlist;
pub use decision::{ToolDecision, NOT_IN_ALLOWLIST};
pub use detector::EntityDetector;
pub use error::{DetectionError, GatewayError};
pub use gateway::{PiiReport, PolicyGateway};
pub use presidio::PresidioDetector;
pub use schema::{FilterSettings, PiiSettings, PolicyConfig, ToolSettings};

// Callers of the facade deal in these types directly.
pub use output_filter::{parse_comma_separated, FilterError, FilterPattern, OutputFilter};
pub use redaction::{AnonymizeResult, EntitySpan, SpanError};

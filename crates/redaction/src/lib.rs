//! # redaction
//!
//! Replaces detected entity spans in a text with placeholder tokens.
//!
//! Spans come from an external detector and may overlap or arrive in any
//! order. [`anonymize`] sorts them, merges every group of spans that share
//! characters into a single [`MergedRun`], and substitutes one placeholder per
//! run: `[TYPE]` when the run's spans agree on a type, `[REDACTED]` when they
//! do not.
//!
//! ```rust
//! use redaction::{anonymize, EntitySpan};
//!
//! let result = anonymize("mail bob@example.com", &[EntitySpan::new("EMAIL_ADDRESS", 5, 20, 1.0)])
//!     .unwrap();
//! assert_eq!(result.anonymized_text, "mail [EMAIL_ADDRESS]");
//! ```

pub mod engine;
pub mod span;

pub use engine::{anonymize, merge_runs, AnonymizeResult, MergedRun, REDACTED};
pub use span::{EntitySpan, SpanError};

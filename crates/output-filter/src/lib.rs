//! # output-filter
//!
//! Scrubs sensitive substrings from model output before it leaves the
//! gateway.
//!
//! The crate is organised around two layers:
//!
//! 1. **[`patterns`]** -- the [`FilterPattern`](patterns::FilterPattern) type
//!    for user-configured literals and regexes, plus the fixed catalogue of
//!    built-in passes (credit card numbers, API keys).
//! 2. **[`filter`]** -- compiles patterns case-insensitively and applies them
//!    in declaration order, followed by the built-ins, through the
//!    [`OutputFilter`](filter::OutputFilter) handle.
//!
//! ## Quick start
//!
//! ```rust
//! use output_filter::OutputFilter;
//!
//! let filter = OutputFilter::from_comma_separated(true, "password,token").unwrap();
//! let out = filter.filter("token 4111 1111 1111 1111");
//! assert_eq!(out, "[FILTERED] [CREDIT_CARD]");
//! ```

pub mod filter;
pub mod patterns;

pub use filter::{apply, parse_comma_separated, CompiledPattern, FilterError, OutputFilter};
pub use patterns::{BuiltinPattern, FilterPattern, API_KEY, BUILTIN_PATTERNS, CREDIT_CARD, FILTERED};

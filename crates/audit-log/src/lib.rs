//! Append-only JSON-lines audit trail for the policy gateway.
//!
//! Every PII check, anonymization, output filter pass and tool decision can be
//! recorded as one newline-terminated JSON object. Producers hold a cheap
//! [`AuditSink`] clone; a single background task owns the file.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (sink, _handle) = AuditSink::start("audit.jsonl").await?;
//!
//! sink.log(AuditEntry::new(
//!     AuditEventType::ToolDenied,
//!     AuditSource::new("http").with_user(Some("u-42")),
//!     serde_json::json!({"tool": "shell"}),
//! ))
//! .await;
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod sink;
pub mod writer;

pub use entry::{AuditEntry, AuditEventType, AuditSource};
pub use sink::AuditSink;
pub use writer::{AuditWriteError, AuditWriter};

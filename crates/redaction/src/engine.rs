//! Span merging and placeholder substitution.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::span::{EntitySpan, SpanError};

/// Placeholder used when a merged run mixes entity types.
pub const REDACTED: &str = "[REDACTED]";

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// The outcome of an [`anonymize`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizeResult {
    /// `true` when at least one span was supplied.
    pub has_pii: bool,
    /// Every span as detected (not merged, not clamped), sorted by start.
    pub entities: Vec<EntitySpan>,
    /// The input with each merged run replaced by its placeholder.
    pub anonymized_text: String,
}

impl AnonymizeResult {
    /// Result for text with nothing to redact.
    pub fn clean(text: &str) -> Self {
        Self {
            has_pii: false,
            entities: Vec::new(),
            anonymized_text: text.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Merged runs
// ---------------------------------------------------------------------------

/// A maximal region formed by unioning spans that share characters.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRun<'a> {
    /// Character offset of the first redacted character.
    pub start: usize,
    /// Character offset one past the last redacted character.
    pub end: usize,
    /// The spans that make up this run, in sorted order.
    pub spans: Vec<&'a EntitySpan>,
}

impl MergedRun<'_> {
    /// `[TYPE]` when every span in the run agrees on the entity type,
    /// [`REDACTED`] otherwise.
    pub fn placeholder(&self) -> String {
        let mut types = self.spans.iter().map(|s| s.entity_type());
        match types.next() {
            Some(first) if types.all(|t| t == first) => format!("[{first}]"),
            _ => REDACTED.to_string(),
        }
    }
}

/// Sort by start ascending; at a shared start the longer span comes first so
/// it is not fragmented by the shorter one.
fn sorted(spans: &[EntitySpan]) -> Vec<&EntitySpan> {
    let mut sorted: Vec<&EntitySpan> = spans.iter().collect();
    sorted.sort_by_key(|s| (s.start(), Reverse(s.end())));
    sorted
}

/// Group `spans` into non-overlapping runs over a text of `char_len`
/// characters.
///
/// Offsets are clamped to `char_len`. Spans that share at least one character
/// join the same run. Adjacent spans (`a.end == b.start`) are not merged; each
/// keeps its own run and placeholder. Spans that clamp to nothing (entirely
/// past the end of the text) contribute no run.
pub fn merge_runs(spans: &[EntitySpan], char_len: usize) -> Vec<MergedRun<'_>> {
    let mut runs: Vec<MergedRun<'_>> = Vec::new();

    for span in sorted(spans) {
        let start = span.start().min(char_len);
        let end = span.end().min(char_len);
        if start >= end {
            continue;
        }

        if let Some(run) = runs.last_mut().filter(|run| start < run.end) {
            run.end = run.end.max(end);
            run.spans.push(span);
            continue;
        }

        runs.push(MergedRun {
            start,
            end,
            spans: vec![span],
        });
    }

    runs
}

// ---------------------------------------------------------------------------
// anonymize
// ---------------------------------------------------------------------------

/// Byte offset of every character boundary in `text`, including the end.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Replace every entity span in `text` with a placeholder.
///
/// All spans are validated before any output is built, so an invalid span
/// yields [`SpanError::InvalidSpan`] and nothing else. With no spans the text
/// is returned verbatim and `has_pii` is `false`.
///
/// # Example
///
/// ```rust
/// use redaction::{anonymize, EntitySpan};
///
/// let spans = vec![
///     EntitySpan::new("PERSON", 0, 4, 0.9),
///     EntitySpan::new("PERSON", 0, 8, 0.95),
/// ];
/// let result = anonymize("John Doe lives at 123 Main St", &spans).unwrap();
/// assert_eq!(result.anonymized_text, "[PERSON] lives at 123 Main St");
/// ```
pub fn anonymize(text: &str, spans: &[EntitySpan]) -> Result<AnonymizeResult, SpanError> {
    for span in spans {
        span.validate()?;
    }

    if spans.is_empty() {
        return Ok(AnonymizeResult::clean(text));
    }

    let boundaries = char_boundaries(text);
    let char_len = boundaries.len() - 1;
    let runs = merge_runs(spans, char_len);

    let mut anonymized = String::with_capacity(text.len());
    let mut cursor = 0;

    for run in &runs {
        let start = boundaries[run.start];
        anonymized.push_str(&text[cursor..start]);
        anonymized.push_str(&run.placeholder());
        cursor = boundaries[run.end];
    }
    anonymized.push_str(&text[cursor..]);

    debug!(spans = spans.len(), runs = runs.len(), "anonymized text");

    Ok(AnonymizeResult {
        has_pii: true,
        entities: sorted(spans).into_iter().cloned().collect(),
        anonymized_text: anonymized,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

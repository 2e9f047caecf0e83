//! The output filter: ordered user patterns followed by the built-in passes.

use std::sync::{OnceLock, PoisonError, RwLock};

use regex::{NoExpand, Regex, RegexBuilder};
use tracing::{debug, info, trace};

use crate::patterns::{FilterPattern, BUILTIN_PATTERNS, FILTERED};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while compiling or registering a [`FilterPattern`].
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid filter regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("filter pattern must not be empty")]
    EmptyPattern,

    #[error("filter pattern '{0}' matches the empty string")]
    MatchesEmpty(String),
}

// ---------------------------------------------------------------------------
// Compiled pattern
// ---------------------------------------------------------------------------

/// A [`FilterPattern`] together with its case-insensitive compiled regex.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: FilterPattern,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile `pattern` for case-insensitive matching.
    ///
    /// Blank patterns and patterns that match the empty string are rejected:
    /// either would splice `[FILTERED]` between every character.
    pub fn compile(pattern: FilterPattern) -> Result<Self, FilterError> {
        if pattern.as_str().trim().is_empty() {
            return Err(FilterError::EmptyPattern);
        }

        let regex = RegexBuilder::new(&pattern.regex_source())
            .case_insensitive(true)
            .build()
            .map_err(|source| FilterError::InvalidRegex {
                pattern: pattern.as_str().to_string(),
                source,
            })?;

        if regex.is_match("") {
            return Err(FilterError::MatchesEmpty(pattern.as_str().to_string()));
        }

        Ok(Self { pattern, regex })
    }

    /// The pattern as configured.
    pub fn pattern(&self) -> &FilterPattern {
        &self.pattern
    }
}

// ---------------------------------------------------------------------------
// Pure transform
// ---------------------------------------------------------------------------

fn builtin_regexes() -> &'static [(Regex, &'static str)] {
    static COMPILED: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        BUILTIN_PATTERNS
            .iter()
            .map(|b| {
                let re = Regex::new(b.pattern).expect("built-in patterns must compile");
                (re, b.placeholder)
            })
            .collect()
    })
}

/// Apply `patterns` in order, then the built-in passes, to `text`.
///
/// Every pass sees the output of the previous one. Never fails; with an empty
/// pattern list only the built-ins run.
pub fn apply(text: &str, patterns: &[CompiledPattern]) -> String {
    let mut filtered = text.to_string();

    for compiled in patterns {
        filtered = compiled
            .regex
            .replace_all(&filtered, NoExpand(FILTERED))
            .into_owned();
    }

    for (regex, placeholder) in builtin_regexes() {
        filtered = regex
            .replace_all(&filtered, NoExpand(placeholder))
            .into_owned();
    }

    filtered
}

// ---------------------------------------------------------------------------
// OutputFilter
// ---------------------------------------------------------------------------

/// Holds the active pattern configuration and applies it to model output.
///
/// The pattern list sits behind a reader-writer lock: any number of
/// concurrent [`filter`](Self::filter) calls share it, while
/// [`add_pattern`](Self::add_pattern) / [`remove_pattern`](Self::remove_pattern)
/// take it exclusively.
///
/// # Example
///
/// ```rust
/// use output_filter::{FilterPattern, OutputFilter};
///
/// let filter = OutputFilter::new(true, vec![FilterPattern::literal("password")]).unwrap();
/// assert_eq!(filter.filter("my PASSWORD is"), "my [FILTERED] is");
/// ```
pub struct OutputFilter {
    enabled: bool,
    patterns: RwLock<Vec<CompiledPattern>>,
}

impl std::fmt::Debug for OutputFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputFilter")
            .field("enabled", &self.enabled)
            .field("num_patterns", &self.read().len())
            .finish()
    }
}

impl OutputFilter {
    /// Build a filter from an ordered pattern list. Duplicates keep their
    /// first position.
    pub fn new(
        enabled: bool,
        patterns: impl IntoIterator<Item = FilterPattern>,
    ) -> Result<Self, FilterError> {
        let mut compiled: Vec<CompiledPattern> = Vec::new();
        for pattern in patterns {
            if compiled.iter().any(|c| c.pattern == pattern) {
                continue;
            }
            compiled.push(CompiledPattern::compile(pattern)?);
        }

        info!(enabled, patterns = compiled.len(), "output filter initialized");

        Ok(Self {
            enabled,
            patterns: RwLock::new(compiled),
        })
    }

    /// Build a filter from a comma-separated list of literals, e.g.
    /// `"api_key,password,secret,token"`. Entries are trimmed and blank
    /// entries are skipped.
    pub fn from_comma_separated(enabled: bool, list: &str) -> Result<Self, FilterError> {
        Self::new(enabled, parse_comma_separated(list))
    }

    /// Whether filtering is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Scrub `text` with the current configuration.
    ///
    /// When the filter is disabled the input is returned unchanged and no
    /// pattern is evaluated.
    pub fn filter(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }

        let patterns = self.read();
        let filtered = apply(text, &patterns);
        trace!(
            input_len = text.len(),
            output_len = filtered.len(),
            patterns = patterns.len(),
            "output filtered"
        );
        filtered
    }

    /// Register `pattern` at the end of the list unless it is already
    /// present. Returns `Ok(true)` when it was inserted.
    pub fn add_pattern(&self, pattern: FilterPattern) -> Result<bool, FilterError> {
        // Compile outside the write lock; readers are not held up by regex
        // construction.
        let compiled = CompiledPattern::compile(pattern)?;

        let mut patterns = self.write();
        if patterns.iter().any(|c| c.pattern == compiled.pattern) {
            debug!(pattern = %compiled.pattern, "filter pattern already present");
            return Ok(false);
        }

        info!(pattern = %compiled.pattern, "added filter pattern");
        patterns.push(compiled);
        Ok(true)
    }

    /// Remove `pattern` if present. Returns whether anything was removed.
    pub fn remove_pattern(&self, pattern: &FilterPattern) -> bool {
        let mut patterns = self.write();
        let before = patterns.len();
        patterns.retain(|c| &c.pattern != pattern);

        let removed = patterns.len() != before;
        if removed {
            info!(%pattern, "removed filter pattern");
        }
        removed
    }

    /// A copy of the current pattern list, in application order.
    pub fn list_patterns(&self) -> Vec<FilterPattern> {
        self.read().iter().map(|c| c.pattern.clone()).collect()
    }

    // A panicking writer can only leave the Vec fully pushed or untouched, so
    // a poisoned lock still guards consistent data.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<CompiledPattern>> {
        self.patterns.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<CompiledPattern>> {
        self.patterns.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Split a comma-separated literal list into patterns.
pub fn parse_comma_separated(list: &str) -> Vec<FilterPattern> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(FilterPattern::literal)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn default_filter() -> OutputFilter {
        OutputFilter::from_comma_separated(true, "api_key,password,secret,token").unwrap()
    }

    // -- user patterns ----------------------------------------------------

    #[test]
    fn literal_patterns_are_case_insensitive() {
        let f = default_filter();
        assert_eq!(
            f.filter("Your Password and SECRET are safe"),
            "Your [FILTERED] and [FILTERED] are safe"
        );
    }

    #[test]
    fn literal_metacharacters_match_literally() {
        let f = OutputFilter::new(true, vec![FilterPattern::literal("a.c")]).unwrap();
        assert_eq!(f.filter("abc a.c"), "abc [FILTERED]");
    }

    #[test]
    fn regex_patterns_are_case_insensitive() {
        let f = OutputFilter::new(true, vec![FilterPattern::regex(r"sk-[a-z]{4}")]).unwrap();
        assert_eq!(f.filter("key SK-ABCD here"), "key [FILTERED] here");
    }

    #[test]
    fn every_match_is_replaced() {
        let f = default_filter();
        assert_eq!(f.filter("token token TOKEN"), "[FILTERED] [FILTERED] [FILTERED]");
    }

    #[test]
    fn patterns_apply_in_declaration_order() {
        // "secret_token": the first pattern consumes the whole word, so the
        // second one has nothing left to match.
        let f = OutputFilter::new(
            true,
            vec![
                FilterPattern::literal("secret_token"),
                FilterPattern::literal("token"),
            ],
        )
        .unwrap();
        assert_eq!(f.filter("a secret_token b"), "a [FILTERED] b");

        let reversed = OutputFilter::new(
            true,
            vec![
                FilterPattern::literal("token"),
                FilterPattern::literal("secret_token"),
            ],
        )
        .unwrap();
        assert_eq!(reversed.filter("a secret_token b"), "a secret_[FILTERED] b");
    }

    // -- built-ins ----------------------------------------------------------

    #[test]
    fn credit_card_is_replaced() {
        let f = default_filter();
        assert_eq!(f.filter("card 4111 1111 1111 1111 ok"), "card [CREDIT_CARD] ok");
        assert_eq!(f.filter("4111-1111-1111-1111"), "[CREDIT_CARD]");
        assert_eq!(f.filter("4111111111111111"), "[CREDIT_CARD]");
    }

    #[test]
    fn short_digit_runs_survive() {
        let f = default_filter();
        assert_eq!(f.filter("call 555 1234"), "call 555 1234");
    }

    #[test]
    fn api_key_is_replaced() {
        let f = default_filter();
        assert_eq!(
            f.filter("use AB12CD34EF56GH78IJ90KL12MN34OP56 now"),
            "use [API_KEY] now"
        );
    }

    #[test]
    fn thirty_one_chars_is_not_a_key() {
        let f = default_filter();
        let text = "AB12CD34EF56GH78IJ90KL12MN34OP5";
        assert_eq!(text.len(), 31);
        assert_eq!(f.filter(text), text);
    }

    #[test]
    fn builtins_run_with_no_user_patterns() {
        let f = OutputFilter::new(true, Vec::new()).unwrap();
        assert_eq!(f.filter("4111 1111 1111 1111"), "[CREDIT_CARD]");
        assert_eq!(f.filter("plain words"), "plain words");
    }

    #[test]
    fn user_pattern_runs_before_builtins() {
        // The user pattern removes part of the digits, so the card pass no
        // longer sees a full card number.
        let f = OutputFilter::new(true, vec![FilterPattern::literal("1111 1111")]).unwrap();
        assert_eq!(f.filter("4111 1111 1111 1111"), "4111 [FILTERED] 1111");
    }

    const MIXED: &str = "password 4111 1111 1111 1111 AB12CD34EF56GH78IJ90KL12MN34OP56";

    #[test]
    fn builtins_alone_are_stable_on_second_pass() {
        let f = OutputFilter::new(true, Vec::new()).unwrap();
        for text in [MIXED, "", "nothing to see", "TOKEN-TOKEN"] {
            let once = f.filter(text);
            assert_eq!(f.filter(&once), once, "not stable for {text:?}");
        }
    }

    #[test]
    fn user_patterns_outside_placeholders_are_stable() {
        let f = OutputFilter::from_comma_separated(true, "password,secret").unwrap();
        let once = f.filter(MIXED);
        assert_eq!(once, "[FILTERED] [CREDIT_CARD] [API_KEY]");
        assert_eq!(f.filter(&once), once);
    }

    #[test]
    fn placeholder_matching_pattern_settles_after_second_pass() {
        // `api_key` matches inside `[API_KEY]`, so pass two differs from
        // pass one but nothing changes after that.
        let f = default_filter();
        let once = f.filter(MIXED);
        let twice = f.filter(&once);
        let thrice = f.filter(&twice);
        assert_eq!(once, "[FILTERED] [CREDIT_CARD] [API_KEY]");
        assert_eq!(twice, "[FILTERED] [CREDIT_CARD] [[FILTERED]]");
        assert_eq!(thrice, twice);
    }

    // -- enable switch ----------------------------------------------------

    #[test]
    fn disabled_filter_is_identity() {
        let f = OutputFilter::from_comma_separated(false, "password").unwrap();
        let text = "password 4111 1111 1111 1111 AB12CD34EF56GH78IJ90KL12MN34OP56";
        assert_eq!(f.filter(text), text);
        assert!(!f.is_enabled());
    }

    #[test]
    fn empty_text() {
        assert_eq!(default_filter().filter(""), "");
    }

    #[test]
    fn non_ascii_text_survives() {
        let f = default_filter();
        assert_eq!(f.filter("Grüße, passwörd ✓ password"), "Grüße, passwörd ✓ [FILTERED]");
    }

    // -- administration ---------------------------------------------------

    #[test]
    fn add_pattern_is_set_like() {
        let f = default_filter();
        assert!(f.add_pattern(FilterPattern::literal("internal")).unwrap());
        assert!(!f.add_pattern(FilterPattern::literal("internal")).unwrap());
        assert_eq!(f.list_patterns().len(), 5);
        assert_eq!(f.list_patterns().last(), Some(&FilterPattern::literal("internal")));
        assert_eq!(f.filter("INTERNAL docs"), "[FILTERED] docs");
    }

    #[test]
    fn literal_and_regex_with_same_text_are_distinct() {
        let f = OutputFilter::new(true, Vec::new()).unwrap();
        assert!(f.add_pattern(FilterPattern::literal("a+")).unwrap());
        assert!(f.add_pattern(FilterPattern::regex("a+")).unwrap());
        assert_eq!(f.list_patterns().len(), 2);
    }

    #[test]
    fn remove_pattern_is_noop_when_absent() {
        let f = default_filter();
        assert!(!f.remove_pattern(&FilterPattern::literal("missing")));
        assert!(f.remove_pattern(&FilterPattern::literal("token")));
        assert!(!f.list_patterns().contains(&FilterPattern::literal("token")));
        assert_eq!(f.filter("token"), "token");
    }

    #[test]
    fn list_patterns_is_a_copy() {
        let f = default_filter();
        let mut listed = f.list_patterns();
        listed.clear();
        assert_eq!(f.list_patterns().len(), 4);
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let f = default_filter();
        let err = f.add_pattern(FilterPattern::regex("[unclosed")).unwrap_err();
        assert!(matches!(err, FilterError::InvalidRegex { .. }), "got {err:?}");
        assert_eq!(f.list_patterns().len(), 4);
    }

    #[test]
    fn empty_patterns_are_rejected() {
        assert!(matches!(
            CompiledPattern::compile(FilterPattern::literal("  ")),
            Err(FilterError::EmptyPattern)
        ));
        assert!(matches!(
            CompiledPattern::compile(FilterPattern::regex("x*")),
            Err(FilterError::MatchesEmpty(_))
        ));
    }

    #[test]
    fn comma_separated_skips_blanks_and_dedups() {
        let f = OutputFilter::from_comma_separated(true, " password , ,token,password,").unwrap();
        assert_eq!(
            f.list_patterns(),
            vec![FilterPattern::literal("password"), FilterPattern::literal("token")]
        );
    }

    #[test]
    fn new_fails_on_bad_regex() {
        let err = OutputFilter::new(true, vec![FilterPattern::regex("(")]).unwrap_err();
        assert!(err.to_string().contains("invalid filter regex"));
    }

    // -- concurrency --------------------------------------------------------

    #[test]
    fn concurrent_filter_and_admin() {
        let f = Arc::new(default_filter());
        let mut handles = Vec::new();

        for i in 0..4 {
            let f = Arc::clone(&f);
            handles.push(std::thread::spawn(move || {
                for j in 0..50 {
                    let p = FilterPattern::literal(format!("word{i}x{j}"));
                    f.add_pattern(p.clone()).unwrap();
                    let out = f.filter("password stays hidden");
                    assert!(out.starts_with("[FILTERED]"));
                    f.remove_pattern(&p);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(f.list_patterns().len(), 4);
    }
}

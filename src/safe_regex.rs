//! Regex compilation and matching with bounded cost against untrusted
//! patterns and haystacks.
//!
//! The engine underneath compiles to finite automata and scans in linear
//! time, so catastrophic backtracking cannot happen; compile-time resource
//! use is capped with explicit size limits. The wall-clock budget on
//! [`SafeRegex::test`] is measured and logged so misbehaving pattern sets
//! show up in host logs, and the call never fails: any trouble is a
//! non-match.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::cache::{Cache, CacheRegistry};
use crate::constants::{cache as cache_consts, regexes};

#[derive(Debug, thiserror::Error)]
#[error("invalid pattern `{pattern}`: {source}")]
pub struct RegexCompileError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

fn hash_key(parts: &[&str]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for part in parts {
        part.hash(&mut hasher);
    }
    hasher.finish()
}

/// Separator class that bounds a keyword token inside a release name.
const TOKEN_BOUNDARY: &str = r"[\s\[\]\(\)\.\-_]";

/// Builds one alternation pattern matching any keyword as a whole token
/// bounded by separator characters or the string edge. Metacharacters in
/// keywords are escaped; internal whitespace in multi-word keywords becomes
/// an optional separator class so `Dolby Vision` also matches
/// `Dolby.Vision` and `DolbyVision`.
#[must_use]
pub fn form_regex_from_keywords(keywords: &[&str]) -> String {
    format!(
        "(?:^|{TOKEN_BOUNDARY})(?:{})(?:{TOKEN_BOUNDARY}|$)",
        keyword_alternation(keywords)
    )
}

/// Escaped alternation of keywords, without token boundaries. Internal
/// whitespace in a keyword becomes an optional separator class.
#[must_use]
pub fn keyword_alternation(keywords: &[&str]) -> String {
    let alternatives: Vec<String> = keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| {
            let escaped = regex::escape(k.trim());
            let mut collapsed = String::with_capacity(escaped.len());
            let mut in_gap = false;
            for c in escaped.chars() {
                if c.is_whitespace() {
                    if !in_gap {
                        collapsed.push_str(r"[ \.\-_]?");
                        in_gap = true;
                    }
                } else {
                    collapsed.push(c);
                    in_gap = false;
                }
            }
            collapsed
        })
        .collect();
    alternatives.join("|")
}

pub struct SafeRegex {
    compile_cache: Arc<Cache<u64, Arc<Regex>>>,
    test_cache: Arc<Cache<u64, bool>>,
}

impl SafeRegex {
    #[must_use]
    pub fn new(registry: &CacheRegistry) -> Self {
        Self {
            compile_cache: registry.instance(
                cache_consts::COMPILE_CACHE_NAME,
                cache_consts::COMPILE_CACHE_SIZE,
            ),
            test_cache: registry
                .instance(cache_consts::TEST_CACHE_NAME, cache_consts::TEST_CACHE_SIZE),
        }
    }

    /// Compiles a pattern with the given flag characters (`imsux` honored,
    /// anything else ignored). Results are memoized for a short TTL keyed by
    /// `hash(pattern|flags)` unless `bypass_cache` is set, which is
    /// appropriate for untrusted one-off patterns that would only pollute
    /// the cache.
    pub fn compile(
        &self,
        pattern: &str,
        flags: &str,
        bypass_cache: bool,
    ) -> Result<Arc<Regex>, RegexCompileError> {
        if !bypass_cache {
            let key = hash_key(&[pattern, "|", flags]);
            if let Some(hit) = self.compile_cache.get(&key) {
                return Ok(hit);
            }
        }
        let compiled = Arc::new(build(pattern, flags)?);
        if !bypass_cache {
            let key = hash_key(&[pattern, "|", flags]);
            self.compile_cache
                .set(key, Arc::clone(&compiled), cache_consts::COMPILE_TTL);
        }
        Ok(compiled)
    }

    /// Match test that never fails and never runs away: compile errors and
    /// budget overruns log a warning and count as a non-match. Results are
    /// memoized keyed by `hash(pattern|haystack)` because the same pairs
    /// recur heavily across sources and users.
    #[must_use]
    pub fn test(&self, pattern: &str, flags: &str, haystack: &str, timeout: Duration) -> bool {
        let key = hash_key(&[pattern, "|", flags, "|", haystack]);
        if let Some(hit) = self.test_cache.get(&key) {
            return hit;
        }

        let result = match self.compile(pattern, flags, false) {
            Ok(re) => {
                let start = Instant::now();
                let matched = re.is_match(haystack);
                let elapsed = start.elapsed();
                if elapsed > timeout {
                    warn!(
                        pattern,
                        elapsed_ms = elapsed.as_millis() as u64,
                        budget_ms = timeout.as_millis() as u64,
                        "regex evaluation exceeded its time budget"
                    );
                }
                matched
            }
            Err(err) => {
                warn!(pattern, error = %err, "treating uncompilable pattern as non-match");
                false
            }
        };

        self.test_cache.set(key, result, cache_consts::TEST_TTL);
        result
    }

    /// [`SafeRegex::test`] with the default budget.
    #[must_use]
    pub fn test_default(&self, pattern: &str, haystack: &str) -> bool {
        self.test(
            pattern,
            "",
            haystack,
            Duration::from_millis(regexes::DEFAULT_TIMEOUT_MS),
        )
    }
}

fn build(pattern: &str, flags: &str) -> Result<Regex, RegexCompileError> {
    let mut builder = RegexBuilder::new(pattern);
    builder
        .size_limit(regexes::SIZE_LIMIT)
        .dfa_size_limit(regexes::DFA_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'u' => builder.unicode(true),
            'x' => builder.ignore_whitespace(true),
            _ => &mut builder,
        };
    }
    builder.build().map_err(|source| RegexCompileError {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn safe() -> SafeRegex {
        SafeRegex::new(&CacheRegistry::new())
    }

    #[test]
    fn test_compile_is_cached() {
        let sr = safe();
        let a = sr.compile(r"\d+", "i", false).unwrap();
        let b = sr.compile(r"\d+", "i", false).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let bypassed = sr.compile(r"\d+", "i", true).unwrap();
        assert!(!Arc::ptr_eq(&a, &bypassed));
    }

    #[test]
    fn test_flags_are_honored() {
        let sr = safe();
        assert!(sr.test("bluray", "i", "Movie.2023.BluRay.mkv", Duration::from_secs(1)));
        assert!(!sr.test("bluray", "", "Movie.2023.BluRay.mkv", Duration::from_secs(1)));
    }

    #[test]
    fn test_catastrophic_pattern_stays_bounded() {
        let sr = safe();
        let haystack = format!("{}!", "a".repeat(10_000));
        let start = Instant::now();
        let matched = sr.test(r"(a+)+$", "", &haystack, Duration::from_millis(100));
        assert!(!matched);
        // Linear-time engine: far below the budget even for the classic
        // backtracking bomb.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_pattern_is_non_match() {
        let sr = safe();
        // Lookahead is unsupported by the engine; must degrade, not fail.
        assert!(!sr.test(r"(?=a)b", "", "ab", Duration::from_secs(1)));
        assert!(!sr.test(r"(unclosed", "", "anything", Duration::from_secs(1)));
    }

    #[test]
    fn test_result_memoization() {
        let sr = safe();
        assert!(sr.test_default(r"\d{4}", "Movie 2023"));
        // Second call is served from the result cache.
        assert!(sr.test_default(r"\d{4}", "Movie 2023"));
        assert_eq!(sr.test_cache.len(), 1);
    }

    #[test]
    fn test_keyword_regex_whole_tokens_only() {
        let pattern = form_regex_from_keywords(&["RD", "Real Debrid"]);
        let re = build(&pattern, "i").unwrap();
        assert!(re.is_match("[RD] Movie 1080p"));
        assert!(re.is_match("real.debrid cached"));
        assert!(re.is_match("Real-Debrid"));
        assert!(!re.is_match("HARD drive"));
        assert!(!re.is_match("shardX"));
    }

    #[test]
    fn test_keyword_regex_escapes_metacharacters() {
        let pattern = form_regex_from_keywords(&["put.io"]);
        let re = build(&pattern, "i").unwrap();
        assert!(re.is_match("(put.io) cached"));
        assert!(!re.is_match("putzio"));
    }
}

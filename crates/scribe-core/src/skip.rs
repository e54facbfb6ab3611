//! Skip rules.
//!
//! A [`Skipper`] decides per request whether logging happens at all
//! ([`Skipper::should_skip`]) and whether the body is captured
//! ([`Skipper::should_skip_body`]). Rules are evaluated in order and the first
//! match wins.

use crate::error::ConfigError;
use regex::Regex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Caller-supplied skip predicate over `(path, method)`.
pub type SkipPredicate = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// A single skip rule.
#[derive(Clone)]
pub enum SkipRule {
    /// Exact path match.
    Path(String),
    /// Regular expression matched against the path.
    Pattern(Regex),
    /// Method match, case-insensitive.
    Method(String),
    Predicate(SkipPredicate),
    /// Matches only when every inner rule matches.
    All(Vec<SkipRule>),
}

impl SkipRule {
    pub fn path(path: impl Into<String>) -> Self {
        SkipRule::Path(path.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, ConfigError> {
        Regex::new(pattern)
            .map(SkipRule::Pattern)
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn method(method: impl Into<String>) -> Self {
        SkipRule::Method(method.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        SkipRule::Predicate(Arc::new(f))
    }

    pub fn all(rules: impl IntoIterator<Item = SkipRule>) -> Self {
        SkipRule::All(rules.into_iter().collect())
    }

    pub fn matches(&self, path: &str, method: &str) -> bool {
        match self {
            SkipRule::Path(p) => p == path,
            SkipRule::Pattern(re) => re.is_match(path),
            SkipRule::Method(m) => m.eq_ignore_ascii_case(method),
            SkipRule::Predicate(f) => {
                // A panicking predicate counts as "no match".
                catch_unwind(AssertUnwindSafe(|| f(path, method))).unwrap_or_else(|_| {
                    tracing::warn!(path, method, "skip predicate panicked");
                    false
                })
            }
            SkipRule::All(rules) => !rules.is_empty() && rules.iter().all(|r| r.matches(path, method)),
        }
    }
}

impl fmt::Debug for SkipRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipRule::Path(p) => f.debug_tuple("Path").field(p).finish(),
            SkipRule::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            SkipRule::Method(m) => f.debug_tuple("Method").field(m).finish(),
            SkipRule::Predicate(_) => f.write_str("Predicate(<fn>)"),
            SkipRule::All(rules) => f.debug_tuple("All").field(rules).finish(),
        }
    }
}

/// Immutable rule set shared by every request of one middleware instance.
#[derive(Clone, Debug, Default)]
pub struct Skipper {
    rules: Arc<Vec<SkipRule>>,
}

impl Skipper {
    pub fn new(rules: impl IntoIterator<Item = SkipRule>) -> Self {
        Self {
            rules: Arc::new(rules.into_iter().collect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether the request should not be logged at all.
    pub fn should_skip(&self, path: &str, method: &str) -> bool {
        self.evaluate(path, method)
    }

    /// Whether the body of the exchange should not be captured.
    ///
    /// Currently shares the evaluation of [`should_skip`](Self::should_skip);
    /// kept separate so that the two can diverge without touching callers.
    pub fn should_skip_body(&self, path: &str, method: &str) -> bool {
        self.evaluate(path, method)
    }

    fn evaluate(&self, path: &str, method: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(path, method))
    }
}

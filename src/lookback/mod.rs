mod memory;

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::{LabelSet, Timestamp};
use crate::config::get_global_settings;
use crate::error::{AnalyzerError, AnalyzerResult};

pub use memory::*;

/// A recorded value of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookbackPoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl LookbackPoint {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        LookbackPoint { timestamp, value }
    }
}

/// "what was `labels` at or before `timestamp`"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookbackQuery {
    pub labels: LabelSet,
    pub timestamp: Timestamp,
}

impl LookbackQuery {
    pub fn new(labels: LabelSet, timestamp: Timestamp) -> Self {
        LookbackQuery { labels, timestamp }
    }
}

/// Source of historical values for rate-style operators.
///
/// `Ok(None)` means the series has no value at or before the instant. That is
/// an expected outcome, not an error.
pub trait LookbackResolver: Send + Sync {
    /// Returns the most recent value recorded for exactly `labels` at or before `timestamp`.
    fn lookup(&self, labels: &LabelSet, timestamp: Timestamp) -> AnalyzerResult<Option<LookbackPoint>>;

    /// Resolves every query in one round trip. Answers are positional.
    fn lookup_batch(&self, queries: &[LookbackQuery]) -> AnalyzerResult<Vec<Option<LookbackPoint>>> {
        queries
            .iter()
            .map(|q| self.lookup(&q.labels, q.timestamp))
            .collect()
    }
}

impl<T: LookbackResolver + ?Sized> LookbackResolver for &T {
    fn lookup(&self, labels: &LabelSet, timestamp: Timestamp) -> AnalyzerResult<Option<LookbackPoint>> {
        (**self).lookup(labels, timestamp)
    }

    fn lookup_batch(&self, queries: &[LookbackQuery]) -> AnalyzerResult<Vec<Option<LookbackPoint>>> {
        (**self).lookup_batch(queries)
    }
}

/// What rate-style operators do when the resolver has no baseline for a series.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookbackMissPolicy {
    /// use the current sample as its own baseline; increase and rate yield 0
    #[default]
    CurrentSample,
    /// assume the series was 0 at the queried instant
    ZeroBaseline,
    /// leave the sample out of the result
    Skip,
}

impl LookbackMissPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LookbackMissPolicy::CurrentSample => "current_sample",
            LookbackMissPolicy::ZeroBaseline => "zero_baseline",
            LookbackMissPolicy::Skip => "skip",
        }
    }
}

impl Display for LookbackMissPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LookbackMissPolicy {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "current_sample" | "current" => Ok(LookbackMissPolicy::CurrentSample),
            "zero_baseline" | "zero" => Ok(LookbackMissPolicy::ZeroBaseline),
            "skip" | "drop" => Ok(LookbackMissPolicy::Skip),
            _ => Err(AnalyzerError::InvalidConfiguration(format!(
                "unknown lookback miss policy: {s}"
            ))),
        }
    }
}

/// A resolver paired with the miss policy rate-style operators should apply.
#[derive(Clone, Copy)]
pub struct Lookback<'a> {
    resolver: &'a dyn LookbackResolver,
    miss_policy: LookbackMissPolicy,
}

impl<'a> Lookback<'a> {
    /// Uses the miss policy from the global settings.
    pub fn new(resolver: &'a dyn LookbackResolver) -> Self {
        Lookback {
            resolver,
            miss_policy: get_global_settings().lookback_miss_policy,
        }
    }

    pub fn with_miss_policy(mut self, miss_policy: LookbackMissPolicy) -> Self {
        self.miss_policy = miss_policy;
        self
    }

    pub fn miss_policy(&self) -> LookbackMissPolicy {
        self.miss_policy
    }

    pub(crate) fn resolve(&self, queries: &[LookbackQuery]) -> AnalyzerResult<Vec<Option<LookbackPoint>>> {
        let answers = self.resolver.lookup_batch(queries)?;
        if answers.len() != queries.len() {
            return Err(AnalyzerError::Lookback(format!(
                "resolver answered {} of {} queries",
                answers.len(),
                queries.len()
            )));
        }
        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShortResolver;

    impl LookbackResolver for ShortResolver {
        fn lookup(&self, _labels: &LabelSet, _timestamp: Timestamp) -> AnalyzerResult<Option<LookbackPoint>> {
            Ok(None)
        }

        fn lookup_batch(&self, _queries: &[LookbackQuery]) -> AnalyzerResult<Vec<Option<LookbackPoint>>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_resolve_rejects_short_batches() {
        let resolver = ShortResolver;
        let lookback = Lookback::new(&resolver);
        let queries = vec![LookbackQuery::new(LabelSet::empty(), 1_000)];
        let err = lookback.resolve(&queries).unwrap_err();
        assert!(matches!(err, AnalyzerError::Lookback(_)));
    }

    #[test]
    fn test_miss_policy_parse() {
        assert_eq!("zero".parse::<LookbackMissPolicy>().unwrap(), LookbackMissPolicy::ZeroBaseline);
        assert_eq!("SKIP".parse::<LookbackMissPolicy>().unwrap(), LookbackMissPolicy::Skip);
        assert!("later".parse::<LookbackMissPolicy>().is_err());
        assert_eq!(LookbackMissPolicy::default().to_string(), "current_sample");
    }
}

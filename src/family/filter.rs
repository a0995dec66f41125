use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::common::regex_util::get_regexp_cache;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::family::{Sample, SampleFamily};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelFilterOp {
    Equal,
    NotEqual,
    MatchRegexp,
    NotMatchRegexp,
}

impl LabelFilterOp {
    pub fn is_regex(&self) -> bool {
        matches!(self, LabelFilterOp::MatchRegexp | LabelFilterOp::NotMatchRegexp)
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, LabelFilterOp::NotEqual | LabelFilterOp::NotMatchRegexp)
    }
}

impl fmt::Display for LabelFilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelFilterOp::Equal => write!(f, "="),
            LabelFilterOp::NotEqual => write!(f, "!="),
            LabelFilterOp::MatchRegexp => write!(f, "=~"),
            LabelFilterOp::NotMatchRegexp => write!(f, "!~"),
        }
    }
}

/// `{label op "value"}` with the pattern compiled up front for regex ops.
#[derive(Debug, Clone)]
struct LabelFilter {
    label: String,
    op: LabelFilterOp,
    value: String,
    re: Option<Arc<Regex>>,
}

impl LabelFilter {
    fn new(label: &str, op: LabelFilterOp, value: &str) -> AnalyzerResult<Self> {
        let re = if op.is_regex() {
            Some(get_regexp_cache().get_or_compile(value)?)
        } else {
            None
        };
        Ok(LabelFilter {
            label: label.to_string(),
            op,
            value: value.to_string(),
            re,
        })
    }

    /// A sample lacking the label never matches, whatever the op.
    fn matches(&self, sample: &Sample) -> bool {
        let Some(actual) = sample.labels.get(&self.label) else {
            return false;
        };
        match (self.op, &self.re) {
            (LabelFilterOp::Equal, _) => actual == self.value,
            (LabelFilterOp::NotEqual, _) => actual != self.value,
            (LabelFilterOp::MatchRegexp, Some(re)) => re.is_match(actual),
            (LabelFilterOp::NotMatchRegexp, Some(re)) => !re.is_match(actual),
            (_, None) => false,
        }
    }
}

/// Splits flat `key, value, key, value...` arguments into filters.
fn parse_filters<S: AsRef<str>>(pairs: &[S], op: LabelFilterOp) -> AnalyzerResult<Vec<LabelFilter>> {
    if pairs.len() % 2 != 0 {
        return Err(AnalyzerError::OddLabelArguments(pairs.len()));
    }
    pairs
        .chunks_exact(2)
        .map(|kv| LabelFilter::new(kv[0].as_ref(), op, kv[1].as_ref()))
        .collect()
}

impl SampleFamily {
    /// Keeps samples for which every `key, value` pair holds under `op`.
    /// Returns `Empty` when nothing matches.
    pub fn match_labels<S: AsRef<str>>(&self, pairs: &[S], op: LabelFilterOp) -> AnalyzerResult<SampleFamily> {
        let filters = parse_filters(pairs, op)?;
        Ok(self.retain(|sample| filters.iter().all(|f| f.matches(sample))))
    }

    pub fn tag_equal<S: AsRef<str>>(&self, pairs: &[S]) -> AnalyzerResult<SampleFamily> {
        self.match_labels(pairs, LabelFilterOp::Equal)
    }

    pub fn tag_not_equal<S: AsRef<str>>(&self, pairs: &[S]) -> AnalyzerResult<SampleFamily> {
        self.match_labels(pairs, LabelFilterOp::NotEqual)
    }

    /// Patterns must match the whole label value.
    pub fn tag_match<S: AsRef<str>>(&self, pairs: &[S]) -> AnalyzerResult<SampleFamily> {
        self.match_labels(pairs, LabelFilterOp::MatchRegexp)
    }

    pub fn tag_not_match<S: AsRef<str>>(&self, pairs: &[S]) -> AnalyzerResult<SampleFamily> {
        self.match_labels(pairs, LabelFilterOp::NotMatchRegexp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueFilterOp {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl ValueFilterOp {
    pub fn apply(&self, value: f64, threshold: f64) -> bool {
        match self {
            ValueFilterOp::Equal => value == threshold,
            ValueFilterOp::NotEqual => value != threshold,
            ValueFilterOp::Greater => value > threshold,
            ValueFilterOp::GreaterEqual => value >= threshold,
            ValueFilterOp::Less => value < threshold,
            ValueFilterOp::LessEqual => value <= threshold,
        }
    }
}

impl SampleFamily {
    /// Keeps samples whose value compares true against `threshold`.
    pub fn filter_values(&self, op: ValueFilterOp, threshold: f64) -> SampleFamily {
        self.retain(|sample| op.apply(sample.value, threshold))
    }

    pub fn value_equal(&self, threshold: f64) -> SampleFamily {
        self.filter_values(ValueFilterOp::Equal, threshold)
    }

    pub fn value_not_equal(&self, threshold: f64) -> SampleFamily {
        self.filter_values(ValueFilterOp::NotEqual, threshold)
    }

    pub fn value_greater(&self, threshold: f64) -> SampleFamily {
        self.filter_values(ValueFilterOp::Greater, threshold)
    }

    pub fn value_greater_equal(&self, threshold: f64) -> SampleFamily {
        self.filter_values(ValueFilterOp::GreaterEqual, threshold)
    }

    pub fn value_less(&self, threshold: f64) -> SampleFamily {
        self.filter_values(ValueFilterOp::Less, threshold)
    }

    pub fn value_less_equal(&self, threshold: f64) -> SampleFamily {
        self.filter_values(ValueFilterOp::LessEqual, threshold)
    }
}

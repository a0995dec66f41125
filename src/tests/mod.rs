//! Shared builders for unit tests.


use crate::common::{LabelSet, Timestamp};
use crate::family::{Sample, SampleFamily};

pub const DEFAULT_TIMESTAMP: Timestamp = 1_700_000_000_000;

pub fn labels(pairs: &[(&str, &str)]) -> LabelSet {
    LabelSet::from_pairs(pairs)
}

pub fn sample(pairs: &[(&str, &str)], timestamp: Timestamp, value: f64) -> Sample {
    Sample::new(labels(pairs), timestamp, value)
}

/// One sample per entry, all stamped with [`DEFAULT_TIMESTAMP`].
pub fn family(series: Vec<(Vec<(&str, &str)>, f64)>) -> SampleFamily {
    family_at(
        series
            .into_iter()
            .map(|(pairs, value)| (pairs, DEFAULT_TIMESTAMP, value))
            .collect(),
    )
}

pub fn family_at(series: Vec<(Vec<(&str, &str)>, Timestamp, f64)>) -> SampleFamily {
    let samples = series
        .into_iter()
        .map(|(pairs, ts, value)| sample(&pairs, ts, value))
        .collect();
    SampleFamily::build(samples).expect("test families are never empty")
}

pub fn values(f: &SampleFamily) -> Vec<f64> {
    f.samples().iter().map(|s| s.value).collect()
}

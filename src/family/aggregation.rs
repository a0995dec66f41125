use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::common::{LabelSet, Timestamp};
use crate::family::{Sample, SampleFamily};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Max,
    Min,
    Count,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Sum => write!(f, "sum"),
            AggregateFunction::Avg => write!(f, "avg"),
            AggregateFunction::Max => write!(f, "max"),
            AggregateFunction::Min => write!(f, "min"),
            AggregateFunction::Count => write!(f, "count"),
        }
    }
}

/// Running state of one output group.
struct GroupState {
    labels: LabelSet,
    // timestamp of the first member in input order
    timestamp: Timestamp,
    sum: f64,
    min: f64,
    max: f64,
    count: usize,
}

impl GroupState {
    fn new(labels: LabelSet, first: &Sample) -> Self {
        GroupState {
            labels,
            timestamp: first.timestamp,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
        }
    }

    fn push(&mut self, value: f64) {
        self.sum += value;
        // NaN sticks, as it does for sum and avg
        if value.is_nan() || value < self.min {
            self.min = value;
        }
        if value.is_nan() || value > self.max {
            self.max = value;
        }
        self.count += 1;
    }

    fn finish(self, func: AggregateFunction) -> Sample {
        let value = match func {
            AggregateFunction::Sum => self.sum,
            AggregateFunction::Avg => self.sum / self.count as f64,
            AggregateFunction::Max => self.max,
            AggregateFunction::Min => self.min,
            AggregateFunction::Count => self.count as f64,
        };
        Sample::new(Arc::new(self.labels), self.timestamp, value)
    }
}

impl SampleFamily {
    /// Collapses samples into groups keyed by the projection of their labels onto
    /// `by`. Without `by` everything folds into a single sample with no labels.
    ///
    /// Groups are emitted in order of first appearance and each output sample
    /// carries the timestamp of its group's first member. A NaN member makes
    /// every aggregate but `Count` NaN.
    pub fn aggregate<S: AsRef<str>>(&self, func: AggregateFunction, by: Option<&[S]>) -> SampleFamily {
        let SampleFamily::Populated(family) = self else {
            return SampleFamily::Empty;
        };

        let mut groups: Vec<GroupState> = Vec::new();
        let mut positions: AHashMap<LabelSet, usize> = AHashMap::new();
        for sample in family.samples() {
            let key = match by {
                Some(names) => sample.labels.project(names),
                None => LabelSet::empty(),
            };
            let idx = match positions.get(&key) {
                Some(&idx) => idx,
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push(GroupState::new(key, sample));
                    groups.len() - 1
                }
            };
            groups[idx].push(sample.value);
        }

        let samples = groups.into_iter().map(|g| g.finish(func)).collect();
        SampleFamily::from_parts(family.context().clone(), samples)
    }

    pub fn sum<S: AsRef<str>>(&self, by: Option<&[S]>) -> SampleFamily {
        self.aggregate(AggregateFunction::Sum, by)
    }

    pub fn avg<S: AsRef<str>>(&self, by: Option<&[S]>) -> SampleFamily {
        self.aggregate(AggregateFunction::Avg, by)
    }

    pub fn max<S: AsRef<str>>(&self, by: Option<&[S]>) -> SampleFamily {
        self.aggregate(AggregateFunction::Max, by)
    }

    pub fn min<S: AsRef<str>>(&self, by: Option<&[S]>) -> SampleFamily {
        self.aggregate(AggregateFunction::Min, by)
    }

    pub fn count<S: AsRef<str>>(&self, by: Option<&[S]>) -> SampleFamily {
        self.aggregate(AggregateFunction::Count, by)
    }
}

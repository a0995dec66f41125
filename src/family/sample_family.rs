use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::family::{Context, DownsamplingType, Sample};

/// Non-empty samples of one evaluation step plus their context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FamilyRepr")]
pub struct Family {
    samples: Arc<[Sample]>,
    context: Context,
}

#[derive(Deserialize)]
struct FamilyRepr {
    samples: Vec<Sample>,
    #[serde(default)]
    context: Context,
}

impl TryFrom<FamilyRepr> for Family {
    type Error = AnalyzerError;

    fn try_from(repr: FamilyRepr) -> Result<Self, Self::Error> {
        if repr.samples.is_empty() {
            return Err(AnalyzerError::EmptySampleFamily);
        }
        Ok(Family {
            samples: repr.samples.into(),
            context: repr.context,
        })
    }
}

impl Family {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The series produced by one evaluation step of a metric expression.
///
/// `Empty` stands for "no data" and is distinct from a family whose samples
/// all happen to be zero. A `Populated` family always holds at least one
/// sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "family", rename_all = "lowercase")]
pub enum SampleFamily {
    #[default]
    Empty,
    Populated(Family),
}

impl SampleFamily {
    /// Builds a family with a default context. At least one sample is required.
    pub fn build(samples: Vec<Sample>) -> AnalyzerResult<SampleFamily> {
        Self::build_with_context(Context::default(), samples)
    }

    pub fn build_with_context(context: Context, samples: Vec<Sample>) -> AnalyzerResult<SampleFamily> {
        if samples.is_empty() {
            return Err(AnalyzerError::EmptySampleFamily);
        }
        Ok(Self::from_parts(context, samples))
    }

    /// Builds a histogram family. At least one sample is required.
    pub fn build_histogram(context: Context, samples: Vec<Sample>) -> AnalyzerResult<SampleFamily> {
        Self::build_with_context(
            Context {
                is_histogram: true,
                ..context
            },
            samples,
        )
    }

    /// Operator results: no samples means `Empty`.
    pub(crate) fn from_parts(context: Context, samples: Vec<Sample>) -> SampleFamily {
        if samples.is_empty() {
            return SampleFamily::Empty;
        }
        SampleFamily::Populated(Family {
            samples: samples.into(),
            context,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SampleFamily::Empty)
    }

    /// Samples in evaluation order; `Empty` yields an empty slice.
    pub fn samples(&self) -> &[Sample] {
        match self {
            SampleFamily::Empty => &[],
            SampleFamily::Populated(family) => family.samples(),
        }
    }

    pub fn context(&self) -> Option<&Context> {
        match self {
            SampleFamily::Empty => None,
            SampleFamily::Populated(family) => Some(family.context()),
        }
    }

    pub fn len(&self) -> usize {
        self.samples().len()
    }

    pub fn is_histogram(&self) -> bool {
        self.context().map_or(false, |ctx| ctx.is_histogram)
    }

    /// Replaces every value with `f(value)`, keeping labels and timestamps.
    pub(crate) fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> SampleFamily {
        match self {
            SampleFamily::Empty => SampleFamily::Empty,
            SampleFamily::Populated(family) => {
                let samples = family
                    .samples
                    .iter()
                    .map(|s| s.with_value(f(s.value)))
                    .collect();
                Self::from_parts(family.context.clone(), samples)
            }
        }
    }

    /// Keeps the samples satisfying `predicate`.
    pub(crate) fn retain<F: Fn(&Sample) -> bool>(&self, predicate: F) -> SampleFamily {
        match self {
            SampleFamily::Empty => SampleFamily::Empty,
            SampleFamily::Populated(family) => {
                let samples = family
                    .samples
                    .iter()
                    .filter(|s| predicate(s))
                    .cloned()
                    .collect();
                Self::from_parts(family.context.clone(), samples)
            }
        }
    }

    /// Same samples under a new context.
    pub(crate) fn with_context(&self, context: Context) -> SampleFamily {
        match self {
            SampleFamily::Empty => SampleFamily::Empty,
            SampleFamily::Populated(family) => SampleFamily::Populated(Family {
                samples: Arc::clone(&family.samples),
                context,
            }),
        }
    }

    /// Sets the downsampling policy the consumer should apply.
    pub fn downsampling(&self, downsampling: DownsamplingType) -> SampleFamily {
        match self.context() {
            None => SampleFamily::Empty,
            Some(ctx) => self.with_context(Context {
                downsampling,
                ..ctx.clone()
            }),
        }
    }
}

impl From<Family> for SampleFamily {
    fn from(family: Family) -> Self {
        SampleFamily::Populated(family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::LabelSet;

    fn sample(value: f64) -> Sample {
        Sample::new(LabelSet::from_pairs(&[("a", "1")]), 1_000, value)
    }

    #[test]
    fn test_build_rejects_empty() {
        assert_eq!(SampleFamily::build(vec![]), Err(AnalyzerError::EmptySampleFamily));
        assert_eq!(
            SampleFamily::build_histogram(Context::default(), vec![]),
            Err(AnalyzerError::EmptySampleFamily)
        );
    }

    #[test]
    fn test_empty_is_distinct_from_zero_valued() {
        let zero = SampleFamily::build(vec![sample(0.0)]).unwrap();
        assert!(!zero.is_empty());
        assert_ne!(zero, SampleFamily::Empty);
        assert!(SampleFamily::Empty.samples().is_empty());
        assert_eq!(SampleFamily::Empty.context(), None);
    }

    #[test]
    fn test_build_histogram_sets_flag() {
        let family = SampleFamily::build_histogram(Context::default(), vec![sample(1.0)]).unwrap();
        assert!(family.is_histogram());
        assert!(!SampleFamily::build(vec![sample(1.0)]).unwrap().is_histogram());
    }

    #[test]
    fn test_downsampling_updates_context_only() {
        let family = SampleFamily::build(vec![sample(3.0)]).unwrap();
        let latest = family.downsampling(DownsamplingType::Latest);
        assert_eq!(latest.context().unwrap().downsampling, DownsamplingType::Latest);
        assert_eq!(latest.samples(), family.samples());
        assert_eq!(family.context().unwrap().downsampling, DownsamplingType::Avg);
        assert!(SampleFamily::Empty.downsampling(DownsamplingType::Sum).is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(SampleFamily::Empty).unwrap();
        assert_eq!(json["kind"], "empty");
        let family = SampleFamily::build(vec![sample(2.0)]).unwrap();
        let json = serde_json::to_value(&family).unwrap();
        assert_eq!(json["kind"], "populated");
        assert_eq!(json["family"]["samples"][0]["labels"]["a"], "1");
        let back: SampleFamily = serde_json::from_value(json).unwrap();
        assert_eq!(back, family);

        let hollow = serde_json::json!({"kind": "populated", "family": {"samples": []}});
        assert!(serde_json::from_value::<SampleFamily>(hollow).is_err());
    }
}

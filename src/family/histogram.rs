use ahash::AHashMap;
use tracing::trace;

use crate::common::{LabelSet, TimeUnit};
use crate::config::get_global_settings;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::family::{Context, Sample, SampleFamily};

fn parse_bound(value: &str) -> AnalyzerResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(bound) if !bound.is_nan() => Ok(bound),
        _ => Err(AnalyzerError::InvalidBucketBound(value.to_string())),
    }
}

/// Bound label value for an interval edge, in whole units of the target scale.
fn format_bound(bound: f64, scale: i64) -> String {
    ((bound * scale as f64) as i64).to_string()
}

impl SampleFamily {
    /// De-accumulates cumulative buckets using the configured bound label and unit.
    pub fn histogram(&self) -> AnalyzerResult<SampleFamily> {
        let settings = get_global_settings();
        self.histogram_with(&settings.histogram_bound_label, settings.histogram_time_unit)
    }

    /// Turns cumulative bucket counts into per-bucket counts.
    ///
    /// Samples without `bound_label` are ignored. The rest are split into
    /// independent histograms by their remaining labels; within each, buckets are
    /// walked in ascending bound order and every output sample holds
    /// `count - previous count`, labelled with the *previous* bucket's bound
    /// (the lower edge of the interval) scaled to milliseconds of `unit`.
    pub fn histogram_with(&self, bound_label: &str, unit: TimeUnit) -> AnalyzerResult<SampleFamily> {
        let scale = unit.to_millis();
        if scale <= 0 {
            return Err(AnalyzerError::InvalidTimeUnit(format!(
                "{unit} is finer than one millisecond"
            )));
        }
        let SampleFamily::Populated(family) = self else {
            return Ok(SampleFamily::Empty);
        };

        // histograms in first-seen order, buckets in input order
        let mut histograms: Vec<(LabelSet, Vec<(f64, &Sample)>)> = Vec::new();
        let mut positions: AHashMap<LabelSet, usize> = AHashMap::new();
        let mut ignored = 0usize;
        for sample in family.samples() {
            let Some(raw) = sample.labels.get(bound_label) else {
                ignored += 1;
                continue;
            };
            let bound = parse_bound(raw)?;
            let series = sample.labels.without(bound_label);
            let idx = match positions.get(&series) {
                Some(&idx) => idx,
                None => {
                    positions.insert(series.clone(), histograms.len());
                    histograms.push((series, Vec::new()));
                    histograms.len() - 1
                }
            };
            histograms[idx].1.push((bound, sample));
        }
        if ignored > 0 {
            trace!(ignored, bound_label, "samples without a bucket bound were ignored");
        }

        let mut samples = Vec::with_capacity(family.len() - ignored);
        for (series, mut buckets) in histograms {
            buckets.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut previous_count = 0.0;
            let mut previous_bound = 0.0;
            for (bound, sample) in buckets {
                let labels = series.with_label(bound_label, &format_bound(previous_bound, scale));
                samples.push(Sample::new(labels, sample.timestamp, sample.value - previous_count));
                previous_count = sample.value;
                previous_bound = bound;
            }
        }

        let context = Context {
            is_histogram: true,
            ..family.context().clone()
        };
        Ok(SampleFamily::from_parts(context, samples))
    }

    /// Attaches the percentile ranks a downstream consumer should compute.
    /// No percentile values are computed here.
    pub fn histogram_percentile(&self, ranks: &[i32]) -> AnalyzerResult<SampleFamily> {
        if let Some(&bad) = ranks.iter().find(|r| !(0..=100).contains(*r)) {
            return Err(AnalyzerError::InvalidPercentile(bad));
        }
        match self.context() {
            None => Ok(SampleFamily::Empty),
            Some(ctx) if !ctx.is_histogram => Err(AnalyzerError::NotHistogram),
            Some(ctx) => Ok(self.with_context(Context {
                percentiles: Some(ranks.to_vec()),
                ..ctx.clone()
            })),
        }
    }
}

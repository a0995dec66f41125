use tracing::debug;

use crate::common::parse::parse_range;
use crate::common::Timestamp;
use crate::error::AnalyzerResult;
use crate::family::{Sample, SampleFamily};
use crate::lookback::{Lookback, LookbackMissPolicy, LookbackPoint, LookbackQuery};

/// `irate` always looks back exactly this far.
pub const IRATE_WINDOW_MILLIS: i64 = 1_000;

/// Elapsed time below which a rate is reported as 0.
const MIN_RATE_INTERVAL_MILLIS: i64 = 1_000;

fn counter_increase(current: &Sample, lower: &LookbackPoint) -> f64 {
    current.value - lower.value
}

fn per_second_rate(current: &Sample, lower: &LookbackPoint) -> f64 {
    let elapsed = current.timestamp - lower.timestamp;
    if elapsed < MIN_RATE_INTERVAL_MILLIS {
        return 0.0;
    }
    (current.value - lower.value) / (elapsed as f64 / 1_000.0)
}

impl SampleFamily {
    /// Raw delta against the value `range` ago. A counter that went down yields
    /// a negative increase.
    pub fn increase(&self, range: &str, lookback: &Lookback<'_>) -> AnalyzerResult<SampleFamily> {
        let window = range_millis(range)?;
        self.with_lookback(window, lookback, counter_increase)
    }

    /// Per-second average rate of change over `range`.
    pub fn rate(&self, range: &str, lookback: &Lookback<'_>) -> AnalyzerResult<SampleFamily> {
        let window = range_millis(range)?;
        self.with_lookback(window, lookback, per_second_rate)
    }

    /// Per-second rate over a fixed one second lookback.
    pub fn irate(&self, lookback: &Lookback<'_>) -> AnalyzerResult<SampleFamily> {
        self.with_lookback(IRATE_WINDOW_MILLIS, lookback, per_second_rate)
    }

    /// Resolves a baseline for every sample in one batch, then computes `f(current, baseline)`.
    fn with_lookback<F>(&self, window: i64, lookback: &Lookback<'_>, f: F) -> AnalyzerResult<SampleFamily>
    where
        F: Fn(&Sample, &LookbackPoint) -> f64,
    {
        let SampleFamily::Populated(family) = self else {
            return Ok(SampleFamily::Empty);
        };

        let queries: Vec<LookbackQuery> = family
            .samples()
            .iter()
            .map(|s| LookbackQuery::new(s.labels.as_ref().clone(), lookback_instant(s.timestamp, window)))
            .collect();
        let answers = lookback.resolve(&queries)?;

        let policy = lookback.miss_policy();
        let mut misses = 0usize;
        let mut samples = Vec::with_capacity(family.len());
        for ((sample, query), answer) in family.samples().iter().zip(&queries).zip(answers) {
            let baseline = match answer {
                Some(point) => point,
                None => {
                    misses += 1;
                    match policy {
                        LookbackMissPolicy::CurrentSample => LookbackPoint::new(sample.timestamp, sample.value),
                        LookbackMissPolicy::ZeroBaseline => LookbackPoint::new(query.timestamp, 0.0),
                        LookbackMissPolicy::Skip => continue,
                    }
                }
            };
            samples.push(sample.with_value(f(sample, &baseline)));
        }

        if misses > 0 {
            debug!(misses, window, policy = policy.as_str(), "no lookback baseline for some series");
        }
        Ok(SampleFamily::from_parts(family.context().clone(), samples))
    }
}

fn range_millis(range: &str) -> AnalyzerResult<i64> {
    let duration = parse_range(range)?;
    Ok(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
}

fn lookback_instant(timestamp: Timestamp, window: i64) -> Timestamp {
    timestamp.saturating_sub(window)
}

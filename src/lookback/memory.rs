use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::AHashMap;
use rayon::prelude::*;

use crate::common::{LabelSet, Timestamp};
use crate::error::AnalyzerResult;
use crate::family::SampleFamily;
use crate::lookback::{LookbackPoint, LookbackQuery, LookbackResolver};

/// In-process lookback store keeping every recorded point per series.
#[derive(Default)]
pub struct MemoryLookback {
    series: RwLock<AHashMap<LabelSet, Vec<LookbackPoint>>>,
}

impl MemoryLookback {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, AHashMap<LabelSet, Vec<LookbackPoint>>> {
        self.series.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AHashMap<LabelSet, Vec<LookbackPoint>>> {
        self.series.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Records a point. A point at an already recorded timestamp replaces it.
    pub fn record(&self, labels: LabelSet, timestamp: Timestamp, value: f64) {
        let mut series = self.write();
        insert_point(series.entry(labels).or_default(), LookbackPoint::new(timestamp, value));
    }

    /// Records every sample of `family`.
    pub fn record_family(&self, family: &SampleFamily) {
        let mut series = self.write();
        for sample in family.samples() {
            let points = series.entry(sample.labels.as_ref().clone()).or_default();
            insert_point(points, LookbackPoint::new(sample.timestamp, sample.value));
        }
    }

    /// Drops points recorded strictly before `timestamp`.
    pub fn evict_before(&self, timestamp: Timestamp) {
        let mut series = self.write();
        series.retain(|_, points| {
            let cut = points.partition_point(|p| p.timestamp < timestamp);
            points.drain(..cut);
            !points.is_empty()
        });
    }

    pub fn series_count(&self) -> usize {
        self.read().len()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn find(series: &AHashMap<LabelSet, Vec<LookbackPoint>>, labels: &LabelSet, timestamp: Timestamp) -> Option<LookbackPoint> {
        let points = series.get(labels)?;
        let idx = points.partition_point(|p| p.timestamp <= timestamp);
        if idx == 0 {
            return None;
        }
        Some(points[idx - 1])
    }
}

/// Keeps `points` sorted by timestamp; a point at an existing timestamp replaces it.
fn insert_point(points: &mut Vec<LookbackPoint>, point: LookbackPoint) {
    match points.binary_search_by_key(&point.timestamp, |p| p.timestamp) {
        Ok(idx) => points[idx] = point,
        Err(idx) => points.insert(idx, point),
    }
}

impl LookbackResolver for MemoryLookback {
    fn lookup(&self, labels: &LabelSet, timestamp: Timestamp) -> AnalyzerResult<Option<LookbackPoint>> {
        Ok(Self::find(&self.read(), labels, timestamp))
    }

    fn lookup_batch(&self, queries: &[LookbackQuery]) -> AnalyzerResult<Vec<Option<LookbackPoint>>> {
        let series = self.read();
        let answers = queries
            .par_iter()
            .map(|q| Self::find(&series, &q.labels, q.timestamp))
            .collect();
        Ok(answers)
    }
}

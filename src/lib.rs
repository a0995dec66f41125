//! Label-aware arithmetic over families of metric samples.
//!
//! A [`SampleFamily`] is an immutable snapshot of samples sharing one metric
//! name. Every operator returns a new family and leaves its inputs untouched.
//! Operators that need history (`increase`, `rate`, `irate`) read it through a
//! caller-supplied [`LookbackResolver`].

pub mod common;
pub mod config;
pub mod error;
pub mod family;
pub mod lookback;

#[cfg(test)]
mod tests;

pub use common::{Label, LabelMap, LabelSet, TimeUnit, Timestamp};
pub use config::{get_global_settings, init_global_settings, Settings};
pub use error::{AnalyzerError, AnalyzerResult, ErrorKind};
pub use family::*;
pub use lookback::{
    Lookback, LookbackMissPolicy, LookbackPoint, LookbackQuery, LookbackResolver, MemoryLookback,
};

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::common::regex_util::DEFAULT_CACHE_SIZE;
use crate::common::{TimeUnit, BUCKET_LABEL};
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::lookback::LookbackMissPolicy;

pub const ENV_LOOKBACK_MISS_POLICY: &str = "METER_ANALYZER_LOOKBACK_MISS_POLICY";
pub const ENV_HISTOGRAM_BOUND_LABEL: &str = "METER_ANALYZER_HISTOGRAM_BOUND_LABEL";
pub const ENV_HISTOGRAM_TIME_UNIT: &str = "METER_ANALYZER_HISTOGRAM_TIME_UNIT";
pub const ENV_REGEX_CACHE_SIZE: &str = "METER_ANALYZER_REGEX_CACHE_SIZE";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// What `increase`/`rate`/`irate` do when a series has no baseline.
    pub lookback_miss_policy: LookbackMissPolicy,

    /// Label carrying bucket upper bounds for `histogram()`.
    pub histogram_bound_label: String,

    /// Unit the bucket bounds are expressed in. Output bounds are milliseconds.
    pub histogram_time_unit: TimeUnit,

    /// max number of compiled label-filter patterns kept around
    pub regex_cache_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lookback_miss_policy: LookbackMissPolicy::default(),
            histogram_bound_label: BUCKET_LABEL.to_string(),
            histogram_time_unit: TimeUnit::Seconds,
            regex_cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl Settings {
    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> AnalyzerResult<Settings> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults overridden by whatever `METER_ANALYZER_*` variables are set.
    pub fn from_env() -> Settings {
        Settings::default().with_env_overrides()
    }

    /// Unset or unparseable variables leave the current value in place.
    pub fn with_env_overrides(mut self) -> Settings {
        if let Some(policy) = get_setting_from_env(ENV_LOOKBACK_MISS_POLICY) {
            self.lookback_miss_policy = policy;
        }
        if let Some(label) = get_setting_from_env::<String>(ENV_HISTOGRAM_BOUND_LABEL) {
            if !label.is_empty() {
                self.histogram_bound_label = label;
            }
        }
        if let Some(unit) = get_setting_from_env(ENV_HISTOGRAM_TIME_UNIT) {
            self.histogram_time_unit = unit;
        }
        if let Some(size) = get_setting_from_env::<usize>(ENV_REGEX_CACHE_SIZE) {
            if size > 0 {
                self.regex_cache_size = size;
            }
        }
        self
    }

    pub fn validate(&self) -> AnalyzerResult<()> {
        if self.histogram_bound_label.is_empty() {
            return Err(AnalyzerError::InvalidConfiguration(
                "histogram_bound_label must not be empty".to_string(),
            ));
        }
        if self.regex_cache_size == 0 {
            return Err(AnalyzerError::InvalidConfiguration(
                "regex_cache_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

static GLOBAL_SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Process-wide settings. Falls back to [`Settings::from_env`] on first use
/// if [`init_global_settings`] was never called.
pub fn get_global_settings() -> &'static Settings {
    GLOBAL_SETTINGS.get_or_init(Settings::from_env)
}

/// Installs the process-wide settings. Fails once they have been set or read.
pub fn init_global_settings(settings: Settings) -> AnalyzerResult<()> {
    settings.validate()?;
    GLOBAL_SETTINGS.set(settings).map_err(|_| {
        AnalyzerError::InvalidConfiguration("global settings are already initialized".to_string())
    })
}

fn get_setting_from_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
}

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

/// Rule the storage backend applies when compacting points into a reporting interval.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownsamplingType {
    #[default]
    Avg,
    Sum,
    Latest,
    SumPerMin,
    Max,
    Min,
}

impl Display for DownsamplingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownsamplingType::Avg => write!(f, "AVG"),
            DownsamplingType::Sum => write!(f, "SUM"),
            DownsamplingType::Latest => write!(f, "LATEST"),
            DownsamplingType::SumPerMin => write!(f, "SUM_PER_MIN"),
            DownsamplingType::Max => write!(f, "MAX"),
            DownsamplingType::Min => write!(f, "MIN"),
        }
    }
}

impl FromStr for DownsamplingType {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AVG" => Ok(DownsamplingType::Avg),
            "SUM" => Ok(DownsamplingType::Sum),
            "LATEST" => Ok(DownsamplingType::Latest),
            "SUM_PER_MIN" => Ok(DownsamplingType::SumPerMin),
            "MAX" => Ok(DownsamplingType::Max),
            "MIN" => Ok(DownsamplingType::Min),
            _ => Err(AnalyzerError::InvalidConfiguration(format!(
                "unknown downsampling type: {s}"
            ))),
        }
    }
}

/// Metadata travelling with a family to the downstream consumer.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub is_histogram: bool,
    /// percentile ranks (0..=100) to compute from the bucket deltas
    pub percentiles: Option<Vec<i32>>,
    pub downsampling: DownsamplingType,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn histogram() -> Self {
        Context {
            is_histogram: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsampling_parse_and_display() {
        for kind in [
            DownsamplingType::Avg,
            DownsamplingType::Sum,
            DownsamplingType::Latest,
            DownsamplingType::SumPerMin,
            DownsamplingType::Max,
            DownsamplingType::Min,
        ] {
            assert_eq!(kind.to_string().parse::<DownsamplingType>().unwrap(), kind);
        }
        assert_eq!("latest".parse::<DownsamplingType>().unwrap(), DownsamplingType::Latest);
        assert!("median".parse::<DownsamplingType>().is_err());
    }

    #[test]
    fn test_context_serializes_for_consumers() {
        let ctx = Context {
            is_histogram: true,
            percentiles: Some(vec![50, 99]),
            downsampling: DownsamplingType::SumPerMin,
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["downsampling"], "SUM_PER_MIN");
        assert_eq!(json["percentiles"][1], 99);
        let back: Context = serde_json::from_value(json).unwrap();
        assert_eq!(back, ctx);
    }
}

use std::fmt;

use thiserror::Error;

/// Broad classification of [`AnalyzerError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An argument or a family violated an operator precondition.
    Validation,
    /// A textual argument (duration, bucket bound, pattern) could not be parsed.
    Parse,
    /// The lookback resolver failed.
    Lookback,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "ValidationError"),
            ErrorKind::Parse => write!(f, "ParseError"),
            ErrorKind::Lookback => write!(f, "LookbackError"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/// Enum for the errors raised while evaluating sample families.
pub enum AnalyzerError {
    #[error("Invalid label arguments. Expected key/value pairs, received {0} arguments.")]
    OddLabelArguments(usize),

    #[error("Sample family requires at least one sample.")]
    EmptySampleFamily,

    #[error("Invalid duration. {0}")]
    InvalidDuration(String),

    #[error("Duration must be positive. {0}")]
    NonPositiveDuration(String),

    #[error("Invalid bucket bound. {0}")]
    InvalidBucketBound(String),

    #[error("Sample family is not a histogram.")]
    NotHistogram,

    #[error("Invalid percentile rank {0}. Expected a value between 0 and 100.")]
    InvalidPercentile(i32),

    #[error("Invalid regex. {0}")]
    InvalidRegex(String),

    #[error("Invalid time unit. {0}")]
    InvalidTimeUnit(String),

    #[error("Invalid configuration. {0}")]
    InvalidConfiguration(String),

    #[error("Lookback failed. {0}")]
    Lookback(String),
}

impl AnalyzerError {
    pub fn kind(&self) -> ErrorKind {
        use AnalyzerError::*;
        match self {
            InvalidDuration(_) | InvalidBucketBound(_) | InvalidRegex(_) => ErrorKind::Parse,
            Lookback(_) => ErrorKind::Lookback,
            OddLabelArguments(_)
            | EmptySampleFamily
            | NonPositiveDuration(_)
            | NotHistogram
            | InvalidPercentile(_)
            | InvalidTimeUnit(_)
            | InvalidConfiguration(_) => ErrorKind::Validation,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_parse(&self) -> bool {
        self.kind() == ErrorKind::Parse
    }
}

impl From<regex::Error> for AnalyzerError {
    fn from(err: regex::Error) -> Self {
        AnalyzerError::InvalidRegex(err.to_string())
    }
}

impl From<serde_json::Error> for AnalyzerError {
    fn from(err: serde_json::Error) -> Self {
        AnalyzerError::InvalidConfiguration(err.to_string())
    }
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

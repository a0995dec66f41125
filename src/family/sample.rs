use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::common::{LabelSet, Timestamp};

/// One data point of one series. Operators never mutate a Sample; they build new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Timestamp,
    #[serde(with = "sample_value")]
    pub value: f64,
    pub labels: Arc<LabelSet>,
}

impl Sample {
    pub fn new<L: Into<Arc<LabelSet>>>(labels: L, timestamp: Timestamp, value: f64) -> Self {
        Sample {
            timestamp,
            value,
            labels: labels.into(),
        }
    }

    /// Same series and timestamp with a new value. Labels are shared, not copied.
    pub fn with_value(&self, value: f64) -> Sample {
        Sample {
            timestamp: self.timestamp,
            value,
            labels: Arc::clone(&self.labels),
        }
    }

    pub fn with_labels<L: Into<Arc<LabelSet>>>(&self, labels: L) -> Sample {
        Sample {
            timestamp: self.timestamp,
            value: self.value,
            labels: labels.into(),
        }
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name)
    }
}

/// JSON has no literal for non-finite numbers. They travel as the strings
/// `"+Inf"`, `"-Inf"` and `"NaN"`; finite values stay plain numbers.
mod sample_value {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if *value == f64::INFINITY {
            serializer.serialize_str("+Inf")
        } else if *value == f64::NEG_INFINITY {
            serializer.serialize_str("-Inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawValue {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match RawValue::deserialize(deserializer)? {
            RawValue::Number(value) => Ok(value),
            RawValue::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "+Inf" | "Inf" => Ok(f64::INFINITY),
                "-Inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid sample value: {other}"))),
            },
        }
    }
}

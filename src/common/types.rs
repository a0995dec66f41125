use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Milliseconds since the unix epoch.
pub type Timestamp = i64;

/// Mutable label mapping handed to label rewrites.
pub type LabelMap = AHashMap<String, String>;

/// Label is a key/value pair of strings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Label {
            name: name.into(),
            value: value.into(),
        }
    }
}

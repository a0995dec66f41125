use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::types::{Label, LabelMap};

/// Well-known label carrying the upper bound of a cumulative histogram bucket.
pub const BUCKET_LABEL: &str = "le";

/// LabelSet identifies one time series within a family.
///
/// Labels are kept sorted by name and names are unique, so two sets built from
/// the same pairs in any order compare, hash and order identically.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "LabelMap", into = "LabelMap")]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    pub fn empty() -> Self {
        LabelSet { labels: Vec::new() }
    }

    /// Returns a sorted LabelSet from the given labels. When a name repeats,
    /// the last occurrence wins.
    pub fn new(mut labels: Vec<Label>) -> Self {
        // stable sort keeps insertion order among equal names
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        let mut deduped: Vec<Label> = Vec::with_capacity(labels.len());
        for label in labels {
            match deduped.last_mut() {
                Some(last) if last.name == label.name => *last = label,
                _ => deduped.push(label),
            }
        }
        LabelSet { labels: deduped }
    }

    /// Creates labels from name/value pairs.
    pub fn from_pairs<N: AsRef<str>, V: AsRef<str>>(pairs: &[(N, V)]) -> Self {
        pairs
            .iter()
            .map(|(n, v)| (n.as_ref(), v.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.labels
            .binary_search_by(|l| l.name.as_str().cmp(name))
    }

    /// returns the value for the label with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .ok()
            .map(|idx| self.labels[idx].value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn as_slice(&self) -> &[Label] {
        &self.labels
    }

    /// Projects the set onto exactly `names`. Names the set lacks map to the
    /// empty string.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> LabelSet {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                (name, self.get(name).unwrap_or_default())
            })
            .collect()
    }

    /// Returns a copy of the set without the label `name`.
    pub fn without(&self, name: &str) -> LabelSet {
        let labels = self
            .labels
            .iter()
            .filter(|l| l.name != name)
            .cloned()
            .collect();
        LabelSet { labels }
    }

    /// Returns a copy of the set with `name` added or overwritten.
    pub fn with_label(&self, name: &str, value: &str) -> LabelSet {
        let mut labels = self.labels.clone();
        match self.position(name) {
            Ok(idx) => labels[idx].value = value.to_string(),
            Err(idx) => labels.insert(idx, Label::new(name, value)),
        }
        LabelSet { labels }
    }

    /// Returns a mutable copy of the labels as a map.
    pub fn to_map(&self) -> LabelMap {
        self.labels
            .iter()
            .map(|l| (l.name.clone(), l.value.clone()))
            .collect()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for LabelSet {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let labels = iter
            .into_iter()
            .map(|(n, v)| Label::new(n, v))
            .collect();
        LabelSet::new(labels)
    }
}

impl From<LabelMap> for LabelSet {
    fn from(map: LabelMap) -> Self {
        map.into_iter().collect()
    }
}

impl From<LabelSet> for LabelMap {
    fn from(labels: LabelSet) -> Self {
        labels
            .labels
            .into_iter()
            .map(|l| (l.name, l.value))
            .collect()
    }
}

impl From<Vec<Label>> for LabelSet {
    fn from(labels: Vec<Label>) -> Self {
        LabelSet::new(labels)
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:?}", label.name, label.value)?;
        }
        write!(f, "}}")
    }
}

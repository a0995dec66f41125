use serde::{Deserialize, Serialize};

use crate::common::regex_util::get_regexp_cache;
use crate::common::{LabelMap, LabelSet};
use crate::error::AnalyzerResult;
use crate::family::SampleFamily;

/// Caller supplied label rewrite, applied to one sample at a time.
///
/// `rewrite` receives a private mutable copy of the sample's labels. Returning
/// `Some(map)` replaces the labels with `map`; returning `None` keeps whatever
/// the copy was edited into.
pub trait LabelRewrite: Send + Sync {
    fn rewrite(&self, labels: &mut LabelMap) -> AnalyzerResult<Option<LabelMap>>;
}

/// Adapts an infallible closure to [`LabelRewrite`].
pub struct FnRewrite<F>(pub F);

impl<F> LabelRewrite for FnRewrite<F>
where
    F: Fn(&mut LabelMap) -> Option<LabelMap> + Send + Sync,
{
    fn rewrite(&self, labels: &mut LabelMap) -> AnalyzerResult<Option<LabelMap>> {
        Ok((self.0)(labels))
    }
}

/// Declarative label edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TagInstruction {
    /// sets `key` to `value`
    Set { key: String, value: String },
    /// drops `key`
    Remove { key: String },
    /// moves the value of `from` to `to`; no-op when `from` is absent
    Rename { from: String, to: String },
    /// copies the value of `from` to `to`; no-op when `from` is absent
    Copy { from: String, to: String },
    /// when `regex` fully matches the value of `source`, stores the expanded
    /// `replacement` (`$1`, `${name}`) at `target`
    Replace {
        source: String,
        regex: String,
        replacement: String,
        target: String,
    },
}

impl TagInstruction {
    pub fn set(key: &str, value: &str) -> Self {
        TagInstruction::Set {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn remove(key: &str) -> Self {
        TagInstruction::Remove { key: key.to_string() }
    }

    pub fn rename(from: &str, to: &str) -> Self {
        TagInstruction::Rename {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn copy(from: &str, to: &str) -> Self {
        TagInstruction::Copy {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn replace(source: &str, regex: &str, replacement: &str, target: &str) -> Self {
        TagInstruction::Replace {
            source: source.to_string(),
            regex: regex.to_string(),
            replacement: replacement.to_string(),
            target: target.to_string(),
        }
    }

    fn apply(&self, labels: &mut LabelMap) -> AnalyzerResult<()> {
        match self {
            TagInstruction::Set { key, value } => {
                labels.insert(key.clone(), value.clone());
            }
            TagInstruction::Remove { key } => {
                labels.remove(key);
            }
            TagInstruction::Rename { from, to } => {
                if let Some(value) = labels.remove(from) {
                    labels.insert(to.clone(), value);
                }
            }
            TagInstruction::Copy { from, to } => {
                if let Some(value) = labels.get(from).cloned() {
                    labels.insert(to.clone(), value);
                }
            }
            TagInstruction::Replace {
                source,
                regex,
                replacement,
                target,
            } => {
                let re = get_regexp_cache().get_or_compile(regex)?;
                let value = labels.get(source).map(String::as_str).unwrap_or_default();
                if let Some(captures) = re.captures(value) {
                    let mut expanded = String::new();
                    captures.expand(replacement, &mut expanded);
                    labels.insert(target.clone(), expanded);
                }
            }
        }
        Ok(())
    }
}

impl LabelRewrite for TagInstruction {
    fn rewrite(&self, labels: &mut LabelMap) -> AnalyzerResult<Option<LabelMap>> {
        self.apply(labels)?;
        Ok(None)
    }
}

/// Instructions applied in order to the same label copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewriteChain(pub Vec<TagInstruction>);

impl RewriteChain {
    pub fn new(instructions: Vec<TagInstruction>) -> Self {
        RewriteChain(instructions)
    }
}

impl LabelRewrite for RewriteChain {
    fn rewrite(&self, labels: &mut LabelMap) -> AnalyzerResult<Option<LabelMap>> {
        for instruction in &self.0 {
            instruction.apply(labels)?;
        }
        Ok(None)
    }
}

impl SampleFamily {
    /// Rewrites every sample's labels. Values and timestamps are kept, and the
    /// input family is left untouched.
    pub fn tag<R: LabelRewrite + ?Sized>(&self, rewrite: &R) -> AnalyzerResult<SampleFamily> {
        let SampleFamily::Populated(family) = self else {
            return Ok(SampleFamily::Empty);
        };
        let samples = family
            .samples()
            .iter()
            .map(|sample| {
                let mut copy = sample.labels.to_map();
                let labels = match rewrite.rewrite(&mut copy)? {
                    Some(replacement) => replacement,
                    None => copy,
                };
                Ok(sample.with_labels(LabelSet::from(labels)))
            })
            .collect::<AnalyzerResult<Vec<_>>>()?;
        Ok(SampleFamily::from_parts(family.context().clone(), samples))
    }

    /// [`tag`](Self::tag) for a plain closure.
    pub fn tag_with<F>(&self, f: F) -> AnalyzerResult<SampleFamily>
    where
        F: Fn(&mut LabelMap) -> Option<LabelMap> + Send + Sync,
    {
        self.tag(&FnRewrite(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyzerError;
    use crate::tests::{family, labels, values};

    fn endpoints() -> SampleFamily {
        family(vec![
            (vec![("svc", "api"), ("path", "/users/42")], 1.0),
            (vec![("svc", "web"), ("path", "/index")], 2.0),
        ])
    }

    #[test]
    fn test_closure_edits_copy_in_place() {
        let f = endpoints();
        let result = f
            .tag_with(|labels| {
                labels.insert("cluster".to_string(), "east".to_string());
                None
            })
            .unwrap();
        assert_eq!(result.samples()[0].labels.get("cluster"), Some("east"));
        assert_eq!(values(&result), values(&f));
        // original labels are untouched
        assert_eq!(f.samples()[0].labels.get("cluster"), None);
    }

    #[test]
    fn test_closure_returns_replacement() {
        let result = endpoints()
            .tag_with(|labels| {
                let mut replacement = LabelMap::default();
                replacement.insert("service".to_string(), labels["svc"].to_uppercase());
                Some(replacement)
            })
            .unwrap();
        assert_eq!(*result.samples()[0].labels, labels(&[("service", "API")]));
        assert_eq!(*result.samples()[1].labels, labels(&[("service", "WEB")]));
    }

    #[test]
    fn test_instructions() {
        let chain = RewriteChain::new(vec![
            TagInstruction::rename("svc", "service"),
            TagInstruction::copy("service", "service_copy"),
            TagInstruction::set("env", "prod"),
            TagInstruction::remove("path"),
        ]);
        let result = endpoints().tag(&chain).unwrap();
        assert_eq!(
            *result.samples()[0].labels,
            labels(&[("service", "api"), ("service_copy", "api"), ("env", "prod")])
        );
    }

    #[test]
    fn test_replace_instruction() {
        let replace = TagInstruction::replace("path", "/users/([0-9]+)", "user-$1", "user");
        let result = endpoints().tag(&replace).unwrap();
        assert_eq!(result.samples()[0].labels.get("user"), Some("user-42"));
        // no full match, no change
        assert_eq!(result.samples()[1].labels.get("user"), None);
    }

    #[test]
    fn test_replace_with_invalid_regex_fails() {
        let replace = TagInstruction::replace("path", "(", "x", "y");
        let err = endpoints().tag(&replace).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidRegex(_)));
    }

    #[test]
    fn test_missing_sources_are_noops() {
        let chain = RewriteChain::new(vec![
            TagInstruction::rename("nope", "x"),
            TagInstruction::copy("nope", "y"),
            TagInstruction::remove("nope"),
        ]);
        let f = endpoints();
        assert_eq!(f.tag(&chain).unwrap(), f);
    }

    #[test]
    fn test_instructions_deserialize() {
        let json = r#"[
            {"action": "set", "key": "env", "value": "prod"},
            {"action": "rename", "from": "svc", "to": "service"}
        ]"#;
        let chain: RewriteChain = serde_json::from_str(json).unwrap();
        assert_eq!(chain.0[0], TagInstruction::set("env", "prod"));
        assert_eq!(chain.0[1], TagInstruction::rename("svc", "service"));
    }

    #[test]
    fn test_tag_on_empty() {
        assert!(SampleFamily::Empty.tag(&TagInstruction::set("a", "b")).unwrap().is_empty());
    }
}

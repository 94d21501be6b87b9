//! Writer capability traits and the per-key exclusion spec.
//!
//! A backend implements `OutputFormat` and opts into one or both writer
//! capabilities by overriding the capability accessors to return itself.
//! The `Logger` only ever asks "can you write key-values?" / "can you write
//! a sequence?" through those accessors; it never assumes both.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::value::Value;

/// Accumulated values for one dump, ordered lexicographically by key.
pub type ValueMap = BTreeMap<String, Value>;

/// Per-key exclusion specs, parallel to [`ValueMap`].
pub type ExcludeMap = BTreeMap<String, Option<Exclude>>;

/// Backends a key must not be routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclude {
    One(String),
    Many(Vec<String>),
}

impl Exclude {
    /// Does this spec name the given backend identity?
    pub fn excludes(&self, format_name: &str) -> bool {
        match self {
            Exclude::One(name) => name == format_name,
            Exclude::Many(names) => names.iter().any(|n| n == format_name),
        }
    }
}

impl From<&str> for Exclude {
    fn from(name: &str) -> Self {
        Exclude::One(name.to_string())
    }
}

impl From<String> for Exclude {
    fn from(name: String) -> Self {
        Exclude::One(name)
    }
}

impl From<Vec<&str>> for Exclude {
    fn from(names: Vec<&str>) -> Self {
        Exclude::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Exclude {
    fn from(names: Vec<String>) -> Self {
        Exclude::Many(names)
    }
}

/// Skip test applied by every key-value backend before rendering a key.
pub fn is_excluded(excluded: &ExcludeMap, key: &str, format_name: &str) -> bool {
    excluded
        .get(key)
        .and_then(Option::as_ref)
        .is_some_and(|e| e.excludes(format_name))
}

/// Key-value writer capability: receives a whole dump at once so the backend
/// can apply its own ordering and grouping.
pub trait KVWriter {
    fn write(&mut self, values: &ValueMap, excluded: &ExcludeMap, step: u64) -> Result<()>;
}

/// Sequence writer capability: free-form leveled log lines.
pub trait SeqWriter {
    fn write_sequence(&mut self, sequence: &[String]) -> Result<()>;
}

/// A concrete output backend.
///
/// `name` is the identity token exclusion specs match against; it is also the
/// token the registry resolves. The default capability accessors return
/// `None`, so a backend only implements what it supports.
pub trait OutputFormat: Send {
    fn name(&self) -> &str;

    fn as_kv_writer(&mut self) -> Option<&mut dyn KVWriter> {
        None
    }

    fn as_seq_writer(&mut self) -> Option<&mut dyn SeqWriter> {
        None
    }

    /// Release the owned resource. Called exactly once, by the `Logger`.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_one_and_many() {
        let one = Exclude::from("stdout");
        assert!(one.excludes("stdout"));
        assert!(!one.excludes("log"));

        let many = Exclude::from(vec!["stdout", "json"]);
        assert!(many.excludes("json"));
        assert!(!many.excludes("tensorboard"));
    }

    #[test]
    fn test_is_excluded_absent_key_or_none() {
        let mut excluded = ExcludeMap::new();
        assert!(!is_excluded(&excluded, "loss", "stdout"));
        excluded.insert("loss".to_string(), None);
        assert!(!is_excluded(&excluded, "loss", "stdout"));
        excluded.insert("loss".to_string(), Some(Exclude::from("stdout")));
        assert!(is_excluded(&excluded, "loss", "stdout"));
        assert!(!is_excluded(&excluded, "loss", "csv"));
    }
}

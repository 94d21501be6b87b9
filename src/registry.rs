//! Backend construction: the name→constructor registry and the host entry
//! points `make_output_format` / `configure_logger`.
//!
//! Adapters are only ever built through here; unknown tokens and missing
//! preconditions fail at construction time, never at first write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RunlogError};
#[cfg(feature = "tensorboard")]
use crate::formats::TensorBoardFormat;
use crate::formats::{CsvFormat, HumanFormat, JsonFormat, TrackerFormat};
use crate::logger::Logger;
use crate::writer::OutputFormat;

/// Constructor signature: output directory plus a run-specific file suffix.
pub type FormatConstructor = fn(&Path, &str) -> Result<Box<dyn OutputFormat>>;

/// Explicit registry mapping backend tokens to constructors.
///
/// `with_defaults` covers the built-in backends; hosts extend it with
/// `register` and pass it to `configure_logger_with` instead of relying on
/// any global state.
pub struct FormatRegistry {
    constructors: BTreeMap<String, FormatConstructor>,
}

impl FormatRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("stdout", |_dir, _suffix| Ok(Box::new(HumanFormat::stdout())));
        registry.register("log", |dir, suffix| {
            Ok(Box::new(HumanFormat::file(&dir.join(format!("log{suffix}.txt")))?))
        });
        registry.register("json", |dir, suffix| {
            Ok(Box::new(JsonFormat::new(&dir.join(format!("progress{suffix}.json")))?))
        });
        registry.register("csv", |dir, suffix| {
            Ok(Box::new(CsvFormat::new(&dir.join(format!("progress{suffix}.csv")))?))
        });
        #[cfg(feature = "tensorboard")]
        registry.register("tensorboard", |dir, _suffix| {
            Ok(Box::new(TensorBoardFormat::new(dir)))
        });
        registry.register("tracker", |_dir, _suffix| Ok(Box::new(TrackerFormat::from_env()?)));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, constructor: FormatConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build the named backend, creating the output directory first.
    pub fn make(&self, kind: &str, dir: &Path, suffix: &str) -> Result<Box<dyn OutputFormat>> {
        fs::create_dir_all(dir)?;
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| RunlogError::UnknownFormat(kind.to_string()))?;
        constructor(dir, suffix)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Build a single backend from the default registry.
pub fn make_output_format(kind: &str, dir: &Path, suffix: &str) -> Result<Box<dyn OutputFormat>> {
    FormatRegistry::with_defaults().make(kind, dir, suffix)
}

/// Snapshot written next to the log files when a logger is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub started_at: DateTime<Utc>,
    pub formats: Vec<String>,
}

/// Configure a logger over the default registry.
pub fn configure_logger(dir: impl Into<PathBuf>, kinds: &[&str]) -> Result<Logger> {
    configure_logger_with(&FormatRegistry::with_defaults(), dir, kinds)
}

/// Configure a logger over an injected registry.
///
/// Empty tokens are filtered out. Any constructor failure aborts the whole
/// configuration: no partial logger is returned, and backends built before
/// the failure are dropped.
pub fn configure_logger_with(
    registry: &FormatRegistry,
    dir: impl Into<PathBuf>,
    kinds: &[&str],
) -> Result<Logger> {
    let dir = dir.into();
    fs::create_dir_all(&dir)?;

    let kinds: Vec<&str> = kinds.iter().copied().filter(|kind| !kind.is_empty()).collect();
    let mut formats = Vec::with_capacity(kinds.len());
    for kind in &kinds {
        formats.push(registry.make(kind, &dir, "")?);
    }

    let info = RunInfo {
        started_at: Utc::now(),
        formats: kinds.iter().map(|kind| kind.to_string()).collect(),
    };
    fs::write(dir.join("run.yaml"), serde_yaml::to_string(&info)?)?;

    tracing::info!(dir = %dir.display(), formats = ?kinds, "logger configured");

    let mut logger = Logger::new(Some(dir.clone()), formats);
    if !kinds.is_empty() && kinds != ["stdout"] {
        let banner = format!("Logging to {}", dir.display());
        logger.info(&[&banner])?;
    }
    Ok(logger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_format_fails_at_construction() {
        let tmp = TempDir::new().unwrap();
        let err = match make_output_format("nonexistent", tmp.path(), "") {
            Ok(_) => panic!("called `Result::unwrap_err()` on an `Ok` value"),
            Err(e) => e,
        };
        assert!(matches!(err, RunlogError::UnknownFormat(name) if name == "nonexistent"));
    }

    #[test]
    fn test_registry_injection() {
        fn null_format(_dir: &Path, _suffix: &str) -> Result<Box<dyn OutputFormat>> {
            struct Null;
            impl OutputFormat for Null {
                fn name(&self) -> &str {
                    "null"
                }
            }
            Ok(Box::new(Null))
        }

        let tmp = TempDir::new().unwrap();
        let mut registry = FormatRegistry::empty();
        registry.register("null", null_format);
        assert!(registry.make("null", tmp.path(), "").is_ok());
        assert!(registry.make("stdout", tmp.path(), "").is_err());
    }

    #[test]
    fn test_default_registry_names() {
        let registry = FormatRegistry::with_defaults();
        let names: Vec<&str> = registry.names().collect();
        for expected in ["stdout", "log", "json", "csv", "tracker"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }
}

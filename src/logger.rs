//! The accumulation and dispatch core.
//!
//! A `Logger` owns an ordered list of output backends and three parallel maps
//! of per-step state: current values, mean-accumulation counts, and exclusion
//! specs. `record`/`record_mean` populate the maps; `dump` hands the whole
//! state to every key-value backend and clears it. The maps are cleared even
//! when a backend fails, so one misbehaving output cannot poison later steps.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::value::Value;
use crate::writer::{Exclude, ExcludeMap, OutputFormat, ValueMap};

/// Severity threshold for the free-form logging surface.
///
/// Lower levels are more verbose; `Disabled` also turns `dump` into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug = 10,
    Info = 20,
    Warn = 30,
    Error = 40,
    Disabled = 50,
}

/// Per-run metrics logger.
pub struct Logger {
    values: ValueMap,
    counts: HashMap<String, u64>,
    excluded: ExcludeMap,
    level: Level,
    dir: Option<PathBuf>,
    formats: Vec<Box<dyn OutputFormat>>,
    closed: bool,
}

impl Logger {
    pub fn new(dir: Option<PathBuf>, formats: Vec<Box<dyn OutputFormat>>) -> Self {
        Self {
            values: ValueMap::new(),
            counts: HashMap::new(),
            excluded: ExcludeMap::new(),
            level: Level::Info,
            dir,
            formats,
            closed: false,
        }
    }

    /// Record a value for `key`, overwriting any value recorded for it since
    /// the last `dump`. Call once per diagnostic per iteration; if called
    /// repeatedly, the last value wins.
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<Value>, exclude: Option<Exclude>) {
        let key = key.into();
        self.values.insert(key.clone(), value.into());
        self.excluded.insert(key, exclude);
    }

    /// Like `record`, but repeated calls within one cycle average.
    ///
    /// `None` is a policy escape: it stores the null marker for `key` and
    /// drops the running count, so the key renders as "no data" this step and
    /// any later accumulation restarts fresh.
    pub fn record_mean(&mut self, key: impl Into<String>, value: Option<f64>, exclude: Option<Exclude>) {
        let key = key.into();
        let Some(value) = value else {
            self.values.insert(key.clone(), Value::Null);
            self.counts.remove(&key);
            self.excluded.insert(key, exclude);
            return;
        };
        let count = self.counts.get(&key).copied().unwrap_or(0);
        let old = match self.values.get(&key) {
            Some(Value::Float(f)) => *f,
            Some(Value::Int(i)) => *i as f64,
            _ => 0.0,
        };
        let n = count as f64;
        self.values
            .insert(key.clone(), Value::Float(old * n / (n + 1.0) + value / (n + 1.0)));
        self.counts.insert(key.clone(), count + 1);
        self.excluded.insert(key, exclude);
    }

    /// Write everything recorded since the previous `dump` to every key-value
    /// backend, then clear the accumulation state.
    ///
    /// All backends are attempted even if one fails; the state is cleared
    /// unconditionally and the first backend error is returned afterwards.
    pub fn dump(&mut self, step: u64) -> Result<()> {
        if self.level == Level::Disabled {
            return Ok(());
        }
        if self.values.is_empty() {
            tracing::warn!("dump called with no recorded values; nothing written");
            self.counts.clear();
            self.excluded.clear();
            return Ok(());
        }

        let mut first_err = None;
        for format in &mut self.formats {
            if let Some(kv) = format.as_kv_writer() {
                if let Err(e) = kv.write(&self.values, &self.excluded, step) {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }

        self.values.clear();
        self.counts.clear();
        self.excluded.clear();

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Forward `parts`, stringified, to every sequence-capable backend if
    /// `level` passes the current threshold.
    pub fn log(&mut self, level: Level, parts: &[&dyn fmt::Display]) -> Result<()> {
        if self.level > level {
            return Ok(());
        }
        let sequence: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
        for format in &mut self.formats {
            if let Some(seq) = format.as_seq_writer() {
                seq.write_sequence(&sequence)?;
            }
        }
        Ok(())
    }

    pub fn debug(&mut self, parts: &[&dyn fmt::Display]) -> Result<()> {
        self.log(Level::Debug, parts)
    }

    pub fn info(&mut self, parts: &[&dyn fmt::Display]) -> Result<()> {
        self.log(Level::Info, parts)
    }

    pub fn warn(&mut self, parts: &[&dyn fmt::Display]) -> Result<()> {
        self.log(Level::Warn, parts)
    }

    pub fn error(&mut self, parts: &[&dyn fmt::Display]) -> Result<()> {
        self.log(Level::Error, parts)
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Directory log files are written to, if one was configured.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Close every backend in registration order. Every backend is attempted
    /// even if an earlier close fails; the first failure is returned.
    ///
    /// A second call is a warned no-op: backend resources are released exactly
    /// once.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            tracing::warn!("logger already closed");
            return Ok(());
        }
        self.closed = true;
        let mut first_err = None;
        for format in &mut self.formats {
            if let Err(e) = format.close() {
                tracing::error!(format = format.name(), "failed to close output: {}", e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("dir", &self.dir)
            .field("pending_keys", &self.values.len())
            .field("formats", &self.formats.iter().map(|o| o.name().to_string()).collect::<Vec<_>>())
            .finish()
    }
}

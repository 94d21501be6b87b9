//! Remote experiment-tracking output.
//!
//! The tracker daemon owns the session: it exports the session directory via
//! `RUNLOG_SESSION_DIR` before the training process starts, and consumes the
//! `events.jsonl` stream this adapter appends to. Constructing the adapter
//! without an active session is a hard error; the logger is never half-connected.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{json, Map};

use crate::error::{Result, RunlogError};
use crate::value::{ImageData, Value};
use crate::writer::{is_excluded, ExcludeMap, KVWriter, OutputFormat, ValueMap};

/// Environment variable the tracker daemon sets for the session directory.
pub const SESSION_ENV: &str = "RUNLOG_SESSION_DIR";

pub struct TrackerFormat {
    session_dir: PathBuf,
    out: BufWriter<File>,
}

impl TrackerFormat {
    /// Attach to the session announced in the process environment.
    pub fn from_env() -> Result<Self> {
        let dir = env::var(SESSION_ENV).map_err(|_| {
            RunlogError::SessionNotActive(format!(
                "{SESSION_ENV} is not set; start a tracker session first"
            ))
        })?;
        Self::with_session_dir(PathBuf::from(dir))
    }

    /// Attach to an explicit session directory. The directory must already
    /// exist: creating it is the tracker daemon's job, and its absence means
    /// there is no live session to attach to.
    pub fn with_session_dir(session_dir: PathBuf) -> Result<Self> {
        if !session_dir.is_dir() {
            return Err(RunlogError::SessionNotActive(format!(
                "session directory {} does not exist",
                session_dir.display()
            )));
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(session_dir.join("events.jsonl"))?;
        Ok(Self {
            session_dir,
            out: BufWriter::new(file),
        })
    }

    /// Persist a figure beside the event stream and return its path.
    fn save_figure(&self, key: &str, step: u64, svg: &str) -> Result<PathBuf> {
        let figures_dir = self.session_dir.join("figures");
        fs::create_dir_all(&figures_dir)?;
        let file_name = format!("{}_{step}.svg", key.replace('/', "_"));
        let path = figures_dir.join(file_name);
        fs::write(&path, svg)?;
        Ok(path)
    }

    fn encode(&self, key: &str, value: &Value, step: u64) -> Result<serde_json::Value> {
        let encoded = match value {
            Value::Float(v) => {
                if v.is_finite() {
                    json!(v)
                } else {
                    serde_json::Value::Null
                }
            }
            Value::Int(v) => json!(v),
            Value::Str(s) => json!(s),
            Value::Null => serde_json::Value::Null,
            Value::Tensor(t) => {
                let count = t.len();
                let (min, max, sum) = t.data.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY, 0.0),
                    |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
                );
                if count == 0 {
                    json!({ "_kind": "histogram", "count": 0 })
                } else {
                    json!({
                        "_kind": "histogram",
                        "count": count,
                        "min": min,
                        "max": max,
                        "mean": sum / count as f64,
                    })
                }
            }
            Value::Video(v) => json!({
                "_kind": "video",
                "fps": v.fps,
                "shape": v.frames.shape,
            }),
            Value::Image(img) => match &img.data {
                ImageData::Pixels { shape, .. } => json!({
                    "_kind": "image",
                    "shape": shape,
                    "dataformats": img.dataformats,
                }),
                ImageData::Path(path) => json!({
                    "_kind": "image",
                    "path": path.display().to_string(),
                    "dataformats": img.dataformats,
                }),
            },
            Value::Figure(fig) => {
                let path = self.save_figure(key, step, &fig.svg)?;
                json!({
                    "_kind": "figure",
                    "path": path.display().to_string(),
                })
            }
        };
        Ok(encoded)
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }
}

impl KVWriter for TrackerFormat {
    fn write(&mut self, values: &ValueMap, excluded: &ExcludeMap, step: u64) -> Result<()> {
        let mut fields = Map::new();
        for (key, value) in values {
            if is_excluded(excluded, key, "tracker") {
                continue;
            }
            fields.insert(key.clone(), self.encode(key, value, step)?);
        }
        if fields.is_empty() {
            return Ok(());
        }
        let record = json!({
            "step": step,
            "timestamp": Utc::now().to_rfc3339(),
            "values": fields,
        });
        writeln!(self.out, "{}", record)?;
        self.out.flush()?;
        Ok(())
    }
}

impl OutputFormat for TrackerFormat {
    fn name(&self) -> &str {
        "tracker"
    }

    fn as_kv_writer(&mut self) -> Option<&mut dyn KVWriter> {
        Some(self)
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

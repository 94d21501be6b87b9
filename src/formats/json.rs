//! JSON-lines progress output.
//!
//! One object per dump: `{"step": …, "timestamp": …, "values": {…}}`.
//! Scalar and text values only; tensors and media belong to the richer
//! backends and are rejected here.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use serde_json::{json, Map};

use crate::error::{Result, RunlogError};
use crate::value::Value;
use crate::writer::{is_excluded, ExcludeMap, KVWriter, OutputFormat, ValueMap};

pub struct JsonFormat {
    out: BufWriter<File>,
}

impl JsonFormat {
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }
}

/// Non-finite floats have no JSON representation; store them as null.
fn float_to_json(v: f64) -> serde_json::Value {
    if v.is_finite() {
        json!(v)
    } else {
        serde_json::Value::Null
    }
}

impl KVWriter for JsonFormat {
    fn write(&mut self, values: &ValueMap, excluded: &ExcludeMap, step: u64) -> Result<()> {
        let mut fields = Map::new();
        for (key, value) in values {
            if is_excluded(excluded, key, "json") {
                continue;
            }
            let encoded = match value {
                Value::Float(v) => float_to_json(*v),
                Value::Int(v) => json!(v),
                Value::Str(s) => json!(s),
                Value::Null => serde_json::Value::Null,
                Value::Tensor(_) | Value::Video(_) | Value::Figure(_) | Value::Image(_) => {
                    return Err(RunlogError::UnsupportedValue {
                        backend: "json".to_string(),
                        value_kind: value.kind(),
                        key: key.clone(),
                    });
                }
            };
            fields.insert(key.clone(), encoded);
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

impl OutputFormat for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn as_kv_writer(&mut self) -> Option<&mut dyn KVWriter> {
        Some(self)
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

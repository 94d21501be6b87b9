//! Human-readable table output, for the console or a plain text file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, RunlogError};
use crate::value::Value;
use crate::writer::{is_excluded, ExcludeMap, KVWriter, OutputFormat, SeqWriter, ValueMap};

/// Default cap on displayed key/value length. The rendered table stays within
/// `2 * 36 + 7 = 79` columns.
pub const DEFAULT_MAX_LENGTH: usize = 36;

/// ASCII table renderer over an arbitrary writer.
///
/// Registered twice by the factory: as `stdout` (standard output) and as
/// `log` (a `log{suffix}.txt` file in the output directory). The two are
/// distinct backend identities for exclusion purposes.
pub struct HumanFormat {
    name: String,
    out: Box<dyn Write + Send>,
    max_length: usize,
}

impl HumanFormat {
    pub fn new(name: impl Into<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            name: name.into(),
            out,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Table output on standard output.
    pub fn stdout() -> Self {
        Self::new("stdout", Box::new(io::stdout()))
    }

    /// Table output into a freshly created text file.
    pub fn file(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new("log", Box::new(BufWriter::new(file))))
    }

    /// Override the display-length cap.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    fn truncate(&self, s: &str) -> String {
        if s.chars().count() > self.max_length {
            let head: String = s.chars().take(self.max_length.saturating_sub(3)).collect();
            format!("{head}...")
        } else {
            s.to_string()
        }
    }
}

/// Format a float with 3 significant digits, `%g`-style: fixed notation in a
/// moderate exponent range, scientific outside it, trailing zeros trimmed.
fn format_float(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{}", value);
    }
    let exp = value.abs().log10().floor() as i32;
    if !(-4..3).contains(&exp) {
        return format!("{:.2e}", value);
    }
    let decimals = (2 - exp).max(0) as usize;
    let s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

impl KVWriter for HumanFormat {
    fn write(&mut self, values: &ValueMap, excluded: &ExcludeMap, _step: u64) -> Result<()> {
        // Build display rows first; nothing is written if a value is rejected.
        let mut rows: Vec<(String, String)> = Vec::new();
        let mut current_tag: Option<String> = None;
        for (key, value) in values {
            if is_excluded(excluded, key, &self.name) {
                continue;
            }
            let value_str = match value {
                Value::Float(v) => format!("{:<8}", format_float(*v)),
                Value::Int(v) => v.to_string(),
                Value::Str(s) => s.clone(),
                Value::Tensor(t) => t.to_string(),
                Value::Null => "-".to_string(),
                Value::Video(_) | Value::Figure(_) | Value::Image(_) => {
                    return Err(RunlogError::UnsupportedValue {
                        backend: self.name.clone(),
                        value_kind: value.kind(),
                        key: key.clone(),
                    });
                }
            };

            // Keys sharing a `/`-prefix are grouped under one tag header and
            // shown indented with the tag stripped.
            let mut display_key = key.clone();
            if let Some(pos) = key.find('/') {
                if pos > 0 {
                    let tag = &key[..=pos];
                    if current_tag.as_deref() != Some(tag) {
                        current_tag = Some(tag.to_string());
                        rows.push((self.truncate(tag), String::new()));
                    }
                    display_key = format!("   {}", &key[pos + 1..]);
                }
            }
            rows.push((self.truncate(&display_key), self.truncate(&value_str)));
        }

        if rows.is_empty() {
            tracing::warn!("tried to write an empty key-value table");
            return Ok(());
        }

        // Column widths are set by the longest truncated strings present.
        let key_width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
        let val_width = rows.iter().map(|(_, v)| v.chars().count()).max().unwrap_or(0);

        let rule = "-".repeat(key_width + val_width + 7);
        let mut lines = Vec::with_capacity(rows.len() + 2);
        lines.push(rule.clone());
        for (key, value) in &rows {
            let key_pad = " ".repeat(key_width - key.chars().count());
            let val_pad = " ".repeat(val_width - value.chars().count());
            lines.push(format!("| {key}{key_pad} | {value}{val_pad} |"));
        }
        lines.push(rule);
        writeln!(self.out, "{}", lines.join("\n"))?;
        self.out.flush()?;
        Ok(())
    }
}

impl SeqWriter for HumanFormat {
    fn write_sequence(&mut self, sequence: &[String]) -> Result<()> {
        writeln!(self.out, "{}", sequence.join(" "))?;
        self.out.flush()?;
        Ok(())
    }
}

impl OutputFormat for HumanFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_kv_writer(&mut self) -> Option<&mut dyn KVWriter> {
        Some(self)
    }

    fn as_seq_writer(&mut self) -> Option<&mut dyn SeqWriter> {
        Some(self)
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        // Release the underlying handle now rather than at drop time.
        self.out = Box::new(io::sink());
        Ok(())
    }
}

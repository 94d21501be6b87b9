//! CSV progress output.
//!
//! One row per dump, one column per key. Keys recorded for the first time in
//! a later dump extend the header: the file is rewritten in place with the
//! wider header and earlier rows padded with empty cells.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Result, RunlogError};
use crate::value::Value;
use crate::writer::{is_excluded, ExcludeMap, KVWriter, OutputFormat, ValueMap};

pub struct CsvFormat {
    file: File,
    /// Column order after the leading `step` column.
    keys: Vec<String>,
}

impl CsvFormat {
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file,
            keys: Vec::new(),
        })
    }

    fn header(&self) -> String {
        let mut header = String::from("step");
        for key in &self.keys {
            header.push(',');
            header.push_str(key);
        }
        header
    }

    /// Rewrite the whole file under the widened header, padding existing rows
    /// with one empty cell per new column.
    fn rewrite_with_extended_header(&mut self, n_new: usize) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut old = String::new();
        self.file.read_to_string(&mut old)?;

        let mut out = self.header();
        out.push('\n');
        let pad = ",".repeat(n_new);
        for line in old.lines().skip(1) {
            out.push_str(line);
            out.push_str(&pad);
            out.push('\n');
        }

        self.file.seek(SeekFrom::Start(0))?;
        self.file.set_len(0)?;
        self.file.write_all(out.as_bytes())?;
        Ok(())
    }
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

impl KVWriter for CsvFormat {
    fn write(&mut self, values: &ValueMap, excluded: &ExcludeMap, step: u64) -> Result<()> {
        let mut cells: Vec<(String, String)> = Vec::new();
        for (key, value) in values {
            if is_excluded(excluded, key, "csv") {
                continue;
            }
            let cell = match value {
                Value::Float(v) => {
                    if v.is_finite() {
                        v.to_string()
                    } else {
                        String::new()
                    }
                }
                Value::Int(v) => v.to_string(),
                Value::Str(s) => escape(s),
                Value::Null => String::new(),
                Value::Tensor(_) | Value::Video(_) | Value::Figure(_) | Value::Image(_) => {
                    return Err(RunlogError::UnsupportedValue {
                        backend: "csv".to_string(),
                        value_kind: value.kind(),
                        key: key.clone(),
                    });
                }
            };
            cells.push((key.clone(), cell));
        }
        if cells.is_empty() {
            return Ok(());
        }

        let new_keys: Vec<String> = cells
            .iter()
            .map(|(key, _)| key)
            .filter(|&key| !self.keys.contains(key))
            .cloned()
            .collect();
        if !new_keys.is_empty() {
            let had_header = !self.keys.is_empty();
            self.keys.extend(new_keys.iter().cloned());
            if had_header {
                self.rewrite_with_extended_header(new_keys.len())?;
            } else {
                let header = self.header();
                writeln!(self.file, "{}", header)?;
            }
        }

        let mut row = step.to_string();
        for key in &self.keys {
            row.push(',');
            if let Some((_, cell)) = cells.iter().find(|(k, _)| k == key) {
                row.push_str(cell);
            }
        }
        writeln!(self.file, "{}", row)?;
        self.file.flush()?;
        Ok(())
    }
}

impl OutputFormat for CsvFormat {
    fn name(&self) -> &str {
        "csv"
    }

    fn as_kv_writer(&mut self) -> Option<&mut dyn KVWriter> {
        Some(self)
    }

    fn close(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Exclude;
    use tempfile::TempDir;

    fn dump(format: &mut CsvFormat, step: u64, pairs: &[(&str, Value)]) {
        let mut values = ValueMap::new();
        let mut excluded = ExcludeMap::new();
        for (key, value) in pairs {
            values.insert(key.to_string(), value.clone());
            excluded.insert(key.to_string(), None);
        }
        format.write(&values, &excluded, step).unwrap();
    }

    #[test]
    fn test_new_keys_extend_header_and_pad_old_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("progress.csv");
        let mut format = CsvFormat::new(&path).unwrap();

        dump(&mut format, 0, &[("loss", Value::Float(0.5))]);
        dump(
            &mut format,
            1,
            &[("acc", Value::Float(0.75)), ("loss", Value::Float(0.4))],
        );
        format.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["step,loss,acc", "0,0.5,", "1,0.4,0.75"]);
    }

    #[test]
    fn test_excluded_and_text_cells() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("progress.csv");
        let mut format = CsvFormat::new(&path).unwrap();

        let mut values = ValueMap::new();
        let mut excluded = ExcludeMap::new();
        values.insert("note".to_string(), Value::Str("warm, start".to_string()));
        excluded.insert("note".to_string(), None);
        values.insert("hidden".to_string(), Value::Int(1));
        excluded.insert("hidden".to_string(), Some(Exclude::from("csv")));
        format.write(&values, &excluded, 0).unwrap();
        format.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "step,note\n0,\"warm, start\"\n");
    }

    #[test]
    fn test_csv_rejects_media() {
        let tmp = TempDir::new().unwrap();
        let mut format = CsvFormat::new(&tmp.path().join("progress.csv")).unwrap();
        let mut values = ValueMap::new();
        let mut excluded = ExcludeMap::new();
        values.insert(
            "img".to_string(),
            Value::Image(crate::value::Image::from_path("img.png", "HWC")),
        );
        excluded.insert("img".to_string(), None);
        assert!(matches!(
            format.write(&values, &excluded, 0),
            Err(RunlogError::UnsupportedValue { value_kind: "image", .. })
        ));
    }
}

//! TensorBoard event-file output.

use std::path::Path;

use tensorboard_rs::summary_writer::SummaryWriter;

use crate::error::{Result, RunlogError};
use crate::value::{ImageData, Tensor, Value};
use crate::writer::{is_excluded, ExcludeMap, KVWriter, OutputFormat, ValueMap};

const HISTOGRAM_BUCKETS: usize = 30;

/// Writes scalars, tensor histograms, and raw images into TensorBoard event
/// files under the output directory.
///
/// The event writer has no text/video/figure surface, so those value kinds
/// are rejected; exclude them for `tensorboard` when recording.
pub struct TensorBoardFormat {
    writer: SummaryWriter,
}

impl TensorBoardFormat {
    pub fn new(dir: &Path) -> Self {
        Self {
            writer: SummaryWriter::new(dir),
        }
    }

    fn unsupported(&self, value: &Value, key: &str) -> RunlogError {
        RunlogError::UnsupportedValue {
            backend: "tensorboard".to_string(),
            value_kind: value.kind(),
            key: key.to_string(),
        }
    }

    fn write_histogram(&mut self, key: &str, tensor: &Tensor, step: usize) {
        let data = &tensor.data;
        if data.is_empty() {
            return;
        }
        let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = data.iter().sum();
        let sum_squares: f64 = data.iter().map(|v| v * v).sum();

        let (limits, counts) = bucketize(data, min, max);
        self.writer.add_histogram_raw(
            key,
            min,
            max,
            data.len() as f64,
            sum,
            sum_squares,
            &limits,
            &counts,
            step,
        );
    }
}

/// Linear bucketing over [min, max]; degenerate ranges collapse to one bucket.
fn bucketize(data: &[f64], min: f64, max: f64) -> (Vec<f64>, Vec<f64>) {
    if min == max {
        return (vec![max], vec![data.len() as f64]);
    }
    let width = (max - min) / HISTOGRAM_BUCKETS as f64;
    let limits: Vec<f64> = (1..=HISTOGRAM_BUCKETS)
        .map(|i| min + width * i as f64)
        .collect();
    let mut counts = vec![0.0; HISTOGRAM_BUCKETS];
    for &v in data {
        let idx = (((v - min) / width) as usize).min(HISTOGRAM_BUCKETS - 1);
        counts[idx] += 1.0;
    }
    (limits, counts)
}

/// Reorder pixel data into the CHW layout the event writer expects.
fn to_chw(data: &[u8], shape: &[usize], dataformats: &str) -> Result<(Vec<u8>, Vec<usize>)> {
    match dataformats {
        "CHW" if shape.len() == 3 => Ok((data.to_vec(), shape.to_vec())),
        "HW" if shape.len() == 2 => Ok((data.to_vec(), vec![1, shape[0], shape[1]])),
        "HWC" if shape.len() == 3 => {
            let (h, w, c) = (shape[0], shape[1], shape[2]);
            let mut out = vec![0u8; data.len()];
            for y in 0..h {
                for x in 0..w {
                    for ch in 0..c {
                        out[ch * h * w + y * w + x] = data[y * w * c + x * c + ch];
                    }
                }
            }
            Ok((out, vec![c, h, w]))
        }
        other => Err(RunlogError::ImageLayout(other.to_string())),
    }
}

impl KVWriter for TensorBoardFormat {
    fn write(&mut self, values: &ValueMap, excluded: &ExcludeMap, step: u64) -> Result<()> {
        let step = step as usize;
        for (key, value) in values {
            if is_excluded(excluded, key, "tensorboard") {
                continue;
            }
            match value {
                Value::Float(v) => self.writer.add_scalar(key, *v as f32, step),
                Value::Int(v) => self.writer.add_scalar(key, *v as f32, step),
                Value::Tensor(t) => self.write_histogram(key, t, step),
                Value::Image(img) => match &img.data {
                    ImageData::Pixels { data, shape } => {
                        let (chw, dims) = to_chw(data, shape, &img.dataformats)?;
                        self.writer.add_image(key, &chw, &dims, step);
                    }
                    ImageData::Path(_) => return Err(self.unsupported(value, key)),
                },
                Value::Str(_) | Value::Video(_) | Value::Figure(_) | Value::Null => {
                    return Err(self.unsupported(value, key));
                }
            }
        }
        let _ = self.writer.flush();
        Ok(())
    }
}

impl OutputFormat for TensorBoardFormat {
    fn name(&self) -> &str {
        "tensorboard"
    }

    fn as_kv_writer(&mut self) -> Option<&mut dyn KVWriter> {
        Some(self)
    }

    fn close(&mut self) -> Result<()> {
        let _ = self.writer.flush();
        Ok(())
    }
}

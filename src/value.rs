//! Value types recorded by the logger.
//!
//! `Value` is the closed set of kinds a backend can be asked to render.
//! Adding a kind means adding a variant here and one handler per backend;
//! the exhaustive `match` in each backend keeps the dispatch honest.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A dense numeric array with an explicit shape.
///
/// The shape is advisory: backends that only need the samples (histograms)
/// read `data` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub data: Vec<f64>,
    pub shape: Vec<usize>,
}

impl Tensor {
    pub fn new(data: Vec<f64>, shape: Vec<usize>) -> Self {
        Self { data, shape }
    }

    /// A rank-1 tensor over the given samples.
    pub fn from_vec(data: Vec<f64>) -> Self {
        let shape = vec![data.len()];
        Self { data, shape }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tensor([")?;
        for (i, v) in self.data.iter().take(6).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        if self.data.len() > 6 {
            write!(f, ", ...")?;
        }
        write!(f, "], shape={:?})", self.shape)
    }
}

/// Video frames plus the playback rate a backend needs to encode them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// Frame buffer, conventionally shaped (T, C, H, W).
    pub frames: Tensor,
    pub fps: f32,
}

impl Video {
    pub fn new(frames: Tensor, fps: f32) -> Self {
        Self { frames, fps }
    }
}

/// A rendered figure and whether the producer is done with it after logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// The figure as an SVG document.
    pub svg: String,
    /// Close-after-log hint for the producing side.
    pub close: bool,
}

impl Figure {
    pub fn new(svg: impl Into<String>, close: bool) -> Self {
        Self {
            svg: svg.into(),
            close,
        }
    }
}

/// Image payload: either raw pixels or a path to an encoded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImageData {
    Pixels { data: Vec<u8>, shape: Vec<usize> },
    Path(PathBuf),
}

/// An image plus its axis-layout descriptor (`"CHW"`, `"HWC"`, `"HW"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub data: ImageData,
    pub dataformats: String,
}

impl Image {
    pub fn from_pixels(data: Vec<u8>, shape: Vec<usize>, dataformats: impl Into<String>) -> Self {
        Self {
            data: ImageData::Pixels { data, shape },
            dataformats: dataformats.into(),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>, dataformats: impl Into<String>) -> Self {
        Self {
            data: ImageData::Path(path.into()),
            dataformats: dataformats.into(),
        }
    }
}

/// A single recorded value.
#[derive(Debug, Clone)]
pub enum Value {
    Float(f64),
    Int(i64),
    Str(String),
    Tensor(Tensor),
    Video(Video),
    Figure(Figure),
    Image(Image),
    /// The "no data this step" marker produced by `record_mean(key, None)`.
    Null,
}

impl Value {
    /// Short kind name used in unsupported-value errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Float(_) | Value::Int(_) => "scalar",
            Value::Str(_) => "text",
            Value::Tensor(_) => "tensor",
            Value::Video(_) => "video",
            Value::Figure(_) => "figure",
            Value::Image(_) => "image",
            Value::Null => "null",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}
impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
impl From<Tensor> for Value {
    fn from(v: Tensor) -> Self {
        Value::Tensor(v)
    }
}
impl From<Video> for Value {
    fn from(v: Video) -> Self {
        Value::Video(v)
    }
}
impl From<Figure> for Value {
    fn from(v: Figure) -> Self {
        Value::Figure(v)
    }
}
impl From<Image> for Value {
    fn from(v: Image) -> Self {
        Value::Image(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_display_truncates() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let s = t.to_string();
        assert!(s.starts_with("tensor([1, 2, 3, 4, 5, 6, ..."));
        assert!(s.contains("shape=[8]"));
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::from(1.0).kind(), "scalar");
        assert_eq!(Value::from(3usize).kind(), "scalar");
        assert_eq!(Value::from("hi").kind(), "text");
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(Tensor::from_vec(vec![0.0])).kind(), "tensor");
    }
}

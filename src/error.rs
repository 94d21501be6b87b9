//! Error types for runlog.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunlogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A backend was asked to render a value kind it has no representation
    /// for. Recoverable by excluding the key for that backend via the
    /// `exclude` argument of `record`/`record_mean`.
    #[error(
        "the {value_kind} value recorded under `{key}` is not supported by the `{backend}` output; \
         exclude the key for this backend via the `exclude` argument of `record`"
    )]
    UnsupportedValue {
        backend: String,
        value_kind: &'static str,
        key: String,
    },

    #[error("unknown output format: {0}")]
    UnknownFormat(String),

    /// The tracker backend requires an already-active session.
    #[error("tracker session not active: {0}")]
    SessionNotActive(String),

    #[error("unsupported image axis layout `{0}` (expected CHW, HWC, or HW)")]
    ImageLayout(String),
}

pub type Result<T> = std::result::Result<T, RunlogError>;

//! Output backends.
//!
//! Provides:
//! - `HumanFormat` for console/file ASCII tables (tokens `stdout`, `log`)
//! - `JsonFormat` for a JSON-lines progress file
//! - `CsvFormat` for a CSV progress file with a growing header
//! - `TensorBoardFormat` for event files (optional)
//! - `TrackerFormat` for a live experiment-tracking session

mod csv;
mod human;
mod json;
#[cfg(feature = "tensorboard")]
mod tensorboard;
mod tracker;

pub use csv::CsvFormat;
pub use human::{HumanFormat, DEFAULT_MAX_LENGTH};
pub use json::JsonFormat;
#[cfg(feature = "tensorboard")]
pub use tensorboard::TensorBoardFormat;
pub use tracker::{TrackerFormat, SESSION_ENV};

//! runlog: structured metrics and diagnostics logging for training loops.
//!
//! Callers `record` named values once per step; `dump` fans the accumulated
//! state out to every configured output backend. Backends are pluggable
//! through the [`writer::OutputFormat`] capability traits and are built by
//! name through [`registry::FormatRegistry`].
//!
//! ```no_run
//! use runlog::configure_logger;
//!
//! fn main() -> runlog::Result<()> {
//!     let mut logger = configure_logger("./runs/cartpole", &["stdout", "log", "csv"])?;
//!     for step in 0..1000u64 {
//!         logger.record("train/lr", 3e-4, None);
//!         logger.record_mean("rollout/ep_rew_mean", Some(step as f64), None);
//!         if step % 100 == 0 {
//!             logger.dump(step)?;
//!         }
//!     }
//!     logger.info(&[&"training finished"])?;
//!     logger.close()
//! }
//! ```

pub mod error;
pub mod formats;
pub mod logger;
pub mod registry;
pub mod value;
pub mod writer;

pub use error::{Result, RunlogError};
pub use logger::{Level, Logger};
pub use registry::{configure_logger, configure_logger_with, make_output_format, FormatRegistry, RunInfo};
pub use value::{Figure, Image, ImageData, Tensor, Value, Video};
pub use writer::{is_excluded, Exclude, ExcludeMap, KVWriter, OutputFormat, SeqWriter, ValueMap};

//! Import orchestration
//!
//! Drives reader, adapter, link resolver and writer over one input, with
//! skip/limit, dry-run, cancellation and progress reporting.

mod cancel;
mod importer;
mod progress;

pub use cancel::CancellationToken;
pub use importer::{ImportError, ImportOptions, ImportReport, ImportResult, Importer};
pub use progress::{BarProgress, ImportProgress, ProgressSink};

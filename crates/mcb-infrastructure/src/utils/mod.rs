//! Infrastructure utilities
//!
//! Reusable helpers for timing, file I/O, and common patterns.
//!
//! Note: JsonExt and HttpResponseUtils are in mcb_providers::utils.

mod file;
mod timing;

pub use file::FileUtils;
pub use timing::TimedOperation;

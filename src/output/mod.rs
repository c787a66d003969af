//! Reporting module
//!
//! Read-only views over the archive cache for the `--stats` mode.

mod stats;

pub use stats::{load_statistics, print_statistics, ArchiveStatistics};

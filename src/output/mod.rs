//! Output module for reporting mirror results
//!
//! This module handles:
//! - Counting fetched, written, and dropped documents while the run is in progress
//! - Printing the final summary

pub mod stats;

pub use stats::{print_summary, MirrorStats, MirrorSummary};

//! Per-class heap census profiling.
//!
//! Consumes the textual heap histogram a JVM emits (one class per line with
//! live instance count and byte size), decodes JNI type descriptors into
//! readable class names, ranks classes by occupied bytes and annotates each
//! poll with the percentage change against the previous one.

mod census;

pub use census::{format_bytes, Direction, HeapSampler, HistogramRecord};

use crate::error::Result;

/// Abstract provider of raw heap-census lines.
///
/// The production implementation runs `jmap -histo` (see [`crate::jdk`]).
/// Header, footer and otherwise garbled lines are fine; the parser skips
/// anything that does not match the tabular layout.
pub trait HeapCensusSource {
    fn census(&mut self) -> Result<Vec<String>>;
}

//! Sampling CPU profiler for JVM threads.
//!
//! Periodically snapshots every thread's stack and cumulative CPU time,
//! attributes the per-interval CPU delta to the topmost application frame,
//! and keeps a ranked table of the hottest call sites. Frames from common
//! runtime and third-party packages are excluded so application problems
//! are not drowned out by framework overhead.

mod sampler;
mod stats;

pub use sampler::CpuSampler;
pub use stats::{FrameKey, HotspotEntry, NoiseFilter};

use crate::error::Result;

/// Scheduler state of a thread at the sampling instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Runnable,
    Blocked,
    Waiting,
    TimedWaiting,
    New,
    Terminated,
}

/// One stack frame as reported by the target VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Fully qualified class name (e.g. "com.example.OrderService").
    pub class_name: String,
    pub method_name: String,
    /// Source line, or a negative sentinel for native/unknown locations.
    pub line_number: i32,
}

/// One thread's contribution to a sample: identity, state, cumulative CPU
/// time and its stack, topmost frame first.
#[derive(Debug, Clone)]
pub struct ThreadSnapshot {
    pub id: i64,
    pub state: ThreadState,
    pub cpu_time_ns: u64,
    pub frames: Vec<StackFrame>,
}

/// Abstract provider of thread snapshots.
///
/// The production implementation shells out to `jstack` (see [`crate::jdk`]);
/// tests script snapshots directly. A failed call must leave the target
/// untouched so the caller can simply retry on the next poll.
pub trait ThreadSampleSource {
    fn sample(&mut self) -> Result<Vec<ThreadSnapshot>>;
}

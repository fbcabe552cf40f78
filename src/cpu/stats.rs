use super::StackFrame;
use std::sync::atomic::{AtomicU64, Ordering};

/// Package prefixes excluded from attribution by default. These are the
/// usual runtime and third-party suspects that sit on top of application
/// frames without being the cause of the work.
const DEFAULT_NOISE_PREFIXES: &[&str] = &[
    "org.eclipse.",
    "org.apache.",
    "java.",
    "sun.",
    "com.sun.",
    "javax.",
    "oracle.",
    "com.trilead.",
    "org.junit.",
    "org.mockito.",
    "org.hibernate.",
    "com.ibm.",
    "com.caucho.",
    "jdk.internal.reflect.",
    "io.netty.",
];

/// Identity of one ranked call site: class, method and line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub class_name: String,
    pub method_name: String,
    pub line_number: i32,
}

impl FrameKey {
    pub fn from_frame(frame: &StackFrame) -> Self {
        FrameKey {
            class_name: frame.class_name.clone(),
            method_name: frame.method_name.clone(),
            line_number: frame.line_number,
        }
    }
}

impl std::fmt::Display for FrameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}:{}",
            self.class_name, self.method_name, self.line_number
        )
    }
}

/// Accumulated CPU time for one call site.
///
/// The hit counter only ever grows and is incremented atomically, so a
/// ranking pass may read it while an update is in progress.
#[derive(Debug)]
pub struct HotspotStat {
    key: FrameKey,
    hits: AtomicU64,
}

impl HotspotStat {
    pub fn new(key: FrameKey) -> Self {
        HotspotStat {
            key,
            hits: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> &FrameKey {
        &self.key
    }

    pub fn add_hits(&self, delta_ns: u64) {
        self.hits.fetch_add(delta_ns, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Snapshot of one ranked call site, as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotspotEntry {
    pub class_name: String,
    pub method_name: String,
    pub line_number: i32,
    pub hits: u64,
}

/// Immutable denylist of class-name prefixes excluded from attribution.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    prefixes: Vec<String>,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        NoiseFilter {
            prefixes: DEFAULT_NOISE_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl NoiseFilter {
    /// A filter with only the given prefixes.
    pub fn new(prefixes: Vec<String>) -> Self {
        NoiseFilter { prefixes }
    }

    /// The default denylist extended with additional prefixes.
    pub fn with_extra(extra: &[String]) -> Self {
        let mut filter = NoiseFilter::default();
        filter.prefixes.extend(extra.iter().cloned());
        filter
    }

    pub fn is_filtered(&self, frame: &StackFrame) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| frame.class_name.starts_with(prefix.as_str()))
    }

    /// A RUNNABLE thread parked in the native epoll wait is idle despite its
    /// reported state; seeing this frame ends attribution for the thread.
    pub fn is_idle_poll(&self, frame: &StackFrame) -> bool {
        frame.class_name == "sun.nio.ch.EPollArrayWrapper" && frame.method_name == "epollWait"
    }
}

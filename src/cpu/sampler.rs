use super::stats::HotspotStat;
use super::{FrameKey, HotspotEntry, NoiseFilter, ThreadSampleSource, ThreadState};
use crate::error::Result;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Sampling CPU profiler.
///
/// Each [`update`](CpuSampler::update) pulls one snapshot from the source,
/// computes every thread's CPU-time delta against its baseline from the
/// previous poll, and adds that delta to the hit counter of the topmost
/// non-filtered frame. Counters are atomic and the table is behind an
/// `RwLock`, so [`top_n`](CpuSampler::top_n) may run concurrently with an
/// in-progress update; a ranking taken mid-update is at most one poll stale.
pub struct CpuSampler {
    source: Mutex<Box<dyn ThreadSampleSource + Send>>,
    filter: NoiseFilter,
    table: RwLock<HashMap<FrameKey, Arc<HotspotStat>>>,
    /// Last observed cumulative CPU time per thread id.
    baselines: Mutex<HashMap<i64, u64>>,
    total_attributed_ns: AtomicU64,
    update_count: AtomicU64,
}

impl CpuSampler {
    pub fn new(source: Box<dyn ThreadSampleSource + Send>, filter: NoiseFilter) -> Self {
        CpuSampler {
            source: Mutex::new(source),
            filter,
            table: RwLock::new(HashMap::new()),
            baselines: Mutex::new(HashMap::new()),
            total_attributed_ns: AtomicU64::new(0),
            update_count: AtomicU64::new(0),
        }
    }

    /// Poll the source once and fold the snapshot into the hotspot table.
    ///
    /// A source failure propagates without touching any aggregate state, so
    /// the caller can retry on the next scheduled interval.
    pub fn update(&self) -> Result<()> {
        let threads = self.source.lock().unwrap().sample()?;

        let mut samples_acquired = false;
        let mut baselines = self.baselines.lock().unwrap();

        // Drop baselines of threads that no longer exist, so a recycled
        // thread id starts from a fresh baseline instead of inheriting the
        // dead thread's counter.
        baselines.retain(|id, _| threads.iter().any(|t| t.id == *id));

        for thread in &threads {
            let baseline = *baselines.entry(thread.id).or_insert(thread.cpu_time_ns);
            // A cumulative counter below its baseline means the id was
            // recycled between polls; count that interval as zero.
            let delta_ns = thread.cpu_time_ns.saturating_sub(baseline);
            baselines.insert(thread.id, thread.cpu_time_ns);

            if thread.state != ThreadState::Runnable || thread.frames.is_empty() {
                continue;
            }

            let Some(target) = self.select_frame(thread) else {
                continue;
            };

            let key = FrameKey::from_frame(target);
            trace!("thread {} -> {} (+{}ns)", thread.id, key, delta_ns);
            self.stat_for(key).add_hits(delta_ns);
            self.total_attributed_ns
                .fetch_add(delta_ns, Ordering::Relaxed);
            if delta_ns > 0 {
                samples_acquired = true;
            }
        }

        if samples_acquired {
            self.update_count.fetch_add(1, Ordering::Relaxed);
        } else {
            debug!("sample produced no attributable CPU time");
        }

        Ok(())
    }

    /// Scan from the top of the stack outward for the first frame that
    /// survives the noise filter. The idle-poll sentinel ends the scan with
    /// no attribution.
    fn select_frame<'t>(&self, thread: &'t super::ThreadSnapshot) -> Option<&'t super::StackFrame> {
        for frame in &thread.frames {
            if self.filter.is_idle_poll(frame) {
                return None;
            }
            if self.filter.is_filtered(frame) {
                continue;
            }
            return Some(frame);
        }
        None
    }

    fn stat_for(&self, key: FrameKey) -> Arc<HotspotStat> {
        if let Some(stat) = self.table.read().unwrap().get(&key) {
            return Arc::clone(stat);
        }
        let mut table = self.table.write().unwrap();
        Arc::clone(
            table
                .entry(key.clone())
                .or_insert_with(|| Arc::new(HotspotStat::new(key))),
        )
    }

    /// The `limit` call sites with the largest hit counters, descending.
    /// Returns the whole table when it holds fewer entries.
    pub fn top_n(&self, limit: usize) -> Vec<HotspotEntry> {
        let mut entries: Vec<HotspotEntry> = self
            .table
            .read()
            .unwrap()
            .values()
            .map(|stat| HotspotEntry {
                class_name: stat.key().class_name.clone(),
                method_name: stat.key().method_name.clone(),
                line_number: stat.key().line_number,
                hits: stat.hits(),
            })
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.hits));
        entries.truncate(limit);
        entries
    }

    /// Running total of CPU time attributed to any call site.
    pub fn total_attributed_ns(&self) -> u64 {
        self.total_attributed_ns.load(Ordering::Relaxed)
    }

    /// Number of polls that attributed a non-zero CPU delta. Exposed as a
    /// liveness indicator for the view layer.
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{StackFrame, ThreadSnapshot};
    use std::collections::VecDeque;

    /// Scripted source replaying a fixed sequence of snapshots.
    struct ScriptedSource {
        polls: VecDeque<Vec<ThreadSnapshot>>,
    }

    impl ThreadSampleSource for ScriptedSource {
        fn sample(&mut self) -> Result<Vec<ThreadSnapshot>> {
            self.polls
                .pop_front()
                .ok_or_else(|| crate::Error::ThreadDump("script exhausted".to_string()))
        }
    }

    fn sampler_with(polls: Vec<Vec<ThreadSnapshot>>) -> CpuSampler {
        CpuSampler::new(
            Box::new(ScriptedSource {
                polls: polls.into(),
            }),
            NoiseFilter::default(),
        )
    }

    fn frame(class: &str, method: &str, line: i32) -> StackFrame {
        StackFrame {
            class_name: class.to_string(),
            method_name: method.to_string(),
            line_number: line,
        }
    }

    fn thread(id: i64, state: ThreadState, cpu_ns: u64, frames: Vec<StackFrame>) -> ThreadSnapshot {
        ThreadSnapshot {
            id,
            state,
            cpu_time_ns: cpu_ns,
            frames,
        }
    }

    fn app_thread(id: i64, cpu_ns: u64) -> ThreadSnapshot {
        thread(
            id,
            ThreadState::Runnable,
            cpu_ns,
            vec![frame("com.example.Worker", "run", 42)],
        )
    }

    #[test]
    fn first_sight_yields_zero_delta() {
        let sampler = sampler_with(vec![vec![app_thread(1, 5_000)]]);
        sampler.update().unwrap();

        // Entry is created lazily but no time can be attributed yet.
        let top = sampler.top_n(10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].hits, 0);
        assert_eq!(sampler.total_attributed_ns(), 0);
        assert_eq!(sampler.update_count(), 0);
    }

    #[test]
    fn identical_snapshots_leave_counters_unchanged() {
        let sampler = sampler_with(vec![
            vec![app_thread(1, 5_000)],
            vec![app_thread(1, 5_000)],
            vec![app_thread(1, 5_000)],
        ]);
        for _ in 0..3 {
            sampler.update().unwrap();
        }

        assert_eq!(sampler.top_n(10)[0].hits, 0);
        assert_eq!(sampler.update_count(), 0);
        assert_eq!(sampler.total_attributed_ns(), 0);
    }

    #[test]
    fn cpu_advance_is_attributed_exactly() {
        let sampler = sampler_with(vec![
            vec![app_thread(1, 5_000)],
            vec![app_thread(1, 12_000)],
        ]);
        sampler.update().unwrap();
        sampler.update().unwrap();

        let top = sampler.top_n(10);
        assert_eq!(top[0].class_name, "com.example.Worker");
        assert_eq!(top[0].hits, 7_000);
        assert_eq!(sampler.total_attributed_ns(), 7_000);
        assert_eq!(sampler.update_count(), 1);
    }

    #[test]
    fn non_runnable_threads_contribute_nothing() {
        let blocked = |cpu| {
            thread(
                2,
                ThreadState::Blocked,
                cpu,
                vec![frame("com.example.Locked", "wait_for_it", 7)],
            )
        };
        let sampler = sampler_with(vec![vec![blocked(1_000)], vec![blocked(9_000)]]);
        sampler.update().unwrap();
        sampler.update().unwrap();

        assert!(sampler.top_n(10).is_empty());
        assert_eq!(sampler.total_attributed_ns(), 0);
    }

    #[test]
    fn noise_frames_never_accrue_entries() {
        let noisy = |cpu| {
            thread(
                3,
                ThreadState::Runnable,
                cpu,
                vec![
                    frame("java.util.HashMap", "resize", 600),
                    frame("org.apache.io.Channel", "flush", 88),
                    frame("com.example.Cache", "put", 31),
                ],
            )
        };
        let sampler = sampler_with(vec![vec![noisy(0)], vec![noisy(4_000)]]);
        sampler.update().unwrap();
        sampler.update().unwrap();

        let top = sampler.top_n(10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].class_name, "com.example.Cache");
        assert_eq!(top[0].hits, 4_000);
    }

    #[test]
    fn fully_filtered_stack_contributes_nothing() {
        let t = |cpu| {
            thread(
                4,
                ThreadState::Runnable,
                cpu,
                vec![
                    frame("java.lang.Thread", "run", 830),
                    frame("sun.misc.Unsafe", "park", 0),
                ],
            )
        };
        let sampler = sampler_with(vec![vec![t(0)], vec![t(2_000)]]);
        sampler.update().unwrap();
        sampler.update().unwrap();

        assert!(sampler.top_n(10).is_empty());
        assert_eq!(sampler.update_count(), 0);
    }

    #[test]
    fn idle_poll_sentinel_stops_attribution() {
        let t = |cpu| {
            thread(
                5,
                ThreadState::Runnable,
                cpu,
                vec![
                    frame("sun.nio.ch.EPollArrayWrapper", "epollWait", -2),
                    frame("com.example.Selector", "select", 19),
                ],
            )
        };
        let sampler = sampler_with(vec![vec![t(0)], vec![t(3_000)]]);
        sampler.update().unwrap();
        sampler.update().unwrap();

        assert!(sampler.top_n(10).is_empty());
    }

    #[test]
    fn top_n_ranks_descending_and_bounds_the_slice() {
        let t = |id, class: &str, cpu| {
            thread(
                id,
                ThreadState::Runnable,
                cpu,
                vec![frame(class, "work", 1)],
            )
        };
        let sampler = sampler_with(vec![
            vec![
                t(1, "com.example.Small", 0),
                t(2, "com.example.Medium", 0),
                t(3, "com.example.Large", 0),
            ],
            vec![
                t(1, "com.example.Small", 100),
                t(2, "com.example.Medium", 2_000),
                t(3, "com.example.Large", 30_000),
            ],
        ]);
        sampler.update().unwrap();
        sampler.update().unwrap();

        let top = sampler.top_n(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].class_name, "com.example.Large");
        assert_eq!(top[1].class_name, "com.example.Medium");

        // Limit beyond table size returns the whole table.
        assert_eq!(sampler.top_n(50).len(), 3);
    }

    #[test]
    fn recycled_thread_id_counts_as_zero() {
        // Same id, but the cumulative counter went backwards: the id was
        // reused by a new thread. The negative interval must not underflow
        // or inflate any counter.
        let sampler = sampler_with(vec![
            vec![app_thread(6, 50_000)],
            vec![app_thread(6, 1_000)],
            vec![app_thread(6, 2_500)],
        ]);
        for _ in 0..3 {
            sampler.update().unwrap();
        }

        // Only the 1_000 -> 2_500 advance is real.
        assert_eq!(sampler.top_n(1)[0].hits, 1_500);
    }

    #[test]
    fn baseline_of_vanished_thread_is_pruned() {
        let sampler = sampler_with(vec![
            vec![app_thread(7, 90_000)],
            // Thread 7 died; nothing to sample this poll.
            vec![],
            // Id 7 reappears (recycled) with a small counter; without
            // pruning this would be read against the stale 90_000 baseline.
            vec![app_thread(7, 100)],
            vec![app_thread(7, 600)],
        ]);
        for _ in 0..4 {
            sampler.update().unwrap();
        }

        assert_eq!(sampler.top_n(1)[0].hits, 500);
    }

    #[test]
    fn source_failure_propagates_and_leaves_state_intact() {
        let sampler = sampler_with(vec![
            vec![app_thread(8, 0)],
            vec![app_thread(8, 1_000)],
            // Script exhausted: the third poll fails.
        ]);
        sampler.update().unwrap();
        sampler.update().unwrap();
        assert!(sampler.update().is_err());

        assert_eq!(sampler.top_n(1)[0].hits, 1_000);
        assert_eq!(sampler.update_count(), 1);
    }
}

//! Parser for `jstack` thread dumps.
//!
//! A dump contains one section per thread:
//!
//! ```text
//! "worker-1" #12 prio=5 os_prio=0 cpu=1234.56ms elapsed=99.20s tid=0x00007f... nid=0x1f03 runnable [0x00007f...]
//!    java.lang.Thread.State: RUNNABLE
//!         at com.example.OrderService.submit(OrderService.java:184)
//!         at java.base@17.0.1/java.lang.Thread.run(Thread.java:833)
//! ```
//!
//! VM-internal sections without a `java.lang.Thread.State:` line carry no
//! Java stack and end up with zero frames, which the sampler ignores.

use crate::cpu::{StackFrame, ThreadSnapshot, ThreadState};
use crate::error::{Error, Result};

/// Line number sentinel for native frames, matching the JVM convention.
const NATIVE_LINE: i32 = -2;
const UNKNOWN_LINE: i32 = -1;

/// Parse a complete `jstack` dump into thread snapshots. Unparseable frame
/// lines are skipped as noise; a dump with no thread headers at all is an
/// error (the tool produced something other than a dump).
pub fn parse(dump: &str) -> Result<Vec<ThreadSnapshot>> {
    let mut threads = Vec::new();
    let mut current: Option<ThreadSnapshot> = None;

    for line in dump.lines() {
        if line.starts_with('"') {
            if let Some(done) = current.take() {
                threads.push(done);
            }
            current = parse_header(line);
            continue;
        }

        let Some(thread) = current.as_mut() else {
            continue;
        };

        let trimmed = line.trim_start();
        if let Some(state) = trimmed.strip_prefix("java.lang.Thread.State: ") {
            thread.state = parse_state(state);
        } else if let Some(frame) = parse_frame(trimmed) {
            thread.frames.push(frame);
        }
    }
    if let Some(done) = current.take() {
        threads.push(done);
    }

    if threads.is_empty() {
        return Err(Error::ThreadDump(
            "no thread sections found in jstack output".to_string(),
        ));
    }
    Ok(threads)
}

/// Parse a thread header line: name in quotes, then `key=value` attributes.
/// Returns `None` when the native thread id is missing, since without it the
/// section cannot be correlated across polls.
fn parse_header(line: &str) -> Option<ThreadSnapshot> {
    // The thread name may itself contain spaces; attributes start after the
    // closing quote.
    let rest = &line[1..];
    let close = rest.find('"')?;
    let attrs = &rest[close + 1..];

    let id = i64::from_str_radix(attr_value(attrs, "nid=")?.trim_start_matches("0x"), 16).ok()?;

    // cpu= is present on modern JVMs; older dumps simply get zero, which
    // the sampler treats as no observable CPU advance.
    let cpu_time_ns = attr_value(attrs, "cpu=")
        .and_then(|v| v.trim_end_matches("ms").parse::<f64>().ok())
        .map(|ms| (ms * 1_000_000.0) as u64)
        .unwrap_or(0);

    Some(ThreadSnapshot {
        id,
        // Corrected by the java.lang.Thread.State line when present. VM
        // threads without one have no frames either, so they never
        // contribute.
        state: ThreadState::Runnable,
        cpu_time_ns,
        frames: Vec::new(),
    })
}

fn attr_value<'a>(attrs: &'a str, key: &str) -> Option<&'a str> {
    let start = attrs.find(key)? + key.len();
    let rest = &attrs[start..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn parse_state(state: &str) -> ThreadState {
    // The state may carry a qualifier, e.g. "TIMED_WAITING (sleeping)".
    match state.split_whitespace().next().unwrap_or("") {
        "RUNNABLE" => ThreadState::Runnable,
        "BLOCKED" => ThreadState::Blocked,
        "WAITING" => ThreadState::Waiting,
        "TIMED_WAITING" => ThreadState::TimedWaiting,
        "NEW" => ThreadState::New,
        _ => ThreadState::Terminated,
    }
}

/// Parse one `at package.Class.method(Source.java:NN)` frame line.
fn parse_frame(line: &str) -> Option<StackFrame> {
    let rest = line.strip_prefix("at ")?;
    let open = rest.find('(')?;
    let mut qualified = &rest[..open];
    let location = rest[open + 1..].trim_end_matches(')');

    // Strip a module qualifier like "java.base@17.0.1/"; lambda class names
    // also contain '/' but never an '@' before it.
    if let Some(slash) = qualified.find('/') {
        if qualified[..slash].contains('@') {
            qualified = &qualified[slash + 1..];
        }
    }

    let dot = qualified.rfind('.')?;
    let class_name = qualified[..dot].to_string();
    let method_name = qualified[dot + 1..].to_string();
    if class_name.is_empty() || method_name.is_empty() {
        return None;
    }

    let line_number = if location == "Native Method" {
        NATIVE_LINE
    } else {
        location
            .rsplit(':')
            .next()
            .and_then(|n| n.parse::<i32>().ok())
            .unwrap_or(UNKNOWN_LINE)
    };

    Some(StackFrame {
        class_name,
        method_name,
        line_number,
    })
}

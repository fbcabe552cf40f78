//! Concrete snapshot providers backed by the JDK command-line tools.
//!
//! `jstack` supplies thread dumps (states, per-thread CPU time, stacks) and
//! `jmap -histo` supplies the raw heap census. Both are invoked once per
//! poll; a failed invocation maps into the error enum and surfaces as a
//! failed poll without disturbing any aggregate state.

pub mod thread_dump;

use crate::cpu::{ThreadSampleSource, ThreadSnapshot};
use crate::error::{Error, Result};
use crate::heap::HeapCensusSource;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Locations of the JDK tools this profiler shells out to.
#[derive(Debug, Clone)]
pub struct JdkTools {
    jstack: PathBuf,
    jmap: PathBuf,
}

impl JdkTools {
    /// Find `jstack` and `jmap` under `$JAVA_HOME/bin`, falling back to a
    /// `$PATH` scan.
    pub fn locate() -> Result<Self> {
        Ok(JdkTools {
            jstack: find_tool("jstack")?,
            jmap: find_tool("jmap")?,
        })
    }

    pub fn thread_source(&self, pid: u32) -> JstackSource {
        JstackSource {
            jstack: self.jstack.clone(),
            pid,
        }
    }

    pub fn census_source(&self, pid: u32) -> HistoSource {
        HistoSource {
            jmap: self.jmap.clone(),
            pid,
        }
    }
}

fn find_tool(name: &str) -> Result<PathBuf> {
    if let Ok(home) = std::env::var("JAVA_HOME") {
        let candidate = Path::new(&home).join("bin").join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(Error::ToolNotFound {
        name: name.to_string(),
    })
}

/// Run one JDK tool against a pid and return its stdout.
fn run_tool(tool: &Path, args: &[&str], pid: u32) -> Result<String> {
    debug!("running {} {} {}", tool.display(), args.join(" "), pid);
    let output = Command::new(tool)
        .args(args)
        .arg(pid.to_string())
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let name = tool
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| tool.display().to_string());
        return Err(classify_failure(&name, pid, stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn classify_failure(tool: &str, pid: u32, stderr: &str) -> Error {
    let lowered = stderr.to_lowercase();
    if lowered.contains("no such process") || lowered.contains("not attachable") {
        Error::ProcessNotFound(format!("PID {}", pid))
    } else if lowered.contains("operation not permitted") || lowered.contains("well-known file is not secure") {
        Error::PermissionDenied(format!("{} cannot attach to PID {}", tool, pid))
    } else {
        Error::ToolFailed {
            tool: tool.to_string(),
            pid,
            message: stderr.to_string(),
        }
    }
}

/// Thread snapshot provider running `jstack` once per poll.
pub struct JstackSource {
    jstack: PathBuf,
    pid: u32,
}

impl ThreadSampleSource for JstackSource {
    fn sample(&mut self) -> Result<Vec<ThreadSnapshot>> {
        let dump = run_tool(&self.jstack, &[], self.pid)?;
        thread_dump::parse(&dump)
    }
}

/// Heap census provider running `jmap -histo` once per poll.
pub struct HistoSource {
    jmap: PathBuf,
    pid: u32,
}

impl HeapCensusSource for HistoSource {
    fn census(&mut self) -> Result<Vec<String>> {
        let out = run_tool(&self.jmap, &["-histo"], self.pid)?;
        Ok(out.lines().map(String::from).collect())
    }
}

use crate::error::{Error, Result};
use std::fs;

/// Information about a target JVM process.
pub struct ProcessInfo {
    pid: u32,
    /// Main class or jar name, best-effort from the command line.
    display_name: String,
}

impl ProcessInfo {
    /// Validate a pid against /proc and check it actually runs a JVM.
    pub fn new(pid: u32) -> Result<Self> {
        let proc_path = format!("/proc/{}", pid);
        if !std::path::Path::new(&proc_path).exists() {
            return Err(Error::ProcessNotFound(format!("PID {}", pid)));
        }

        let comm = fs::read_to_string(format!("{}/comm", proc_path))
            .map_err(|_| Error::ProcessNotFound(format!("Cannot read comm for PID {}", pid)))?
            .trim()
            .to_string();

        let cmdline = read_cmdline(pid)?;
        if !looks_like_jvm(&comm, &cmdline) {
            return Err(Error::NotAJvm(pid));
        }

        Ok(ProcessInfo {
            pid,
            display_name: jvm_display_name(&cmdline).unwrap_or(comm),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

fn read_cmdline(pid: u32) -> Result<Vec<String>> {
    let raw = fs::read(format!("/proc/{}/cmdline", pid))
        .map_err(|e| Error::PermissionDenied(format!("Cannot read cmdline for PID {}: {}", pid, e)))?;
    Ok(raw
        .split(|b| *b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect())
}

fn looks_like_jvm(comm: &str, cmdline: &[String]) -> bool {
    if comm == "java" || comm == "javaw" {
        return true;
    }
    cmdline.first().is_some_and(|argv0| {
        let binary = argv0.rsplit('/').next().unwrap_or(argv0);
        binary == "java" || binary == "javaw"
    })
}

/// Pick the main class or jar out of a java command line, skipping JVM
/// options and their values. Returns `None` for bare `java` invocations.
fn jvm_display_name(cmdline: &[String]) -> Option<String> {
    let mut args = cmdline.iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-jar" => {
                let jar = args.next()?;
                return Some(jar.rsplit('/').next().unwrap_or(jar).to_string());
            }
            "-cp" | "-classpath" | "--class-path" | "--module-path" => {
                // Option with a separate value.
                args.next();
            }
            other if other.starts_with('-') => {}
            main_class => return Some(main_class.to_string()),
        }
    }
    None
}

/// Find a JVM process whose main class or jar matches `pattern`
/// (pgrep-style substring match). Exactly one match is required.
pub fn find_jvm_by_name(pattern: &str) -> Result<u32> {
    let mut matches: Vec<(u32, String)> = Vec::new();

    for entry in fs::read_dir("/proc")? {
        let entry = entry?;
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() else {
            continue;
        };

        // Processes we cannot inspect (permissions, raced exits) are simply
        // not candidates.
        let Ok(cmdline) = read_cmdline(pid) else {
            continue;
        };
        let comm = fs::read_to_string(format!("/proc/{}/comm", pid)).unwrap_or_default();
        if !looks_like_jvm(comm.trim(), &cmdline) {
            continue;
        }

        let name = jvm_display_name(&cmdline).unwrap_or_else(|| comm.trim().to_string());
        if name.contains(pattern) {
            matches.push((pid, name));
        }
    }

    match matches.len() {
        0 => Err(Error::ProcessNotFound(format!(
            "No JVM process matching '{}'",
            pattern
        ))),
        1 => Ok(matches[0].0),
        _ => {
            let match_list = matches
                .iter()
                .map(|(pid, name)| format!("  PID {}: {}\n", pid, name))
                .collect::<String>();
            Err(Error::MultipleProcesses {
                pattern: pattern.to_string(),
                matches: match_list,
            })
        }
    }
}

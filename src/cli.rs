use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "jvmprof")]
#[command(about = "Sampling CPU and heap-census profiler for JVM processes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Process ID of the target JVM
    #[arg(long, short = 'p', global = true, conflicts_with = "process")]
    pub pid: Option<u32>,

    /// Process name to profile (pgrep-style matching, JVMs only)
    #[arg(long, short = 'P', global = true, conflicts_with = "pid")]
    pub process: Option<String>,

    /// Poll interval between samples
    #[arg(long, short = 'i', global = true, default_value = "1s", value_parser = parse_duration)]
    pub interval: Duration,

    /// Exit after N iterations (default: until Ctrl-C)
    #[arg(long, short = 'n', global = true)]
    pub iterations: Option<u64>,

    /// Number of ranked entries to display
    #[arg(long, global = true, default_value = "20")]
    pub top: usize,

    /// Additional class-name prefix to exclude from CPU attribution (repeatable)
    #[arg(long, value_name = "PREFIX")]
    pub filter_prefix: Vec<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Profile heap occupancy per class instead of CPU hotspots
    Memory {
        /// Annotate each class with its byte-size change since the previous poll
        #[arg(long)]
        deltas: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Try bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!("Invalid duration '{}'. Examples: 500ms, 1s, 5m", s))
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        let needs_target = !matches!(self.command, Some(Command::Completions { .. }));
        if needs_target && self.pid.is_none() && self.process.is_none() {
            return Err("Either --pid or --process is required".to_string());
        }

        if self.interval < Duration::from_millis(100) {
            return Err(format!(
                "Poll interval cannot be set below 100ms, got {}",
                humantime::format_duration(self.interval)
            ));
        }

        if self.top == 0 {
            return Err("--top must be at least 1".to_string());
        }

        Ok(())
    }
}

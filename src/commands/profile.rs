use super::{format_elapsed, format_ns, PollOptions, CLEAR_SCREEN};
use crate::cpu::{CpuSampler, NoiseFilter};
use crate::error::Result;
use crate::jdk::JdkTools;
use crate::process::ProcessInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// CPU hotspot mode: poll thread dumps at a fixed interval and redraw the
/// ranked call-site table until Ctrl-C or the iteration cap.
pub fn run(
    info: &ProcessInfo,
    tools: &JdkTools,
    opts: &PollOptions,
    filter: NoiseFilter,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let sampler = CpuSampler::new(Box::new(tools.thread_source(info.pid())), filter);
    let start = Instant::now();
    let mut iteration = 0u64;

    while running.load(Ordering::SeqCst) {
        sampler.update()?;
        render(info, &sampler, opts.top, start);

        iteration += 1;
        if opts.iterations.is_some_and(|n| iteration >= n) {
            break;
        }
        std::thread::sleep(opts.interval);
    }

    Ok(())
}

fn render(info: &ProcessInfo, sampler: &CpuSampler, limit: usize, start: Instant) {
    let entries = sampler.top_n(limit);
    let total = sampler.total_attributed_ns();

    print!("{}", CLEAR_SCREEN);
    println!(
        " jvmprof - {} (PID {})  {}  up {}",
        info.display_name(),
        info.pid(),
        chrono::Local::now().format("%H:%M:%S"),
        format_elapsed(start.elapsed()),
    );
    println!(
        " samples: {}  attributed cpu: {}",
        sampler.update_count(),
        format_ns(total),
    );
    println!();

    if entries.is_empty() {
        println!(" (no application call sites sampled yet)");
        return;
    }

    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(vec!["CPU%", "TIME", "METHOD"]);
    for entry in &entries {
        let share = if total > 0 {
            entry.hits as f64 * 100.0 / total as f64
        } else {
            0.0
        };
        table.add_row(vec![
            format!("{:.1}", share),
            format_ns(entry.hits),
            format!(
                "{}.{}:{}",
                entry.class_name, entry.method_name, entry.line_number
            ),
        ]);
    }
    for col in [0, 1] {
        if let Some(column) = table.column_mut(col) {
            column.set_cell_alignment(comfy_table::CellAlignment::Right);
        }
    }
    println!("{table}");
}

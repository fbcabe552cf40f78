use super::{format_elapsed, PollOptions, CLEAR_SCREEN};
use crate::error::Result;
use crate::heap::{HeapSampler, HistogramRecord};
use crate::jdk::JdkTools;
use crate::process::ProcessInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Heap census mode: poll the per-class histogram at a fixed interval and
/// redraw the ranked table, optionally annotated with per-class deltas.
pub fn run(
    info: &ProcessInfo,
    tools: &JdkTools,
    opts: &PollOptions,
    deltas: bool,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let mut sampler = HeapSampler::new(Box::new(tools.census_source(info.pid())));
    let start = Instant::now();
    let mut iteration = 0u64;

    while running.load(Ordering::SeqCst) {
        let records = sampler.histogram(opts.top, deltas)?;
        render(info, &records, deltas, start);

        iteration += 1;
        if opts.iterations.is_some_and(|n| iteration >= n) {
            break;
        }
        std::thread::sleep(opts.interval);
    }

    Ok(())
}

fn render(info: &ProcessInfo, records: &[HistogramRecord], deltas: bool, start: Instant) {
    print!("{}", CLEAR_SCREEN);
    println!(
        " jvmprof memory - {} (PID {})  {}  up {}",
        info.display_name(),
        info.pid(),
        chrono::Local::now().format("%H:%M:%S"),
        format_elapsed(start.elapsed()),
    );
    println!();

    if records.is_empty() {
        println!(" (no census data yet)");
        return;
    }

    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    let mut header = vec!["INSTANCES", "BYTES", "SIZE", "CLASS"];
    if deltas {
        header.push("DELTA");
    }
    table.set_header(header);

    for record in records {
        let mut row = vec![
            record.count.to_string(),
            record.bytes.to_string(),
            record.human_bytes(),
            record.class_name.clone(),
        ];
        if deltas {
            row.push(match record.direction {
                Some(direction) => {
                    format!("{}{:.3}%", direction.glyph(), record.delta_percent)
                }
                None => String::new(),
            });
        }
        table.add_row(row);
    }

    for col in [0, 1, 2] {
        if let Some(column) = table.column_mut(col) {
            column.set_cell_alignment(comfy_table::CellAlignment::Right);
        }
    }
    println!("{table}");
}

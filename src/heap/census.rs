use super::HeapCensusSource;
use crate::error::Result;
use log::debug;

const KIB: u64 = 1024;

/// Binary-prefix units, largest first.
const UNITS: &[(u64, &str)] = &[
    (KIB * KIB * KIB * KIB, "TiB"),
    (KIB * KIB * KIB, "GiB"),
    (KIB * KIB, "MiB"),
    (KIB, "KiB"),
];

/// Whether a class's byte size grew or shrank since the previous census.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn glyph(self) -> &'static str {
        match self {
            Direction::Increase => "▲",
            Direction::Decrease => "▼",
        }
    }
}

/// One class's heap occupancy at a census instant.
///
/// Identity for delta matching is the class name alone; count and bytes are
/// volatile. Ranking is a separate concern and always orders by bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramRecord {
    /// Decoded, human-readable class name.
    pub class_name: String,
    /// Live instance count.
    pub count: u64,
    /// Live bytes occupied by all instances.
    pub bytes: u64,
    /// Unsigned percentage change versus the previous census, 0 when no
    /// prior record exists or nothing changed.
    pub delta_percent: f64,
    /// Set only when `delta_percent` is non-zero.
    pub direction: Option<Direction>,
}

impl HistogramRecord {
    fn new(descriptor: &str, count: u64, bytes: u64) -> Self {
        HistogramRecord {
            class_name: decode_descriptor(descriptor),
            count,
            bytes,
            delta_percent: 0.0,
            direction: None,
        }
    }

    /// Byte size in human form, e.g. "1.500 KiB".
    pub fn human_bytes(&self) -> String {
        format_bytes(self.bytes)
    }
}

/// Heap census differencer.
///
/// Each call to [`histogram`](HeapSampler::histogram) pulls one raw census
/// from the source, parses and ranks it, and retains it as the reference
/// for the next call's deltas. Only the single most recent census is kept.
pub struct HeapSampler {
    source: Box<dyn HeapCensusSource + Send>,
    previous: Option<Vec<HistogramRecord>>,
}

impl HeapSampler {
    pub fn new(source: Box<dyn HeapCensusSource + Send>) -> Self {
        HeapSampler {
            source,
            previous: None,
        }
    }

    /// Poll the source and return the `limit` largest classes by bytes,
    /// descending. With `compute_deltas`, each record carries its percentage
    /// change against the previous poll's record of the same class.
    ///
    /// A source failure propagates and the retained census is left as-is.
    pub fn histogram(&mut self, limit: usize, compute_deltas: bool) -> Result<Vec<HistogramRecord>> {
        let lines = self.source.census()?;

        let mut records: Vec<HistogramRecord> = lines
            .iter()
            .filter_map(|line| parse_line(line))
            .collect();
        debug!("census: {} classes from {} lines", records.len(), lines.len());

        // Stable sort: equal-byte classes keep their census order.
        records.sort_by_key(|r| std::cmp::Reverse(r.bytes));

        if compute_deltas {
            if let Some(previous) = &self.previous {
                update_deltas(&mut records, previous);
            }
        }

        let top: Vec<HistogramRecord> = records.iter().take(limit).cloned().collect();
        // Keep the full census for the next diff; classes outside the
        // display window still need a reference point.
        self.previous = Some(records);
        Ok(top)
    }
}

/// Annotate `records` with the percentage change against `previous`,
/// matching by class name. O(n*m), acceptable at loaded-class counts.
fn update_deltas(records: &mut [HistogramRecord], previous: &[HistogramRecord]) {
    for record in records.iter_mut() {
        let Some(old) = previous.iter().find(|o| o.class_name == record.class_name) else {
            continue;
        };
        if old.bytes == 0 {
            continue;
        }
        let change = (record.bytes as f64 - old.bytes as f64) * 100.0 / old.bytes as f64;
        if change != 0.0 {
            record.delta_percent = change.abs();
            record.direction = Some(if change > 0.0 {
                Direction::Increase
            } else {
                Direction::Decrease
            });
        }
    }
}

/// Parse one census line of the form
/// `   12:        3456      789012  [Ljava.lang.Object;`.
/// Anything else (headers, totals, garbage) yields `None`.
fn parse_line(line: &str) -> Option<HistogramRecord> {
    let mut tokens = line.split_whitespace();

    let index = tokens.next()?;
    let rank = index.strip_suffix(':')?;
    rank.parse::<u64>().ok()?;

    let count = tokens.next()?.parse::<u64>().ok()?;
    let bytes = tokens.next()?.parse::<u64>().ok()?;

    // The descriptor may carry trailing annotations (e.g. a module suffix);
    // take everything that remains.
    let descriptor = tokens.collect::<Vec<_>>().join(" ");
    if descriptor.is_empty() {
        return None;
    }

    Some(HistogramRecord::new(&descriptor, count, bytes))
}

/// Decode a JNI type descriptor into a readable type name.
///
/// `[` wraps an array (recursing on the remainder), `L...;` wraps an object
/// type, single letters are primitives. Anything unrecognized passes through
/// unchanged so unknown encodings still render.
pub fn decode_descriptor(descriptor: &str) -> String {
    if let Some(inner) = descriptor.strip_prefix('[') {
        return format!("{}[]", decode_descriptor(inner));
    }
    if descriptor.starts_with('L') && descriptor.ends_with(';') {
        return descriptor[1..descriptor.len() - 1].to_string();
    }
    match descriptor {
        "B" => "boolean".to_string(),
        "C" => "char".to_string(),
        "S" => "short".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "F" => "float".to_string(),
        "D" => "double".to_string(),
        other => other.to_string(),
    }
}

/// Format a byte count with the largest binary-prefix unit whose scaled
/// value has a positive integer part, to three decimals. Values below one
/// KiB render as a plain integer.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < KIB {
        return format!("{} B", bytes);
    }
    for (unit, suffix) in UNITS {
        if bytes >= *unit {
            return format!("{:.3} {}", bytes as f64 / *unit as f64, suffix);
        }
    }
    unreachable!("bytes >= KIB always matches a unit")
}

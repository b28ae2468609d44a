// Post-run statistics over the rows a stream trace recorded.

use crate::trace::PacketEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub name: String,
    pub samples: usize,
    pub drop_rate: f64,
    pub mean_latency_s: f64,
    pub min_latency_s: f64,
    pub max_latency_s: f64,
    pub mean_jitter_s: f64,
    pub mean_throughput_bytes_per_s: f64,
}

pub fn latencies(entries: &[PacketEntry]) -> Vec<f64> {
    entries.iter().map(|e| e.latency().as_secs_f64()).collect()
}

/// |latency difference| of each consecutive pair, one shorter than the input.
pub fn jitter(entries: &[PacketEntry]) -> Vec<f64> {
    latencies(entries)
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .collect()
}

/// Bytes over the receive span. The first packet only opens the window, so
/// its bytes are not counted.
pub fn mean_throughput(entries: &[PacketEntry]) -> f64 {
    let (Some(first), Some(last)) = (
        entries.iter().map(|e| e.recv_time).min(),
        entries.iter().map(|e| e.recv_time).max(),
    ) else {
        return 0.0;
    };

    let elapsed = (last - first).as_secs_f64();
    if elapsed <= 0.0 {
        return 0.0;
    }
    let bytes: u64 = entries.iter().skip(1).map(|e| e.packet_size as u64).sum();
    bytes as f64 / elapsed
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn analyze(name: &str, entries: &[PacketEntry], drop_rate: f64) -> AnalysisReport {
    let lat = latencies(entries);

    AnalysisReport {
        name: name.to_string(),
        samples: entries.len(),
        drop_rate,
        mean_latency_s: mean(&lat),
        min_latency_s: lat.iter().copied().reduce(f64::min).unwrap_or(0.0),
        max_latency_s: lat.iter().copied().reduce(f64::max).unwrap_or(0.0),
        mean_jitter_s: mean(&jitter(entries)),
        mean_throughput_bytes_per_s: mean_throughput(entries),
    }
}

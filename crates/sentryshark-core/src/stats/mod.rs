//! Per-window traffic statistics.

pub mod entropy;
pub mod history;

use serde::{Deserialize, Serialize};

use crate::packet::Packet;
use entropy::shannon_entropy;

/// Floor applied to a window's duration to avoid division by zero when two
/// packets share (or nearly share) a timestamp.
const MIN_DURATION_S: f64 = 1e-6;

/// Per-window aggregate statistics, computed once when a window closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowStats {
    /// Nominal window start (window-processor boundary, not first packet ts).
    pub start_time: f64,
    /// Nominal window end (window-processor boundary, not last packet ts).
    pub end_time: f64,
    pub packet_count: u64,
    pub total_bytes: u64,
    pub duration_s: f64,
    pub pps: f64,
    pub bps: f64,
    pub src_ip_entropy: f64,
    pub dst_ip_entropy: f64,
    pub dst_port_entropy: f64,
    pub inter_arrival_times: Vec<f64>,
}

/// Computes `WindowStats` from a non-empty packet list and the window's
/// nominal (boundary) bounds.
///
/// Panics if `packets` is empty; the window processor never closes an empty
/// window (see [`crate::window::WindowProcessor`]).
pub fn compute_window_stats(packets: &[Packet], start_time: f64, end_time: f64) -> WindowStats {
    assert!(!packets.is_empty(), "window stats require at least one packet");

    let timestamps: Vec<f64> = packets.iter().filter_map(|p| p.timestamp).collect();
    let first_ts = timestamps.first().copied().unwrap_or(start_time);
    let last_ts = timestamps.last().copied().unwrap_or(start_time);
    let duration_s = (last_ts - first_ts).max(MIN_DURATION_S);

    let packet_count = packets.len() as u64;
    let total_bytes: u64 = packets.iter().map(|p| p.length as u64).sum();

    let src_ips: Vec<_> = packets.iter().filter_map(|p| p.ip().map(|ip| ip.src)).collect();
    let dst_ips: Vec<_> = packets.iter().filter_map(|p| p.ip().map(|ip| ip.dst)).collect();
    let dst_ports: Vec<_> = packets.iter().filter_map(|p| p.dst_port()).collect();

    let mut inter_arrival_times = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        if i == 0 {
            inter_arrival_times.push(0.0);
        } else {
            inter_arrival_times.push(ts - timestamps[i - 1]);
        }
    }

    WindowStats {
        start_time,
        end_time,
        packet_count,
        total_bytes,
        duration_s,
        pps: packet_count as f64 / duration_s,
        bps: (total_bytes as f64 * 8.0) / duration_s,
        src_ip_entropy: shannon_entropy(&src_ips),
        dst_ip_entropy: shannon_entropy(&dst_ips),
        dst_port_entropy: shannon_entropy(&dst_ports),
        inter_arrival_times,
    }
}

//! Groups a packet sequence into fixed-duration, contiguous time windows
//! with a hard cap on in-memory packets per window.

use crate::packet::Packet;
use crate::stats::{WindowStats, compute_window_stats};

pub const DEFAULT_MAX_WINDOW_PACKETS: usize = 10_000;

pub struct WindowProcessor {
    window_size_s: f64,
    max_window_packets: usize,
    current_window: Vec<Packet>,
    window_start_time: Option<f64>,
    dropped_packets_count: u64,
}

impl WindowProcessor {
    pub fn new(window_size_s: f64, max_window_packets: usize) -> Self {
        Self {
            window_size_s,
            max_window_packets,
            current_window: Vec::new(),
            window_start_time: None,
            dropped_packets_count: 0,
        }
    }

    /// Feeds one packet into the processor. Returns a closed window when
    /// `packet`'s timestamp crosses the current window's boundary;
    /// otherwise returns `None`. A packet with no usable timestamp is
    /// silently skipped (never buffered, never counted as dropped).
    pub fn push(&mut self, packet: Packet) -> Option<(WindowStats, Vec<Packet>)> {
        let t = packet.timestamp?;

        let closed = match self.window_start_time {
            None => {
                self.window_start_time = Some(t);
                None
            }
            Some(start) if t >= start + self.window_size_s => {
                let closed = self.close_window(start);
                self.window_start_time = Some(t);
                closed
            }
            Some(_) => None,
        };

        if closed.is_some() {
            self.current_window.push(packet);
        } else if self.current_window.len() < self.max_window_packets {
            self.current_window.push(packet);
        } else {
            self.dropped_packets_count += 1;
        }

        closed
    }

    /// Flushes the trailing non-empty window after the packet stream ends.
    pub fn flush(mut self) -> Option<(WindowStats, Vec<Packet>)> {
        let start = self.window_start_time?;
        self.close_window(start)
    }

    fn close_window(&mut self, window_start_time: f64) -> Option<(WindowStats, Vec<Packet>)> {
        if self.current_window.is_empty() {
            self.dropped_packets_count = 0;
            return None;
        }
        let start_time = window_start_time;
        let end_time = window_start_time + self.window_size_s;
        let packets = std::mem::take(&mut self.current_window);
        let stats = compute_window_stats(&packets, start_time, end_time);

        if self.dropped_packets_count > 0 {
            tracing::warn!(
                count = self.dropped_packets_count,
                "window hit max_window_packets; dropped trailing packets"
            );
        }
        self.dropped_packets_count = 0;

        Some((stats, packets))
    }
}

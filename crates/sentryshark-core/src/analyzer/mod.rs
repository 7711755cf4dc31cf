//! Drives the full pipeline: streamer -> window processor -> detector fleet
//! -> fusion -> `AnalysisResult`.
//!
//! Detector state lives for the lifetime of one `Analyzer`; a fresh
//! `Analyzer` is required per analysis run (see `config::AnalyzerConfig`'s
//! `parallel_workers` note — running several runs concurrently means one
//! `Analyzer` per worker, never a shared one).

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::config::AnalyzerConfig;
use crate::detectors::{self, Detection, Detector, fusion};
use crate::error::AnalysisError;
use crate::packet::Packet;
use crate::source::{PacketSource, PcapFileSource};
use crate::stats::WindowStats;
use crate::streamer::PacketStreamer;
use crate::window::{DEFAULT_MAX_WINDOW_PACKETS, WindowProcessor};

/// Current result schema version.
pub const REPORT_VERSION: u32 = 1;
/// Timestamp used when a run produced no windows.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";
/// `top_source_ips`/`top_dest_ports` are capped at this many entries.
const TOP_N: usize = 5;

/// Tool identification metadata embedded in every result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// One entry of a `top_source_ips`/`top_dest_ports` ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopCount {
    pub key: String,
    pub packet_count: u64,
}

/// Run-wide aggregates that don't belong to any single window or detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub window_count: u64,
    pub detection_count: u64,
    pub avg_pps: f64,
    pub avg_bps: f64,
}

/// The full output of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub report_version: u32,
    pub tool: ToolInfo,
    pub generated_at: String,

    pub pcap_path: String,
    pub first_window_start: Option<f64>,
    pub last_window_end: Option<f64>,
    pub total_packets: u64,
    pub total_bytes: u64,

    pub detections: Vec<Detection>,
    pub window_stats: Vec<WindowStats>,
    pub top_source_ips: Vec<TopCount>,
    pub top_dest_ports: Vec<TopCount>,
    pub summary_stats: SummaryStats,
}

/// Owns the detector fleet and drives one analysis run end to end.
pub struct Analyzer {
    config: AnalyzerConfig,
    detector_fleet: Vec<Box<dyn Detector>>,
}

impl Analyzer {
    /// Validates `config` and builds the five detectors in their fixed
    /// order. Fails with `ConfigError` if a parameter is out of range.
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let detector_fleet = detectors::build_detectors(&config);
        Ok(Self {
            config,
            detector_fleet,
        })
    }

    /// Runs the pipeline over `source` to completion, returning the fused
    /// `AnalysisResult`. `pcap_path` is recorded verbatim in the result; it
    /// need not refer to a real file (useful for in-memory sources in tests).
    pub fn analyze_source<S: PacketSource>(
        &mut self,
        pcap_path: &str,
        source: S,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut streamer = PacketStreamer::new(source);
        let mut window_processor =
            WindowProcessor::new(self.config.window_size_s(), DEFAULT_MAX_WINDOW_PACKETS);
        let mut run = RunAggregates::new();

        tracing::info!(path = pcap_path, "starting analysis");

        while let Some(packet) = streamer.next_packet()? {
            if let Some((stats, packets)) = window_processor.push(packet) {
                run.record_window(&stats, &packets, &mut self.detector_fleet);
            }
        }
        if let Some((stats, packets)) = window_processor.flush() {
            run.record_window(&stats, &packets, &mut self.detector_fleet);
        }

        tracing::info!(
            windows = run.window_stats.len(),
            packets = run.total_packets,
            "analysis complete"
        );

        Ok(run.into_result(pcap_path))
    }
}

/// Per-run mutable state threaded through every closed window: totals,
/// per-window stats, raw (pre-fusion) detections, and the top-N counters.
struct RunAggregates {
    total_packets: u64,
    total_bytes: u64,
    first_window_start: Option<f64>,
    last_window_end: Option<f64>,
    window_stats: Vec<WindowStats>,
    raw_detections: Vec<Detection>,
    source_ip_counts: HashMap<IpAddr, u64>,
    dest_port_counts: HashMap<u16, u64>,
}

impl RunAggregates {
    fn new() -> Self {
        Self {
            total_packets: 0,
            total_bytes: 0,
            first_window_start: None,
            last_window_end: None,
            window_stats: Vec::new(),
            raw_detections: Vec::new(),
            source_ip_counts: HashMap::new(),
            dest_port_counts: HashMap::new(),
        }
    }

    fn record_window(
        &mut self,
        stats: &WindowStats,
        packets: &[Packet],
        detector_fleet: &mut [Box<dyn Detector>],
    ) {
        self.total_packets += stats.packet_count;
        self.total_bytes += stats.total_bytes;
        self.first_window_start.get_or_insert(stats.start_time);
        self.last_window_end = Some(stats.end_time);

        for packet in packets {
            if let Some(ip) = packet.ip() {
                *self.source_ip_counts.entry(ip.src).or_insert(0) += 1;
            }
            if let Some(port) = packet.dst_port() {
                *self.dest_port_counts.entry(port).or_insert(0) += 1;
            }
        }

        for detector in detector_fleet.iter_mut() {
            self.raw_detections.extend(detector.analyze(stats, packets));
        }

        self.window_stats.push(stats.clone());
    }

    fn into_result(self, pcap_path: &str) -> AnalysisResult {
        let window_count = self.window_stats.len() as u64;
        let avg_pps = mean(self.window_stats.iter().map(|w| w.pps));
        let avg_bps = mean(self.window_stats.iter().map(|w| w.bps));

        let detections = fusion::fuse(self.raw_detections);
        let generated_at = self
            .last_window_end
            .and_then(ts_to_rfc3339)
            .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());

        AnalysisResult {
            report_version: REPORT_VERSION,
            tool: ToolInfo {
                name: "sentryshark".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            generated_at,
            pcap_path: pcap_path.to_string(),
            first_window_start: self.first_window_start,
            last_window_end: self.last_window_end,
            total_packets: self.total_packets,
            total_bytes: self.total_bytes,
            top_source_ips: top_n(self.source_ip_counts, |ip| ip.to_string()),
            top_dest_ports: top_n(self.dest_port_counts, |port| port.to_string()),
            summary_stats: SummaryStats {
                window_count,
                detection_count: detections.len() as u64,
                avg_pps,
                avg_bps,
            },
            detections,
            window_stats: self.window_stats,
        }
    }
}

/// Ranks `counts` descending, breaking ties by ascending stringified key for
/// determinism, and keeps at most `TOP_N` entries.
fn top_n<K: Copy>(counts: HashMap<K, u64>, to_key: impl Fn(K) -> String) -> Vec<TopCount> {
    let mut entries: Vec<TopCount> = counts
        .into_iter()
        .map(|(k, packet_count)| TopCount {
            key: to_key(k),
            packet_count,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.packet_count
            .cmp(&a.packet_count)
            .then_with(|| a.key.cmp(&b.key))
    });
    entries.truncate(TOP_N);
    entries
}

fn mean(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let count = values.clone().count();
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

fn ts_to_rfc3339(ts: f64) -> Option<String> {
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

/// Analyzes a capture file on disk with the default `AnalyzerConfig`.
pub fn analyze_pcap_file(path: &Path) -> Result<AnalysisResult, AnalysisError> {
    analyze_pcap_file_with_config(path, AnalyzerConfig::default())
}

/// Analyzes a capture file on disk with a caller-supplied configuration.
pub fn analyze_pcap_file_with_config(
    path: &Path,
    config: AnalyzerConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let source = PcapFileSource::open(path)?;
    let mut analyzer = Analyzer::new(config)?;
    analyzer.analyze_source(&path.display().to_string(), source)
}

/// Analyzes an arbitrary `PacketSource` with the default `AnalyzerConfig`,
/// recording `path` as the result's `pcap_path` without opening it.
pub fn analyze_source<S: PacketSource>(
    path: &Path,
    source: S,
) -> Result<AnalysisResult, AnalysisError> {
    let mut analyzer = Analyzer::new(AnalyzerConfig::default())?;
    analyzer.analyze_source(&path.display().to_string(), source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{IpLayer, Packet, UdpLayer};
    use crate::stats::compute_window_stats;
    use std::net::Ipv4Addr;

    fn packet(src: [u8; 4], dport: u16) -> Packet {
        Packet::new(Some(0.0), 100)
            .with_ip(IpLayer {
                src: IpAddr::V4(Ipv4Addr::from(src)),
                dst: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                proto: 17,
            })
            .with_udp(UdpLayer {
                sport: 1234,
                dport,
            })
    }

    #[test]
    fn top_n_breaks_ties_by_ascending_key() {
        let mut counts = HashMap::new();
        counts.insert(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 5u64);
        counts.insert(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 5u64);
        counts.insert(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)), 9u64);
        let ranked = top_n(counts, |ip| ip.to_string());
        assert_eq!(ranked[0].key, "10.0.0.3");
        assert_eq!(ranked[1].key, "10.0.0.1");
        assert_eq!(ranked[2].key, "10.0.0.2");
    }

    #[test]
    fn top_n_is_capped_at_five() {
        let mut counts = HashMap::new();
        for i in 0..10u8 {
            counts.insert(IpAddr::V4(Ipv4Addr::new(10, 0, 0, i)), i as u64);
        }
        let ranked = top_n(counts, |ip| ip.to_string());
        assert_eq!(ranked.len(), TOP_N);
    }

    #[test]
    fn run_aggregates_accumulate_totals_and_top_counts() {
        let mut run = RunAggregates::new();
        let packets = vec![packet([10, 0, 0, 5], 80), packet([10, 0, 0, 5], 443)];
        let stats = compute_window_stats(&packets, 0.0, 10.0);
        let mut fleet: Vec<Box<dyn Detector>> = Vec::new();
        run.record_window(&stats, &packets, &mut fleet);

        let result = run.into_result("test.pcap");
        assert_eq!(result.total_packets, 2);
        assert_eq!(result.top_source_ips[0].key, "10.0.0.5");
        assert_eq!(result.top_source_ips[0].packet_count, 2);
        assert_eq!(result.summary_stats.window_count, 1);
    }

    #[test]
    fn empty_stream_produces_a_well_formed_result() {
        let run = RunAggregates::new();
        let result = run.into_result("empty.pcap");
        assert_eq!(result.total_packets, 0);
        assert!(result.window_stats.is_empty());
        assert!(result.detections.is_empty());
        assert_eq!(result.generated_at, DEFAULT_GENERATED_AT);
    }
}

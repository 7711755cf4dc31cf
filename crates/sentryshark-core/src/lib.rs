//! SentryShark core library for offline PCAP/PCAPNG anomaly analysis.
//!
//! This crate exposes the analysis pipeline used by the CLI and tests: a
//! packet source feeds a lazy streamer, which a window processor buckets
//! into fixed-duration windows; each window is run through five stateful
//! detectors whose output is fused into a deterministic `AnalysisResult`.
//! Packet decoding is byte-oriented and side-effect free; all I/O is
//! isolated in `source` modules.
//!
//! Key guarantees:
//! - Detector state is bounded and lives for one analysis run.
//! - Detection evidence keys are stable (`ip`, `source_ip`, `domain`,
//!   `flow_key`), so fusion can dedupe across detectors.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use sentryshark_core::analyze_pcap_file;
//!
//! let result = analyze_pcap_file(Path::new("capture.pcapng"))?;
//! println!("result schema version: {}", result.report_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod analyzer;
mod config;
mod detectors;
mod error;
mod packet;
mod protocols;
mod source;
mod stats;
mod streamer;
mod window;

pub use analyzer::{
    AnalysisResult, Analyzer, DEFAULT_GENERATED_AT, REPORT_VERSION, SummaryStats, ToolInfo,
    TopCount, analyze_pcap_file, analyze_pcap_file_with_config, analyze_source,
};
pub use config::{AnalyzerConfig, EngineId, ModelConfig};
pub use detectors::{Detection, Detector, build_detectors};
pub use error::{
    AnalysisError, ConfigError, DetectorInputError, PacketDecodeError, SourceOpenError,
};
pub use packet::{
    ArpLayer, DnsLayer, IpLayer, Packet, TcpLayer, UdpLayer, flow_key, flow_key_for_packet,
};
pub use source::{PacketEvent, PacketSource, PcapFileSource, SourceError};
pub use stats::{WindowStats, compute_window_stats};
pub use streamer::PacketStreamer;
pub use window::WindowProcessor;

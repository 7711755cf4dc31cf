//! End-to-end scenarios: a synthetic in-memory `PacketSource` feeds the full
//! pipeline (streamer -> window processor -> detector fleet -> fusion) via
//! `Analyzer`, and each scenario asserts on the fused `AnalysisResult`.

use std::collections::VecDeque;

use etherparse::PacketBuilder;
use pcap_parser::Linktype;

use sentryshark_core::{
    Analyzer, AnalyzerConfig, EngineId, ModelConfig, PacketEvent, PacketSource, SourceError,
};

struct MemorySource(VecDeque<PacketEvent>);

impl PacketSource for MemorySource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        Ok(self.0.pop_front())
    }
}

/// Builds a `ModelConfig` overriding `window_size_s` (a dedicated field, not
/// a `params` entry) plus whatever detector-specific knobs are given.
fn model(window_size_s: f64, params: &[(&str, f64)]) -> ModelConfig {
    ModelConfig {
        window_size_s,
        params: params.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        ..Default::default()
    }
}

fn udp_frame(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4(src, dst, 64)
        .udp(sport, dport);
    let mut data = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut data, payload).unwrap();
    data
}

fn tcp_syn_frame(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4(src, dst, 64)
        .tcp(sport, dport, 0, 4096);
    let mut data = Vec::with_capacity(builder.size(0));
    builder.write(&mut data, &[]).unwrap();
    data
}

/// Hand-builds an Ethernet+ARP frame (14-byte ethernet header, 28-byte ARP
/// body) the same way `packet::decode`'s own tests do.
fn arp_frame(op: u16, psrc: [u8; 4], pdst: [u8; 4], hwsrc: [u8; 6]) -> Vec<u8> {
    let mut data = vec![0u8; 14 + 28];
    data[12..14].copy_from_slice(&0x0806u16.to_be_bytes());
    data[14..16].copy_from_slice(&1u16.to_be_bytes()); // hw type ethernet
    data[16..18].copy_from_slice(&0x0800u16.to_be_bytes()); // proto type ipv4
    data[18] = 6;
    data[19] = 4;
    data[20..22].copy_from_slice(&op.to_be_bytes());
    data[22..28].copy_from_slice(&hwsrc);
    data[28..32].copy_from_slice(&psrc);
    data[38..42].copy_from_slice(&pdst);
    data
}

fn encode_dns_question(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.') {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out.extend_from_slice(&1u16.to_be_bytes()); // qtype A
    out.extend_from_slice(&1u16.to_be_bytes()); // qclass IN
    out
}

fn dns_query_payload(name: &str) -> Vec<u8> {
    let mut payload = vec![0u8; 12];
    payload[4..6].copy_from_slice(&1u16.to_be_bytes()); // qdcount
    payload.extend_from_slice(&encode_dns_question(name));
    payload
}

fn push_event(events: &mut VecDeque<PacketEvent>, ts: f64, data: Vec<u8>) {
    events.push_back(PacketEvent {
        ts: Some(ts),
        linktype: Linktype::ETHERNET,
        data,
    });
}

#[test]
fn ddos_spike_after_stable_baseline_is_flagged_once() {
    let mut config = AnalyzerConfig::default();
    config.models.insert(
        EngineId::DdosVolume,
        model(1.0, &[("pps_z_threshold", 3.0)]),
    );
    let mut analyzer = Analyzer::new(config).unwrap();

    let mut events = VecDeque::new();
    // 100 baseline windows: 10 packets each, spread across the first 0.9s
    // of a 1s window, constant source/dest so entropy never collapses.
    for window in 0..100 {
        for i in 0..10 {
            let ts = window as f64 + i as f64 * 0.1;
            push_event(
                &mut events,
                ts,
                udp_frame([10, 0, 0, 5], [10, 0, 0, 1], 40000, 9999, &[0u8; 8]),
            );
        }
    }
    // One spike window: 80 packets packed into the same 1s window.
    for i in 0..80 {
        let ts = 100.0 + i as f64 * (0.99 / 79.0);
        push_event(
            &mut events,
            ts,
            udp_frame([10, 0, 0, 5], [10, 0, 0, 1], 40000, 9999, &[0u8; 8]),
        );
    }

    let result = analyzer
        .analyze_source("synthetic", MemorySource(events))
        .unwrap();

    let spikes: Vec<_> = result
        .detections
        .iter()
        .filter(|d| d.label == "High Volume Anomaly (DDoS Suspect)")
        .collect();
    assert_eq!(spikes.len(), 1);
}

#[test]
fn source_ip_entropy_collapse_is_flagged() {
    let mut config = AnalyzerConfig::default();
    config.models.insert(
        EngineId::DdosVolume,
        model(1.0, &[("entropy_drop_ratio", 0.5)]),
    );
    let mut analyzer = Analyzer::new(config).unwrap();

    let mut events = VecDeque::new();
    // 100 baseline windows: 32 packets each from 32 distinct source IPs,
    // one packet per IP -> H = log2(32) = 5.0 exactly.
    for window in 0..100 {
        for i in 0..32u8 {
            let ts = window as f64 + i as f64 * 0.02;
            push_event(
                &mut events,
                ts,
                udp_frame([10, 0, 0, i], [10, 0, 0, 255], 40000, 9999, &[0u8; 8]),
            );
        }
    }
    // Collapse window: 32 packets split evenly between 2 source IPs ->
    // H = log2(2) = 1.0 exactly.
    for i in 0..32u8 {
        let ts = 100.0 + i as f64 * 0.02;
        let src = if i % 2 == 0 { [10, 0, 0, 1] } else { [10, 0, 0, 2] };
        push_event(
            &mut events,
            ts,
            udp_frame(src, [10, 0, 0, 255], 40000, 9999, &[0u8; 8]),
        );
    }

    let result = analyzer
        .analyze_source("synthetic", MemorySource(events))
        .unwrap();

    let collapses: Vec<_> = result
        .detections
        .iter()
        .filter(|d| d.label == "Source IP Entropy Collapse")
        .collect();
    assert_eq!(collapses.len(), 1);
}

#[test]
fn port_scan_across_two_windows_is_flagged_once_with_source_ip_evidence() {
    let mut config = AnalyzerConfig::default();
    config.models.insert(
        EngineId::PortScan,
        model(10.0, &[("min_unique_ports", 10.0)]),
    );
    let mut analyzer = Analyzer::new(config).unwrap();

    let mut events = VecDeque::new();
    // Window 1 (default 10s window): 6 distinct ports, below the 10-port
    // threshold on its own.
    for (i, port) in (2000..2006u16).enumerate() {
        push_event(
            &mut events,
            i as f64 * 0.1,
            tcp_syn_frame([10, 0, 0, 9], [10, 0, 0, 1], 50000, port),
        );
    }
    // Window 2 (past the 10s boundary): 19 more distinct ports, cumulative
    // 25 total >= 10.
    for (i, port) in (2006..2025u16).enumerate() {
        push_event(
            &mut events,
            11.0 + i as f64 * 0.1,
            tcp_syn_frame([10, 0, 0, 9], [10, 0, 0, 1], 50000, port),
        );
    }

    let result = analyzer
        .analyze_source("synthetic", MemorySource(events))
        .unwrap();

    let scans: Vec<_> = result
        .detections
        .iter()
        .filter(|d| d.label == "Port Scan Suspect (Stateful)")
        .collect();
    assert_eq!(scans.len(), 1);
    assert!(scans[0].score >= 10.0);
    assert_eq!(
        scans[0].evidence.get("source_ip").unwrap().as_str(),
        Some("10.0.0.9")
    );
}

#[test]
fn gratuitous_arp_flood_is_flagged_with_exact_count() {
    let config = AnalyzerConfig::default();
    let mut analyzer = Analyzer::new(config).unwrap();

    let mut events = VecDeque::new();
    for i in 0..8 {
        push_event(
            &mut events,
            i as f64 * 0.1,
            arp_frame(2, [10, 0, 0, 5], [10, 0, 0, 5], [9, 9, 9, 9, 9, 9]),
        );
    }

    let result = analyzer
        .analyze_source("synthetic", MemorySource(events))
        .unwrap();

    let floods: Vec<_> = result
        .detections
        .iter()
        .filter(|d| d.label == "Excessive Gratuitous ARP")
        .collect();
    assert_eq!(floods.len(), 1);
    assert_eq!(floods[0].score, 8.0);
    assert_eq!(
        floods[0].evidence.get("ip").unwrap().as_str(),
        Some("10.0.0.5")
    );
}

#[test]
fn dga_style_domain_is_flagged_with_domain_evidence() {
    let mut config = AnalyzerConfig::default();
    config.models.insert(
        EngineId::DnsAnomaly,
        model(10.0, &[("entropy_threshold", 3.5)]),
    );
    let mut analyzer = Analyzer::new(config).unwrap();

    let domain = "kq7z9xv3m2pn.com";
    let mut events = VecDeque::new();
    push_event(
        &mut events,
        0.0,
        udp_frame([10, 0, 0, 9], [8, 8, 8, 8], 51000, 53, &dns_query_payload(domain)),
    );

    let result = analyzer
        .analyze_source("synthetic", MemorySource(events))
        .unwrap();

    let dga: Vec<_> = result
        .detections
        .iter()
        .filter(|d| d.label == "DNS High Entropy (DGA Suspect)")
        .collect();
    assert_eq!(dga.len(), 1);
    assert_eq!(dga[0].evidence.get("domain").unwrap().as_str(), Some(domain));
}

#[test]
fn steady_beaconing_flow_is_flagged_with_flow_key_evidence() {
    let mut config = AnalyzerConfig::default();
    config.models.insert(
        EngineId::Beaconing,
        model(10.0, &[("history_size", 50.0)]),
    );
    let mut analyzer = Analyzer::new(config).unwrap();

    let mut events = VecDeque::new();
    // A pure period-2 oscillation in inter-arrival times (0.7s / 1.3s,
    // alternating) puts all of the DC-removed spectrum's energy in the
    // Nyquist bin at exactly 2*amplitude = 0.6, above the default 0.5
    // threshold; small uniform jitter around a fixed period (e.g. +-10ms)
    // stays under 0.02 and never crosses it, so this is the shape that
    // actually exercises the detector end to end.
    let mut ts = 0.0;
    for i in 0..100 {
        ts += if i % 2 == 0 { 0.7 } else { 1.3 };
        push_event(
            &mut events,
            ts,
            udp_frame([10, 0, 0, 9], [203, 0, 113, 1], 51820, 443, &[0u8; 4]),
        );
    }

    let result = analyzer
        .analyze_source("synthetic", MemorySource(events))
        .unwrap();

    let beacons: Vec<_> = result
        .detections
        .iter()
        .filter(|d| d.label == "C2 Beaconing Suspect (FFT)")
        .collect();
    assert_eq!(beacons.len(), 1);
    assert!(beacons[0].score > 0.5);
    assert!(beacons[0].flow_key.is_some());
}

#[test]
fn analysis_result_totals_match_packets_fed_in() {
    let config = AnalyzerConfig::default();
    let mut analyzer = Analyzer::new(config).unwrap();

    let mut events = VecDeque::new();
    for i in 0..5 {
        push_event(
            &mut events,
            i as f64,
            udp_frame([10, 0, 0, 1], [10, 0, 0, 2], 1234, 5678, &[0u8; 16]),
        );
    }

    let result = analyzer
        .analyze_source("synthetic", MemorySource(events))
        .unwrap();

    assert_eq!(result.total_packets, 5);
    assert_eq!(result.pcap_path, "synthetic");
    assert!(result.first_window_start.is_some());
    assert!(result.last_window_end.is_some());
    assert_eq!(result.summary_stats.window_count, result.window_stats.len() as u64);
}

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::IpAddr;

use crate::config::{AnalyzerConfig, EngineId};
use crate::packet::Packet;
use crate::stats::WindowStats;

use super::{Detection, Detector, severity};

const DEFAULT_MIN_UNIQUE_PORTS: usize = 10;
const DEFAULT_IDLE_EVICTION_S: f64 = 300.0;

#[derive(Default)]
struct SourceState {
    ports: HashSet<u16>,
}

/// Stateful per-source unique-destination-port tracking, coalesced across
/// windows until a scan is confirmed and reported.
pub struct PortScanDetector {
    min_unique_ports: usize,
    idle_eviction_s: f64,
    scan_history: HashMap<IpAddr, SourceState>,
    last_seen: HashMap<IpAddr, f64>,
}

impl PortScanDetector {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let model = config.models.get(&EngineId::PortScan);
        let min_unique_ports = model
            .map(|m| m.param("min_unique_ports", DEFAULT_MIN_UNIQUE_PORTS as f64))
            .unwrap_or(DEFAULT_MIN_UNIQUE_PORTS as f64) as usize;
        let idle_eviction_s = model
            .map(|m| m.param("idle_eviction_s", DEFAULT_IDLE_EVICTION_S))
            .unwrap_or(DEFAULT_IDLE_EVICTION_S);

        Self {
            min_unique_ports,
            idle_eviction_s,
            scan_history: HashMap::new(),
            last_seen: HashMap::new(),
        }
    }
}

impl Detector for PortScanDetector {
    fn id(&self) -> &'static str {
        "port_scan"
    }

    fn analyze(&mut self, stats: &WindowStats, packets: &[Packet]) -> Vec<Detection> {
        for packet in packets {
            let (Some(ip), Some(dport)) = (packet.ip(), packet.dst_port()) else {
                continue;
            };
            if packet.tcp().is_none() && packet.udp().is_none() {
                continue;
            }
            let entry = self.scan_history.entry(ip.src).or_default();
            entry.ports.insert(dport);
            self.last_seen.insert(ip.src, stats.end_time);
        }

        let mut detections = Vec::new();
        let mut confirmed = Vec::new();
        for (&src_ip, state) in self.scan_history.iter() {
            if state.ports.len() >= self.min_unique_ports {
                let mut evidence = BTreeMap::new();
                evidence.insert("source_ip".to_string(), src_ip.to_string().into());
                evidence.insert("unique_ports".to_string(), state.ports.len().into());
                detections.push(Detection {
                    model_name: self.id().to_string(),
                    timestamp: stats.end_time,
                    severity: severity((state.ports.len() as f64 - self.min_unique_ports as f64) / 20.0),
                    score: state.ports.len() as f64,
                    label: "Port Scan Suspect (Stateful)".to_string(),
                    justification: format!(
                        "{src_ip} touched {} distinct destination ports (threshold {})",
                        state.ports.len(),
                        self.min_unique_ports
                    ),
                    evidence,
                    flow_key: None,
                });
                confirmed.push(src_ip);
            }
        }
        // Clear only the sources that were just reported, for one detection
        // per coalesced scan; sources below threshold keep accumulating.
        for src_ip in confirmed {
            self.scan_history.remove(&src_ip);
        }

        self.last_seen
            .retain(|_, &mut last| stats.end_time - last <= self.idle_eviction_s);
        let live: HashSet<IpAddr> = self.last_seen.keys().copied().collect();
        self.scan_history.retain(|ip, _| live.contains(ip));

        detections
    }
}

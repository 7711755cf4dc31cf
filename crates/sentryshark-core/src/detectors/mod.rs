//! Stateful anomaly detectors and the fusion stage that deduplicates their
//! output across a full analysis run.

pub mod arp_spoof;
pub mod beaconing;
pub mod ddos;
pub mod dns_anomaly;
pub mod fusion;
pub mod port_scan;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AnalyzerConfig;
use crate::packet::Packet;
use crate::stats::WindowStats;

/// A single anomaly flagged by a detector against one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub model_name: String,
    pub timestamp: f64,
    pub severity: f64,
    pub score: f64,
    pub label: String,
    pub justification: String,
    pub evidence: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_key: Option<String>,
}

/// Common contract every detector implements. Detectors hold their own
/// bounded cross-window state and must never panic or mutate their input.
pub trait Detector {
    /// Stable identifier emitted as `Detection::model_name`.
    fn id(&self) -> &'static str;

    /// Analyzes one window, returning zero or more detections. Internally
    /// updates this detector's baseline/state for the next window.
    fn analyze(&mut self, stats: &WindowStats, packets: &[Packet]) -> Vec<Detection>;
}

/// Builds the five detectors in their fixed registration order, reading
/// each one's parameters from `config` (falling back to its own defaults
/// when a detector or parameter is unconfigured). A detector whose model
/// config is present with `enabled = false` is omitted from the fleet
/// entirely, so a disabled engine costs nothing per window.
pub fn build_detectors(config: &AnalyzerConfig) -> Vec<Box<dyn Detector>> {
    use crate::config::EngineId;

    let is_enabled = |id: EngineId| config.models.get(&id).map(|m| m.enabled).unwrap_or(true);

    let mut fleet: Vec<Box<dyn Detector>> = Vec::new();
    if is_enabled(EngineId::DdosVolume) {
        fleet.push(Box::new(ddos::DdosDetector::from_config(config)));
    }
    if is_enabled(EngineId::PortScan) {
        fleet.push(Box::new(port_scan::PortScanDetector::from_config(config)));
    }
    if is_enabled(EngineId::ArpSpoof) {
        fleet.push(Box::new(arp_spoof::ArpSpoofDetector::from_config(config)));
    }
    if is_enabled(EngineId::DnsAnomaly) {
        fleet.push(Box::new(dns_anomaly::DnsAnomalyDetector::from_config(config)));
    }
    if is_enabled(EngineId::Beaconing) {
        fleet.push(Box::new(beaconing::BeaconingDetector::from_config(config)));
    }
    fleet
}

pub(crate) fn severity(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

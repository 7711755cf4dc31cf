use std::collections::BTreeMap;

use crate::config::{AnalyzerConfig, EngineId};
use crate::packet::Packet;
use crate::stats::WindowStats;
use crate::stats::history::BoundedHistory;

use super::{Detection, Detector, severity};

const DEFAULT_HISTORY_SIZE: usize = 100;
const DEFAULT_PPS_Z_THRESHOLD: f64 = 5.0;
const DEFAULT_ENTROPY_DROP_RATIO: f64 = 0.5;

/// Rolling z-score on packets-per-second, plus a source-IP entropy
/// collapse test, each computed against a bounded window history.
pub struct DdosDetector {
    pps_z_threshold: f64,
    entropy_drop_ratio: f64,
    pps_history: BoundedHistory,
    entropy_history: BoundedHistory,
}

impl DdosDetector {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let model = config.models.get(&EngineId::DdosVolume);
        let history_size = model
            .map(|m| m.param("history_size", DEFAULT_HISTORY_SIZE as f64))
            .unwrap_or(DEFAULT_HISTORY_SIZE as f64) as usize;
        let pps_z_threshold = model
            .map(|m| m.param("pps_z_threshold", DEFAULT_PPS_Z_THRESHOLD))
            .unwrap_or(DEFAULT_PPS_Z_THRESHOLD);
        let entropy_drop_ratio = model
            .map(|m| m.param("entropy_drop_ratio", DEFAULT_ENTROPY_DROP_RATIO))
            .unwrap_or(DEFAULT_ENTROPY_DROP_RATIO);

        let mut pps_history = BoundedHistory::new(history_size);
        let mut entropy_history = BoundedHistory::new(history_size);
        if let Some(model) = model {
            if let Some(&default_pps) = model.params.get("default_pps") {
                pps_history.push(default_pps);
            }
            if let Some(&default_entropy) = model.params.get("default_entropy") {
                entropy_history.push(default_entropy);
            }
        }

        Self {
            pps_z_threshold,
            entropy_drop_ratio,
            pps_history,
            entropy_history,
        }
    }
}

impl Detector for DdosDetector {
    fn id(&self) -> &'static str {
        "ddos_volume"
    }

    fn analyze(&mut self, stats: &WindowStats, _packets: &[Packet]) -> Vec<Detection> {
        let mut detections = Vec::new();

        // With no prior samples there is no baseline to score against; the
        // "exclude current sample" rule degenerates to "skip" rather than
        // comparing against a fabricated zero baseline.
        let mean_pps = self.pps_history.mean();
        let std_pps = {
            let s = self.pps_history.std_dev();
            if s == 0.0 { 1.0 } else { s }
        };
        let z = (stats.pps - mean_pps) / std_pps;
        if !self.pps_history.is_empty() && z > self.pps_z_threshold {
            let mut evidence = BTreeMap::new();
            evidence.insert("current_pps".to_string(), stats.pps.into());
            evidence.insert("mean_pps".to_string(), mean_pps.into());
            evidence.insert("z_score".to_string(), z.into());
            detections.push(Detection {
                model_name: self.id().to_string(),
                timestamp: stats.end_time,
                severity: severity((z - self.pps_z_threshold) / self.pps_z_threshold.max(1.0)),
                score: z,
                label: "High Volume Anomaly (DDoS Suspect)".to_string(),
                justification: format!(
                    "pps={:.2} is {:.2} std above the {}-window baseline mean {:.2}",
                    stats.pps,
                    z,
                    self.pps_history.len(),
                    mean_pps
                ),
                evidence,
                flow_key: None,
            });
        }

        let mean_entropy = self.entropy_history.mean();
        if mean_entropy > 1.0 && stats.src_ip_entropy < mean_entropy * self.entropy_drop_ratio {
            let mut evidence = BTreeMap::new();
            evidence.insert("current_entropy".to_string(), stats.src_ip_entropy.into());
            evidence.insert("mean_entropy".to_string(), mean_entropy.into());
            detections.push(Detection {
                model_name: self.id().to_string(),
                timestamp: stats.end_time,
                severity: severity((mean_entropy - stats.src_ip_entropy) / mean_entropy),
                score: stats.src_ip_entropy,
                label: "Source IP Entropy Collapse".to_string(),
                justification: format!(
                    "source IP entropy {:.2} fell below {:.2} (baseline mean {:.2})",
                    stats.src_ip_entropy,
                    mean_entropy * self.entropy_drop_ratio,
                    mean_entropy
                ),
                evidence,
                flow_key: None,
            });
        }

        self.pps_history.push(stats.pps);
        self.entropy_history.push(stats.src_ip_entropy);

        detections
    }
}

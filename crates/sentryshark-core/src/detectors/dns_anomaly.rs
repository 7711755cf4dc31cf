use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::config::{AnalyzerConfig, EngineId};
use crate::packet::Packet;
use crate::stats::WindowStats;
use crate::stats::entropy::char_entropy;

use super::{Detection, Detector, severity};

const DEFAULT_ENTROPY_THRESHOLD: f64 = 3.8;
const DEFAULT_MAX_SEEN_DOMAINS: usize = 50_000;
const DEFAULT_MIN_LABEL_LENGTH: usize = 5;

/// Per-label character-entropy test for DGA-style DNS query names.
///
/// Queries are normalized to their "registrable label" (the part of the
/// name most likely to carry a generated string: the label before a
/// two-part ccTLD like `.co.uk`, otherwise the second-to-last label, or
/// the whole name if it has no dots). Each distinct label is scored once;
/// the `seen_domains` set is cleared outright when it grows past
/// `max_seen_domains` rather than evicted piecewise.
pub struct DnsAnomalyDetector {
    entropy_threshold: f64,
    max_seen_domains: usize,
    min_label_length: usize,
    seen_domains: HashSet<String>,
}

impl DnsAnomalyDetector {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let model = config.models.get(&EngineId::DnsAnomaly);
        let entropy_threshold = model
            .map(|m| m.param("entropy_threshold", DEFAULT_ENTROPY_THRESHOLD))
            .unwrap_or(DEFAULT_ENTROPY_THRESHOLD);
        let max_seen_domains = model
            .map(|m| m.param("max_seen_domains", DEFAULT_MAX_SEEN_DOMAINS as f64))
            .unwrap_or(DEFAULT_MAX_SEEN_DOMAINS as f64) as usize;
        let min_label_length = model
            .map(|m| m.param("min_label_length", DEFAULT_MIN_LABEL_LENGTH as f64))
            .unwrap_or(DEFAULT_MIN_LABEL_LENGTH as f64) as usize;

        Self {
            entropy_threshold,
            max_seen_domains,
            min_label_length,
            seen_domains: HashSet::new(),
        }
    }
}

/// Picks the "registrable label" out of a normalized (no trailing dot) qname.
fn registrable_label(qname: &str) -> &str {
    let parts: Vec<&str> = qname.split('.').collect();
    match parts.len() {
        n if n >= 3 && parts[n - 1].len() == 2 && parts[n - 2].len() <= 3 => parts[n - 3],
        n if n >= 2 => parts[n - 2],
        _ => parts[0],
    }
}

impl Detector for DnsAnomalyDetector {
    fn id(&self) -> &'static str {
        "dns_anomaly"
    }

    fn analyze(&mut self, stats: &WindowStats, packets: &[Packet]) -> Vec<Detection> {
        let mut detections = Vec::new();

        for packet in packets {
            let Some(dns) = packet.dns() else {
                continue;
            };
            if !dns.is_query {
                continue;
            }

            for qname in &dns.questions {
                let normalized = qname.trim_end_matches('.');
                if normalized.is_empty() {
                    continue;
                }
                let label = registrable_label(normalized);

                if self.seen_domains.contains(label) || label.len() < self.min_label_length {
                    continue;
                }
                self.seen_domains.insert(label.to_string());

                let entropy = char_entropy(label);
                if entropy > self.entropy_threshold {
                    let mut evidence = BTreeMap::new();
                    evidence.insert("domain".to_string(), qname.clone().into());
                    evidence.insert("entropy".to_string(), entropy.into());
                    detections.push(Detection {
                        model_name: self.id().to_string(),
                        timestamp: stats.end_time,
                        severity: severity(entropy / 5.0),
                        score: entropy,
                        label: "DNS High Entropy (DGA Suspect)".to_string(),
                        justification: format!(
                            "label '{label}' has character entropy {entropy:.2} (threshold {:.2})",
                            self.entropy_threshold
                        ),
                        evidence,
                        flow_key: None,
                    });
                }
            }
        }

        if self.seen_domains.len() > self.max_seen_domains {
            self.seen_domains.clear();
        }

        detections
    }
}

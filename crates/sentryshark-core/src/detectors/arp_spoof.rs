use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::config::{AnalyzerConfig, EngineId};
use crate::packet::Packet;
use crate::stats::WindowStats;

use super::{Detection, Detector, severity};

const DEFAULT_MAX_GRATUITOUS_ARP_PER_WINDOW: f64 = 5.0;
const DEFAULT_IDLE_EVICTION_S: f64 = 600.0;
const ARP_OP_REPLY: u16 = 2;

fn mac_to_string(mac: [u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Tracks IP<->MAC bindings and gratuitous-ARP volume to flag spoofing.
///
/// Two independent checks run per window: a rebind of an already-known IP
/// to a different MAC (`ARP Spoofing Detected (MAC Conflict)`), and an IP
/// sending more gratuitous replies than `max_gratuitous_arp_per_window`
/// allows (`Excessive Gratuitous ARP`).
pub struct ArpSpoofDetector {
    max_gratuitous_arp_per_window: f64,
    idle_eviction_s: f64,
    ip_mac_map: HashMap<Ipv4Addr, [u8; 6]>,
    mac_ip_map: HashMap<[u8; 6], Ipv4Addr>,
    last_seen: HashMap<Ipv4Addr, f64>,
}

impl ArpSpoofDetector {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let model = config.models.get(&EngineId::ArpSpoof);
        let max_gratuitous_arp_per_window = model
            .map(|m| m.param("max_gratuitous_arp_per_window", DEFAULT_MAX_GRATUITOUS_ARP_PER_WINDOW))
            .unwrap_or(DEFAULT_MAX_GRATUITOUS_ARP_PER_WINDOW);
        let idle_eviction_s = model
            .map(|m| m.param("idle_eviction_s", DEFAULT_IDLE_EVICTION_S))
            .unwrap_or(DEFAULT_IDLE_EVICTION_S);

        Self {
            max_gratuitous_arp_per_window,
            idle_eviction_s,
            ip_mac_map: HashMap::new(),
            mac_ip_map: HashMap::new(),
            last_seen: HashMap::new(),
        }
    }
}

impl Detector for ArpSpoofDetector {
    fn id(&self) -> &'static str {
        "arp_spoof"
    }

    fn analyze(&mut self, stats: &WindowStats, packets: &[Packet]) -> Vec<Detection> {
        let mut detections = Vec::new();
        let mut gratuitous_count: HashMap<Ipv4Addr, u64> = HashMap::new();

        for packet in packets {
            let Some(arp) = packet.arp() else {
                continue;
            };

            if let Some(&bound_mac) = self.ip_mac_map.get(&arp.psrc) {
                if bound_mac != arp.hwsrc {
                    let mut evidence = std::collections::BTreeMap::new();
                    evidence.insert("ip".to_string(), arp.psrc.to_string().into());
                    evidence.insert("old_mac".to_string(), mac_to_string(bound_mac).into());
                    evidence.insert("new_mac".to_string(), mac_to_string(arp.hwsrc).into());
                    detections.push(Detection {
                        model_name: self.id().to_string(),
                        timestamp: stats.end_time,
                        severity: severity(1.0),
                        score: 1.0,
                        label: "ARP Spoofing Detected (MAC Conflict)".to_string(),
                        justification: format!(
                            "{} was bound to {} but now claims {}",
                            arp.psrc,
                            mac_to_string(bound_mac),
                            mac_to_string(arp.hwsrc)
                        ),
                        evidence,
                        flow_key: None,
                    });
                }
            }
            self.ip_mac_map.insert(arp.psrc, arp.hwsrc);
            self.mac_ip_map.insert(arp.hwsrc, arp.psrc);

            if arp.op == ARP_OP_REPLY && arp.psrc == arp.pdst {
                *gratuitous_count.entry(arp.psrc).or_insert(0) += 1;
            }

            self.last_seen.insert(arp.psrc, stats.end_time);
        }

        for (ip, count) in gratuitous_count {
            if count as f64 > self.max_gratuitous_arp_per_window {
                let mut evidence = std::collections::BTreeMap::new();
                evidence.insert("ip".to_string(), ip.to_string().into());
                evidence.insert("count".to_string(), count.into());
                detections.push(Detection {
                    model_name: self.id().to_string(),
                    timestamp: stats.end_time,
                    severity: severity(
                        (count as f64 - self.max_gratuitous_arp_per_window) / 5.0,
                    ),
                    score: count as f64,
                    label: "Excessive Gratuitous ARP".to_string(),
                    justification: format!(
                        "{ip} sent {count} gratuitous ARP replies, exceeding threshold {}",
                        self.max_gratuitous_arp_per_window
                    ),
                    evidence,
                    flow_key: None,
                });
            }
        }

        let end_time = stats.end_time;
        let idle_eviction_s = self.idle_eviction_s;
        self.last_seen.retain(|_, &mut last| end_time - last <= idle_eviction_s);
        let live: std::collections::HashSet<Ipv4Addr> = self.last_seen.keys().copied().collect();
        self.ip_mac_map.retain(|ip, _| live.contains(ip));
        self.mac_ip_map.retain(|_, ip| live.contains(ip));

        detections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{ArpLayer, Packet};

    fn arp_packet(op: u16, psrc: [u8; 4], pdst: [u8; 4], hwsrc: [u8; 6]) -> Packet {
        Packet::new(Some(0.0), 42).with_arp(ArpLayer {
            op,
            psrc: Ipv4Addr::from(psrc),
            pdst: Ipv4Addr::from(pdst),
            hwsrc,
        })
    }

    fn stats(end_time: f64) -> WindowStats {
        WindowStats {
            start_time: end_time - 10.0,
            end_time,
            packet_count: 0,
            total_bytes: 0,
            duration_s: 10.0,
            pps: 0.0,
            bps: 0.0,
            src_ip_entropy: 0.0,
            dst_ip_entropy: 0.0,
            dst_port_entropy: 0.0,
            inter_arrival_times: vec![],
        }
    }

    #[test]
    fn mac_rebind_is_flagged() {
        let config = AnalyzerConfig::default();
        let mut detector = ArpSpoofDetector::from_config(&config);

        let first = vec![arp_packet(1, [10, 0, 0, 1], [10, 0, 0, 2], [1, 1, 1, 1, 1, 1])];
        assert!(detector.analyze(&stats(10.0), &first).is_empty());

        let second = vec![arp_packet(1, [10, 0, 0, 1], [10, 0, 0, 2], [2, 2, 2, 2, 2, 2])];
        let detections = detector.analyze(&stats(20.0), &second);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "ARP Spoofing Detected (MAC Conflict)");
        assert_eq!(detections[0].severity, 1.0);
    }

    #[test]
    fn gratuitous_arp_flood_is_flagged() {
        let mut config = AnalyzerConfig::default();
        config.models.insert(
            EngineId::ArpSpoof,
            crate::config::ModelConfig {
                params: [("max_gratuitous_arp_per_window".to_string(), 5.0)]
                    .into_iter()
                    .collect(),
                ..Default::default()
            },
        );
        let mut detector = ArpSpoofDetector::from_config(&config);

        let packets: Vec<Packet> = (0..8)
            .map(|_| arp_packet(2, [10, 0, 0, 5], [10, 0, 0, 5], [9, 9, 9, 9, 9, 9]))
            .collect();
        let detections = detector.analyze(&stats(10.0), &packets);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "Excessive Gratuitous ARP");
        assert_eq!(detections[0].score, 8.0);
    }

    #[test]
    fn non_gratuitous_replies_do_not_count() {
        let config = AnalyzerConfig::default();
        let mut detector = ArpSpoofDetector::from_config(&config);
        let packets: Vec<Packet> = (0..10)
            .map(|_| arp_packet(2, [10, 0, 0, 5], [10, 0, 0, 6], [9, 9, 9, 9, 9, 9]))
            .collect();
        let detections = detector.analyze(&stats(10.0), &packets);
        assert!(detections.is_empty());
    }

    #[test]
    fn stale_bindings_are_evicted() {
        let mut config = AnalyzerConfig::default();
        config.models.insert(
            EngineId::ArpSpoof,
            crate::config::ModelConfig {
                params: [("idle_eviction_s".to_string(), 5.0)].into_iter().collect(),
                ..Default::default()
            },
        );
        let mut detector = ArpSpoofDetector::from_config(&config);

        let first = vec![arp_packet(1, [10, 0, 0, 1], [10, 0, 0, 2], [1, 1, 1, 1, 1, 1])];
        detector.analyze(&stats(10.0), &first);
        // Window far beyond idle_eviction_s: binding should be evicted, so a
        // new MAC for the same IP is not treated as a conflict.
        detector.analyze(&stats(1000.0), &[]);
        let rebind = vec![arp_packet(1, [10, 0, 0, 1], [10, 0, 0, 2], [2, 2, 2, 2, 2, 2])];
        let detections = detector.analyze(&stats(1010.0), &rebind);
        assert!(detections.is_empty());
    }
}

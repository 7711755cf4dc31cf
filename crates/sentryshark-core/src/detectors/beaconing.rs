use std::collections::BTreeMap;
use std::collections::HashMap;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;

use crate::config::{AnalyzerConfig, EngineId};
use crate::packet::{Packet, flow_key_for_packet};
use crate::stats::WindowStats;
use crate::stats::history::BoundedHistory;

use super::{Detection, Detector, severity};

const DEFAULT_HISTORY_SIZE: usize = 100;
const DEFAULT_FFT_THRESHOLD: f64 = 0.5;
const DEFAULT_MAX_IAT_S: f64 = 10.0;
const DEFAULT_IDLE_EVICTION_S: f64 = 300.0;
const DEFAULT_CLEANUP_INTERVAL_PACKETS: u64 = 1000;

struct FlowState {
    iat_history: BoundedHistory,
    last_packet_time: Option<f64>,
}

/// Per-flow FFT beaconing detector.
///
/// Every TCP/UDP/IP flow accumulates a bounded history of inter-arrival
/// times. Once a flow's history is full, its DC-removed spectrum is
/// checked for a dominant periodic component; a peak above
/// `fft_threshold` is reported as likely C2 beaconing and the flow's
/// history is cleared so the same period isn't re-reported every window.
///
/// This is the per-flow variant, not the earlier non-per-flow one that
/// also appears in the source material -- only this variant is implemented.
pub struct BeaconingDetector {
    history_size: usize,
    fft_threshold: f64,
    max_iat_s: f64,
    idle_eviction_s: f64,
    cleanup_interval_packets: u64,
    flows: HashMap<String, FlowState>,
    packets_seen: u64,
}

impl BeaconingDetector {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let model = config.models.get(&EngineId::Beaconing);
        let history_size = model
            .map(|m| m.param("history_size", DEFAULT_HISTORY_SIZE as f64))
            .unwrap_or(DEFAULT_HISTORY_SIZE as f64) as usize;
        let fft_threshold = model
            .map(|m| m.param("fft_threshold", DEFAULT_FFT_THRESHOLD))
            .unwrap_or(DEFAULT_FFT_THRESHOLD);
        let max_iat_s = model
            .map(|m| m.param("max_iat_s", DEFAULT_MAX_IAT_S))
            .unwrap_or(DEFAULT_MAX_IAT_S);
        let idle_eviction_s = model
            .map(|m| m.param("idle_eviction_s", DEFAULT_IDLE_EVICTION_S))
            .unwrap_or(DEFAULT_IDLE_EVICTION_S);
        let cleanup_interval_packets = model
            .map(|m| m.param("cleanup_interval_packets", DEFAULT_CLEANUP_INTERVAL_PACKETS as f64))
            .unwrap_or(DEFAULT_CLEANUP_INTERVAL_PACKETS as f64) as u64;

        Self {
            history_size,
            fft_threshold,
            max_iat_s,
            idle_eviction_s,
            cleanup_interval_packets,
            flows: HashMap::new(),
            packets_seen: 0,
        }
    }

    fn evict_idle(&mut self, now: f64) {
        let idle_eviction_s = self.idle_eviction_s;
        self.flows
            .retain(|_, state| now - state.last_packet_time.unwrap_or(now) <= idle_eviction_s);
    }
}

/// Magnitude spectrum per spec: `(2/N)*|X_k|` for `k = 1 .. floor(N/2)`,
/// DC term excluded, over the DC-removed (mean-subtracted) series.
fn fft_peak_magnitude(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n == 0 {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / n as f64;

    let mut buffer: Vec<Complex64> = samples
        .iter()
        .map(|&x| Complex64::new(x - mean, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let scale = 2.0 / n as f64;
    (1..n / 2 + 1)
        .map(|k| scale * buffer[k].norm())
        .fold(0.0_f64, f64::max)
}

impl Detector for BeaconingDetector {
    fn id(&self) -> &'static str {
        "beaconing"
    }

    fn analyze(&mut self, stats: &WindowStats, packets: &[Packet]) -> Vec<Detection> {
        for packet in packets {
            let (Some(flow_key), Some(t)) = (flow_key_for_packet(packet), packet.timestamp) else {
                continue;
            };

            let entry = self.flows.entry(flow_key).or_insert_with(|| FlowState {
                iat_history: BoundedHistory::new(self.history_size),
                last_packet_time: None,
            });

            if let Some(prev) = entry.last_packet_time {
                let iat = t - prev;
                if iat < self.max_iat_s {
                    entry.iat_history.push(iat);
                }
            }
            entry.last_packet_time = Some(t);

            self.packets_seen += 1;
            if self.packets_seen % self.cleanup_interval_packets == 0 {
                self.evict_idle(t);
            }
        }

        let mut detections = Vec::new();
        let history_size = self.history_size;
        let fft_threshold = self.fft_threshold;
        let mut to_clear = Vec::new();

        for (flow_key, state) in self.flows.iter() {
            if state.iat_history.len() < history_size {
                continue;
            }
            let samples: Vec<f64> = state.iat_history.iter().copied().collect();
            let peak = fft_peak_magnitude(&samples);
            if peak > fft_threshold {
                let mut evidence = BTreeMap::new();
                evidence.insert("flow_key".to_string(), flow_key.clone().into());
                evidence.insert("peak_magnitude".to_string(), peak.into());
                detections.push(Detection {
                    model_name: self.id().to_string(),
                    timestamp: stats.end_time,
                    severity: severity(peak / fft_threshold),
                    score: peak,
                    label: "C2 Beaconing Suspect (FFT)".to_string(),
                    justification: format!(
                        "flow {flow_key} shows a dominant IAT spectral peak of {peak:.3} (threshold {fft_threshold:.2})"
                    ),
                    evidence,
                    flow_key: Some(flow_key.clone()),
                });
                to_clear.push(flow_key.clone());
            }
        }

        for flow_key in to_clear {
            if let Some(state) = self.flows.get_mut(&flow_key) {
                state.iat_history = BoundedHistory::new(history_size);
            }
        }

        detections
    }
}

//! Analyzer configuration: which detectors run, and with what parameters.
//!
//! Parsing a TOML file into this shape is the CLI's job; this module only
//! defines the shape and validates it once parsed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One of the five fixed detector engines this pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineId {
    DdosVolume,
    PortScan,
    ArpSpoof,
    DnsAnomaly,
    Beaconing,
}

impl EngineId {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineId::DdosVolume => "ddos_volume",
            EngineId::PortScan => "port_scan",
            EngineId::ArpSpoof => "arp_spoof",
            EngineId::DnsAnomaly => "dns_anomaly",
            EngineId::Beaconing => "beaconing",
        }
    }

    pub const ALL: [EngineId; 5] = [
        EngineId::DdosVolume,
        EngineId::PortScan,
        EngineId::ArpSpoof,
        EngineId::DnsAnomaly,
        EngineId::Beaconing,
    ];
}

/// Per-engine configuration. `params` holds the detector-specific knobs
/// enumerated alongside each detector; unset keys fall back to the
/// detector's own defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default = "default_window_size_s")]
    pub window_size_s: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub params: HashMap<String, f64>,
}

fn default_enabled() -> bool {
    true
}

fn default_window_size_s() -> f64 {
    10.0
}

fn default_weight() -> f64 {
    1.0
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            threshold: 0.0,
            window_size_s: default_window_size_s(),
            weight: default_weight(),
            params: HashMap::new(),
        }
    }
}

impl ModelConfig {
    pub fn param(&self, key: &str, default: f64) -> f64 {
        self.params.get(key).copied().unwrap_or(default)
    }
}

/// Top-level analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_profile")]
    pub analysis_profile: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Reserved; has no effect on the single-threaded streaming core
    /// (see the concurrency model notes on `Analyzer`).
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: u32,
    #[serde(default)]
    pub models: HashMap<EngineId, ModelConfig>,
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_parallel_workers() -> u32 {
    1
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            analysis_profile: default_profile(),
            output_dir: default_output_dir(),
            parallel_workers: default_parallel_workers(),
            models: HashMap::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Validates parameter ranges. Unknown engine ids cannot occur here —
    /// `EngineId` is a closed enum, so an unrecognized key fails during
    /// TOML deserialization itself, before reaching this check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (engine, model) in &self.models {
            if !model.window_size_s.is_finite() || model.window_size_s <= 0.0 {
                return Err(ConfigError::InvalidParameter {
                    engine: engine.as_str(),
                    parameter: "window_size_s",
                    value: model.window_size_s,
                });
            }
            if !model.threshold.is_finite() {
                return Err(ConfigError::InvalidParameter {
                    engine: engine.as_str(),
                    parameter: "threshold",
                    value: model.threshold,
                });
            }
        }
        Ok(())
    }

    /// The window size used by the window processor: the `ddos_volume`
    /// engine's `window_size_s` is the historic anchor (other detectors'
    /// own `window_size_s` fields are accepted but ignored by the window
    /// processor), falling back to the default when `ddos_volume` is
    /// absent from `models`.
    pub fn window_size_s(&self) -> f64 {
        self.models
            .get(&EngineId::DdosVolume)
            .map(|m| m.window_size_s)
            .unwrap_or_else(default_window_size_s)
    }
}

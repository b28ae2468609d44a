use super::zonal::ZonalPreset;
use crate::bridge::{BridgeConfig, FirewallFilter, LatencyRegistry};
use crate::error::{Result, SimError};
use crate::network::DataRate;
use crate::sim::SimTime;
use crate::trace::CsvLayout;
use crate::traffic::TrafficPattern;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Latency model by registry name. `delay` feeds constant models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySpec {
    pub model: String,
    #[serde(default)]
    pub delay: SimTime,
}

impl LatencySpec {
    pub fn constant(delay: SimTime) -> Self {
        Self {
            model: "constant".into(),
            delay,
        }
    }

    pub fn macsec() -> Self {
        Self {
            model: "macsec".into(),
            delay: SimTime::ZERO,
        }
    }
}

/// One processing bridge on the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopConfig {
    pub name: String,
    pub latency: LatencySpec,
    pub throughput: DataRate,
    pub queue_capacity: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall: Option<FirewallFilter>,
}

impl HopConfig {
    pub fn bridge_config(&self) -> Result<BridgeConfig> {
        let processing_delay = LatencyRegistry::global()
            .create(&self.latency.model, self.latency.delay)
            .ok_or_else(|| SimError::UnknownLatencyModel(self.latency.model.clone()))?;
        let config = BridgeConfig::new(processing_delay, self.throughput, self.queue_capacity);
        Ok(match &self.firewall {
            Some(firewall) => config.with_firewall(firewall.clone()),
            None => config,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub name: String,
    pub hops: Vec<HopConfig>,
    pub packet_size: u32,
    pub traffic: TrafficPattern,
    /// Sender runs in `[start, stop)`.
    pub start: SimTime,
    pub stop: SimTime,
    /// Measurement switches on here; earlier packets are warm-up.
    pub trace_start: SimTime,
    /// Events after this time are not processed.
    pub duration: SimTime,
    pub seed: u64,
    #[serde(default)]
    pub csv_layout: CsvLayout,
    /// Message type the sender stamps on every packet. Untyped when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "stream".to_string(),
            hops: ZonalPreset::IntraZone.hops(),
            packet_size: 512,
            traffic: TrafficPattern::ConstantRate {
                rate: DataRate::from_bps(500_000),
            },
            start: SimTime::from_millis(1100),
            stop: SimTime::from_secs(10),
            trace_start: SimTime::from_millis(1500),
            duration: SimTime::from_secs(11),
            seed: 1,
            csv_layout: CsvLayout::PacketSize,
            message_type: None,
        }
    }
}

impl SimConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_preset(mut self, preset: ZonalPreset) -> Self {
        self.hops = preset.hops();
        self
    }

    pub fn with_hops(mut self, hops: Vec<HopConfig>) -> Self {
        self.hops = hops;
        self
    }

    pub fn with_packet_size(mut self, size: u32) -> Self {
        self.packet_size = size;
        self
    }

    pub fn with_traffic(mut self, traffic: TrafficPattern) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn with_window(mut self, start: SimTime, stop: SimTime, trace_start: SimTime) -> Self {
        self.start = start;
        self.stop = stop;
        self.trace_start = trace_start;
        self
    }

    pub fn with_duration(mut self, duration: SimTime) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_message_type(mut self, kind: impl Into<String>) -> Self {
        self.message_type = Some(kind.into());
        self
    }

    /// Install `firewall` on every hop whose name ends in `switch`.
    pub fn with_switch_firewall(mut self, firewall: FirewallFilter) -> Self {
        for hop in self.hops.iter_mut().filter(|h| h.name.ends_with("switch")) {
            hop.firewall = Some(firewall.clone());
        }
        self
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SimError::InvalidConfig("name must not be empty".into()));
        }
        if self.packet_size == 0 {
            return Err(SimError::InvalidConfig("packet size must be positive".into()));
        }
        if self.stop <= self.start {
            return Err(SimError::InvalidConfig(format!(
                "stop ({}) must be after start ({})",
                self.stop, self.start
            )));
        }
        for hop in &self.hops {
            if hop.throughput.bps() == 0 {
                return Err(SimError::InvalidConfig(format!(
                    "hop {}: throughput must be positive",
                    hop.name
                )));
            }
            if hop.queue_capacity == 0 {
                return Err(SimError::InvalidConfig(format!(
                    "hop {}: queue capacity must be positive",
                    hop.name
                )));
            }
            hop.bridge_config()?;
        }
        self.traffic.validate(self.packet_size)
    }
}

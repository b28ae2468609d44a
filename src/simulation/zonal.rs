// Hop lists for a stream crossing a zonal network.

use super::config::{HopConfig, LatencySpec};
use crate::error::SimError;
use crate::network::DataRate;
use crate::sim::SimTime;
use std::fmt;
use std::str::FromStr;

pub const ZONAL_SWITCH_PROCESSING_DELAY: SimTime = SimTime::from_nanos(30);
pub const ZONAL_SWITCH_THROUGHPUT: DataRate = DataRate::from_mbps(1000);
pub const ZONAL_SWITCH_QUEUE: usize = 100;

pub const MACSEC_TRX_THROUGHPUT: DataRate = DataRate::from_mbps(1000);
pub const MACSEC_TRX_QUEUE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonalPreset {
    /// Two endpoints behind the same zonal switch.
    IntraZone,
    /// Endpoints in different zones: each side crosses its switch and the
    /// MACsec transceiver pair on its backbone link.
    InterZone,
}

impl ZonalPreset {
    pub const ALL: [ZonalPreset; 2] = [ZonalPreset::IntraZone, ZonalPreset::InterZone];

    pub fn name(self) -> &'static str {
        match self {
            Self::IntraZone => "intra-zone",
            Self::InterZone => "inter-zone",
        }
    }

    pub fn hops(self) -> Vec<HopConfig> {
        match self {
            Self::IntraZone => vec![zonal_switch("zone0-switch")],
            // The gateway routes between zones but adds no processing of its own.
            Self::InterZone => vec![
                zonal_switch("zone0-switch"),
                macsec_trx("zone0-trx-switch-side"),
                macsec_trx("zone0-trx-gateway-side"),
                macsec_trx("zone1-trx-gateway-side"),
                macsec_trx("zone1-trx-switch-side"),
                zonal_switch("zone1-switch"),
            ],
        }
    }
}

impl FromStr for ZonalPreset {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intra-zone" | "intra" => Ok(Self::IntraZone),
            "inter-zone" | "inter" => Ok(Self::InterZone),
            _ => Err(SimError::InvalidConfig(format!("unknown preset: {}", s))),
        }
    }
}

impl fmt::Display for ZonalPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn zonal_switch(name: &str) -> HopConfig {
    HopConfig {
        name: name.to_string(),
        latency: LatencySpec::constant(ZONAL_SWITCH_PROCESSING_DELAY),
        throughput: ZONAL_SWITCH_THROUGHPUT,
        queue_capacity: ZONAL_SWITCH_QUEUE,
        firewall: None,
    }
}

pub fn macsec_trx(name: &str) -> HopConfig {
    HopConfig {
        name: name.to_string(),
        latency: LatencySpec::macsec(),
        throughput: MACSEC_TRX_THROUGHPUT,
        queue_capacity: MACSEC_TRX_QUEUE,
        firewall: None,
    }
}

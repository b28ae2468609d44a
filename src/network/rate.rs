use crate::error::SimError;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A line rate in bits per second. Parses and prints like `"1000Mbps"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataRate {
    bps: u64,
}

// (suffix, multiplier in bits/s). Longest suffixes first so "Mbps" wins over "bps".
const UNITS: &[(&str, u64)] = &[
    ("Gbps", 1_000_000_000),
    ("Mbps", 1_000_000),
    ("Kbps", 1_000),
    ("kbps", 1_000),
    ("GBps", 8_000_000_000),
    ("MBps", 8_000_000),
    ("KBps", 8_000),
    ("kBps", 8_000),
    ("bps", 1),
    ("Bps", 8),
];

impl DataRate {
    pub const fn from_bps(bps: u64) -> Self {
        Self { bps }
    }

    pub const fn from_mbps(mbps: u64) -> Self {
        Self { bps: mbps * 1_000_000 }
    }

    pub const fn bps(self) -> u64 {
        self.bps
    }

    /// Time to push `bytes` through at this rate, floored to whole nanoseconds.
    /// A zero rate never finishes.
    pub fn bytes_tx_time(self, bytes: u32) -> SimTime {
        if self.bps == 0 {
            return SimTime::MAX;
        }
        let ns = (bytes as u128 * 8 * 1_000_000_000) / self.bps as u128;
        SimTime::from_nanos(ns.min(u64::MAX as u128) as u64)
    }
}

impl FromStr for DataRate {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (number, multiplier) = UNITS
            .iter()
            .find_map(|(suffix, mult)| s.strip_suffix(suffix).map(|n| (n.trim(), *mult)))
            .ok_or_else(|| SimError::InvalidRate(s.to_string()))?;

        let value: f64 = number
            .parse()
            .map_err(|_| SimError::InvalidRate(s.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(SimError::InvalidRate(s.to_string()));
        }

        Ok(Self::from_bps((value * multiplier as f64).round() as u64))
    }
}

impl TryFrom<String> for DataRate {
    type Error = SimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataRate> for String {
    fn from(rate: DataRate) -> String {
        rate.to_string()
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bps {
            0 => write!(f, "0bps"),
            bps if bps % 1_000_000_000 == 0 => write!(f, "{}Gbps", bps / 1_000_000_000),
            bps if bps % 1_000_000 == 0 => write!(f, "{}Mbps", bps / 1_000_000),
            bps if bps % 1_000 == 0 => write!(f, "{}Kbps", bps / 1_000),
            bps => write!(f, "{}bps", bps),
        }
    }
}

// Sending application for the measured flow.

use crate::error::{Result, SimError};
use crate::network::{Address, DataRate, Packet, PacketId, TypeTag};
use crate::sim::SimTime;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TrafficPattern {
    /// One packet every `every`.
    Interval { every: SimTime },
    /// Constant bit rate: one packet per packet-size worth of `rate`.
    ConstantRate { rate: DataRate },
    /// Same mean rate as `ConstantRate`, exponential gaps.
    Poisson { rate: DataRate },
    /// `count` packets back to back at the start instant.
    Burst { count: u32 },
}

impl TrafficPattern {
    pub fn validate(&self, packet_size: u32) -> Result<()> {
        match self {
            Self::Interval { every } if *every == SimTime::ZERO => Err(SimError::InvalidConfig(
                "traffic interval must be positive".into(),
            )),
            Self::ConstantRate { rate } | Self::Poisson { rate }
                if rate.bytes_tx_time(packet_size) == SimTime::ZERO
                    || rate.bytes_tx_time(packet_size) == SimTime::MAX =>
            {
                Err(SimError::InvalidConfig(format!(
                    "sending rate {} gives no usable interval for {} B packets",
                    rate, packet_size
                )))
            }
            Self::Burst { count: 0 } => Err(SimError::InvalidConfig(
                "burst needs at least one packet".into(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct Sender {
    pub address: Address,
    pub destination: Address,
    packet_size: u32,
    pattern: TrafficPattern,
    start: SimTime,
    stop: SimTime,
    rng: StdRng,
    message_type: Option<String>,
    sent: u64,
}

impl Sender {
    pub fn new(
        address: Address,
        destination: Address,
        packet_size: u32,
        pattern: TrafficPattern,
        start: SimTime,
        stop: SimTime,
        seed: u64,
    ) -> Self {
        Self {
            address,
            destination,
            packet_size,
            pattern,
            start,
            stop,
            rng: StdRng::seed_from_u64(seed),
            message_type: None,
            sent: 0,
        }
    }

    pub fn with_message_type(mut self, kind: Option<String>) -> Self {
        self.message_type = kind;
        self
    }

    /// Time of the first send, if the sending window is not empty.
    pub fn first_send(&self) -> Option<SimTime> {
        (self.start < self.stop).then_some(self.start)
    }

    pub fn make_packet(&mut self, uid: PacketId) -> Packet {
        self.sent += 1;
        let mut packet = Packet::new(uid, self.packet_size, self.address, self.destination);
        if let Some(kind) = &self.message_type {
            packet.add_message_type(TypeTag { kind: kind.clone() });
        }
        packet
    }

    /// Call after each send. `None` once the window closes.
    pub fn next_send(&mut self, now: SimTime) -> Option<SimTime> {
        let next = match &self.pattern {
            TrafficPattern::Interval { every } => now + *every,
            TrafficPattern::ConstantRate { rate } => now + rate.bytes_tx_time(self.packet_size),
            TrafficPattern::Poisson { rate } => {
                let mean = rate.bytes_tx_time(self.packet_size).as_secs_f64();
                let gap = Exp::new(1.0 / mean)
                    .map(|exp| exp.sample(&mut self.rng))
                    .unwrap_or(mean);
                now + SimTime::from_secs_f64(gap)
            }
            TrafficPattern::Burst { count } => {
                if self.sent >= *count as u64 {
                    debug!("burst of {} done at {}", count, now);
                    return None;
                }
                now
            }
        };

        (next < self.stop).then_some(next)
    }
}

//! Bridge that adds per-packet processing latency and per-port throughput
//! limiting on top of instantaneous learning-bridge forwarding.
//!
//! Each input interface behaves like a single-server queue: one packet is in
//! processing at a time, later arrivals wait in a bounded drop-tail queue.
//! Two timers start with each packet. The processing delay decides when the
//! packet leaves the device; the throughput delay (serialization time at the
//! configured rate) decides when the next packet on that interface may start.
//! With a processing delay longer than the serialization time packets overlap
//! in flight, the way pipelined store-and-forward hardware does.

pub mod device;
pub mod firewall;
pub mod forwarding;
pub mod latency;
pub mod queue;

pub use device::{BridgeEvent, DeviceId, DeviceStats, PortState, ProcessingBridge};
pub use firewall::{Direction, FirewallFilter, InterfaceRules};
pub use forwarding::{Forwarding, LearningBridge};
pub use latency::{ConstantDelay, FnDelay, LatencyRegistry, MacsecRegression, ProcessingDelay};
pub use queue::{Admission, InputQueue, QueuedPacket};

use crate::network::DataRate;
use crate::sim::SimTime;
use std::sync::Arc;

/// Fixed at construction.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub processing_delay: Arc<dyn ProcessingDelay>,
    pub throughput: DataRate,
    pub queue_capacity: usize,
    pub firewall: Option<FirewallFilter>,
}

impl BridgeConfig {
    pub fn new(
        processing_delay: Arc<dyn ProcessingDelay>,
        throughput: DataRate,
        queue_capacity: usize,
    ) -> Self {
        Self {
            processing_delay,
            throughput,
            queue_capacity,
            firewall: None,
        }
    }

    pub fn with_firewall(mut self, firewall: FirewallFilter) -> Self {
        self.firewall = Some(firewall);
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            processing_delay: Arc::new(ConstantDelay::new(SimTime::from_nanos(30))),
            throughput: DataRate::from_mbps(1000),
            queue_capacity: 100,
            firewall: None,
        }
    }
}

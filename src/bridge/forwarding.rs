use crate::network::Address;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// The bridging logic behind a processing bridge. It must not add simulated delay.
pub trait Forwarding: Send + fmt::Debug {
    /// Called once per packet, the moment it starts processing.
    fn learn(&mut self, source: Address, interface: u32);

    /// Ports a packet to `destination` that came in on `ingress` leaves through.
    fn egress(&self, destination: Address, ingress: u32, ports: &[u32]) -> Vec<u32>;
}

/// Plain transparent bridge: learn source addresses, flood unknown and broadcast.
#[derive(Debug, Default, Clone)]
pub struct LearningBridge {
    table: HashMap<Address, u32>,
}

impl LearningBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, address: Address) -> Option<u32> {
        self.table.get(&address).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Forwarding for LearningBridge {
    fn learn(&mut self, source: Address, interface: u32) {
        if source.is_multicast() {
            return;
        }
        if self.table.insert(source, interface) != Some(interface) {
            trace!("learned {} on interface {}", source, interface);
        }
    }

    fn egress(&self, destination: Address, ingress: u32, ports: &[u32]) -> Vec<u32> {
        if !destination.is_multicast() {
            if let Some(port) = self.lookup(destination) {
                // Known on the port it came from: filter.
                return if port == ingress { Vec::new() } else { vec![port] };
            }
        }
        ports.iter().copied().filter(|&p| p != ingress).collect()
    }
}

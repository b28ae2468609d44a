use super::{
    Admission, BridgeConfig, Direction, Forwarding, InputQueue, LearningBridge, QueuedPacket,
};
use crate::error::{Result, SimError};
use crate::network::{Packet, PacketType};
use crate::sim::Scheduler;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

pub type DeviceId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Ready,
    Busy,
}

/// Timers a bridge schedules for itself.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// Processing delay elapsed: the packet leaves the device.
    Emit { device: DeviceId, record: QueuedPacket },
    /// Throughput delay elapsed: the interface may start its next packet.
    PortReady { device: DeviceId, interface: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub received: u64,
    pub dropped: u64,
    /// Refused by the firewall, in either direction.
    pub filtered: u64,
    pub processed: u64,
    pub emitted: u64,
}

#[derive(Debug)]
struct InputPort {
    state: PortState,
    queue: InputQueue,
}

#[derive(Debug)]
pub struct ProcessingBridge {
    id: DeviceId,
    name: String,
    config: BridgeConfig,
    forwarding: Box<dyn Forwarding>,
    bridge_ports: Vec<u32>,
    // Created lazily on first arrival.
    inputs: BTreeMap<u32, InputPort>,
    stats: DeviceStats,
}

impl ProcessingBridge {
    pub fn new(id: DeviceId, name: impl Into<String>, config: BridgeConfig) -> Self {
        Self::with_forwarding(id, name, config, Box::new(LearningBridge::new()))
    }

    pub fn with_forwarding(
        id: DeviceId,
        name: impl Into<String>,
        config: BridgeConfig,
        forwarding: Box<dyn Forwarding>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            config,
            forwarding,
            bridge_ports: Vec::new(),
            inputs: BTreeMap::new(),
            stats: DeviceStats::default(),
        }
    }

    /// Attach another port and return its interface index.
    pub fn add_port(&mut self) -> u32 {
        let interface = self.bridge_ports.len() as u32;
        self.bridge_ports.push(interface);
        interface
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn ports(&self) -> &[u32] {
        &self.bridge_ports
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub fn port_state(&self, interface: u32) -> Option<PortState> {
        self.inputs.get(&interface).map(|p| p.state)
    }

    pub fn queue_len(&self, interface: u32) -> usize {
        self.inputs.get(&interface).map_or(0, |p| p.queue.len())
    }

    pub fn queue_high_water(&self, interface: u32) -> usize {
        self.inputs.get(&interface).map_or(0, |p| p.queue.high_water())
    }

    pub fn queue_dropped(&self, interface: u32) -> u64 {
        self.inputs.get(&interface).map_or(0, |p| p.queue.dropped())
    }

    /// A packet arrived on `interface`. Returns whether the input queue took it;
    /// a dropped packet is gone with no signal to the sender.
    pub fn receive<E: From<BridgeEvent>>(
        &mut self,
        interface: u32,
        packet: Packet,
        packet_type: PacketType,
        sched: &mut Scheduler<E>,
    ) -> Result<Admission> {
        self.stats.received += 1;

        if !self.firewall_allows(interface, Direction::Ingress, &packet) {
            self.stats.filtered += 1;
            return Ok(Admission::Blocked);
        }

        let capacity = self.config.queue_capacity;
        let port = self.inputs.entry(interface).or_insert_with(|| {
            debug!("{}: new input port {} (capacity {})", self.name, interface, capacity);
            InputPort {
                state: PortState::Ready,
                queue: InputQueue::new(capacity),
            }
        });

        let uid = packet.uid;
        if port.queue.enqueue(QueuedPacket::new(interface, packet, packet_type)) == Admission::Drop {
            self.stats.dropped += 1;
            trace!("{}: input queue {} full, dropped {:?}", self.name, interface, uid);
            return Ok(Admission::Drop);
        }

        if port.state == PortState::Ready {
            if let Some(next) = port.queue.dequeue() {
                self.begin_processing(next, sched)?;
            }
        }

        Ok(Admission::Accept)
    }

    /// Put `record` in its interface's processing slot. The slot must be free.
    pub fn begin_processing<E: From<BridgeEvent>>(
        &mut self,
        record: QueuedPacket,
        sched: &mut Scheduler<E>,
    ) -> Result<()> {
        let interface = record.interface;
        let port = self
            .inputs
            .get_mut(&interface)
            .ok_or_else(|| SimError::UnknownPort {
                device: self.name.clone(),
                interface,
            })?;

        if port.state != PortState::Ready {
            return Err(SimError::InvariantViolation {
                device: self.name.clone(),
                interface,
            });
        }
        port.state = PortState::Busy;
        self.stats.processed += 1;

        // Bridging sees the packet now; only its onward delivery is delayed.
        self.forwarding.learn(record.source, interface);

        let size = record.size();
        let processing = self.config.processing_delay.delay(size);
        let throughput = self.config.throughput.bytes_tx_time(size);
        trace!(
            "{}: interface {} processing {:?} ({} B), out in {}, next in {}",
            self.name,
            interface,
            record.packet.uid,
            size,
            processing,
            throughput
        );

        sched.schedule(
            processing,
            BridgeEvent::Emit {
                device: self.id,
                record,
            }
            .into(),
        );
        sched.schedule(
            throughput,
            BridgeEvent::PortReady {
                device: self.id,
                interface,
            }
            .into(),
        );
        Ok(())
    }

    /// Throughput timer for `interface` fired.
    pub fn port_ready<E: From<BridgeEvent>>(
        &mut self,
        interface: u32,
        sched: &mut Scheduler<E>,
    ) -> Result<()> {
        let port = self
            .inputs
            .get_mut(&interface)
            .ok_or_else(|| SimError::UnknownPort {
                device: self.name.clone(),
                interface,
            })?;

        port.state = PortState::Ready;
        if let Some(next) = port.queue.dequeue() {
            self.begin_processing(next, sched)?;
        }
        Ok(())
    }

    /// Processing timer fired: the interfaces the packet now leaves through.
    pub fn emit(&mut self, record: &QueuedPacket) -> Vec<u32> {
        self.stats.emitted += 1;
        let mut ports = self
            .forwarding
            .egress(record.destination, record.interface, &self.bridge_ports);

        let before = ports.len();
        ports.retain(|&port| self.firewall_allows(port, Direction::Egress, &record.packet));
        self.stats.filtered += (before - ports.len()) as u64;
        ports
    }

    fn firewall_allows(&self, interface: u32, direction: Direction, packet: &Packet) -> bool {
        self.config
            .firewall
            .as_ref()
            .is_none_or(|fw| fw.allows(interface, direction, packet.message_type()))
    }

}

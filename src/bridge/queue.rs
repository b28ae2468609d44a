// Drop-tail admission queue in front of each bridge input port.

use crate::network::{Address, Packet, PacketType};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Drop,
    /// Refused by the hop's firewall before reaching the queue.
    Blocked,
}

/// A packet waiting at an input port, with everything needed to bridge it later.
#[derive(Debug, Clone)]
pub struct QueuedPacket {
    pub interface: u32,
    pub packet: Packet,
    pub protocol: u16,
    pub source: Address,
    pub destination: Address,
    pub packet_type: PacketType,
}

impl QueuedPacket {
    pub fn new(interface: u32, packet: Packet, packet_type: PacketType) -> Self {
        Self {
            interface,
            protocol: packet.protocol,
            source: packet.source,
            destination: packet.destination,
            packet,
            packet_type,
        }
    }

    pub fn size(&self) -> u32 {
        self.packet.size
    }
}

#[derive(Debug, Clone)]
pub struct InputQueue {
    capacity: usize,
    items: VecDeque<QueuedPacket>,
    dropped: u64,
    high_water: usize,
}

impl InputQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(1024)),
            dropped: 0,
            high_water: 0,
        }
    }

    /// Full queue drops the newcomer. Callers must not retry.
    pub fn enqueue(&mut self, record: QueuedPacket) -> Admission {
        if self.items.len() >= self.capacity {
            self.dropped += 1;
            return Admission::Drop;
        }
        self.items.push_back(record);
        self.high_water = self.high_water.max(self.items.len());
        Admission::Accept
    }

    pub fn dequeue(&mut self) -> Option<QueuedPacket> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }
}

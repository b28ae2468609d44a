use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketId(u64);

impl PacketId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// 48-bit link layer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(u64);

impl Address {
    pub const BROADCAST: Address = Address(0xffff_ffff_ffff);

    pub fn new(raw: u64) -> Self {
        Self(raw & 0xffff_ffff_ffff)
    }

    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }

    // Low bit of the first octet.
    pub fn is_multicast(self) -> bool {
        (self.0 >> 40) & 0x01 == 0x01
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[2], b[3], b[4], b[5], b[6], b[7])
    }
}

/// How a frame was addressed relative to the port that received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketType {
    Host,
    Broadcast,
    Multicast,
    OtherHost,
}

impl PacketType {
    pub fn classify(destination: Address, local: Address) -> Self {
        if destination.is_broadcast() {
            Self::Broadcast
        } else if destination.is_multicast() {
            Self::Multicast
        } else if destination == local {
            Self::Host
        } else {
            Self::OtherHost
        }
    }
}

pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// Sequence number stamped once at the origin of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceTag {
    pub id: u64,
}

/// Send time stamped once at the origin of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampTag {
    pub time: SimTime,
}

/// Application message type, stamped by the sending host. Zonal firewalls
/// match on it; untyped traffic is never filtered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeTag {
    pub kind: String,
}

/// Metadata that rides along with a packet. Tags are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketTags {
    pub sequence: Option<SequenceTag>,
    pub timestamp: Option<TimestampTag>,
    pub message_type: Option<TypeTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    pub uid: PacketId,
    pub size: u32,
    pub protocol: u16,
    pub source: Address,
    pub destination: Address,
    tags: PacketTags,
}

impl Packet {
    pub fn new(uid: PacketId, size: u32, source: Address, destination: Address) -> Self {
        Self {
            uid,
            size,
            protocol: ETHERTYPE_IPV4,
            source,
            destination,
            tags: PacketTags::default(),
        }
    }

    pub fn sequence(&self) -> Option<u64> {
        self.tags.sequence.map(|t| t.id)
    }

    pub fn sent_at(&self) -> Option<SimTime> {
        self.tags.timestamp.map(|t| t.time)
    }

    /// Attach a sequence tag. An existing one is kept, since ids are assigned once.
    pub fn add_sequence(&mut self, tag: SequenceTag) -> bool {
        if self.tags.sequence.is_some() {
            return false;
        }
        self.tags.sequence = Some(tag);
        true
    }

    pub fn add_timestamp(&mut self, tag: TimestampTag) -> bool {
        if self.tags.timestamp.is_some() {
            return false;
        }
        self.tags.timestamp = Some(tag);
        true
    }

    pub fn message_type(&self) -> Option<&str> {
        self.tags.message_type.as_ref().map(|t| t.kind.as_str())
    }

    pub fn add_message_type(&mut self, tag: TypeTag) -> bool {
        if self.tags.message_type.is_some() {
            return false;
        }
        self.tags.message_type = Some(tag);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_packet_has_no_timing() {
        let p = Packet::new(PacketId::new(1), 64, Address::new(1), Address::new(2));
        assert_eq!(p.sequence(), None);
        assert_eq!(p.sent_at(), None);
    }

    #[test]
    fn test_tags_are_additive_only() {
        let mut p = Packet::new(PacketId::new(1), 64, Address::new(1), Address::new(2));
        assert!(p.add_sequence(SequenceTag { id: 7 }));
        assert!(!p.add_sequence(SequenceTag { id: 8 }));
        assert_eq!(p.sequence(), Some(7));

        assert!(p.add_timestamp(TimestampTag { time: SimTime::from_nanos(3) }));
        assert!(!p.add_timestamp(TimestampTag { time: SimTime::from_nanos(4) }));
        assert_eq!(p.sent_at(), Some(SimTime::from_nanos(3)));
    }

    #[test]
    fn test_message_type_is_set_once() {
        let mut p = Packet::new(PacketId::new(1), 64, Address::new(1), Address::new(2));
        assert_eq!(p.message_type(), None);
        assert!(p.add_message_type(TypeTag { kind: "brake".into() }));
        assert!(!p.add_message_type(TypeTag { kind: "media".into() }));
        assert_eq!(p.message_type(), Some("brake"));
    }

    #[test]
    fn test_tags_serialize_independently() {
        let seq = serde_json::to_string(&SequenceTag { id: 42 }).unwrap();
        assert_eq!(seq, r#"{"id":42}"#);
        let ts = serde_json::to_string(&TimestampTag { time: SimTime::from_nanos(5) }).unwrap();
        assert_eq!(ts, r#"{"time":5}"#);
    }

    #[test]
    fn test_classify() {
        let me = Address::new(0x02_00_00_00_00_01);
        assert_eq!(PacketType::classify(Address::BROADCAST, me), PacketType::Broadcast);
        assert_eq!(PacketType::classify(Address::new(0x01_00_5e_00_00_01), me), PacketType::Multicast);
        assert_eq!(PacketType::classify(me, me), PacketType::Host);
        assert_eq!(PacketType::classify(Address::new(0x02_00_00_00_00_02), me), PacketType::OtherHost);
        assert_eq!(me.to_string(), "02:00:00:00:00:01");
    }
}

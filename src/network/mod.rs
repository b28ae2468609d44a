pub mod packet;
pub mod rate;

pub use packet::{
    Address, Packet, PacketId, PacketTags, PacketType, SequenceTag, TimestampTag, TypeTag,
    ETHERTYPE_IPV4,
};
pub use rate::DataRate;

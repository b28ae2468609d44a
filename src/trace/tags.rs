use crate::network::{Packet, SequenceTag, TimestampTag};
use crate::sim::SimTime;

/// Stamps packets at the origin of one flow with a send time and a sequence
/// id. Ids start at 0 and go up by one per call, measured or not.
#[derive(Debug, Clone, Default)]
pub struct PacketTagger {
    next_id: u64,
}

impl PacketTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id given to `packet`.
    pub fn tag(&mut self, packet: &mut Packet, now: SimTime) -> u64 {
        let id = self.next_id;
        packet.add_timestamp(TimestampTag { time: now });
        packet.add_sequence(SequenceTag { id });
        self.next_id += 1;
        id
    }

    /// Number of packets tagged so far, which is also the next id.
    pub fn issued(&self) -> u64 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Address, PacketId};

    fn packet() -> Packet {
        Packet::new(PacketId::new(0), 100, Address::new(1), Address::new(2))
    }

    #[test]
    fn test_ids_are_gap_free_from_zero() {
        let mut tagger = PacketTagger::new();
        let ids: Vec<u64> = (0..5)
            .map(|i| tagger.tag(&mut packet(), SimTime::from_millis(i)))
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(tagger.issued(), 5);
    }

    #[test]
    fn test_tag_sets_both_fields() {
        let mut tagger = PacketTagger::new();
        let mut p = packet();
        tagger.tag(&mut p, SimTime::from_micros(3));
        assert_eq!(p.sequence(), Some(0));
        assert_eq!(p.sent_at(), Some(SimTime::from_micros(3)));
    }
}

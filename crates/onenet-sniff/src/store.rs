//! Timestamp-ordered packet store.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::warn;

use crate::error::StoreError;
use crate::filter::Filter;
use crate::packet::Packet;

/// Decoded packets keyed by adjusted timestamp (capture time plus offset).
#[derive(Debug, Clone, Default)]
pub struct PacketStore {
    offset_ms: i64,
    packets: BTreeMap<u64, Packet>,
}

impl PacketStore {
    pub fn new(offset_ms: i64) -> Self {
        Self {
            offset_ms,
            packets: BTreeMap::new(),
        }
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Stored timestamp for a capture timestamp.
    pub fn adjusted(&self, capture_ms: u64) -> u64 {
        capture_ms.saturating_add_signed(self.offset_ms)
    }

    /// Inserts `packet`, refusing to replace one already stored at the same time.
    pub fn insert(&mut self, packet: Packet) -> Result<u64, StoreError> {
        let timestamp = self.adjusted(packet.timestamp_ms());
        match self.packets.entry(timestamp) {
            Entry::Occupied(_) => {
                warn!(timestamp, "duplicate packet timestamp");
                Err(StoreError::DuplicateTimestamp(timestamp))
            }
            Entry::Vacant(slot) => {
                slot.insert(packet);
                Ok(timestamp)
            }
        }
    }

    pub fn get(&self, timestamp: u64) -> Option<&Packet> {
        self.packets.get(&timestamp)
    }

    pub fn remove(&mut self, timestamp: u64) -> Option<Packet> {
        self.packets.remove(&timestamp)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn clear(&mut self) {
        self.packets.clear();
    }

    /// All packets in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Packet)> {
        self.packets.iter().map(|(ts, packet)| (*ts, packet))
    }

    /// Packets the filter accepts, in timestamp order.
    pub fn query<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = (u64, &'a Packet)> + 'a {
        self.iter().filter(move |(ts, packet)| filter.accepts(*ts, packet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onenet_codec::header::decode_header;
    use onenet_codec::raw::RawPacket;

    use crate::packet::Validity;

    fn packet(timestamp_ms: u64) -> Packet {
        let bytes = vec![0xB4; 32];
        let header = decode_header(&bytes).unwrap();
        Packet {
            raw: RawPacket::new(timestamp_ms, bytes).unwrap(),
            header,
            kind: None,
            validity: Validity::default(),
            issues: Vec::new(),
            key: None,
            payload: None,
            parse_error: None,
        }
    }

    #[test]
    fn iterates_in_timestamp_order_regardless_of_insert_order() {
        let mut store = PacketStore::default();
        for ts in [30, 10, 20] {
            store.insert(packet(ts)).unwrap();
        }
        let order: Vec<u64> = store.iter().map(|(ts, _)| ts).collect();
        assert_eq!(order, vec![10, 20, 30]);
    }

    #[test]
    fn duplicate_timestamp_is_reported_not_dropped_silently() {
        let mut store = PacketStore::default();
        store.insert(packet(5)).unwrap();
        assert_eq!(store.insert(packet(5)), Err(StoreError::DuplicateTimestamp(5)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn offset_shifts_stored_timestamps() {
        let mut store = PacketStore::new(-100);
        assert_eq!(store.insert(packet(1_000)), Ok(900));
        assert!(store.get(900).is_some());
        assert_eq!(store.adjusted(50), 0);
    }

    #[test]
    fn query_applies_filter() {
        use crate::filter::FilterField;

        let mut store = PacketStore::default();
        for ts in [1, 2, 3, 4] {
            store.insert(packet(ts)).unwrap();
        }
        let mut filter = Filter::new();
        filter.accept_range(FilterField::Timestamp, 2, 3).unwrap();
        let hits: Vec<u64> = store.query(&filter).map(|(ts, _)| ts).collect();
        assert_eq!(hits, vec![2, 3]);
    }
}

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// A submission that was broadcast but never confirmed within the polling
/// window. Kept so the batch can try to evict it with a higher gas price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReplacement {
    pub tx_hash: B256,
    pub nonce: u64,
    pub gas_price: u128,
}

#[derive(Debug, Clone, Default)]
pub struct PendingReplacements {
    records: Vec<PendingReplacement>,
}

impl PendingReplacements {
    pub fn record(&mut self, record: PendingReplacement) {
        if self.records.iter().any(|r| r.tx_hash == record.tx_hash) {
            return;
        }
        self.records.push(record);
    }

    pub fn remove(&mut self, tx_hash: B256) -> Option<PendingReplacement> {
        let index = self.records.iter().position(|r| r.tx_hash == tx_hash)?;
        Some(self.records.remove(index))
    }

    pub fn take_all(&mut self) -> Vec<PendingReplacement> {
        std::mem::take(&mut self.records)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingReplacement> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(byte: u8, nonce: u64) -> PendingReplacement {
        PendingReplacement {
            tx_hash: B256::repeat_byte(byte),
            nonce,
            gas_price: 1,
        }
    }

    #[test]
    fn test_duplicate_hash_recorded_once() {
        let mut pending = PendingReplacements::default();
        pending.record(record(1, 0));
        pending.record(record(1, 0));
        pending.record(record(2, 1));
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_remove_and_take_all() {
        let mut pending = PendingReplacements::default();
        pending.record(record(1, 0));
        pending.record(record(2, 1));

        assert_eq!(pending.remove(B256::repeat_byte(1)).map(|r| r.nonce), Some(0));
        assert!(pending.remove(B256::repeat_byte(1)).is_none());

        let drained = pending.take_all();
        assert_eq!(drained.len(), 1);
        assert!(pending.is_empty());
    }
}

//! Ordered storage underneath the fixation store.
//!
//! A backend maps `(ParamKey, effective_height)` to encoded bytes and must
//! support "greatest height at or below H" lookups without scanning the
//! whole history. The store owns ordering checks; a backend only stores
//! what it is given.

use std::collections::BTreeMap;

use epochstore_types::{FixationRecord, Height, ParamKey};

use crate::error::BackendError;

/// Ordered key-value engine holding fixation records.
pub trait FixationBackend: Send + Sync {
    /// Store a record. An existing record at the same `(key, height)` is
    /// replaced; the store never asks for that.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the engine fails the write.
    fn insert(&mut self, record: FixationRecord) -> Result<(), BackendError>;

    /// Store a batch of records that the store has already validated.
    ///
    /// Engines with transactions should apply the batch atomically. The
    /// default inserts one record at a time.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the engine fails the write.
    fn insert_batch(&mut self, records: Vec<FixationRecord>) -> Result<(), BackendError> {
        for record in records {
            self.insert(record)?;
        }
        Ok(())
    }

    /// The record for `key` with the greatest effective height that is
    /// `<= height`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the engine fails the read.
    fn latest_at_or_below(
        &self,
        key: ParamKey,
        height: Height,
    ) -> Result<Option<FixationRecord>, BackendError>;

    /// The newest record for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the engine fails the read.
    fn latest(&self, key: ParamKey) -> Result<Option<FixationRecord>, BackendError> {
        self.latest_at_or_below(key, Height::MAX)
    }

    /// The oldest retained record for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the engine fails the read.
    fn earliest(&self, key: ParamKey) -> Result<Option<FixationRecord>, BackendError>;

    /// All retained records for `key`, ascending by effective height.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the engine fails the read.
    fn records(&self, key: ParamKey) -> Result<Vec<FixationRecord>, BackendError>;

    /// Remove every record for `key` with effective height `< height`.
    /// Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the engine fails the delete.
    fn remove_below(&mut self, key: ParamKey, height: Height) -> Result<usize, BackendError>;

    /// Total number of retained records across all keys.
    fn len(&self) -> usize;

    /// Whether the backend holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory backend over a [`BTreeMap`] keyed by `(ParamKey, height)`.
///
/// Records of one key are contiguous in the map, so a bounded reverse
/// range scan finds the fixation in effect at any height in O(log n).
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<(ParamKey, Height), Vec<u8>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

fn to_record(entry: (&(ParamKey, Height), &Vec<u8>)) -> FixationRecord {
    let (&(key, height), value) = entry;
    FixationRecord::new(key, value.clone(), height)
}

impl FixationBackend for MemoryBackend {
    fn insert(&mut self, record: FixationRecord) -> Result<(), BackendError> {
        self.entries
            .insert((record.key, record.effective_height), record.value);
        Ok(())
    }

    fn latest_at_or_below(
        &self,
        key: ParamKey,
        height: Height,
    ) -> Result<Option<FixationRecord>, BackendError> {
        Ok(self
            .entries
            .range((key, 0)..=(key, height))
            .next_back()
            .map(to_record))
    }

    fn earliest(&self, key: ParamKey) -> Result<Option<FixationRecord>, BackendError> {
        Ok(self
            .entries
            .range((key, 0)..=(key, Height::MAX))
            .next()
            .map(to_record))
    }

    fn records(&self, key: ParamKey) -> Result<Vec<FixationRecord>, BackendError> {
        Ok(self
            .entries
            .range((key, 0)..=(key, Height::MAX))
            .map(to_record)
            .collect())
    }

    fn remove_below(&mut self, key: ParamKey, height: Height) -> Result<usize, BackendError> {
        let doomed: Vec<(ParamKey, Height)> = self
            .entries
            .range((key, 0)..(key, height))
            .map(|(index, _)| *index)
            .collect();
        for index in &doomed {
            self.entries.remove(index);
        }
        Ok(doomed.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn backend_with(key: ParamKey, heights: &[Height]) -> MemoryBackend {
        let mut backend = MemoryBackend::new();
        for &h in heights {
            backend
                .insert(FixationRecord::new(key, h.to_string().into_bytes(), h))
                .unwrap();
        }
        backend
    }

    #[test]
    fn lookup_picks_greatest_height_not_above_query() {
        let backend = backend_with(ParamKey::EpochBlocks, &[0, 40, 90]);

        let at = |h| {
            backend
                .latest_at_or_below(ParamKey::EpochBlocks, h)
                .unwrap()
                .map(|r| r.effective_height)
        };
        assert_eq!(at(0), Some(0));
        assert_eq!(at(39), Some(0));
        assert_eq!(at(40), Some(40));
        assert_eq!(at(89), Some(40));
        assert_eq!(at(Height::MAX), Some(90));
    }

    #[test]
    fn lookup_does_not_cross_into_other_keys() {
        let mut backend = backend_with(ParamKey::EpochsToSave, &[5]);
        backend
            .insert(FixationRecord::new(ParamKey::EpochBlocks, b"1".to_vec(), 0))
            .unwrap();

        // EpochBlocks sorts before EpochsToSave; a query below 5 must not
        // fall back to the EpochBlocks record.
        assert!(backend
            .latest_at_or_below(ParamKey::EpochsToSave, 4)
            .unwrap()
            .is_none());
        assert!(backend
            .latest_at_or_below(ParamKey::UnstakeHoldBlocks, Height::MAX)
            .unwrap()
            .is_none());
    }

    #[test]
    fn earliest_and_records_are_ordered() {
        let backend = backend_with(ParamKey::UnstakeHoldBlocks, &[30, 10, 20]);
        assert_eq!(
            backend
                .earliest(ParamKey::UnstakeHoldBlocks)
                .unwrap()
                .map(|r| r.effective_height),
            Some(10)
        );
        let heights: Vec<Height> = backend
            .records(ParamKey::UnstakeHoldBlocks)
            .unwrap()
            .into_iter()
            .map(|r| r.effective_height)
            .collect();
        assert_eq!(heights, vec![10, 20, 30]);
    }

    #[test]
    fn remove_below_is_exclusive_and_per_key() {
        let mut backend = backend_with(ParamKey::EpochBlocks, &[0, 10, 20]);
        backend
            .insert(FixationRecord::new(ParamKey::EpochsToSave, b"3".to_vec(), 0))
            .unwrap();

        let removed = backend.remove_below(ParamKey::EpochBlocks, 20).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(backend.len(), 2);
        assert_eq!(
            backend
                .earliest(ParamKey::EpochBlocks)
                .unwrap()
                .map(|r| r.effective_height),
            Some(20)
        );
        assert!(backend.earliest(ParamKey::EpochsToSave).unwrap().is_some());
    }
}

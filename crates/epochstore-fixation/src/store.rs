//! The fixation store: an append-only, per-key log of height-tagged values.
//!
//! [`FixationStore`] owns the record log (through its backend) and the
//! [`ParameterSet`], the cached latest record of every key.
//!
//! # Design
//!
//! - **Append-only**: a key's records only ever grow at the high end. An
//!   append at or below the key's latest height is rejected.
//! - **Point-in-time reads**: [`get_as_of`](FixationStore::get_as_of)
//!   consults only records at or below the queried height.
//! - **Projection, not state**: the [`ParameterSet`] is rebuilt from the
//!   backend on open and updated only inside the append path, under the
//!   same write lock as the backend insert.
//! - **Snapshot reads**: readers share a read lock, so a query never
//!   observes a half-applied append.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use epochstore_types::{FixationRecord, Height, ParamKey};

use crate::backend::{FixationBackend, MemoryBackend};
use crate::codec::{JsonCodec, ParamCodec};
use crate::error::{BackendError, FixationError};
use crate::height::HeightSource;

// ---------------------------------------------------------------------------
// Parameter Set
// ---------------------------------------------------------------------------

/// The latest fixation of every key that has one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    latest: BTreeMap<ParamKey, FixationRecord>,
}

impl ParameterSet {
    /// The latest record for `key`, if any fixation exists.
    pub fn get(&self, key: ParamKey) -> Option<&FixationRecord> {
        self.latest.get(&key)
    }

    /// Greatest effective height among the latest records.
    pub fn latest_change_height(&self) -> Option<Height> {
        self.latest.values().map(|r| r.effective_height).max()
    }

    /// Iterate over `(key, latest record)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &FixationRecord)> {
        self.latest.iter()
    }

    /// Number of keys with at least one fixation.
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    /// Whether no key has been fixated.
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct StoreInner<B> {
    backend: B,
    current: ParameterSet,
}

/// Append-only fixation log with point-in-time lookup.
pub struct FixationStore<B = MemoryBackend, C = JsonCodec> {
    inner: RwLock<StoreInner<B>>,
    codec: C,
}

impl FixationStore<MemoryBackend, JsonCodec> {
    /// Create an empty store over a [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                backend: MemoryBackend::new(),
                current: ParameterSet::default(),
            }),
            codec: JsonCodec,
        }
    }
}

impl<B: FixationBackend> FixationStore<B, JsonCodec> {
    /// Open a store over an existing backend using the JSON codec.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::Backend`] if the backend cannot be read.
    pub fn open(backend: B) -> Result<Self, FixationError> {
        Self::open_with_codec(backend, JsonCodec)
    }
}

impl<B: FixationBackend, C: ParamCodec> FixationStore<B, C> {
    /// Open a store over an existing backend with an explicit codec.
    ///
    /// The [`ParameterSet`] is rebuilt from the newest record of each key,
    /// after checking that every key's records are its own and strictly
    /// ascending by height.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::Backend`] if the backend cannot be read, or
    /// wraps [`BackendError::Corrupt`] if the stored order is broken.
    pub fn open_with_codec(backend: B, codec: C) -> Result<Self, FixationError> {
        let mut latest = BTreeMap::new();
        for key in ParamKey::ALL {
            let records = backend.records(key)?;
            check_ordering(key, &records)?;
            if let Some(record) = records.into_iter().last() {
                latest.insert(key, record);
            }
        }
        debug!(
            keys = latest.len(),
            records = backend.len(),
            "Fixation store opened"
        );
        Ok(Self {
            inner: RwLock::new(StoreInner {
                backend,
                current: ParameterSet { latest },
            }),
            codec,
        })
    }

    /// The codec used for parameter payloads.
    pub const fn codec(&self) -> &C {
        &self.codec
    }

    /// Fixate a new value for `key`, effective from the height currently
    /// being executed.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::Codec`] if the value cannot be encoded,
    /// [`FixationError::NonMonotonicHeight`] or
    /// [`FixationError::HeightAlreadyFixated`] if the height is not above
    /// the key's latest fixation, [`FixationError::InvalidEpochLength`] for
    /// a zero epoch length, or [`FixationError::Backend`].
    pub fn set_current<T: Serialize>(
        &self,
        clock: &impl HeightSource,
        key: ParamKey,
        value: &T,
    ) -> Result<FixationRecord, FixationError> {
        let bytes = self.codec.encode(value).map_err(|e| FixationError::Codec {
            key,
            reason: e.0,
        })?;
        self.set_raw(key, bytes, clock.current_height())
    }

    /// Fixate several keys at once, all effective from the height
    /// currently being executed.
    ///
    /// Either every value is fixated or none is: all values are encoded
    /// and checked before the first write.
    ///
    /// # Errors
    ///
    /// Same as [`set_current`](Self::set_current), for any of the values.
    pub fn set_current_many<T: Serialize>(
        &self,
        clock: &impl HeightSource,
        values: &[(ParamKey, T)],
    ) -> Result<Vec<FixationRecord>, FixationError> {
        let height = clock.current_height();
        let records = values
            .iter()
            .map(|(key, value)| {
                let bytes = self.codec.encode(value).map_err(|e| FixationError::Codec {
                    key: *key,
                    reason: e.0,
                })?;
                Ok(FixationRecord::new(*key, bytes, height))
            })
            .collect::<Result<Vec<_>, FixationError>>()?;
        self.append(records)
    }

    /// Append an already-encoded value at an explicit height.
    ///
    /// # Errors
    ///
    /// Same ordering, value, and backend errors as
    /// [`set_current`](Self::set_current).
    pub fn set_raw(
        &self,
        key: ParamKey,
        value: Vec<u8>,
        height: Height,
    ) -> Result<FixationRecord, FixationError> {
        let record = FixationRecord::new(key, value, height);
        self.append(vec![record.clone()])?;
        Ok(record)
    }

    /// Validate a batch against the log and append it under one write lock.
    ///
    /// Records are sorted by `(key, height)`. Each must lie strictly above
    /// the key's latest fixation (in the log or earlier in the batch), and
    /// an `EpochBlocks` value must decode to a non-zero length. Nothing is
    /// written unless the whole batch passes.
    fn append(
        &self,
        mut records: Vec<FixationRecord>,
    ) -> Result<Vec<FixationRecord>, FixationError> {
        records.sort_by_key(|r| (r.key, r.effective_height));

        let mut inner = self.inner.write();

        let mut latest: BTreeMap<ParamKey, Height> = inner
            .current
            .iter()
            .map(|(key, record)| (*key, record.effective_height))
            .collect();
        for record in &records {
            let (key, height) = (record.key, record.effective_height);
            if let Some(&previous) = latest.get(&key) {
                if height < previous {
                    return Err(FixationError::NonMonotonicHeight {
                        key,
                        height,
                        latest: previous,
                    });
                }
                if height == previous {
                    return Err(FixationError::HeightAlreadyFixated { key, height });
                }
            }
            self.check_value(record)?;
            latest.insert(key, height);
        }

        inner.backend.insert_batch(records.clone())?;
        for record in &records {
            inner.current.latest.insert(record.key, record.clone());
            info!(
                key = %record.key,
                height = record.effective_height,
                bytes = record.value.len(),
                "Parameter fixated"
            );
        }
        Ok(records)
    }

    /// Reject values no reader could use.
    fn check_value(&self, record: &FixationRecord) -> Result<(), FixationError> {
        if record.key == ParamKey::EpochBlocks && self.decode::<u64>(record)? == 0 {
            return Err(FixationError::InvalidEpochLength {
                height: record.effective_height,
            });
        }
        Ok(())
    }

    /// The latest fixation of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::UnknownParameterKey`] if `key` was never
    /// fixated.
    pub fn get_current(&self, key: ParamKey) -> Result<FixationRecord, FixationError> {
        self.inner
            .read()
            .current
            .get(key)
            .cloned()
            .ok_or(FixationError::UnknownParameterKey { key })
    }

    /// The latest value of `key`, decoded.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::UnknownParameterKey`] or
    /// [`FixationError::Codec`].
    pub fn get_current_value<T: DeserializeOwned>(
        &self,
        key: ParamKey,
    ) -> Result<T, FixationError> {
        let record = self.get_current(key)?;
        self.decode(&record)
    }

    /// The fixation of `key` in effect at `height`: the record with the
    /// greatest effective height that is `<= height`.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::UnknownParameterKey`] if `key` has no
    /// records, [`FixationError::NoFixationBeforeHeight`] if every record
    /// is newer than `height`, or [`FixationError::Backend`].
    pub fn get_as_of(
        &self,
        key: ParamKey,
        height: Height,
    ) -> Result<FixationRecord, FixationError> {
        let inner = self.inner.read();

        if let Some(record) = inner.backend.latest_at_or_below(key, height)? {
            return Ok(record);
        }

        match inner.backend.earliest(key)? {
            Some(earliest) => Err(FixationError::NoFixationBeforeHeight {
                key,
                height,
                earliest: earliest.effective_height,
            }),
            None => Err(FixationError::UnknownParameterKey { key }),
        }
    }

    /// The value of `key` in effect at `height`, decoded, together with
    /// the height at which that value took effect.
    ///
    /// # Errors
    ///
    /// Same as [`get_as_of`](Self::get_as_of), plus
    /// [`FixationError::Codec`].
    pub fn get_value_as_of<T: DeserializeOwned>(
        &self,
        key: ParamKey,
        height: Height,
    ) -> Result<(T, Height), FixationError> {
        let record = self.get_as_of(key, height)?;
        let value = self.decode(&record)?;
        Ok((value, record.effective_height))
    }

    /// Decode a record's payload with the store's codec.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::Codec`] if the payload is not a valid `T`.
    pub fn decode<T: DeserializeOwned>(
        &self,
        record: &FixationRecord,
    ) -> Result<T, FixationError> {
        self.codec
            .decode(&record.value)
            .map_err(|e| FixationError::Codec {
                key: record.key,
                reason: e.0,
            })
    }

    /// All retained records of `key`, ascending by effective height.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::Backend`] if the backend cannot be read.
    pub fn history(&self, key: ParamKey) -> Result<Vec<FixationRecord>, FixationError> {
        Ok(self.inner.read().backend.records(key)?)
    }

    /// A copy of the current Parameter Set.
    pub fn parameter_set(&self) -> ParameterSet {
        self.inner.read().current.clone()
    }

    /// Greatest effective height among the latest fixation of every key.
    pub fn latest_change_height(&self) -> Option<Height> {
        self.inner.read().current.latest_change_height()
    }

    /// Whether no fixation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.inner.read().current.is_empty()
    }

    /// Total number of retained records.
    pub fn record_count(&self) -> usize {
        self.inner.read().backend.len()
    }

    /// Every retained record, grouped by key and ascending by height.
    ///
    /// All keys are read under one lock, so the result is a consistent
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::Backend`] if the backend cannot be read.
    pub fn export(&self) -> Result<Vec<FixationRecord>, FixationError> {
        let inner = self.inner.read();
        let mut records = Vec::with_capacity(inner.backend.len());
        for key in ParamKey::ALL {
            records.extend(inner.backend.records(key)?);
        }
        Ok(records)
    }

    /// Append a batch of records, e.g. from [`export`](Self::export).
    ///
    /// Records may arrive in any order. The batch is checked as a whole
    /// against the existing log (duplicate heights, heights at or below an
    /// existing fixation, zero epoch lengths) and written only if every
    /// record passes. Returns the number of records imported.
    ///
    /// # Errors
    ///
    /// Returns the first ordering, value, or backend error found; the
    /// store is then unchanged.
    pub fn import(
        &self,
        records: impl IntoIterator<Item = FixationRecord>,
    ) -> Result<usize, FixationError> {
        let imported = self.append(records.into_iter().collect())?.len();
        debug!(imported, "Fixation records imported");
        Ok(imported)
    }

    /// Drop records of `key` that cannot answer any query at or above
    /// `horizon`.
    ///
    /// The record in effect at `horizon` is always kept, so every
    /// `get_as_of(key, h)` with `h >= horizon` is unchanged. Returns the
    /// number of records removed.
    ///
    /// # Errors
    ///
    /// Returns [`FixationError::Backend`] if the backend fails.
    pub fn prune_before(&self, key: ParamKey, horizon: Height) -> Result<usize, FixationError> {
        let mut inner = self.inner.write();

        let Some(in_effect) = inner.backend.latest_at_or_below(key, horizon)? else {
            return Ok(0);
        };
        let removed = inner
            .backend
            .remove_below(key, in_effect.effective_height)?;

        if removed > 0 {
            debug!(
                %key,
                horizon,
                kept_from = in_effect.effective_height,
                removed,
                "Pruned fixations"
            );
        }
        Ok(removed)
    }
}

/// Check that `records` all belong to `key` and strictly ascend by height.
fn check_ordering(key: ParamKey, records: &[FixationRecord]) -> Result<(), BackendError> {
    let mut previous: Option<Height> = None;
    for record in records {
        if record.key != key {
            return Err(BackendError::Corrupt {
                reason: format!("record for {} returned in the {key} range", record.key),
            });
        }
        if previous.is_some_and(|p| p >= record.effective_height) {
            return Err(BackendError::Corrupt {
                reason: format!(
                    "{key} records out of order at height {}",
                    record.effective_height
                ),
            });
        }
        previous = Some(record.effective_height);
    }
    Ok(())
}

impl<B, C> core::fmt::Debug for FixationStore<B, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FixationStore").finish_non_exhaustive()
    }
}

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use linkforge_core::{MappingPatch, MappingRecord, MappingSink, PersistError, ShortCode};

/// The keyed collection shared by both backends.
///
/// Every mutation goes through a single-key atomic primitive of the DashMap
/// entry API, so writers to different codes never contend on a global lock.
#[derive(Debug, Default)]
pub struct MappingIndex {
    records: DashMap<ShortCode, MappingRecord>,
}

impl MappingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
        }
    }

    pub fn contains(&self, code: &ShortCode) -> bool {
        self.records.contains_key(code)
    }

    pub fn get(&self, code: &ShortCode) -> Option<MappingRecord> {
        self.records.get(code).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Inserts `record` unless its code is already bound. Returns whether it was inserted.
    pub fn insert_if_absent(&self, record: &MappingRecord) -> bool {
        match self.records.entry(record.short_code.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                true
            }
        }
    }

    /// Applies `patch` under the entry lock. Returns `(previous, updated)`.
    pub fn update(
        &self,
        code: &ShortCode,
        patch: &MappingPatch,
    ) -> Option<(MappingRecord, MappingRecord)> {
        let mut entry = self.records.get_mut(code)?;
        let previous = entry.value().clone();
        let updated = previous.patched(patch);
        *entry.value_mut() = updated.clone();
        Some((previous, updated))
    }

    pub fn remove(&self, code: &ShortCode) -> Option<MappingRecord> {
        self.records.remove(code).map(|(_, record)| record)
    }

    /// Removes `record` only if the slot still holds exactly it.
    pub fn remove_exact(&self, record: &MappingRecord) -> bool {
        self.records
            .remove_if(&record.short_code, |_, current| current == record)
            .is_some()
    }

    /// Puts `previous` back if the slot still holds `expected`.
    pub fn revert(&self, expected: &MappingRecord, previous: MappingRecord) -> bool {
        match self.records.get_mut(&expected.short_code) {
            Some(mut entry) if entry.value() == expected => {
                *entry.value_mut() = previous;
                true
            }
            _ => false,
        }
    }

    /// Copies every record out of the map.
    ///
    /// Each key is visited once, so a concurrent write can never duplicate or
    /// tear a record in the returned snapshot.
    pub fn snapshot(&self) -> Vec<MappingRecord> {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl MappingSink for MappingIndex {
    fn contains(&self, code: &ShortCode) -> bool {
        MappingIndex::contains(self, code)
    }

    async fn persist(&self, record: &MappingRecord) -> Result<(), PersistError> {
        if self.insert_if_absent(record) {
            Ok(())
        } else {
            Err(PersistError::Occupied)
        }
    }
}

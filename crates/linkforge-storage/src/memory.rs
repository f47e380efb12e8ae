use crate::index::MappingIndex;
use async_trait::async_trait;
use jiff::Timestamp;
use linkforge_core::{
    Generator, MappingCreator, MappingError, MappingPatch, MappingRecord, MappingStore,
    QueryEngine, QueryFilter, Result, ShortCode,
};
use linkforge_generator::SeqGenerator;
use tracing::debug;

/// Volatile implementation of [`MappingStore`] backed by a [`DashMap`](dashmap::DashMap).
///
/// Nothing survives a restart. Point lookups are O(1); `find`, `count` and
/// `find_all` scan a copy of the whole collection.
pub struct InMemoryMappingStore<G = SeqGenerator> {
    index: MappingIndex,
    creator: MappingCreator<G>,
}

impl InMemoryMappingStore<SeqGenerator> {
    /// Creates an empty store with a fresh [`SeqGenerator`] and default settings.
    pub fn new() -> Self {
        Self::with_creator(MappingCreator::new(SeqGenerator::new()))
    }
}

impl Default for InMemoryMappingStore<SeqGenerator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Generator> InMemoryMappingStore<G> {
    pub fn with_creator(creator: MappingCreator<G>) -> Self {
        Self {
            index: MappingIndex::new(),
            creator,
        }
    }

    pub fn creator(&self) -> &MappingCreator<G> {
        &self.creator
    }

    fn now(&self) -> Timestamp {
        self.creator.clock().now()
    }
}

#[async_trait]
impl<G: Generator> MappingStore for InMemoryMappingStore<G> {
    async fn create_mapping(
        &self,
        alias: Option<&str>,
        original_url: &str,
        expires_at: Option<Timestamp>,
    ) -> Result<MappingRecord> {
        self.creator
            .create(&self.index, alias, original_url, expires_at)
            .await
    }

    async fn edit_mapping(&self, short_code: &str, patch: MappingPatch) -> Result<MappingRecord> {
        let code = ShortCode::normalize(short_code);
        match self.index.update(&code, &patch) {
            Some((_, updated)) => {
                debug!(code = %code, "edited mapping");
                Ok(updated)
            }
            None => Err(MappingError::not_found(code, self.creator.error_mapper())),
        }
    }

    async fn delete(&self, short_code: &str) -> Result<bool> {
        let code = ShortCode::normalize(short_code);
        let removed = self.index.remove(&code).is_some();
        debug!(code = %code, removed, "delete mapping");
        Ok(removed)
    }

    async fn exists_by_code(&self, short_code: &str) -> bool {
        self.index.contains(&ShortCode::normalize(short_code))
    }

    async fn find_by_short_code(&self, short_code: &str) -> Option<MappingRecord> {
        self.index.get(&ShortCode::normalize(short_code))
    }

    async fn find_all(&self) -> Vec<MappingRecord> {
        self.find(&QueryFilter::default()).await
    }

    async fn find(&self, filter: &QueryFilter) -> Vec<MappingRecord> {
        QueryEngine::find(self.index.snapshot(), filter, self.now())
    }

    async fn count(&self, filter: &QueryFilter) -> usize {
        QueryEngine::count(&self.index.snapshot(), filter, self.now())
    }

    async fn count_all(&self) -> usize {
        self.index.len()
    }
}

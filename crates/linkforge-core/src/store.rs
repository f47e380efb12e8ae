use crate::error::Result;
use crate::query::QueryFilter;
use crate::record::{MappingPatch, MappingRecord};
use async_trait::async_trait;
use jiff::Timestamp;

/// The storage-agnostic contract for mapping collections.
///
/// Short codes passed to any method are normalized before use, so lookups are
/// case-insensitive. Reads always reflect the latest committed write.
#[async_trait]
pub trait MappingStore: Send + Sync + 'static {
    /// Creates a mapping, with a custom `alias` or a generated code.
    async fn create_mapping(
        &self,
        alias: Option<&str>,
        original_url: &str,
        expires_at: Option<Timestamp>,
    ) -> Result<MappingRecord>;

    /// Applies `patch` to an existing mapping.
    /// Returns `Err(NotFound)` if the short code is unknown.
    async fn edit_mapping(&self, short_code: &str, patch: MappingPatch) -> Result<MappingRecord>;

    /// Deletes the mapping for a given short code.
    /// Returns `true` if the record existed and was removed.
    ///
    /// Only a durability failure of the backend yields `Err`.
    async fn delete(&self, short_code: &str) -> Result<bool>;

    async fn exists_by_code(&self, short_code: &str) -> bool;

    async fn find_by_short_code(&self, short_code: &str) -> Option<MappingRecord>;

    /// All mappings, oldest first.
    async fn find_all(&self) -> Vec<MappingRecord>;

    /// Filtered, sorted and paged mappings.
    async fn find(&self, filter: &QueryFilter) -> Vec<MappingRecord>;

    /// Number of mappings matching `filter`, ignoring paging.
    async fn count(&self, filter: &QueryFilter) -> usize;

    async fn count_all(&self) -> usize;
}

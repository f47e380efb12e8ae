use crate::error::{Result as StorageResult, StorageError};
use crate::index::MappingIndex;
use async_trait::async_trait;
use jiff::Timestamp;
use linkforge_core::{
    Generator, MappingCreator, MappingError, MappingPatch, MappingRecord, MappingSink,
    MappingStore, PersistError, QueryEngine, QueryFilter, Result, ShortCode,
};
use linkforge_generator::SeqGenerator;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Version of the on-disk document.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    /// Generator checkpoint at the time of the flush.
    #[serde(default)]
    counter: Option<i64>,
    mappings: Vec<MappingRecord>,
}

/// Durable implementation of [`MappingStore`].
///
/// Records live in the same keyed index as the in-memory backend; every
/// mutation rewrites a JSON document with write, fsync, rename before it
/// reports success. If the flush fails the mutation is rolled back.
///
/// Flushes are serialized by a mutex that readers never take.
pub struct FileMappingStore<G = SeqGenerator> {
    path: PathBuf,
    index: MappingIndex,
    creator: MappingCreator<G>,
    flush_lock: Mutex<()>,
    /// Set while the file may disagree with memory; cleared by a successful flush.
    dirty: AtomicBool,
}

/// Inverse of a mutation whose flush failed.
#[derive(Debug)]
enum Rollback {
    Create(MappingRecord),
    Edit {
        updated: MappingRecord,
        previous: MappingRecord,
    },
    Delete(MappingRecord),
}

impl Rollback {
    fn code(&self) -> &ShortCode {
        match self {
            Rollback::Create(record) | Rollback::Delete(record) => &record.short_code,
            Rollback::Edit { updated, .. } => &updated.short_code,
        }
    }
}

impl FileMappingStore<SeqGenerator> {
    /// Opens (or initializes) the store at `path` with default settings.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        Self::open_with(path, MappingCreator::new(SeqGenerator::new())).await
    }
}

impl<G: Generator> FileMappingStore<G> {
    /// Opens the store at `path`, loading prior state if the file exists.
    ///
    /// A missing file means a first run: the parent directory is created and
    /// an empty document is written. The generator is resumed from the
    /// persisted checkpoint.
    pub async fn open_with(path: impl Into<PathBuf>, creator: MappingCreator<G>) -> StorageResult<Self> {
        let path = path.into();

        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => Some(parse_document(&path, &bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        let store = match document {
            Some(document) => {
                let index = MappingIndex::with_capacity(document.mappings.len());
                for record in &document.mappings {
                    if !index.insert_if_absent(record) {
                        return Err(StorageError::InvalidData(format!(
                            "duplicate short code '{}' in {}",
                            record.short_code,
                            path.display()
                        )));
                    }
                }
                if let Some(counter) = document.counter {
                    creator.generator().resume_from(counter);
                }
                info!(
                    path = %path.display(),
                    mappings = index.len(),
                    "loaded mapping store"
                );
                Self::from_parts(path, index, creator)
            }
            None => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| StorageError::io(parent, e))?;
                }
                let store = Self::from_parts(path, MappingIndex::new(), creator);
                store.flush().await?;
                info!(path = %store.path.display(), "initialized empty mapping store");
                store
            }
        };

        Ok(store)
    }

    fn from_parts(path: PathBuf, index: MappingIndex, creator: MappingCreator<G>) -> Self {
        Self {
            path,
            index,
            creator,
            flush_lock: Mutex::new(()),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn creator(&self) -> &MappingCreator<G> {
        &self.creator
    }

    /// Whether the file may hold state that memory no longer has, or lack
    /// state that memory has. The next successful flush clears it.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    fn now(&self) -> Timestamp {
        self.creator.clock().now()
    }

    /// Writes the current collection to disk.
    ///
    /// The snapshot is taken under the flush lock, so a flush always contains
    /// every mutation applied before it started.
    pub async fn flush(&self) -> StorageResult<()> {
        let _guard = self.flush_lock.lock().await;
        // Cleared before the snapshot: a rollback racing this flush sets it again.
        self.dirty.store(false, Ordering::SeqCst);

        let result = self.write_snapshot().await;
        if result.is_err() {
            self.dirty.store(true, Ordering::SeqCst);
        }
        result
    }

    async fn write_snapshot(&self) -> StorageResult<()> {
        let mut mappings = self.index.snapshot();
        mappings.sort_unstable_by(|a, b| a.short_code.cmp(&b.short_code));
        let document = StoreDocument {
            version: FORMAT_VERSION,
            counter: self.creator.generator().checkpoint(),
            mappings,
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        write_atomically(&self.path, &bytes).await?;
        debug!(
            path = %self.path.display(),
            mappings = document.mappings.len(),
            "flushed mapping store"
        );
        Ok(())
    }

    /// Undoes a mutation whose flush failed, then tries to bring the file back
    /// in line with memory.
    ///
    /// The undo only applies if no concurrent writer touched the code since.
    /// Either way another writer's flush may already have persisted the
    /// mutation, so the store stays dirty until a flush succeeds.
    async fn roll_back(&self, rollback: Rollback) -> bool {
        let applied = match &rollback {
            Rollback::Create(record) => self.index.remove_exact(record),
            Rollback::Edit { updated, previous } => self.index.revert(updated, previous.clone()),
            Rollback::Delete(removed) => self.index.insert_if_absent(removed),
        };
        if !applied {
            warn!(
                code = %rollback.code(),
                ?rollback,
                "rollback superseded by a concurrent write"
            );
        }

        self.dirty.store(true, Ordering::SeqCst);
        if let Err(err) = self.flush().await {
            warn!(error = %err, "reconciling flush failed, store stays dirty");
        }
        applied
    }

    fn storage_error(&self, err: StorageError) -> MappingError {
        MappingError::storage(err.to_string(), self.creator.error_mapper())
    }
}

fn parse_document(path: &Path, bytes: &[u8]) -> StorageResult<StoreDocument> {
    let document: StoreDocument = serde_json::from_slice(bytes).map_err(|e| {
        StorageError::InvalidData(format!("cannot parse {}: {e}", path.display()))
    })?;
    if document.version != FORMAT_VERSION {
        return Err(StorageError::InvalidData(format!(
            "unsupported format version {} in {}",
            document.version,
            path.display()
        )));
    }
    Ok(document)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write-fsync-rename, then fsync the parent directory.
async fn write_atomically(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let temp = temp_path(path);

    let mut file = tokio::fs::File::create(&temp)
        .await
        .map_err(|e| StorageError::io(&temp, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StorageError::io(&temp, e))?;
    file.sync_all()
        .await
        .map_err(|e| StorageError::io(&temp, e))?;
    drop(file);

    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| StorageError::io(path, e))?;

    sync_parent_dir(path).await
}

#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> StorageResult<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    let dir = tokio::fs::File::open(parent)
        .await
        .map_err(|e| StorageError::io(parent, e))?;
    dir.sync_all()
        .await
        .map_err(|e| StorageError::io(parent, e))
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> StorageResult<()> {
    Ok(())
}

#[async_trait]
impl<G: Generator> MappingSink for FileMappingStore<G> {
    fn contains(&self, code: &ShortCode) -> bool {
        self.index.contains(code)
    }

    async fn persist(&self, record: &MappingRecord) -> std::result::Result<(), PersistError> {
        if !self.index.insert_if_absent(record) {
            return Err(PersistError::Occupied);
        }

        if let Err(err) = self.flush().await {
            warn!(code = %record.short_code, error = %err, "flush failed, rolling back create");
            self.roll_back(Rollback::Create(record.clone())).await;
            return Err(PersistError::Storage(err.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<G: Generator> MappingStore for FileMappingStore<G> {
    async fn create_mapping(
        &self,
        alias: Option<&str>,
        original_url: &str,
        expires_at: Option<Timestamp>,
    ) -> Result<MappingRecord> {
        self.creator
            .create(self, alias, original_url, expires_at)
            .await
    }

    async fn edit_mapping(&self, short_code: &str, patch: MappingPatch) -> Result<MappingRecord> {
        let code = ShortCode::normalize(short_code);
        let Some((previous, updated)) = self.index.update(&code, &patch) else {
            return Err(MappingError::not_found(code, self.creator.error_mapper()));
        };

        if let Err(err) = self.flush().await {
            warn!(code = %code, error = %err, "flush failed, rolling back edit");
            self.roll_back(Rollback::Edit { updated, previous }).await;
            return Err(self.storage_error(err));
        }

        debug!(code = %code, "edited mapping");
        Ok(updated)
    }

    async fn delete(&self, short_code: &str) -> Result<bool> {
        let code = ShortCode::normalize(short_code);
        let Some(removed) = self.index.remove(&code) else {
            return Ok(false);
        };

        if let Err(err) = self.flush().await {
            warn!(code = %code, error = %err, "flush failed, rolling back delete");
            self.roll_back(Rollback::Delete(removed)).await;
            return Err(self.storage_error(err));
        }

        debug!(code = %code, "deleted mapping");
        Ok(true)
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

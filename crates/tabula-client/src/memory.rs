//! In-memory block store.
//!
//! Used by tests and by the offline console. Optionally backed by an archive
//! file: [`MemoryStore::open`] loads it and [`MemoryStore::save`] writes it
//! back.
//!
//! # Concurrency Model
//!
//! - parking_lot `RwLock` around the block map (locks never span an await)
//! - Event broadcasting for change notification

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tabula_types::{Block, BlockId, FileId};
use tokio::sync::broadcast;

use crate::archive::Archive;
use crate::error::{ClientError, ClientResult};
use crate::{BlockStoreClient, FileUpload};

/// Capacity of the change-event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Events broadcast when blocks change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Inserted(BlockId),
    Updated(BlockId),
    Deleted(BlockId),
    Imported { count: usize },
}

#[derive(Debug)]
struct StoredFile {
    #[allow(dead_code)]
    upload: FileUpload,
}

/// In-memory [`BlockStoreClient`].
pub struct MemoryStore {
    blocks: RwLock<HashMap<BlockId, Block>>,
    files: RwLock<HashMap<FileId, StoredFile>>,
    /// Archive file backing this store, if any.
    path: Option<PathBuf>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("blocks", &self.blocks.read().len())
            .field("files", &self.files.read().len())
            .field("path", &self.path)
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with no backing file.
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            blocks: RwLock::new(HashMap::new()),
            files: RwLock::new(HashMap::new()),
            path: None,
            event_tx,
        }
    }

    /// Create a store pre-populated with blocks.
    pub fn with_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let store = Self::new();
        store
            .blocks
            .write()
            .extend(blocks.into_iter().map(|b| (b.id, b)));
        store
    }

    /// Open a store backed by an archive file. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let mut store = Self::new();
        if path.exists() {
            let archive = Archive::read_from(BufReader::new(File::open(&path)?))?;
            tracing::info!(path = %path.display(), blocks = archive.blocks.len(), "loaded archive");
            store
                .blocks
                .write()
                .extend(archive.blocks.into_iter().map(|b| (b.id, b)));
        }
        store.path = Some(path);
        Ok(store)
    }

    /// Write all blocks to the backing file. No-op for stores without one.
    pub fn save(&self) -> ClientResult<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    /// Write all blocks to an archive file.
    pub fn save_to(&self, path: &Path) -> ClientResult<()> {
        let archive = self.snapshot_archive();
        archive.write_to(BufWriter::new(File::create(path)?))?;
        tracing::info!(path = %path.display(), blocks = archive.blocks.len(), "saved archive");
        Ok(())
    }

    /// Get the event receiver for subscribing to changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    /// Synchronous read of one block.
    pub fn block(&self, id: BlockId) -> Option<Block> {
        self.blocks.read().get(&id).cloned()
    }

    /// All blocks, sorted by creation time then ID.
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks: Vec<Block> = self.blocks.read().values().cloned().collect();
        blocks.sort_by_key(|b| (b.created_at, b.id));
        blocks
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Check whether an uploaded file exists.
    pub fn has_file(&self, id: FileId) -> bool {
        self.files.read().contains_key(&id)
    }

    fn snapshot_archive(&self) -> Archive {
        Archive::new(self.blocks())
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn validate(block: &Block) -> ClientResult<()> {
        if block.id.is_nil() {
            return Err(ClientError::validation("block ID must not be nil"));
        }
        if block.parent_id == Some(block.id) {
            return Err(ClientError::validation(format!("block {} is its own parent", block.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl BlockStoreClient for MemoryStore {
    async fn get_block(&self, id: BlockId) -> ClientResult<Option<Block>> {
        Ok(self.block(id))
    }

    async fn get_subtree(&self, root: BlockId) -> ClientResult<Vec<Block>> {
        let blocks = self.blocks.read();
        let root_block = blocks.get(&root).cloned().ok_or(ClientError::NotFound(root))?;

        let mut children: HashMap<BlockId, Vec<&Block>> = HashMap::new();
        for block in blocks.values() {
            if let Some(parent) = block.parent_id {
                children.entry(parent).or_default().push(block);
            }
        }

        let mut result = vec![root_block];
        let mut seen = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            let Some(kids) = children.get_mut(&id) else {
                continue;
            };
            kids.sort_by_key(|b| (b.created_at, b.id));
            for kid in kids.iter() {
                if seen.insert(kid.id) {
                    result.push((*kid).clone());
                    queue.push_back(kid.id);
                }
            }
        }
        Ok(result)
    }

    async fn insert_block(&self, block: &Block) -> ClientResult<BlockId> {
        Self::validate(block)?;
        {
            let mut blocks = self.blocks.write();
            if blocks.contains_key(&block.id) {
                return Err(ClientError::AlreadyExists(block.id));
            }
            blocks.insert(block.id, block.clone());
        }
        tracing::trace!(block = %block.id, kind = %block.kind(), "inserted");
        self.emit(StoreEvent::Inserted(block.id));
        Ok(block.id)
    }

    async fn insert_blocks(&self, batch: &[Block]) -> ClientResult<()> {
        {
            let mut blocks = self.blocks.write();
            let mut incoming = HashSet::new();
            for block in batch {
                Self::validate(block)?;
                if blocks.contains_key(&block.id) || !incoming.insert(block.id) {
                    return Err(ClientError::AlreadyExists(block.id));
                }
            }
            blocks.extend(batch.iter().map(|b| (b.id, b.clone())));
        }
        for block in batch {
            self.emit(StoreEvent::Inserted(block.id));
        }
        Ok(())
    }

    async fn delete_block(&self, id: BlockId) -> ClientResult<()> {
        if self.blocks.write().remove(&id).is_none() {
            return Err(ClientError::NotFound(id));
        }
        tracing::trace!(block = %id, "deleted");
        self.emit(StoreEvent::Deleted(id));
        Ok(())
    }

    async fn update_block(&self, block: &Block) -> ClientResult<()> {
        Self::validate(block)?;
        {
            let mut blocks = self.blocks.write();
            let slot = blocks.get_mut(&block.id).ok_or(ClientError::NotFound(block.id))?;
            *slot = block.clone();
        }
        self.emit(StoreEvent::Updated(block.id));
        Ok(())
    }

    async fn update_blocks(&self, batch: &[Block]) -> ClientResult<()> {
        {
            let mut blocks = self.blocks.write();
            for block in batch {
                Self::validate(block)?;
                if !blocks.contains_key(&block.id) {
                    return Err(ClientError::NotFound(block.id));
                }
            }
            for block in batch {
                blocks.insert(block.id, block.clone());
            }
        }
        for block in batch {
            self.emit(StoreEvent::Updated(block.id));
        }
        Ok(())
    }

    async fn upload_file(&self, file: FileUpload) -> ClientResult<FileId> {
        if file.bytes.is_empty() {
            return Err(ClientError::validation(format!("file '{}' is empty", file.name)));
        }
        let id = FileId::new();
        tracing::debug!(file = %id, name = %file.name, size = file.bytes.len(), "stored upload");
        self.files.write().insert(id, StoredFile { upload: file });
        Ok(id)
    }

    async fn export_archive(&self) -> ClientResult<Archive> {
        Ok(self.snapshot_archive())
    }

    async fn import_archive(&self, archive: &Archive) -> ClientResult<()> {
        for block in &archive.blocks {
            Self::validate(block)?;
        }
        self.blocks
            .write()
            .extend(archive.blocks.iter().map(|b| (b.id, b.clone())));
        tracing::info!(blocks = archive.blocks.len(), "imported archive");
        self.emit(StoreEvent::Imported {
            count: archive.blocks.len(),
        });
        Ok(())
    }
}

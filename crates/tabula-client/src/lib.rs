//! Block store client interface for Tabula.
//!
//! The [`BlockStoreClient`] trait is the only way the core talks to
//! persistence. Implementations own transport, retry and timeout policy; the
//! core only sees success or a [`ClientError`].
//!
//! - [`BlockStoreClient`] - async trait over block reads and writes
//! - [`MemoryStore`] - in-process implementation (tests, offline console)
//! - [`Archive`] - JSON lines export/import format
//!
//! ## Design Decisions
//!
//! - **Snapshots in, snapshots out**: writes take whole [`Block`] values; the
//!   store never patches individual fields.
//! - **Batches are all-or-nothing**: `insert_blocks` / `update_blocks` either
//!   apply every block or none of them.

use std::sync::Arc;

use async_trait::async_trait;
use tabula_types::{Block, BlockId, FileId};

pub mod archive;
mod error;
pub mod memory;

pub use archive::{ARCHIVE_VERSION, Archive};
pub use error::{ClientError, ClientResult};
pub use memory::{MemoryStore, StoreEvent};

/// A file to upload (image attachments).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    /// Builder-style MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Remote block persistence as seen by the core.
///
/// Every method may suspend on I/O and may fail; callers never assume a
/// partial effect from a failed call.
#[async_trait]
pub trait BlockStoreClient: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Fetch one block.
    async fn get_block(&self, id: BlockId) -> ClientResult<Option<Block>>;

    /// Fetch a block and all of its descendants, root first.
    async fn get_subtree(&self, root: BlockId) -> ClientResult<Vec<Block>>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Insert a new block. Returns the stored ID.
    async fn insert_block(&self, block: &Block) -> ClientResult<BlockId>;

    /// Insert several blocks in one round trip (all-or-nothing).
    async fn insert_blocks(&self, blocks: &[Block]) -> ClientResult<()>;

    /// Delete a block by ID.
    async fn delete_block(&self, id: BlockId) -> ClientResult<()>;

    /// Replace a block with a new snapshot.
    async fn update_block(&self, block: &Block) -> ClientResult<()>;

    /// Replace several blocks in one round trip (all-or-nothing).
    async fn update_blocks(&self, blocks: &[Block]) -> ClientResult<()>;

    /// Store a file and return its ID.
    async fn upload_file(&self, file: FileUpload) -> ClientResult<FileId>;

    // ========================================================================
    // Archive
    // ========================================================================

    /// Export every block.
    async fn export_archive(&self) -> ClientResult<Archive>;

    /// Import blocks, replacing any with matching IDs.
    async fn import_archive(&self, archive: &Archive) -> ClientResult<()>;
}

/// Shared, dynamically dispatched client handle.
pub type SharedClient = Arc<dyn BlockStoreClient>;

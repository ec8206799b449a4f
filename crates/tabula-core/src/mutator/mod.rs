//! The mutator: every state-changing edit goes through here.
//!
//! Each edit becomes a [`Command`] whose redo writes the new snapshot(s) to
//! the [`BlockStoreClient`] and whose undo writes back the snapshot(s)
//! captured at call time. Commands are performed on the shared
//! [`UndoManager`], or on the enclosing group when the mutator was handed
//! out by [`Mutator::perform_as_undo_group`].
//!
//! The generic primitives live in this file; the per-domain convenience
//! operations are split across `blocks`, `properties` and `views`.

mod blocks;
mod properties;
mod views;

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tabula_client::{Archive, BlockStoreClient, SharedClient};
use tabula_types::{Block, BoardFields, CardFields, UserId, ViewFields};
use tokio::sync::watch;

use crate::config::CoreConfig;
use crate::error::{MutatorError, MutatorResult};
use crate::history::{Action, Command, GroupRecorder, HistoryState, UndoManager};

/// History type used by the mutator.
pub type History = UndoManager<MutatorError>;

/// Async callback run inside a primitive's command.
///
/// Hooks receive the affected block(s) and run in the same history entry as
/// the primitive. They talk to the store directly; calling back into a
/// mutator from a hook would wait on the history it is already holding.
pub type Hook<T = Block> = Arc<dyn Fn(T) -> BoxFuture<'static, MutatorResult<()>> + Send + Sync>;

/// Wrap an async closure as a [`Hook`].
pub fn hook<T, F, Fut>(f: F) -> Hook<T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MutatorResult<()>> + Send + 'static,
{
    Arc::new(move |value| f(value).boxed())
}

/// Where commands go.
#[derive(Clone)]
enum Sink {
    History,
    Group(GroupRecorder<MutatorError>),
}

/// Façade over a block store plus its undo history.
///
/// Cheap to clone; clones share the client, the history and the config.
#[derive(Clone)]
pub struct Mutator {
    client: SharedClient,
    history: Arc<History>,
    config: Arc<CoreConfig>,
    user: UserId,
    sink: Sink,
}

impl std::fmt::Debug for Mutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutator")
            .field("history", &self.history)
            .field("user", &self.user)
            .field("in_group", &matches!(self.sink, Sink::Group(_)))
            .finish_non_exhaustive()
    }
}

impl Mutator {
    /// Create a mutator over an existing history with default settings.
    pub fn new(client: SharedClient, history: Arc<History>) -> Self {
        Self {
            client,
            history,
            config: Arc::new(CoreConfig::default()),
            user: UserId::system(),
            sink: Sink::History,
        }
    }

    /// Create a mutator and a fresh history from a config.
    pub fn with_config(client: SharedClient, config: CoreConfig) -> Self {
        let history = Arc::new(History::new(config.history.clone()));
        Self {
            client,
            history,
            config: Arc::new(config),
            user: UserId::system(),
            sink: Sink::History,
        }
    }

    /// Builder-style editing user (stamped into `modified_by`).
    pub fn with_user(mut self, user: UserId) -> Self {
        self.user = user;
        self
    }

    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    /// True for the scoped mutator handed to a group closure.
    pub fn in_group(&self) -> bool {
        matches!(self.sink, Sink::Group(_))
    }

    // ========================================================================
    // Primitives
    // ========================================================================

    /// Insert a block. Undo deletes it.
    ///
    /// `after_redo` runs after every insert (first run and redo);
    /// `before_undo` runs before every delete.
    pub async fn insert_block(
        &self,
        block: Block,
        description: impl Into<String>,
        after_redo: Option<Hook>,
        before_undo: Option<Hook>,
    ) -> MutatorResult<Block> {
        let redo: Action<MutatorError> = {
            let client = self.client.clone();
            let block = block.clone();
            Arc::new(move || {
                let client = client.clone();
                let block = block.clone();
                let hook = after_redo.clone();
                async move {
                    client.insert_block(&block).await?;
                    if let Some(hook) = hook {
                        hook(block).await?;
                    }
                    Ok::<(), MutatorError>(())
                }
                .boxed()
            })
        };
        let undo: Action<MutatorError> = {
            let client = self.client.clone();
            let block = block.clone();
            Arc::new(move || {
                let client = client.clone();
                let block = block.clone();
                let hook = before_undo.clone();
                async move {
                    let id = block.id;
                    if let Some(hook) = hook {
                        hook(block).await?;
                    }
                    client.delete_block(id).await?;
                    Ok::<(), MutatorError>(())
                }
                .boxed()
            })
        };
        self.perform(Command::from_actions(description, redo, undo)).await?;
        Ok(block)
    }

    /// Insert several blocks in one store call. Undo deletes each of them.
    ///
    /// If the batch fails nothing is recorded.
    pub async fn insert_blocks(
        &self,
        blocks: Vec<Block>,
        description: impl Into<String>,
        after_redo: Option<Hook<Vec<Block>>>,
        before_undo: Option<Hook<Vec<Block>>>,
    ) -> MutatorResult<Vec<Block>> {
        let snapshot: Arc<[Block]> = blocks.clone().into();
        let redo: Action<MutatorError> = {
            let client = self.client.clone();
            let blocks = snapshot.clone();
            Arc::new(move || {
                let client = client.clone();
                let blocks = blocks.clone();
                let hook = after_redo.clone();
                async move {
                    client.insert_blocks(&blocks).await?;
                    if let Some(hook) = hook {
                        hook(blocks.to_vec()).await?;
                    }
                    Ok::<(), MutatorError>(())
                }
                .boxed()
            })
        };
        let undo: Action<MutatorError> = {
            let client = self.client.clone();
            let blocks = snapshot;
            Arc::new(move || {
                let client = client.clone();
                let blocks = blocks.clone();
                let hook = before_undo.clone();
                async move {
                    if let Some(hook) = hook {
                        hook(blocks.to_vec()).await?;
                    }
                    for block in blocks.iter().rev() {
                        client.delete_block(block.id).await?;
                    }
                    Ok::<(), MutatorError>(())
                }
                .boxed()
            })
        };
        self.perform(Command::from_actions(description, redo, undo)).await?;
        Ok(blocks)
    }

    /// Delete a block. Undo re-inserts the full snapshot.
    pub async fn delete_block(
        &self,
        block: &Block,
        description: impl Into<String>,
        before_redo: Option<Hook>,
        after_undo: Option<Hook>,
    ) -> MutatorResult<()> {
        let redo: Action<MutatorError> = {
            let client = self.client.clone();
            let block = block.clone();
            Arc::new(move || {
                let client = client.clone();
                let block = block.clone();
                let hook = before_redo.clone();
                async move {
                    let id = block.id;
                    if let Some(hook) = hook {
                        hook(block).await?;
                    }
                    client.delete_block(id).await?;
                    Ok::<(), MutatorError>(())
                }
                .boxed()
            })
        };
        let undo: Action<MutatorError> = {
            let client = self.client.clone();
            let block = block.clone();
            Arc::new(move || {
                let client = client.clone();
                let block = block.clone();
                let hook = after_undo.clone();
                async move {
                    client.insert_block(&block).await?;
                    if let Some(hook) = hook {
                        hook(block).await?;
                    }
                    Ok::<(), MutatorError>(())
                }
                .boxed()
            })
        };
        self.perform(Command::from_actions(description, redo, undo)).await
    }

    /// Replace `old` with `new`. Undo writes `old` back.
    pub async fn update_block(
        &self,
        new: Block,
        old: Block,
        description: impl Into<String>,
    ) -> MutatorResult<()> {
        let redo = write_one(self.client.clone(), new);
        let undo = write_one(self.client.clone(), old);
        self.perform(Command::from_actions(description, redo, undo)).await
    }

    /// Replace several blocks in one store call. Undo writes the old
    /// snapshots back in one call.
    pub async fn update_blocks(
        &self,
        new: Vec<Block>,
        old: Vec<Block>,
        description: impl Into<String>,
    ) -> MutatorResult<()> {
        let redo = write_many(self.client.clone(), new);
        let undo = write_many(self.client.clone(), old);
        self.perform(Command::from_actions(description, redo, undo)).await
    }

    /// Run `f` with a group-scoped mutator; everything it performs becomes
    /// one history entry.
    ///
    /// If `f` fails, its completed edits are undone and the error returned.
    /// Groups nest: inside a group this records a single sub-command.
    pub async fn perform_as_undo_group<T, F, Fut>(
        &self,
        description: impl Into<String>,
        f: F,
    ) -> MutatorResult<T>
    where
        F: FnOnce(Mutator) -> Fut,
        Fut: Future<Output = MutatorResult<T>>,
    {
        match &self.sink {
            Sink::History => {
                self.history
                    .perform_group(description, |recorder| f(self.scoped(recorder)))
                    .await
            }
            Sink::Group(parent) => {
                parent
                    .group(description, |recorder| f(self.scoped(recorder)))
                    .await
            }
        }
    }

    async fn perform(&self, command: Command<MutatorError>) -> MutatorResult<()> {
        match &self.sink {
            Sink::History => self.history.perform_command(command).await,
            Sink::Group(recorder) => recorder.perform_command(command).await,
        }
    }

    fn scoped(&self, recorder: GroupRecorder<MutatorError>) -> Mutator {
        Mutator {
            sink: Sink::Group(recorder),
            ..self.clone()
        }
    }

    /// Copy `block`, apply `edit`, and stamp the copy as modified by this user.
    fn revise(
        &self,
        block: &Block,
        edit: impl FnOnce(&mut Block) -> MutatorResult<()>,
    ) -> MutatorResult<Block> {
        let mut next = block.clone();
        edit(&mut next)?;
        next.modified_by = self.user;
        next.touch();
        Ok(next)
    }

    // ========================================================================
    // Archive (not undoable)
    // ========================================================================

    pub async fn export_archive(&self) -> MutatorResult<Archive> {
        let archive = self.client.export_archive().await?;
        tracing::info!(blocks = archive.blocks.len(), "exported archive");
        Ok(archive)
    }

    pub async fn import_archive(&self, archive: &Archive) -> MutatorResult<()> {
        self.client.import_archive(archive).await?;
        tracing::info!(blocks = archive.blocks.len(), "imported archive");
        Ok(())
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Undo the last entry. Returns its description.
    pub async fn undo(&self) -> MutatorResult<Option<String>> {
        self.ensure_top_level("undo")?;
        self.history.undo().await
    }

    /// Redo the next entry. Returns its description.
    pub async fn redo(&self) -> MutatorResult<Option<String>> {
        self.ensure_top_level("redo")?;
        self.history.redo().await
    }

    pub async fn clear_history(&self) -> MutatorResult<()> {
        self.ensure_top_level("clear history")?;
        self.history.clear().await;
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.history.redo_description()
    }

    pub fn subscribe_history(&self) -> watch::Receiver<HistoryState> {
        self.history.subscribe()
    }

    fn ensure_top_level(&self, operation: &'static str) -> MutatorResult<()> {
        match self.sink {
            Sink::History => Ok(()),
            Sink::Group(_) => Err(MutatorError::InsideUndoGroup(operation)),
        }
    }
}

fn write_one(client: SharedClient, block: Block) -> Action<MutatorError> {
    Arc::new(move || {
        let client = client.clone();
        let block = block.clone();
        async move {
            client.update_block(&block).await?;
            Ok::<(), MutatorError>(())
        }
        .boxed()
    })
}

fn write_many(client: SharedClient, blocks: Vec<Block>) -> Action<MutatorError> {
    let blocks: Arc<[Block]> = blocks.into();
    Arc::new(move || {
        let client = client.clone();
        let blocks = blocks.clone();
        async move {
            client.update_blocks(&blocks).await?;
            Ok::<(), MutatorError>(())
        }
        .boxed()
    })
}

// ── Payload access ──────────────────────────────────────────────────────────

fn board_fields(block: &Block) -> MutatorResult<&BoardFields> {
    block.as_board().ok_or(MutatorError::NotABoard(block.id))
}

fn board_fields_mut(block: &mut Block) -> MutatorResult<&mut BoardFields> {
    let id = block.id;
    block.as_board_mut().ok_or(MutatorError::NotABoard(id))
}

fn card_fields(block: &Block) -> MutatorResult<&CardFields> {
    block.as_card().ok_or(MutatorError::NotACard(block.id))
}

fn card_fields_mut(block: &mut Block) -> MutatorResult<&mut CardFields> {
    let id = block.id;
    block.as_card_mut().ok_or(MutatorError::NotACard(id))
}

fn view_fields(block: &Block) -> MutatorResult<&ViewFields> {
    block.as_view().ok_or(MutatorError::NotAView(block.id))
}

fn view_fields_mut(block: &mut Block) -> MutatorResult<&mut ViewFields> {
    let id = block.id;
    block.as_view_mut().ok_or(MutatorError::NotAView(id))
}

/// Move the element at `from` so it ends up at `to`.
fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> MutatorResult<()> {
    let len = items.len();
    if from >= len {
        return Err(MutatorError::IndexOutOfRange { index: from, len });
    }
    if to >= len {
        return Err(MutatorError::IndexOutOfRange { index: to, len });
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

/// Insert at `index`, or append when `index` is `None`.
fn insert_at<T>(items: &mut Vec<T>, index: Option<usize>, item: T) -> MutatorResult<usize> {
    let len = items.len();
    let index = index.unwrap_or(len);
    if index > len {
        return Err(MutatorError::IndexOutOfRange { index, len });
    }
    items.insert(index, item);
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_item() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        move_item(&mut items, 0, 2).unwrap();
        assert_eq!(items, vec!['b', 'c', 'a', 'd']);
        move_item(&mut items, 3, 0).unwrap();
        assert_eq!(items, vec!['d', 'b', 'c', 'a']);
        assert!(matches!(
            move_item(&mut items, 1, 4),
            Err(MutatorError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_insert_at() {
        let mut items = vec![1, 2];
        assert_eq!(insert_at(&mut items, None, 3).unwrap(), 2);
        assert_eq!(insert_at(&mut items, Some(0), 0).unwrap(), 0);
        assert_eq!(items, vec![0, 1, 2, 3]);
        assert!(insert_at(&mut items, Some(9), 9).is_err());
    }
}

//! Undo/redo command history.
//!
//! [`UndoManager`] keeps a linear list of executed [`Command`]s and a cursor
//! separating the undoable past from the redoable future:
//!
//! ```text
//! perform(A) perform(B) perform(C)      undo() undo()        perform(D)
//! [A, B, C]                             [A, B, C]            [A, D]
//!           ^ cursor = 3                    ^ cursor = 1          ^ cursor = 2
//! ```
//!
//! Performing after an undo truncates the redo tail. Every operation that
//! touches the list holds a fair async mutex for its whole duration (including
//! the awaited action), so overlapping calls run one at a time in the order
//! they arrived.
//!
//! A group ([`UndoManager::perform_group`]) runs a closure with a
//! [`GroupRecorder`]. Sub-commands performed on the recorder execute
//! immediately but land in the recorder rather than the history; when the
//! closure returns they are registered as a single command. The history lock
//! is held for the whole group, so the recorder never touches it. A recorder
//! closes when its group ends; using it afterwards fails with [`GroupClosed`].
//!
//! State changes are published on a `watch` channel as [`HistoryState`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

/// An async, zero-argument, repeatable side effect.
pub type Action<E> = Arc<dyn Fn() -> BoxFuture<'static, Result<(), E>> + Send + Sync>;

// ============================================================================
// Command
// ============================================================================

/// A redo/undo action pair plus a description.
pub struct Command<E> {
    redo: Action<E>,
    undo: Action<E>,
    description: String,
}

impl<E: Send + 'static> Command<E> {
    /// Build a command from two async closures.
    pub fn new<R, RF, U, UF>(description: impl Into<String>, redo: R, undo: U) -> Self
    where
        R: Fn() -> RF + Send + Sync + 'static,
        RF: Future<Output = Result<(), E>> + Send + 'static,
        U: Fn() -> UF + Send + Sync + 'static,
        UF: Future<Output = Result<(), E>> + Send + 'static,
    {
        Self {
            redo: Arc::new(move || redo().boxed()),
            undo: Arc::new(move || undo().boxed()),
            description: description.into(),
        }
    }

    /// Build a command from pre-boxed actions.
    pub fn from_actions(description: impl Into<String>, redo: Action<E>, undo: Action<E>) -> Self {
        Self {
            redo,
            undo,
            description: description.into(),
        }
    }

    /// Combine sub-commands: redo runs them in order, undo in reverse.
    pub fn group(description: impl Into<String>, commands: Vec<Arc<Command<E>>>) -> Self {
        let commands: Arc<[Arc<Command<E>>]> = commands.into();
        let redo_commands = commands.clone();
        let undo_commands = commands;
        Self {
            redo: Arc::new(move || {
                let commands = redo_commands.clone();
                async move {
                    for command in commands.iter() {
                        command.redo().await?;
                    }
                    Ok::<(), E>(())
                }
                .boxed()
            }),
            undo: Arc::new(move || {
                let commands = undo_commands.clone();
                async move {
                    for command in commands.iter().rev() {
                        command.undo().await?;
                    }
                    Ok::<(), E>(())
                }
                .boxed()
            }),
            description: description.into(),
        }
    }
}

impl<E> Command<E> {
    /// Run the forward action.
    pub fn redo(&self) -> BoxFuture<'static, Result<(), E>> {
        (self.redo)()
    }

    /// Run the reverse action.
    pub fn undo(&self) -> BoxFuture<'static, Result<(), E>> {
        (self.undo)()
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<E> fmt::Debug for Command<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Configuration and published state
// ============================================================================

/// History limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of entries kept (0 = unlimited). Oldest entries go first.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

impl HistoryConfig {
    /// Configuration without a depth limit.
    pub fn unlimited() -> Self {
        Self { max_depth: 0 }
    }
}

/// Snapshot of the history as seen by the UI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_description: Option<String>,
    pub redo_description: Option<String>,
    /// Number of recorded entries (undoable plus redoable).
    pub depth: usize,
}

struct Stack<E> {
    commands: Vec<Arc<Command<E>>>,
    cursor: usize,
}

impl<E> Stack<E> {
    fn push(&mut self, command: Arc<Command<E>>, max_depth: usize) {
        self.commands.truncate(self.cursor);
        self.commands.push(command);
        if max_depth > 0 && self.commands.len() > max_depth {
            let excess = self.commands.len() - max_depth;
            self.commands.drain(..excess);
            debug!(evicted = excess, "history depth limit reached");
        }
        self.cursor = self.commands.len();
    }

    fn state(&self) -> HistoryState {
        let undo = self.cursor.checked_sub(1).and_then(|i| self.commands.get(i));
        let redo = self.commands.get(self.cursor);
        HistoryState {
            can_undo: undo.is_some(),
            can_redo: redo.is_some(),
            undo_description: undo.map(|c| c.description.clone()),
            redo_description: redo.map(|c| c.description.clone()),
            depth: self.commands.len(),
        }
    }
}

// ============================================================================
// UndoManager
// ============================================================================

/// Serialized linear undo/redo history.
///
/// One instance per editing session; construct it and pass it where needed.
pub struct UndoManager<E> {
    stack: Mutex<Stack<E>>,
    state_tx: watch::Sender<HistoryState>,
    config: HistoryConfig,
}

impl<E> fmt::Debug for UndoManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoManager")
            .field("state", &*self.state_tx.borrow())
            .field("config", &self.config)
            .finish()
    }
}

impl<E> Default for UndoManager<E>
where
    E: fmt::Display + Send + 'static,
{
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl<E> UndoManager<E>
where
    E: fmt::Display + Send + 'static,
{
    pub fn new(config: HistoryConfig) -> Self {
        let (state_tx, _) = watch::channel(HistoryState::default());
        Self {
            stack: Mutex::new(Stack {
                commands: Vec::new(),
                cursor: 0,
            }),
            state_tx,
            config,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Run `redo`, then record the pair. Nothing is recorded if `redo` fails.
    pub async fn perform<R, RF, U, UF>(
        &self,
        redo: R,
        undo: U,
        description: impl Into<String>,
    ) -> Result<(), E>
    where
        R: Fn() -> RF + Send + Sync + 'static,
        RF: Future<Output = Result<(), E>> + Send + 'static,
        U: Fn() -> UF + Send + Sync + 'static,
        UF: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.perform_command(Command::new(description, redo, undo)).await
    }

    /// Run a prepared command's redo, then record it.
    pub async fn perform_command(&self, command: Command<E>) -> Result<(), E> {
        let mut stack = self.stack.lock().await;
        command.redo().await?;
        debug!(description = %command.description, "perform");
        stack.push(Arc::new(command), self.config.max_depth);
        self.publish(&stack);
        Ok(())
    }

    /// Record a command whose effect has already been applied.
    pub async fn register(&self, command: Command<E>) {
        let mut stack = self.stack.lock().await;
        debug!(description = %command.description, "register");
        stack.push(Arc::new(command), self.config.max_depth);
        self.publish(&stack);
    }

    /// Run `f` as one undoable step.
    ///
    /// Everything `f` performs through the recorder becomes a single entry.
    /// If `f` fails, the sub-commands it already ran are undone in reverse
    /// order and the error is returned; nothing is recorded. A group that
    /// performs nothing records nothing.
    pub async fn perform_group<T, F, Fut>(&self, description: impl Into<String>, f: F) -> Result<T, E>
    where
        F: FnOnce(GroupRecorder<E>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let description = description.into();
        let mut stack = self.stack.lock().await;
        let recorder = GroupRecorder::new(&description);
        match f(recorder.clone()).await {
            Ok(value) => {
                if let Some(command) = recorder.finish(&description) {
                    debug!(description = %description, "perform group");
                    stack.push(Arc::new(command), self.config.max_depth);
                    self.publish(&stack);
                }
                Ok(value)
            }
            Err(e) => {
                recorder.rollback(&description).await;
                Err(e)
            }
        }
    }

    /// Undo the entry before the cursor. Returns its description, or `None`
    /// if there was nothing to undo. On failure the cursor does not move.
    pub async fn undo(&self) -> Result<Option<String>, E> {
        let mut stack = self.stack.lock().await;
        let Some(command) = stack.cursor.checked_sub(1).and_then(|i| stack.commands.get(i)).cloned()
        else {
            return Ok(None);
        };
        command.undo().await?;
        stack.cursor -= 1;
        debug!(description = %command.description, cursor = stack.cursor, "undo");
        self.publish(&stack);
        Ok(Some(command.description.clone()))
    }

    /// Redo the entry after the cursor. Returns its description, or `None`
    /// if there was nothing to redo. On failure the cursor does not move.
    pub async fn redo(&self) -> Result<Option<String>, E> {
        let mut stack = self.stack.lock().await;
        let Some(command) = stack.commands.get(stack.cursor).cloned() else {
            return Ok(None);
        };
        command.redo().await?;
        stack.cursor += 1;
        debug!(description = %command.description, cursor = stack.cursor, "redo");
        self.publish(&stack);
        Ok(Some(command.description.clone()))
    }

    /// Drop every entry (board or session switch).
    pub async fn clear(&self) {
        let mut stack = self.stack.lock().await;
        stack.commands.clear();
        stack.cursor = 0;
        debug!("history cleared");
        self.publish(&stack);
    }

    // ── Queries (last published state) ──────────────────────────────────────

    pub fn can_undo(&self) -> bool {
        self.state_tx.borrow().can_undo
    }

    pub fn can_redo(&self) -> bool {
        self.state_tx.borrow().can_redo
    }

    pub fn undo_description(&self) -> Option<String> {
        self.state_tx.borrow().undo_description.clone()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.state_tx.borrow().redo_description.clone()
    }

    /// Current published state.
    pub fn state(&self) -> HistoryState {
        self.state_tx.borrow().clone()
    }

    /// Receive a new [`HistoryState`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<HistoryState> {
        self.state_tx.subscribe()
    }

    fn publish(&self, stack: &Stack<E>) {
        self.state_tx.send_replace(stack.state());
    }
}

// ============================================================================
// GroupRecorder
// ============================================================================

/// A group recorder was used after its group finished.
///
/// The history error type must convert from this so a stale recorder can
/// refuse work.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("undo group '{group}' has already finished")]
pub struct GroupClosed {
    pub group: String,
}

/// Collects the sub-commands of a group in progress.
///
/// Handed out by [`UndoManager::perform_group`]; clones share one list.
/// Once the group finishes or rolls back the recorder is closed: further
/// performs fail with [`GroupClosed`] before running anything.
pub struct GroupRecorder<E> {
    description: Arc<str>,
    /// `None` once the group has finished.
    commands: Arc<parking_lot::Mutex<Option<Vec<Arc<Command<E>>>>>>,
}

impl<E> Clone for GroupRecorder<E> {
    fn clone(&self) -> Self {
        Self {
            description: Arc::clone(&self.description),
            commands: Arc::clone(&self.commands),
        }
    }
}

impl<E> fmt::Debug for GroupRecorder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRecorder")
            .field("description", &self.description)
            .field("recorded", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<E> GroupRecorder<E> {
    fn new(description: &str) -> Self {
        Self {
            description: description.into(),
            commands: Arc::new(parking_lot::Mutex::new(Some(Vec::new()))),
        }
    }

    /// Number of sub-commands recorded so far.
    pub fn len(&self) -> usize {
        self.commands.lock().as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the group has finished or rolled back.
    pub fn is_closed(&self) -> bool {
        self.commands.lock().is_none()
    }

    fn closed(&self) -> GroupClosed {
        GroupClosed {
            group: self.description.to_string(),
        }
    }

    fn push(&self, command: Arc<Command<E>>) -> Result<(), GroupClosed> {
        match self.commands.lock().as_mut() {
            Some(commands) => {
                commands.push(command);
                Ok(())
            }
            None => Err(self.closed()),
        }
    }

    /// Close the recorder and hand back what it collected.
    fn take(&self) -> Vec<Arc<Command<E>>> {
        self.commands.lock().take().unwrap_or_default()
    }
}

impl<E> GroupRecorder<E>
where
    E: fmt::Display + Send + 'static,
{
    fn finish(&self, description: &str) -> Option<Command<E>> {
        let commands = self.take();
        if commands.is_empty() {
            return None;
        }
        Some(Command::group(description, commands))
    }

    async fn rollback(&self, description: &str) {
        let commands = self.take();
        for command in commands.iter().rev() {
            if let Err(e) = command.undo().await {
                warn!(
                    group = %description,
                    step = %command.description,
                    error = %e,
                    "group rollback step failed"
                );
            }
        }
    }
}

impl<E> GroupRecorder<E>
where
    E: fmt::Display + From<GroupClosed> + Send + 'static,
{
    /// Run `redo` and record the pair into the group.
    pub async fn perform<R, RF, U, UF>(
        &self,
        redo: R,
        undo: U,
        description: impl Into<String>,
    ) -> Result<(), E>
    where
        R: Fn() -> RF + Send + Sync + 'static,
        RF: Future<Output = Result<(), E>> + Send + 'static,
        U: Fn() -> UF + Send + Sync + 'static,
        UF: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.perform_command(Command::new(description, redo, undo)).await
    }

    /// Run a prepared command's redo and record it into the group.
    pub async fn perform_command(&self, command: Command<E>) -> Result<(), E> {
        self.ensure_open()?;
        command.redo().await?;
        self.record(Arc::new(command)).await
    }

    /// Record an already-applied command into the group.
    pub fn register(&self, command: Command<E>) -> Result<(), E> {
        Ok(self.push(Arc::new(command))?)
    }

    /// Nested group: recorded into this group as one sub-command.
    pub async fn group<T, F, Fut>(&self, description: impl Into<String>, f: F) -> Result<T, E>
    where
        F: FnOnce(GroupRecorder<E>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.ensure_open()?;
        let description = description.into();
        let child = GroupRecorder::new(&description);
        match f(child.clone()).await {
            Ok(value) => {
                if let Some(command) = child.finish(&description) {
                    self.record(Arc::new(command)).await?;
                }
                Ok(value)
            }
            Err(e) => {
                child.rollback(&description).await;
                Err(e)
            }
        }
    }

    fn ensure_open(&self) -> Result<(), E> {
        if self.is_closed() {
            return Err(self.closed().into());
        }
        Ok(())
    }

    /// Record a command that already ran. If the group closed meanwhile the
    /// command is undone again so nothing escapes the history.
    async fn record(&self, command: Arc<Command<E>>) -> Result<(), E> {
        if let Err(closed) = self.push(command.clone()) {
            debug!(group = %closed.group, step = %command.description, "group closed during step");
            command.undo().await?;
            return Err(closed.into());
        }
        Ok(())
    }
}

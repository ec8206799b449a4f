//! Undo/redo history and the block mutator for Tabula.
//!
//! # Architecture
//!
//! ```text
//! UI event ──► Mutator::change_title(&card, "New")
//!                 │  builds redo = write(new), undo = write(old)
//!                 ▼
//!              UndoManager::perform_command   (fair async mutex)
//!                 │  runs redo, then records the command
//!                 ▼
//!              BlockStoreClient::update_block
//! ```
//!
//! - [`history`] - [`UndoManager`], [`Command`], [`GroupRecorder`]; knows
//!   nothing about blocks or stores
//! - [`mutator`] - [`Mutator`], the single entry point for edits
//! - [`config`] - [`CoreConfig`] loaded from RON

pub mod config;
mod error;
pub mod history;
pub mod mutator;

pub use config::{ConfigError, CoreConfig};
pub use error::{MutatorError, MutatorResult};
pub use history::{Action, Command, GroupClosed, GroupRecorder, HistoryConfig, HistoryState, UndoManager};
pub use mutator::{History, Hook, Mutator, hook};

//! Console session: runs parsed commands against a store through the mutator.

use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tabula_client::MemoryStore;
use tabula_core::{CoreConfig, Mutator, MutatorError};
use tabula_types::{Block, BlockKind, ViewType, resolve_prefix};

use crate::command::{Command, HELP};

/// What the console loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Print this (possibly empty) text and read the next line.
    Continue(String),
    Quit,
}

pub struct Console {
    store: Arc<MemoryStore>,
    mutator: Mutator,
}

impl Console {
    pub fn new(store: Arc<MemoryStore>, config: CoreConfig) -> Self {
        let mutator = Mutator::with_config(store.clone(), config);
        Self { store, mutator }
    }

    pub fn mutator(&self) -> &Mutator {
        &self.mutator
    }

    /// Parse and run one input line.
    pub async fn run_line(&self, line: &str) -> Result<Outcome> {
        match Command::parse(line)? {
            Some(cmd) => self.execute(cmd).await,
            None => Ok(Outcome::Continue(String::new())),
        }
    }

    pub async fn execute(&self, cmd: Command) -> Result<Outcome> {
        let user = self.mutator.user();
        let out = match cmd {
            Command::List { target } => self.list(target.as_deref())?,
            Command::NewBoard { title } => {
                let board = Block::board(title).by(user);
                let view = Block::view(board.id, ViewType::Board, "Board view").by(user);
                let board = self
                    .mutator
                    .perform_as_undo_group("add board", move |m| async move {
                        let board = m.insert_block(board, "add board", None, None).await?;
                        m.insert_block(view, "add view", None, None).await?;
                        Ok::<_, MutatorError>(board)
                    })
                    .await?;
                format!("created board {}", board.id.short())
            }
            Command::NewCard { board, title } => {
                let board = self.resolve(&board)?;
                if board.kind() != BlockKind::Board {
                    bail!("'{}' is a {}, not a board", board.title, board.kind());
                }
                let card = Block::card(board.id, title).by(user);
                let card = self.mutator.insert_block(card, "add card", None, None).await?;
                format!("created card {}", card.id.short())
            }
            Command::AddText { card, text } => {
                let card = self.resolve(&card)?;
                let text = Block::text(&card, text).by(user);
                let text = self.mutator.add_content_block(&card, text, None).await?;
                format!("added text {}", text.id.short())
            }
            Command::Title { block, title } => {
                let block = self.resolve(&block)?;
                self.mutator.change_title(&block, title).await?;
                String::new()
            }
            Command::Icon { block, icon } => {
                let block = self.resolve(&block)?;
                self.mutator.change_icon(&block, icon).await?;
                String::new()
            }
            Command::Duplicate { card } => {
                let card = self.resolve(&card)?;
                let copy = self.mutator.duplicate_card(card.id, false).await?;
                format!("duplicated as {}", copy.id.short())
            }
            Command::Remove { block } => {
                let block = self.resolve(&block)?;
                self.remove(block).await?
            }
            Command::Undo => match self.mutator.undo().await? {
                Some(description) => format!("undid {description}"),
                None => "nothing to undo".to_string(),
            },
            Command::Redo => match self.mutator.redo().await? {
                Some(description) => format!("redid {description}"),
                None => "nothing to redo".to_string(),
            },
            Command::History => {
                let state = self.mutator.history().state();
                format!(
                    "undo: {}\nredo: {}\ndepth: {}",
                    state.undo_description.as_deref().unwrap_or("-"),
                    state.redo_description.as_deref().unwrap_or("-"),
                    state.depth,
                )
            }
            Command::Export { path } => {
                let archive = self.mutator.export_archive().await?;
                let file = File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                archive.write_to(BufWriter::new(file))?;
                format!("exported {} blocks to {}", archive.blocks.len(), path.display())
            }
            Command::Save => {
                self.store.save()?;
                "saved".to_string()
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Continue(out))
    }

    /// Find a block by exact title, unique title prefix, or hex ID prefix.
    fn resolve(&self, query: &str) -> Result<Block> {
        let blocks = self.store.blocks();
        let id = resolve_prefix(blocks.iter().map(|b| (b.id, b.title.as_str())), query)?;
        blocks
            .into_iter()
            .find(|b| b.id == id)
            .with_context(|| format!("block {id} vanished"))
    }

    fn list(&self, target: Option<&str>) -> Result<String> {
        let blocks = self.store.blocks();
        let rows: Vec<&Block> = match target {
            None => blocks.iter().filter(|b| b.kind() == BlockKind::Board).collect(),
            Some(query) => {
                let parent = self.resolve(query)?;
                blocks.iter().filter(|b| b.parent_id == Some(parent.id)).collect()
            }
        };

        let mut out = String::new();
        for block in rows {
            let icon = block.icon().filter(|i| !i.is_empty()).unwrap_or(" ");
            let _ = writeln!(out, "{}  {:<8} {} {}", block.id.short(), block.kind(), icon, block.title);
        }
        if out.is_empty() {
            out.push_str("(empty)");
        }
        Ok(out.trim_end().to_string())
    }

    /// Delete a block with everything under it, as one undo step.
    ///
    /// Card content also leaves its card's content order.
    async fn remove(&self, block: Block) -> Result<String> {
        let card = if block.kind().is_content() {
            self.parent_card(&block).await?
        } else {
            None
        };
        if let Some(card) = card {
            self.mutator.delete_content_block(&card, &block).await?;
            return Ok("deleted 1 block(s)".to_string());
        }

        let mut subtree = self.mutator.client().get_subtree(block.id).await?;
        // Children go first so undo re-inserts parents before them
        subtree.reverse();
        let count = subtree.len();
        let description = format!("delete {}", block.kind());
        self.mutator
            .perform_as_undo_group(description, move |m| async move {
                for b in &subtree {
                    m.delete_block(b, "delete block", None, None).await?;
                }
                Ok::<_, MutatorError>(())
            })
            .await?;
        Ok(format!("deleted {count} block(s)"))
    }

    async fn parent_card(&self, block: &Block) -> Result<Option<Block>> {
        let Some(parent_id) = block.parent_id else {
            return Ok(None);
        };
        let parent = self.mutator.client().get_block(parent_id).await?;
        Ok(parent.filter(|p| p.kind() == BlockKind::Card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console() -> (Arc<MemoryStore>, Console) {
        let store = Arc::new(MemoryStore::new());
        let console = Console::new(store.clone(), CoreConfig::default());
        (store, console)
    }

    async fn run(console: &Console, line: &str) -> String {
        match console.run_line(line).await.unwrap() {
            Outcome::Continue(out) => out,
            Outcome::Quit => panic!("unexpected quit"),
        }
    }

    fn find(store: &MemoryStore, title: &str) -> Option<Block> {
        store.blocks().into_iter().find(|b| b.title == title)
    }

    #[tokio::test]
    async fn test_new_board_is_one_undo_step() {
        let (store, console) = console();
        run(&console, "board Roadmap").await;
        assert_eq!(store.len(), 2);
        assert_eq!(console.mutator().undo_description().as_deref(), Some("add board"));

        assert_eq!(run(&console, "undo").await, "undid add board");
        assert!(store.is_empty());
        assert_eq!(run(&console, "undo").await, "nothing to undo");
    }

    #[tokio::test]
    async fn test_card_title_and_text() {
        let (store, console) = console();
        run(&console, "board Roadmap").await;
        run(&console, "card Road Ship it").await;
        run(&console, "title Ship Ship it today").await;
        run(&console, "text Ship notes go here").await;

        let card = find(&store, "Ship it today").unwrap();
        let text = find(&store, "notes go here").unwrap();
        assert_eq!(text.parent_id, Some(card.id));
        assert_eq!(card.as_card().unwrap().content_order, vec![text.id]);

        let listing = run(&console, "ls Ship").await;
        assert!(listing.contains("notes go here"));
    }

    #[tokio::test]
    async fn test_card_needs_a_board() {
        let (_store, console) = console();
        run(&console, "board Roadmap").await;
        run(&console, "card Roadmap Ship it").await;
        let err = console.run_line("card Ship nested").await.unwrap_err();
        assert!(err.to_string().contains("not a board"), "{err}");
    }

    #[tokio::test]
    async fn test_remove_restores_subtree_on_undo() {
        let (store, console) = console();
        run(&console, "board Roadmap").await;
        run(&console, "card Roadmap Ship it").await;
        run(&console, "text Ship first").await;
        run(&console, "text Ship second").await;
        assert_eq!(store.len(), 5);

        assert_eq!(run(&console, "rm Ship").await, "deleted 3 block(s)");
        assert_eq!(store.len(), 2);

        run(&console, "undo").await;
        assert_eq!(store.len(), 5);
        let card = find(&store, "Ship it").unwrap();
        assert_eq!(card.as_card().unwrap().content_order.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_content_updates_card_order() {
        let (store, console) = console();
        run(&console, "board Roadmap").await;
        run(&console, "card Roadmap Ship it").await;
        run(&console, "text Ship first").await;
        run(&console, "text Ship second").await;

        assert_eq!(run(&console, "rm first").await, "deleted 1 block(s)");
        let card = find(&store, "Ship it").unwrap();
        let second = find(&store, "second").unwrap();
        assert_eq!(card.as_card().unwrap().content_order, vec![second.id]);
        assert!(find(&store, "first").is_none());

        assert_eq!(run(&console, "undo").await, "undid delete content");
        let card = find(&store, "Ship it").unwrap();
        assert_eq!(card.as_card().unwrap().content_order.len(), 2);
    }

    #[tokio::test]
    async fn test_history_report() {
        let (_store, console) = console();
        run(&console, "board Roadmap").await;
        run(&console, "icon Roadmap 🗺").await;
        run(&console, "undo").await;

        let report = run(&console, "history").await;
        assert_eq!(report, "undo: add board\nredo: change icon\ndepth: 2");
    }

    #[tokio::test]
    async fn test_unknown_block() {
        let (_store, console) = console();
        let err = console.run_line("title nothing here").await.unwrap_err();
        assert!(err.to_string().contains("no match"), "{err}");
    }

    #[tokio::test]
    async fn test_export_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let backing = dir.path().join("boards.jsonl");
        let store = Arc::new(MemoryStore::open(&backing).unwrap());
        let console = Console::new(store.clone(), CoreConfig::default());

        run(&console, "board Roadmap").await;
        let export = dir.path().join("export.jsonl");
        let out = run(&console, &format!("export {}", export.display())).await;
        assert!(out.starts_with("exported 2 blocks"), "{out}");

        assert_eq!(run(&console, "save").await, "saved");
        let reopened = MemoryStore::open(&backing).unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[tokio::test]
    async fn test_quit() {
        let (_store, console) = console();
        assert_eq!(console.run_line("quit").await.unwrap(), Outcome::Quit);
    }
}

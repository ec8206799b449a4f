//! Block record and per-kind payloads.
//!
//! Everything persisted on a board is a [`Block`]: the board itself, its
//! views, its cards, and the content blocks inside a card. Common identity and
//! bookkeeping live on `Block`; kind-specific data lives in [`BlockFields`],
//! a closed sum type. The kind tag is derived from the payload variant, so a
//! block can never claim to be a card while carrying view settings.
//!
//! ## Tree shape
//!
//! ```text
//! Board (parent_id = None, board_id = self)
//!     ├── View      (parent = board)
//!     └── Card      (parent = board)
//!          ├── Text / Image / Divider / Checkbox   (ordered by card.content_order)
//!          └── Comment
//! ```

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{BlockId, FileId, PropertyId, UserId};
use crate::property::{PropertyTemplate, PropertyValue};
use crate::view::{ViewFields, ViewType};

/// What a block *is*. Derived from [`BlockFields`], never stored separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum BlockKind {
    Board,
    View,
    Card,
    Text,
    Image,
    Divider,
    Checkbox,
    Comment,
}

impl BlockKind {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Board => "board",
            BlockKind::View => "view",
            BlockKind::Card => "card",
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Divider => "divider",
            BlockKind::Checkbox => "checkbox",
            BlockKind::Comment => "comment",
        }
    }

    /// Content kinds live inside a card and appear in its `content_order`.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            BlockKind::Text | BlockKind::Image | BlockKind::Divider | BlockKind::Checkbox
        )
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of a board block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BoardFields {
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub show_description: bool,
    /// Ordered card property schema.
    #[serde(default)]
    pub card_properties: Vec<PropertyTemplate>,
}

impl BoardFields {
    /// Look up a property template by ID.
    pub fn property(&self, id: PropertyId) -> Option<&PropertyTemplate> {
        self.card_properties.iter().find(|t| t.id == id)
    }

    /// Mutable lookup of a property template by ID.
    pub fn property_mut(&mut self, id: PropertyId) -> Option<&mut PropertyTemplate> {
        self.card_properties.iter_mut().find(|t| t.id == id)
    }

    /// Position of a template in the schema.
    pub fn property_index(&self, id: PropertyId) -> Option<usize> {
        self.card_properties.iter().position(|t| t.id == id)
    }
}

/// Payload of a card block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CardFields {
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub is_template: bool,
    /// Values keyed by board property template.
    #[serde(default)]
    pub properties: IndexMap<PropertyId, PropertyValue>,
    /// Display order of content blocks.
    #[serde(default)]
    pub content_order: Vec<BlockId>,
}

/// Payload of an image content block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFields {
    pub file_id: FileId,
}

/// Payload of a checkbox content block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CheckboxFields {
    #[serde(default)]
    pub value: bool,
}

/// Kind-specific payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockFields {
    Board(BoardFields),
    View(ViewFields),
    Card(CardFields),
    Text,
    Image(ImageFields),
    Divider,
    Checkbox(CheckboxFields),
    Comment,
}

impl BlockFields {
    /// The kind tag for this payload.
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockFields::Board(_) => BlockKind::Board,
            BlockFields::View(_) => BlockKind::View,
            BlockFields::Card(_) => BlockKind::Card,
            BlockFields::Text => BlockKind::Text,
            BlockFields::Image(_) => BlockKind::Image,
            BlockFields::Divider => BlockKind::Divider,
            BlockFields::Checkbox(_) => BlockKind::Checkbox,
            BlockFields::Comment => BlockKind::Comment,
        }
    }
}

/// A persisted entity on a board.
///
/// Blocks are plain values: cloning one yields an independent snapshot, which
/// is what undo closures capture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Stable identity. Never changes across updates.
    pub id: BlockId,
    /// Tree parent (None for boards).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<BlockId>,
    /// Root board this block belongs to (a board's `board_id` is its own ID).
    pub board_id: BlockId,
    pub created_by: UserId,
    pub modified_by: UserId,
    #[serde(default)]
    pub title: String,
    pub fields: BlockFields,
    /// Unix millis.
    pub created_at: u64,
    /// Unix millis.
    pub updated_at: u64,
}

impl Block {
    fn with_fields(
        id: BlockId,
        parent_id: Option<BlockId>,
        board_id: BlockId,
        title: impl Into<String>,
        fields: BlockFields,
    ) -> Self {
        let now = crate::now_millis();
        Self {
            id,
            parent_id,
            board_id,
            created_by: UserId::system(),
            modified_by: UserId::system(),
            title: title.into(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new board.
    pub fn board(title: impl Into<String>) -> Self {
        let id = BlockId::new();
        Self::with_fields(id, None, id, title, BlockFields::Board(BoardFields::default()))
    }

    /// Create a new view on `board`.
    pub fn view(board_id: BlockId, view_type: ViewType, title: impl Into<String>) -> Self {
        Self::with_fields(
            BlockId::new(),
            Some(board_id),
            board_id,
            title,
            BlockFields::View(ViewFields::new(view_type)),
        )
    }

    /// Create a new card on `board`.
    pub fn card(board_id: BlockId, title: impl Into<String>) -> Self {
        Self::with_fields(
            BlockId::new(),
            Some(board_id),
            board_id,
            title,
            BlockFields::Card(CardFields::default()),
        )
    }

    /// Create a text content block inside `card`.
    pub fn text(card: &Block, text: impl Into<String>) -> Self {
        Self::with_fields(BlockId::new(), Some(card.id), card.board_id, text, BlockFields::Text)
    }

    /// Create a divider content block inside `card`.
    pub fn divider(card: &Block) -> Self {
        Self::with_fields(BlockId::new(), Some(card.id), card.board_id, "", BlockFields::Divider)
    }

    /// Create a checkbox content block inside `card`.
    pub fn checkbox(card: &Block, label: impl Into<String>, value: bool) -> Self {
        Self::with_fields(
            BlockId::new(),
            Some(card.id),
            card.board_id,
            label,
            BlockFields::Checkbox(CheckboxFields { value }),
        )
    }

    /// Create an image content block inside `card`.
    pub fn image(card: &Block, file_id: FileId) -> Self {
        Self::with_fields(
            BlockId::new(),
            Some(card.id),
            card.board_id,
            "",
            BlockFields::Image(ImageFields { file_id }),
        )
    }

    /// Create a comment on `card`.
    pub fn comment(card: &Block, text: impl Into<String>) -> Self {
        Self::with_fields(BlockId::new(), Some(card.id), card.board_id, text, BlockFields::Comment)
    }

    /// Builder-style author override (sets both created_by and modified_by).
    pub fn by(mut self, user: UserId) -> Self {
        self.created_by = user;
        self.modified_by = user;
        self
    }

    /// The kind tag, derived from the payload.
    pub fn kind(&self) -> BlockKind {
        self.fields.kind()
    }

    /// Stamp `updated_at` with the current time.
    pub fn touch(&mut self) {
        self.updated_at = crate::now_millis();
    }

    /// The block's icon, for kinds that have one.
    pub fn icon(&self) -> Option<&str> {
        match &self.fields {
            BlockFields::Board(b) => Some(&b.icon),
            BlockFields::Card(c) => Some(&c.icon),
            BlockFields::View(_)
            | BlockFields::Text
            | BlockFields::Image(_)
            | BlockFields::Divider
            | BlockFields::Checkbox(_)
            | BlockFields::Comment => None,
        }
    }

    /// Mutable icon slot, for kinds that have one.
    pub fn icon_mut(&mut self) -> Option<&mut String> {
        match &mut self.fields {
            BlockFields::Board(b) => Some(&mut b.icon),
            BlockFields::Card(c) => Some(&mut c.icon),
            BlockFields::View(_)
            | BlockFields::Text
            | BlockFields::Image(_)
            | BlockFields::Divider
            | BlockFields::Checkbox(_)
            | BlockFields::Comment => None,
        }
    }

    pub fn as_board(&self) -> Option<&BoardFields> {
        match &self.fields {
            BlockFields::Board(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_board_mut(&mut self) -> Option<&mut BoardFields> {
        match &mut self.fields {
            BlockFields::Board(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<&ViewFields> {
        match &self.fields {
            BlockFields::View(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_view_mut(&mut self) -> Option<&mut ViewFields> {
        match &mut self.fields {
            BlockFields::View(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_card(&self) -> Option<&CardFields> {
        match &self.fields {
            BlockFields::Card(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_card_mut(&mut self) -> Option<&mut CardFields> {
        match &mut self.fields {
            BlockFields::Card(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyType;

    #[test]
    fn test_board_is_its_own_root() {
        let board = Block::board("Roadmap");
        assert_eq!(board.board_id, board.id);
        assert_eq!(board.parent_id, None);
        assert_eq!(board.kind(), BlockKind::Board);
    }

    #[test]
    fn test_content_blocks_inherit_board() {
        let board = Block::board("Roadmap");
        let card = Block::card(board.id, "Ship it");
        let text = Block::text(&card, "notes");
        assert_eq!(text.parent_id, Some(card.id));
        assert_eq!(text.board_id, board.id);
        assert!(text.kind().is_content());
        assert!(!Block::comment(&card, "hi").kind().is_content());
    }

    #[test]
    fn test_icon_only_on_board_and_card() {
        let board = Block::board("b");
        let mut card = Block::card(board.id, "c");
        let mut view = Block::view(board.id, ViewType::Table, "v");
        assert_eq!(board.icon(), Some(""));
        *card.icon_mut().unwrap() = "🚀".into();
        assert_eq!(card.icon(), Some("🚀"));
        assert!(view.icon_mut().is_none());
    }

    #[test]
    fn test_typed_accessors_reject_other_kinds() {
        let board = Block::board("b");
        assert!(board.as_board().is_some());
        assert!(board.as_card().is_none());
        assert!(board.as_view().is_none());
    }

    #[test]
    fn test_serde_roundtrip_with_internal_tag() {
        let mut board = Block::board("Roadmap");
        board
            .as_board_mut()
            .unwrap()
            .card_properties
            .push(PropertyTemplate::new("Status", PropertyType::Select));
        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json["fields"]["type"], "board");

        let parsed: Block = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, board);
    }

    #[test]
    fn test_unit_payload_serde() {
        let board = Block::board("b");
        let card = Block::card(board.id, "c");
        let divider = Block::divider(&card);
        let json = serde_json::to_string(&divider).unwrap();
        assert!(json.contains(r#""fields":{"type":"divider"}"#));
        let parsed: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind(), BlockKind::Divider);
    }

    #[test]
    fn test_clone_is_independent_snapshot() {
        let board = Block::board("b");
        let mut card = Block::card(board.id, "before");
        let snapshot = card.clone();
        card.title = "after".into();
        card.as_card_mut().unwrap().content_order.push(BlockId::new());
        assert_eq!(snapshot.title, "before");
        assert!(snapshot.as_card().unwrap().content_order.is_empty());
    }
}

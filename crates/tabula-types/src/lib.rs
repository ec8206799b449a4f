//! Shared identity and block types for Tabula.
//!
//! This crate is the data foundation: typed IDs, the [`Block`] record, and
//! the per-kind payloads that the mutator edits. It has **no internal tabula
//! dependencies**, a pure leaf crate that the client and core build on.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`Block`]         | Persisted entity (board, view, card, ...)    |
//! | [`BlockFields`]   | Kind-specific payload (closed sum type)      |
//! | [`BlockKind`]     | Kind tag derived from the payload            |
//! | [`BlockId`]       | Stable block identity                        |
//! | [`PropertyTemplate`] | Board-level card property schema entry    |
//! | [`PropertyValue`] | A card's value for one property              |
//! | [`ViewFields`]    | Sort / filter / group / order of a view      |
//! |-------------------|----------------------------------------------|

pub mod block;
pub mod ids;
pub mod property;
pub mod view;

// Re-export primary types at crate root for convenience.
pub use block::{
    Block, BlockFields, BlockKind, BoardFields, CardFields, CheckboxFields, ImageFields,
};
pub use ids::{BlockId, FileId, OptionId, PrefixError, PropertyId, UserId, resolve_prefix};
pub use property::{
    DEFAULT_OPTION_COLOR, PropertyOption, PropertyTemplate, PropertyType, PropertyValue,
};
pub use view::{
    FilterClause, FilterCondition, FilterGroup, FilterNode, FilterOperation, SortOption,
    ViewFields, ViewType,
};

/// Current time as Unix milliseconds. Used by constructors throughout the crate.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

//! Typed identifiers for blocks, users, property templates, options, and files.
//!
//! All ID types wrap UUIDv7 (time-ordered, globally unique). They serialize as
//! standard UUID text and display the same way for logging. The `short()` form
//! (first 8 hex chars) is for human-facing UI and the console; lookups by
//! prefix go through [`resolve_prefix`].
//!
//! `UserId` also has a deterministic sentinel via `UserId::system()`, derived
//! from UUIDv5, for blocks created by imports and templates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A block identifier (UUIDv7). Boards, views, cards and content are all blocks.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(uuid::Uuid);

/// A user identifier (UUIDv7, or UUIDv5 for sentinels).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(uuid::Uuid);

/// A card property template identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(uuid::Uuid);

/// A select / multi-select option identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(uuid::Uuid);

/// An uploaded file identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// First 8 hex characters, for human display only (not lookup).
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Full 32-character hex string (no hyphens).
            pub fn to_hex(&self) -> String {
                self.0.as_simple().to_string()
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// Check if a query string matches this ID by hex prefix.
            pub fn matches_hex_prefix(&self, prefix: &str) -> bool {
                self.to_hex().starts_with(prefix)
            }

            /// A nil / zero ID, for sentinel values only.
            pub fn nil() -> Self {
                Self(uuid::Uuid::nil())
            }

            /// Check if this is the nil ID.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$T> for uuid::Uuid {
            fn from(id: $T) -> uuid::Uuid {
                id.0
            }
        }

        impl std::str::FromStr for $T {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Full UUID with hyphens for log readability
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(BlockId, "BlockId");
impl_typed_id!(UserId, "UserId");
impl_typed_id!(PropertyId, "PropertyId");
impl_typed_id!(OptionId, "OptionId");
impl_typed_id!(FileId, "FileId");

// ── UserId sentinels ────────────────────────────────────────────────────────

/// Fixed namespace for deriving deterministic UserIds via UUIDv5.
const TABULA_USER_NS: uuid::Uuid = uuid::uuid!("3f1c9a52-8d47-4b6e-9e21-7a05c4d8b913");

impl UserId {
    /// The well-known "system" user.
    ///
    /// Used for blocks created by archive import and built-in templates.
    /// Deterministic: same value every time (UUIDv5 derived from `b"system"`).
    pub fn system() -> Self {
        Self(uuid::Uuid::new_v5(&TABULA_USER_NS, b"system"))
    }
}

// ── Prefix resolution ───────────────────────────────────────────────────────

/// Error from ambiguous prefix resolution.
#[derive(Debug, thiserror::Error)]
pub enum PrefixError {
    #[error("no match for prefix '{0}'")]
    NoMatch(String),
    #[error("ambiguous prefix '{prefix}': matches {candidates:?}")]
    Ambiguous {
        prefix: String,
        candidates: Vec<String>,
    },
}

/// Resolve a query string against a set of block IDs and their titles.
///
/// Resolution order:
/// 1. Exact title match
/// 2. Unique title prefix match
/// 3. Unique hex prefix match
/// 4. Error (no match or ambiguous)
pub fn resolve_prefix<'a>(
    blocks: impl Iterator<Item = (BlockId, &'a str)>,
    query: &str,
) -> Result<BlockId, PrefixError> {
    let entries: Vec<(BlockId, &str)> = blocks.collect();

    // 1. Exact title match
    if let Some(&(id, _)) = entries.iter().find(|(_, title)| *title == query) {
        return Ok(id);
    }

    // 2. Unique title prefix match
    let title_matches: Vec<(BlockId, &str)> = entries
        .iter()
        .filter(|(_, title)| !title.is_empty() && title.starts_with(query))
        .copied()
        .collect();

    if title_matches.len() == 1 {
        return Ok(title_matches[0].0);
    }
    if title_matches.len() > 1 {
        return Err(PrefixError::Ambiguous {
            prefix: query.to_string(),
            candidates: title_matches.iter().map(|(_, t)| t.to_string()).collect(),
        });
    }

    // 3. Unique hex prefix match
    let hex_matches: Vec<BlockId> = entries
        .iter()
        .filter(|(id, _)| id.matches_hex_prefix(query))
        .map(|(id, _)| *id)
        .collect();

    match hex_matches.len() {
        0 => Err(PrefixError::NoMatch(query.to_string())),
        1 => Ok(hex_matches[0]),
        _ => Err(PrefixError::Ambiguous {
            prefix: query.to_string(),
            candidates: hex_matches.iter().map(|id| id.short()).collect(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unique() {
        assert_ne!(BlockId::new(), BlockId::new());
    }

    #[test]
    fn test_short_is_8_chars() {
        assert_eq!(PropertyId::new().short().len(), 8);
    }

    #[test]
    fn test_parse_hex_and_uuid_format() {
        let id = BlockId::new();
        assert_eq!(BlockId::parse(&id.to_hex()).unwrap(), id);
        assert_eq!(BlockId::parse(&id.to_string()).unwrap(), id);
        assert_eq!(id.to_string().parse::<BlockId>().unwrap(), id);
    }

    #[test]
    fn test_nil() {
        assert!(OptionId::nil().is_nil());
        assert!(!OptionId::new().is_nil());
    }

    #[test]
    fn test_ordering_is_time_ordered() {
        let ids: Vec<BlockId> = (0..10).map(|_| BlockId::new()).collect();
        for i in 1..ids.len() {
            assert!(ids[i] >= ids[i - 1]);
        }
    }

    #[test]
    fn test_serde_is_plain_uuid_string() {
        let id = FileId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let parsed: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_system_user_is_deterministic() {
        assert_eq!(UserId::system(), UserId::system());
        assert_ne!(UserId::system(), UserId::new());
        assert!(!UserId::system().is_nil());
    }

    // ── Prefix resolution ───────────────────────────────────────────────

    #[test]
    fn test_resolve_exact_title() {
        let a = BlockId::new();
        let b = BlockId::new();
        let found = resolve_prefix([(a, "Roadmap"), (b, "Roadmap Q3")].into_iter(), "Roadmap");
        assert_eq!(found.unwrap(), a);
    }

    #[test]
    fn test_resolve_title_prefix() {
        let a = BlockId::new();
        let b = BlockId::new();
        let found = resolve_prefix([(a, "Roadmap"), (b, "Backlog")].into_iter(), "Back");
        assert_eq!(found.unwrap(), b);
    }

    #[test]
    fn test_resolve_ambiguous_title_prefix() {
        let a = BlockId::new();
        let b = BlockId::new();
        let err = resolve_prefix([(a, "Task one"), (b, "Task two")].into_iter(), "Task")
            .unwrap_err();
        assert!(matches!(err, PrefixError::Ambiguous { .. }));
    }

    #[test]
    fn test_resolve_hex_prefix() {
        let a = BlockId::new();
        let b = BlockId::new();
        let query = a.to_hex();
        let found = resolve_prefix([(a, ""), (b, "")].into_iter(), &query);
        assert_eq!(found.unwrap(), a);
    }

    #[test]
    fn test_resolve_no_match() {
        let err = resolve_prefix([(BlockId::new(), "Card")].into_iter(), "zzz").unwrap_err();
        assert!(matches!(err, PrefixError::NoMatch(_)));
    }
}

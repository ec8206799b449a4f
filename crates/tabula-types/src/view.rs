//! View configuration: layout type, grouping, sorting, filtering, ordering.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{BlockId, OptionId, PropertyId};

/// How a view lays out its cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ViewType {
    /// Kanban columns grouped by a select property.
    #[default]
    #[strum(serialize = "board", serialize = "kanban")]
    Board,
    Table,
    Gallery,
    Calendar,
}

impl ViewType {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Board => "board",
            ViewType::Table => "table",
            ViewType::Gallery => "gallery",
            ViewType::Calendar => "calendar",
        }
    }
}

impl std::fmt::Display for ViewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One sort key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOption {
    pub property_id: PropertyId,
    #[serde(default)]
    pub reversed: bool,
}

/// Boolean combinator for a filter group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperation {
    #[default]
    And,
    Or,
}

/// Comparison applied by a filter clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    Includes,
    NotIncludes,
    IsEmpty,
    IsNotEmpty,
}

/// A leaf predicate over one property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    pub property_id: PropertyId,
    pub condition: FilterCondition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Either a clause or a nested group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Clause(FilterClause),
    Group(FilterGroup),
}

/// A tree of filter clauses joined by one operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FilterGroup {
    #[serde(default)]
    pub operation: FilterOperation,
    #[serde(default)]
    pub filters: Vec<FilterNode>,
}

impl FilterGroup {
    /// Check whether any clause in the tree reads the given property.
    pub fn references_property(&self, property: PropertyId) -> bool {
        self.filters.iter().any(|node| match node {
            FilterNode::Clause(c) => c.property_id == property,
            FilterNode::Group(g) => g.references_property(property),
        })
    }

    /// Copy of the tree with every clause on `property` removed.
    ///
    /// Nested groups left empty are dropped too.
    pub fn without_property(&self, property: PropertyId) -> FilterGroup {
        let filters = self
            .filters
            .iter()
            .filter_map(|node| match node {
                FilterNode::Clause(c) if c.property_id == property => None,
                FilterNode::Clause(c) => Some(FilterNode::Clause(c.clone())),
                FilterNode::Group(g) => {
                    let g = g.without_property(property);
                    (!g.filters.is_empty()).then_some(FilterNode::Group(g))
                }
            })
            .collect();
        FilterGroup {
            operation: self.operation,
            filters,
        }
    }
}

/// Payload of a view block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViewFields {
    pub view_type: ViewType,
    /// Select property that defines kanban columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<PropertyId>,
    #[serde(default)]
    pub sort_options: Vec<SortOption>,
    #[serde(default)]
    pub visible_property_ids: Vec<PropertyId>,
    /// Column order for kanban (option IDs of the group-by property).
    #[serde(default)]
    pub visible_option_ids: Vec<OptionId>,
    /// Kanban columns the user collapsed.
    #[serde(default)]
    pub hidden_option_ids: Vec<OptionId>,
    #[serde(default)]
    pub filter: FilterGroup,
    /// Manual card order (cards missing from this list sort after it).
    #[serde(default)]
    pub card_order: Vec<BlockId>,
    /// Table column widths in pixels.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub column_widths: IndexMap<PropertyId, u32>,
    /// Card template used when creating cards from this view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_template_id: Option<BlockId>,
}

impl ViewFields {
    /// Fresh view settings for the given layout.
    pub fn new(view_type: ViewType) -> Self {
        Self {
            view_type,
            ..Self::default()
        }
    }
}

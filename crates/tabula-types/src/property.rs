//! Card property schema: templates, options, and values.
//!
//! A board owns an ordered list of [`PropertyTemplate`]s. Each card stores a
//! value per template ID. Select-like templates carry their options inline;
//! card values for those templates hold option IDs (as strings), not option
//! labels, so renaming an option never touches the cards.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{OptionId, PropertyId};

/// The kind of value a property template holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum PropertyType {
    #[default]
    Text,
    Number,
    Email,
    Phone,
    Url,
    Select,
    #[strum(serialize = "multi_select", serialize = "multiselect")]
    MultiSelect,
    Date,
    Person,
    Checkbox,
    #[strum(serialize = "created_time", serialize = "createdtime")]
    CreatedTime,
    #[strum(serialize = "created_by", serialize = "createdby")]
    CreatedBy,
    #[strum(serialize = "updated_time", serialize = "updatedtime")]
    UpdatedTime,
    #[strum(serialize = "updated_by", serialize = "updatedby")]
    UpdatedBy,
}

impl PropertyType {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Text => "text",
            PropertyType::Number => "number",
            PropertyType::Email => "email",
            PropertyType::Phone => "phone",
            PropertyType::Url => "url",
            PropertyType::Select => "select",
            PropertyType::MultiSelect => "multi_select",
            PropertyType::Date => "date",
            PropertyType::Person => "person",
            PropertyType::Checkbox => "checkbox",
            PropertyType::CreatedTime => "created_time",
            PropertyType::CreatedBy => "created_by",
            PropertyType::UpdatedTime => "updated_time",
            PropertyType::UpdatedBy => "updated_by",
        }
    }

    /// Templates of this type carry options and store option IDs on cards.
    pub fn is_select_like(&self) -> bool {
        matches!(self, PropertyType::Select | PropertyType::MultiSelect)
    }

    /// Free-form text values that can be converted to and from option labels.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            PropertyType::Text | PropertyType::Number | PropertyType::Email | PropertyType::Phone | PropertyType::Url
        )
    }

    /// Values computed from block metadata; cards never store them.
    pub fn is_computed(&self) -> bool {
        matches!(
            self,
            PropertyType::CreatedTime
                | PropertyType::CreatedBy
                | PropertyType::UpdatedTime
                | PropertyType::UpdatedBy
        )
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One choice of a select / multi-select template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOption {
    pub id: OptionId,
    /// Display label.
    pub value: String,
    /// Color token understood by the front end (e.g. `"propColorRed"`).
    #[serde(default = "default_option_color")]
    pub color: String,
}

fn default_option_color() -> String {
    DEFAULT_OPTION_COLOR.to_string()
}

/// Color assigned to options created without an explicit color.
pub const DEFAULT_OPTION_COLOR: &str = "propColorDefault";

impl PropertyOption {
    /// Create an option with a fresh ID and the default color.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: OptionId::new(),
            value: value.into(),
            color: default_option_color(),
        }
    }

    /// Builder-style color override.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

/// Schema entry for one card property on a board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyTemplate {
    pub id: PropertyId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PropertyOption>,
}

impl PropertyTemplate {
    /// Create a template with a fresh ID and no options.
    pub fn new(name: impl Into<String>, kind: PropertyType) -> Self {
        Self {
            id: PropertyId::new(),
            name: name.into(),
            kind,
            options: Vec::new(),
        }
    }

    /// Builder-style option list.
    pub fn with_options(mut self, options: Vec<PropertyOption>) -> Self {
        self.options = options;
        self
    }

    /// Look up an option by ID.
    pub fn option(&self, id: OptionId) -> Option<&PropertyOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Position of an option in the template's option list.
    pub fn option_index(&self, id: OptionId) -> Option<usize> {
        self.options.iter().position(|o| o.id == id)
    }

    /// Look up an option by its display label.
    pub fn option_by_value(&self, value: &str) -> Option<&PropertyOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

/// A card's stored value for one property.
///
/// Single-valued types (including select) store `Text`; multi-select stores
/// `List`. Select values are option IDs in string form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    List(Vec<String>),
}

impl PropertyValue {
    /// Single-value view, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            PropertyValue::List(_) => None,
        }
    }

    /// All contained values as a slice-like iterator.
    pub fn values(&self) -> Vec<&str> {
        match self {
            PropertyValue::Text(s) => vec![s.as_str()],
            PropertyValue::List(v) => v.iter().map(String::as_str).collect(),
        }
    }

    /// Check whether the value is empty (empty text or empty list).
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Text(s) => s.is_empty(),
            PropertyValue::List(v) => v.is_empty(),
        }
    }

    /// Check whether this value references the given option.
    pub fn contains_option(&self, option: OptionId) -> bool {
        let key = option.to_string();
        self.values().iter().any(|v| *v == key)
    }

    /// Copy of this value with one option removed. Returns `None` if nothing is left.
    pub fn without_option(&self, option: OptionId) -> Option<PropertyValue> {
        let key = option.to_string();
        match self {
            PropertyValue::Text(s) if *s == key => None,
            PropertyValue::Text(s) => Some(PropertyValue::Text(s.clone())),
            PropertyValue::List(v) => {
                let kept: Vec<String> = v.iter().filter(|x| **x != key).cloned().collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(PropertyValue::List(kept))
                }
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<OptionId> for PropertyValue {
    fn from(id: OptionId) -> Self {
        PropertyValue::Text(id.to_string())
    }
}

impl From<Vec<OptionId>> for PropertyValue {
    fn from(ids: Vec<OptionId>) -> Self {
        PropertyValue::List(ids.into_iter().map(|id| id.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_parse_aliases() {
        assert_eq!(PropertyType::from_str("multiSelect"), Some(PropertyType::MultiSelect));
        assert_eq!(PropertyType::from_str("multi_select"), Some(PropertyType::MultiSelect));
        assert_eq!(PropertyType::from_str("SELECT"), Some(PropertyType::Select));
        assert_eq!(PropertyType::from_str("bogus"), None);
    }

    #[test]
    fn test_property_type_serde_matches_as_str() {
        for kind in [PropertyType::MultiSelect, PropertyType::CreatedBy, PropertyType::Url] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_template_type_field_is_named_type() {
        let t = PropertyTemplate::new("Status", PropertyType::Select);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "select");
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_value_untagged_serde() {
        let text: PropertyValue = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(text, PropertyValue::Text("hello".into()));
        let list: PropertyValue = serde_json::from_str("[\"a\",\"b\"]").unwrap();
        assert_eq!(list, PropertyValue::List(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_without_option() {
        let a = OptionId::new();
        let b = OptionId::new();
        assert_eq!(PropertyValue::from(a).without_option(a), None);
        let multi = PropertyValue::from(vec![a, b]);
        assert!(multi.contains_option(b));
        assert_eq!(multi.without_option(a), Some(PropertyValue::from(vec![b])));
        assert_eq!(PropertyValue::from(vec![a]).without_option(a), None);
    }
}

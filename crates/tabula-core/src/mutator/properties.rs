//! Card property edits: templates, options and values.
//!
//! Property templates live on the board; values live on cards; views refer
//! to properties for sorting, grouping, filtering and column layout. Edits
//! that touch more than one of these go out as a single `update_blocks`
//! call so they undo together.

use indexmap::IndexSet;
use tabula_types::{
    Block, OptionId, PropertyId, PropertyOption, PropertyTemplate, PropertyType, PropertyValue,
    ViewFields, ViewType,
};

use super::{
    Mutator, board_fields, board_fields_mut, card_fields, card_fields_mut, insert_at, move_item,
    view_fields, view_fields_mut,
};
use crate::error::{MutatorError, MutatorResult};

fn template(board: &Block, property_id: PropertyId) -> MutatorResult<&PropertyTemplate> {
    board_fields(board)?
        .property(property_id)
        .ok_or(MutatorError::PropertyNotFound(property_id))
}

fn template_mut(board: &mut Block, property_id: PropertyId) -> MutatorResult<&mut PropertyTemplate> {
    board_fields_mut(board)?
        .property_mut(property_id)
        .ok_or(MutatorError::PropertyNotFound(property_id))
}

fn option_index(template: &PropertyTemplate, option_id: OptionId) -> MutatorResult<usize> {
    template
        .option_index(option_id)
        .ok_or(MutatorError::OptionNotFound {
            property: template.id,
            option: option_id,
        })
}

fn view_references_property(view: &ViewFields, property_id: PropertyId) -> bool {
    view.visible_property_ids.contains(&property_id)
        || view.sort_options.iter().any(|s| s.property_id == property_id)
        || view.group_by == Some(property_id)
        || view.filter.references_property(property_id)
        || view.column_widths.contains_key(&property_id)
}

fn strip_property(view: &mut ViewFields, property_id: PropertyId) {
    view.visible_property_ids.retain(|id| *id != property_id);
    view.sort_options.retain(|s| s.property_id != property_id);
    if view.group_by == Some(property_id) {
        view.group_by = None;
        view.visible_option_ids.clear();
        view.hidden_option_ids.clear();
    }
    view.filter = view.filter.without_property(property_id);
    view.column_widths.shift_remove(&property_id);
}

/// Convert a stored value between property types.
///
/// Select-like values are option IDs; text-like values are display strings.
/// Labels come from `from.options` on the way out of a select type; `options`
/// holds the target type's options on the way in. Returns `None` when nothing
/// survives the conversion.
fn convert_value(
    value: &PropertyValue,
    from: &PropertyTemplate,
    to: PropertyType,
    options: &[PropertyOption],
) -> Option<PropertyValue> {
    let label = |id: &str| {
        from.options
            .iter()
            .find(|o| o.id.to_string() == id)
            .map(|o| o.value.clone())
    };
    let option_for = |text: &str| {
        options
            .iter()
            .find(|o| o.value == text)
            .map(|o| o.id.to_string())
    };

    let converted = match (from.kind.is_select_like(), to.is_select_like()) {
        (true, true) => match (value, to) {
            (PropertyValue::Text(id), PropertyType::MultiSelect) => PropertyValue::List(vec![id.clone()]),
            (PropertyValue::List(ids), PropertyType::Select) => PropertyValue::Text(ids.first()?.clone()),
            (v, _) => v.clone(),
        },
        (true, false) => {
            let labels: Vec<String> = value.values().into_iter().filter_map(label).collect();
            PropertyValue::Text(labels.join(", "))
        }
        (false, true) => {
            let ids: Vec<String> = value.values().into_iter().filter_map(option_for).collect();
            match to {
                PropertyType::MultiSelect => PropertyValue::List(ids),
                _ => PropertyValue::Text(ids.into_iter().next()?),
            }
        }
        (false, false) => value.clone(),
    };
    (!converted.is_empty()).then_some(converted)
}

impl Mutator {
    // ========================================================================
    // Templates
    // ========================================================================

    /// Add a property template to the board at `index` (end if `None`).
    ///
    /// When `active_view` is a table, the new property is also made visible
    /// there. Both writes are one store call and one undo step.
    pub async fn insert_property_template(
        &self,
        board: &Block,
        active_view: Option<&Block>,
        index: Option<usize>,
        template: PropertyTemplate,
    ) -> MutatorResult<PropertyId> {
        self.add_template(board, active_view, index, template, "add property")
            .await
    }

    /// Copy a property template (new IDs, prefixed name) right after the source.
    pub async fn duplicate_property_template(
        &self,
        board: &Block,
        active_view: Option<&Block>,
        property_id: PropertyId,
    ) -> MutatorResult<PropertyId> {
        let source = template(board, property_id)?;
        let index = board_fields(board)?
            .property_index(property_id)
            .map(|i| i + 1);
        let copy = PropertyTemplate::new(
            format!("{}{}", self.config.copy_name_prefix, source.name),
            source.kind,
        )
        .with_options(
            source
                .options
                .iter()
                .map(|o| PropertyOption::new(o.value.clone()).with_color(o.color.clone()))
                .collect(),
        );
        self.add_template(board, active_view, index, copy, "duplicate property")
            .await
    }

    async fn add_template(
        &self,
        board: &Block,
        active_view: Option<&Block>,
        index: Option<usize>,
        template: PropertyTemplate,
        description: &'static str,
    ) -> MutatorResult<PropertyId> {
        let property_id = template.id;
        let new_board = self.revise(board, |b| {
            insert_at(&mut board_fields_mut(b)?.card_properties, index, template)?;
            Ok(())
        })?;

        let mut new = vec![new_board];
        let mut old = vec![board.clone()];
        if let Some(view) = active_view {
            let fields = view_fields(view)?;
            if fields.view_type == ViewType::Table && !fields.visible_property_ids.contains(&property_id) {
                new.push(self.revise(view, |v| {
                    view_fields_mut(v)?.visible_property_ids.push(property_id);
                    Ok(())
                })?);
                old.push(view.clone());
            }
        }

        self.update_blocks(new, old, description).await?;
        Ok(property_id)
    }

    /// Move a property template to `dest_index` in the board schema.
    pub async fn change_property_template_order(
        &self,
        board: &Block,
        property_id: PropertyId,
        dest_index: usize,
    ) -> MutatorResult<()> {
        let from = board_fields(board)?
            .property_index(property_id)
            .ok_or(MutatorError::PropertyNotFound(property_id))?;
        let new = self.revise(board, |b| {
            move_item(&mut board_fields_mut(b)?.card_properties, from, dest_index)
        })?;
        self.update_block(new, board.clone(), "reorder property").await
    }

    /// Remove a property from the board, from every view that refers to it,
    /// and from every card that has a value for it.
    ///
    /// Blocks from other boards in `views` / `cards` are ignored.
    pub async fn delete_property_template(
        &self,
        board: &Block,
        views: &[Block],
        cards: &[Block],
        property_id: PropertyId,
    ) -> MutatorResult<()> {
        let index = board_fields(board)?
            .property_index(property_id)
            .ok_or(MutatorError::PropertyNotFound(property_id))?;

        let mut new = vec![self.revise(board, |b| {
            board_fields_mut(b)?.card_properties.remove(index);
            Ok(())
        })?];
        let mut old = vec![board.clone()];

        for view in views.iter().filter(|v| v.board_id == board.id) {
            if !view_references_property(view_fields(view)?, property_id) {
                continue;
            }
            new.push(self.revise(view, |v| {
                strip_property(view_fields_mut(v)?, property_id);
                Ok(())
            })?);
            old.push(view.clone());
        }

        for card in cards.iter().filter(|c| c.board_id == board.id) {
            if !card_fields(card)?.properties.contains_key(&property_id) {
                continue;
            }
            new.push(self.revise(card, |c| {
                card_fields_mut(c)?.properties.shift_remove(&property_id);
                Ok(())
            })?);
            old.push(card.clone());
        }

        self.update_blocks(new, old, "delete property").await
    }

    /// Rename a property and change its type, converting card values.
    ///
    /// Text to select creates one option per distinct value; select to text
    /// replaces option IDs with their labels; select to multi-select wraps
    /// the value in a list and the reverse keeps the first entry.
    pub async fn change_property_type_and_name(
        &self,
        board: &Block,
        cards: &[Block],
        property_id: PropertyId,
        kind: PropertyType,
        name: impl Into<String>,
    ) -> MutatorResult<()> {
        let source = template(board, property_id)?.clone();
        let name = name.into();

        if source.kind == kind {
            if source.name == name {
                return Ok(());
            }
            let new = self.revise(board, |b| {
                template_mut(b, property_id)?.name = name;
                Ok(())
            })?;
            return self.update_block(new, board.clone(), "rename property").await;
        }

        let cards: Vec<&Block> = cards
            .iter()
            .filter(|c| c.board_id == board.id)
            .filter(|c| c.as_card().is_some_and(|f| f.properties.contains_key(&property_id)))
            .collect();

        let options: Vec<PropertyOption> = match (source.kind.is_select_like(), kind.is_select_like()) {
            (true, true) => source.options.clone(),
            (true, false) => Vec::new(),
            (false, true) => {
                let distinct: IndexSet<&str> = cards
                    .iter()
                    .filter_map(|c| c.as_card()?.properties.get(&property_id))
                    .flat_map(|v| v.values())
                    .filter(|s| !s.is_empty())
                    .collect();
                distinct.into_iter().map(PropertyOption::new).collect()
            }
            (false, false) => Vec::new(),
        };

        let mut new = vec![self.revise(board, |b| {
            let t = template_mut(b, property_id)?;
            t.name = name;
            t.kind = kind;
            t.options = options.clone();
            Ok(())
        })?];
        let mut old = vec![board.clone()];

        for card in cards {
            let value = card_fields(card)?.properties.get(&property_id);
            let converted = value.and_then(|v| convert_value(v, &source, kind, &options));
            if converted.as_ref() == value {
                continue;
            }
            new.push(self.revise(card, |c| {
                let properties = &mut card_fields_mut(c)?.properties;
                match converted {
                    Some(v) => {
                        properties.insert(property_id, v);
                    }
                    None => {
                        properties.shift_remove(&property_id);
                    }
                }
                Ok(())
            })?);
            old.push(card.clone());
        }

        self.update_blocks(new, old, "change property type and name")
            .await
    }

    // ========================================================================
    // Options
    // ========================================================================

    /// Add an option to a select property at `index` (end if `None`).
    pub async fn insert_property_option(
        &self,
        board: &Block,
        property_id: PropertyId,
        option: PropertyOption,
        index: Option<usize>,
    ) -> MutatorResult<OptionId> {
        let t = template(board, property_id)?;
        if !t.kind.is_select_like() {
            return Err(MutatorError::unsupported(
                "insert_property_option",
                format!("{} properties have no options", t.kind),
            ));
        }
        let option_id = option.id;
        let new = self.revise(board, |b| {
            insert_at(&mut template_mut(b, property_id)?.options, index, option)?;
            Ok(())
        })?;
        self.update_block(new, board.clone(), "add option").await?;
        Ok(option_id)
    }

    /// Remove an option from a property, from card values that use it, and
    /// from the column lists of views grouped by the property.
    pub async fn delete_property_option(
        &self,
        board: &Block,
        views: &[Block],
        cards: &[Block],
        property_id: PropertyId,
        option_id: OptionId,
    ) -> MutatorResult<()> {
        let index = option_index(template(board, property_id)?, option_id)?;

        let mut new = vec![self.revise(board, |b| {
            template_mut(b, property_id)?.options.remove(index);
            Ok(())
        })?];
        let mut old = vec![board.clone()];

        for view in views.iter().filter(|v| v.board_id == board.id) {
            let fields = view_fields(view)?;
            let listed = fields.visible_option_ids.contains(&option_id)
                || fields.hidden_option_ids.contains(&option_id);
            if fields.group_by != Some(property_id) || !listed {
                continue;
            }
            new.push(self.revise(view, |v| {
                let fields = view_fields_mut(v)?;
                fields.visible_option_ids.retain(|id| *id != option_id);
                fields.hidden_option_ids.retain(|id| *id != option_id);
                Ok(())
            })?);
            old.push(view.clone());
        }

        for card in cards.iter().filter(|c| c.board_id == board.id) {
            let Some(value) = card_fields(card)?.properties.get(&property_id) else {
                continue;
            };
            if !value.contains_option(option_id) {
                continue;
            }
            let remaining = value.without_option(option_id);
            new.push(self.revise(card, |c| {
                let properties = &mut card_fields_mut(c)?.properties;
                match remaining {
                    Some(v) => {
                        properties.insert(property_id, v);
                    }
                    None => {
                        properties.shift_remove(&property_id);
                    }
                }
                Ok(())
            })?);
            old.push(card.clone());
        }

        self.update_blocks(new, old, "delete option").await
    }

    pub async fn change_property_option_order(
        &self,
        board: &Block,
        property_id: PropertyId,
        option_id: OptionId,
        dest_index: usize,
    ) -> MutatorResult<()> {
        let from = option_index(template(board, property_id)?, option_id)?;
        let new = self.revise(board, |b| {
            move_item(&mut template_mut(b, property_id)?.options, from, dest_index)
        })?;
        self.update_block(new, board.clone(), "reorder options").await
    }

    /// Rename an option.
    pub async fn change_property_option_value(
        &self,
        board: &Block,
        property_id: PropertyId,
        option_id: OptionId,
        value: impl Into<String>,
    ) -> MutatorResult<()> {
        let index = option_index(template(board, property_id)?, option_id)?;
        let value = value.into();
        let new = self.revise(board, |b| {
            template_mut(b, property_id)?.options[index].value = value;
            Ok(())
        })?;
        self.update_block(new, board.clone(), "rename option").await
    }

    pub async fn change_property_option_color(
        &self,
        board: &Block,
        property_id: PropertyId,
        option_id: OptionId,
        color: impl Into<String>,
    ) -> MutatorResult<()> {
        let index = option_index(template(board, property_id)?, option_id)?;
        let color = color.into();
        let new = self.revise(board, |b| {
            template_mut(b, property_id)?.options[index].color = color;
            Ok(())
        })?;
        self.update_block(new, board.clone(), "change option color").await
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Set a card's value for a property. `None` or an empty value clears it.
    pub async fn change_property_value(
        &self,
        card: &Block,
        property_id: PropertyId,
        value: Option<PropertyValue>,
    ) -> MutatorResult<()> {
        let value = value.filter(|v| !v.is_empty());
        if card_fields(card)?.properties.get(&property_id) == value.as_ref() {
            return Ok(());
        }
        let new = self.revise(card, |c| {
            let properties = &mut card_fields_mut(c)?.properties;
            match value {
                Some(v) => {
                    properties.insert(property_id, v);
                }
                None => {
                    properties.shift_remove(&property_id);
                }
            }
            Ok(())
        })?;
        self.update_block(new, card.clone(), "change property").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(options: &[&str]) -> PropertyTemplate {
        PropertyTemplate::new("Status", PropertyType::Select)
            .with_options(options.iter().map(|v| PropertyOption::new(*v)).collect())
    }

    #[test]
    fn test_select_to_text_uses_labels() {
        let status = select(&["Todo", "Done"]);
        let done = PropertyValue::from(status.options[1].id);
        let converted = convert_value(&done, &status, PropertyType::Text, &[]);
        assert_eq!(converted, Some(PropertyValue::Text("Done".into())));
    }

    #[test]
    fn test_text_to_select_maps_to_option_ids() {
        let text = PropertyTemplate::new("Owner", PropertyType::Text);
        let options = vec![PropertyOption::new("ana"), PropertyOption::new("bo")];
        let converted = convert_value(&"bo".into(), &text, PropertyType::Select, &options);
        assert_eq!(converted, Some(PropertyValue::from(options[1].id)));

        let multi = convert_value(&"ana".into(), &text, PropertyType::MultiSelect, &options);
        assert_eq!(multi, Some(PropertyValue::from(vec![options[0].id])));
    }

    #[test]
    fn test_select_multi_select_conversions() {
        let status = select(&["a", "b"]);
        let a = status.options[0].id;
        let b = status.options[1].id;

        let wrapped = convert_value(&a.into(), &status, PropertyType::MultiSelect, &status.options);
        assert_eq!(wrapped, Some(PropertyValue::from(vec![a])));

        let mut multi = status.clone();
        multi.kind = PropertyType::MultiSelect;
        let first = convert_value(&vec![b, a].into(), &multi, PropertyType::Select, &status.options);
        assert_eq!(first, Some(PropertyValue::from(b)));
    }

    #[test]
    fn test_empty_conversion_clears_value() {
        let status = select(&["a"]);
        let stale = PropertyValue::Text("no-such-option".into());
        assert_eq!(convert_value(&stale, &status, PropertyType::Text, &[]), None);
    }
}

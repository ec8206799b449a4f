//! View settings: sort, filter, grouping, visible properties, columns, card order.

use tabula_types::{Block, BlockId, FilterGroup, OptionId, PropertyId, SortOption, ViewFields};

use super::{Mutator, move_item, view_fields, view_fields_mut};
use crate::error::{MutatorError, MutatorResult};

impl Mutator {
    /// Copy `view`, apply `edit` to its settings, and record the update.
    async fn change_view(
        &self,
        view: &Block,
        description: &'static str,
        edit: impl FnOnce(&mut ViewFields) -> MutatorResult<()>,
    ) -> MutatorResult<()> {
        let new = self.revise(view, |b| edit(view_fields_mut(b)?))?;
        self.update_block(new, view.clone(), description).await
    }

    pub async fn change_view_sort_options(&self, view: &Block, sort_options: Vec<SortOption>) -> MutatorResult<()> {
        self.change_view(view, "sort", |v| {
            v.sort_options = sort_options;
            Ok(())
        })
        .await
    }

    pub async fn change_view_filter(&self, view: &Block, filter: FilterGroup) -> MutatorResult<()> {
        self.change_view(view, "filter", |v| {
            v.filter = filter;
            Ok(())
        })
        .await
    }

    /// Group a kanban view by a select property. Column lists reset when
    /// the property changes.
    pub async fn change_view_group_by(&self, view: &Block, group_by: Option<PropertyId>) -> MutatorResult<()> {
        self.change_view(view, "group by", |v| {
            if v.group_by != group_by {
                v.visible_option_ids.clear();
                v.hidden_option_ids.clear();
            }
            v.group_by = group_by;
            Ok(())
        })
        .await
    }

    pub async fn change_view_visible_properties(
        &self,
        view: &Block,
        visible_property_ids: Vec<PropertyId>,
    ) -> MutatorResult<()> {
        self.change_view(view, "show / hide property", |v| {
            v.visible_property_ids = visible_property_ids;
            Ok(())
        })
        .await
    }

    /// Move one visible property to `dest_index` in the view's column order.
    pub async fn change_view_visible_properties_order(
        &self,
        view: &Block,
        property_id: PropertyId,
        dest_index: usize,
    ) -> MutatorResult<()> {
        let from = view_fields(view)?
            .visible_property_ids
            .iter()
            .position(|id| *id == property_id)
            .ok_or(MutatorError::PropertyNotFound(property_id))?;
        self.change_view(view, "reorder properties", |v| {
            move_item(&mut v.visible_property_ids, from, dest_index)
        })
        .await
    }

    pub async fn change_view_visible_option_ids(
        &self,
        view: &Block,
        visible_option_ids: Vec<OptionId>,
    ) -> MutatorResult<()> {
        self.change_view(view, "reorder columns", |v| {
            v.visible_option_ids = visible_option_ids;
            Ok(())
        })
        .await
    }

    pub async fn change_view_hidden_option_ids(
        &self,
        view: &Block,
        hidden_option_ids: Vec<OptionId>,
    ) -> MutatorResult<()> {
        self.change_view(view, "reorder hidden columns", |v| {
            v.hidden_option_ids = hidden_option_ids;
            Ok(())
        })
        .await
    }

    /// Collapse a kanban column.
    pub async fn hide_view_column(&self, view: &Block, option_id: OptionId) -> MutatorResult<()> {
        if view_fields(view)?.hidden_option_ids.contains(&option_id) {
            return Ok(());
        }
        self.change_view(view, "hide column", |v| {
            v.visible_option_ids.retain(|id| *id != option_id);
            v.hidden_option_ids.push(option_id);
            Ok(())
        })
        .await
    }

    /// Expand a collapsed kanban column (appended to the visible columns).
    pub async fn show_view_column(&self, view: &Block, option_id: OptionId) -> MutatorResult<()> {
        if !view_fields(view)?.hidden_option_ids.contains(&option_id) {
            return Ok(());
        }
        self.change_view(view, "show column", |v| {
            v.hidden_option_ids.retain(|id| *id != option_id);
            if !v.visible_option_ids.contains(&option_id) {
                v.visible_option_ids.push(option_id);
            }
            Ok(())
        })
        .await
    }

    pub async fn change_view_card_order(&self, view: &Block, card_order: Vec<BlockId>) -> MutatorResult<()> {
        self.change_view(view, "reorder cards", |v| {
            v.card_order = card_order;
            Ok(())
        })
        .await
    }

    /// Set a table column width in pixels.
    pub async fn change_view_column_width(
        &self,
        view: &Block,
        property_id: PropertyId,
        width: u32,
    ) -> MutatorResult<()> {
        self.change_view(view, "resize column", |v| {
            v.column_widths.insert(property_id, width);
            Ok(())
        })
        .await
    }
}

//! Block-level convenience edits: titles, icons, descriptions, card content.

use std::collections::HashMap;

use tabula_client::{ClientError, FileUpload};
use tabula_types::{Block, BlockFields, BlockId};

use super::{
    Mutator, board_fields_mut, card_fields, card_fields_mut, insert_at, view_fields,
    view_fields_mut,
};
use crate::error::{MutatorError, MutatorResult};

impl Mutator {
    pub async fn change_title(&self, block: &Block, title: impl Into<String>) -> MutatorResult<()> {
        let title = title.into();
        let new = self.revise(block, |b| {
            b.title = title;
            Ok(())
        })?;
        self.update_block(new, block.clone(), "change title").await
    }

    /// Change the icon of a board or card.
    pub async fn change_icon(&self, block: &Block, icon: impl Into<String>) -> MutatorResult<()> {
        let icon = icon.into();
        let new = self.revise(block, |b| {
            let kind = b.kind();
            let slot = b
                .icon_mut()
                .ok_or_else(|| MutatorError::unsupported("change_icon", format!("{kind} blocks have no icon")))?;
            *slot = icon;
            Ok(())
        })?;
        self.update_block(new, block.clone(), "change icon").await
    }

    pub async fn change_description(
        &self,
        board: &Block,
        description: impl Into<String>,
    ) -> MutatorResult<()> {
        let description = description.into();
        let new = self.revise(board, |b| {
            board_fields_mut(b)?.description = description;
            Ok(())
        })?;
        self.update_block(new, board.clone(), "change description").await
    }

    pub async fn show_description(&self, board: &Block, show: bool) -> MutatorResult<()> {
        let new = self.revise(board, |b| {
            board_fields_mut(b)?.show_description = show;
            Ok(())
        })?;
        let description = if show { "show description" } else { "hide description" };
        self.update_block(new, board.clone(), description).await
    }

    pub async fn change_card_content_order(
        &self,
        card: &Block,
        content_order: Vec<BlockId>,
    ) -> MutatorResult<()> {
        let new = self.revise(card, |b| {
            card_fields_mut(b)?.content_order = content_order;
            Ok(())
        })?;
        self.update_block(new, card.clone(), "reorder content").await
    }

    // ========================================================================
    // Card content
    // ========================================================================

    /// Insert a content block into `card` at `index` (end if `None`) and
    /// record it in the card's content order, as one undo step.
    ///
    /// Returns the inserted block (re-parented onto `card`).
    pub async fn add_content_block(
        &self,
        card: &Block,
        content: Block,
        index: Option<usize>,
    ) -> MutatorResult<Block> {
        self.add_content(card, content, index, "add content").await
    }

    /// Remove a content block from `card` and delete it, as one undo step.
    pub async fn delete_content_block(&self, card: &Block, content: &Block) -> MutatorResult<()> {
        let new_card = self.revise(card, |b| {
            card_fields_mut(b)?.content_order.retain(|id| *id != content.id);
            Ok(())
        })?;
        let old_card = card.clone();
        let content = content.clone();
        self.perform_as_undo_group("delete content", move |m| async move {
            m.update_block(new_card, old_card, "reorder content").await?;
            m.delete_block(&content, "delete content", None, None).await
        })
        .await
    }

    /// Upload an image and add it to `card` as one undo step.
    ///
    /// The upload itself is not undoable; only the block insert is.
    pub async fn create_image_block(
        &self,
        card: &Block,
        upload: FileUpload,
        index: Option<usize>,
    ) -> MutatorResult<Block> {
        card_fields(card)?;
        let file_id = self.client.upload_file(upload).await?;
        let image = Block::image(card, file_id).by(self.user);
        self.add_content(card, image, index, "add image").await
    }

    async fn add_content(
        &self,
        card: &Block,
        mut content: Block,
        index: Option<usize>,
        description: &'static str,
    ) -> MutatorResult<Block> {
        if !content.kind().is_content() {
            return Err(MutatorError::unsupported(
                "add_content_block",
                format!("{} blocks are not card content", content.kind()),
            ));
        }
        content.parent_id = Some(card.id);
        content.board_id = card.board_id;

        let content_id = content.id;
        let new_card = self.revise(card, |b| {
            insert_at(&mut card_fields_mut(b)?.content_order, index, content_id)?;
            Ok(())
        })?;
        let old_card = card.clone();
        self.perform_as_undo_group(description, move |m| async move {
            let content = m.insert_block(content, description, None, None).await?;
            m.update_block(new_card, old_card, "reorder content").await?;
            Ok(content)
        })
        .await
    }

    // ========================================================================
    // Cards and templates
    // ========================================================================

    /// Copy a card and all its children with fresh IDs.
    ///
    /// Parent links and `content_order` of the copy point at the copied
    /// children. With `as_template` the copy is marked as a template;
    /// otherwise it is a regular card (creating a card from a template).
    pub async fn duplicate_card(&self, card_id: BlockId, as_template: bool) -> MutatorResult<Block> {
        let subtree = self.client.get_subtree(card_id).await?;
        let source = subtree
            .first()
            .ok_or(MutatorError::Store(ClientError::NotFound(card_id)))?;
        let from_template = card_fields(source)?.is_template;

        let ids: HashMap<BlockId, BlockId> = subtree.iter().map(|b| (b.id, BlockId::new())).collect();
        let remap = |id: BlockId| ids.get(&id).copied().unwrap_or(id);
        let now = tabula_types::now_millis();

        let copies: Vec<Block> = subtree
            .iter()
            .map(|b| {
                let mut copy = b.clone();
                copy.id = remap(b.id);
                copy.parent_id = b.parent_id.map(remap);
                copy.created_by = self.user;
                copy.modified_by = self.user;
                copy.created_at = now;
                copy.updated_at = now;
                if let BlockFields::Card(fields) = &mut copy.fields {
                    fields.content_order = fields.content_order.iter().copied().map(remap).collect();
                    if b.id == card_id {
                        fields.is_template = as_template;
                    }
                }
                copy
            })
            .collect();

        let description = if from_template && !as_template {
            "new card from template"
        } else {
            "duplicate card"
        };
        let mut inserted = self.insert_blocks(copies, description, None, None).await?;
        Ok(inserted.swap_remove(0))
    }

    /// Mark or unmark a card as a template.
    pub async fn set_card_template(&self, card: &Block, is_template: bool) -> MutatorResult<()> {
        let new = self.revise(card, |b| {
            card_fields_mut(b)?.is_template = is_template;
            Ok(())
        })?;
        self.update_block(new, card.clone(), "set template").await
    }

    /// Use `template_id` for new cards created from this view.
    pub async fn set_default_template(&self, view: &Block, template_id: BlockId) -> MutatorResult<()> {
        let new = self.revise(view, |b| {
            view_fields_mut(b)?.default_template_id = Some(template_id);
            Ok(())
        })?;
        self.update_block(new, view.clone(), "set default template").await
    }

    pub async fn clear_default_template(&self, view: &Block) -> MutatorResult<()> {
        if view_fields(view)?.default_template_id.is_none() {
            return Ok(());
        }
        let new = self.revise(view, |b| {
            view_fields_mut(b)?.default_template_id = None;
            Ok(())
        })?;
        self.update_block(new, view.clone(), "clear default template").await
    }
}

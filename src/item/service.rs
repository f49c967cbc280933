//! Item service for cloudshelf.
//!
//! This module is the caller-facing facade of the item store. Every
//! operation takes the authenticated caller's user ID; mutations run in a
//! single `BEGIN IMMEDIATE` transaction so size aggregates, lifecycle state
//! and grants commit together or not at all.

use tracing::{debug, info};
use validator::Validate;

use crate::blob::BlobReclaimer;
use crate::config::LimitsConfig;
use crate::db::{Database, UserRepository};
use crate::{Result, ShelfError};

use super::aggregate::{
    ancestor_chain, depth_of, propagate_size, subtree_height, SizeAggregator, SizeMismatch,
};
use super::lifecycle::{apply_transition, purge};
use super::query::{CountSummary, ItemQuery, ListingEngine};
use super::repository::{
    fetch_item, fetch_owned, insert_item, name_taken, require_active_folder, ItemInsert,
};
use super::sharing::{revoke_grants, toggle_grant, SharingEngine};
use super::types::{
    check_name_length, DeleteOutcome, Item, ItemEdit, ItemEntry, ItemInfo, LifecycleEvent,
    MediaType, NewFile, NewFolder, ShareOutcome,
};

/// Service for item operations with ownership checking.
pub struct ItemService<'a> {
    db: &'a Database,
    reclaimer: &'a BlobReclaimer,
    limits: LimitsConfig,
}

impl<'a> ItemService<'a> {
    /// Create a new ItemService with default limits.
    pub fn new(db: &'a Database, reclaimer: &'a BlobReclaimer) -> Self {
        Self::with_limits(db, reclaimer, LimitsConfig::default())
    }

    /// Create a new ItemService with the given limits.
    pub fn with_limits(
        db: &'a Database,
        reclaimer: &'a BlobReclaimer,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            db,
            reclaimer,
            limits,
        }
    }

    /// Check that the caller identity is present and known.
    async fn authorize(&self, user_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(ShelfError::Unauthorized("missing caller identity".to_string()));
        }
        if !UserRepository::new(self.db.pool()).exists(user_id).await? {
            return Err(ShelfError::Unauthorized("unknown user".to_string()));
        }
        Ok(())
    }

    fn check_name(&self, name: &str) -> Result<()> {
        check_name_length(name, self.limits.max_name_length)
    }

    /// Reject a new item whose depth would reach the nesting limit.
    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth >= self.limits.max_depth {
            return Err(ShelfError::Validation(format!(
                "parent_id: folders may be nested at most {} levels deep",
                self.limits.max_depth
            )));
        }
        Ok(())
    }

    /// Create a file.
    ///
    /// The file's size is added to every ancestor folder in the same
    /// transaction as the insert.
    pub async fn create_item(&self, owner_id: &str, new_file: &NewFile) -> Result<Item> {
        self.authorize(owner_id).await?;
        new_file.validate()?;
        self.check_name(&new_file.name)?;
        let size = i64::try_from(new_file.size)
            .map_err(|_| ShelfError::Validation("size: is too large".to_string()))?;

        let mut tx = self.db.begin_write().await?;

        let inherited_private = match new_file.parent_id.as_deref() {
            Some(parent_id) => {
                let parent = require_active_folder(&mut tx, owner_id, parent_id).await?;
                let depth = depth_of(&mut tx, &parent.id, self.limits.max_depth).await?;
                self.check_depth(depth + 1)?;
                parent.is_private
            }
            None => false,
        };

        let item = insert_item(
            &mut tx,
            &ItemInsert {
                owner_id,
                parent_id: new_file.parent_id.as_deref(),
                is_folder: false,
                name: &new_file.name,
                media: Some(new_file.media.as_str()),
                media_type: new_file.media_type,
                size,
                is_private: new_file.is_private.unwrap_or(inherited_private),
            },
        )
        .await?;

        propagate_size(&mut tx, item.parent_id.as_deref(), size, self.limits.max_depth).await?;
        tx.commit().await?;

        info!(
            "Created file {} ({} bytes) for {}",
            item.id, item.size, owner_id
        );
        Ok(item)
    }

    /// Create a folder.
    ///
    /// Folder names are unique among all of the owner's items, wherever
    /// they are and whatever their state.
    pub async fn create_folder(&self, owner_id: &str, new_folder: &NewFolder) -> Result<Item> {
        self.authorize(owner_id).await?;
        new_folder.validate()?;
        self.check_name(&new_folder.name)?;

        let mut tx = self.db.begin_write().await?;

        if name_taken(&mut tx, owner_id, &new_folder.name).await? {
            return Err(ShelfError::Conflict(format!(
                "an item named {:?} already exists",
                new_folder.name
            )));
        }

        let inherited_private = match new_folder.parent_id.as_deref() {
            Some(parent_id) => {
                let parent = require_active_folder(&mut tx, owner_id, parent_id).await?;
                let depth = depth_of(&mut tx, &parent.id, self.limits.max_depth).await?;
                self.check_depth(depth + 1)?;
                parent.is_private
            }
            None => false,
        };

        let folder = insert_item(
            &mut tx,
            &ItemInsert {
                owner_id,
                parent_id: new_folder.parent_id.as_deref(),
                is_folder: true,
                name: &new_folder.name,
                media: None,
                media_type: MediaType::Unknown,
                size: 0,
                is_private: new_folder.is_private.unwrap_or(inherited_private),
            },
        )
        .await?;
        tx.commit().await?;

        info!("Created folder {} for {}", folder.id, owner_id);
        Ok(folder)
    }

    /// Get an active owned item with the users it is shared with.
    pub async fn get_item_info(&self, owner_id: &str, item_id: &str) -> Result<ItemInfo> {
        self.authorize(owner_id).await?;
        ListingEngine::new(self.db.pool())
            .item_info(owner_id, item_id)
            .await
    }

    /// Get an item the caller owns or has been granted.
    pub async fn get_visible_item(&self, user_id: &str, item_id: &str) -> Result<Item> {
        self.authorize(user_id).await?;
        SharingEngine::new(self.db.pool())
            .visible_item(user_id, item_id)
            .await
    }

    /// List the active children of a folder, or of the caller's root.
    pub async fn list_children(
        &self,
        owner_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<ItemEntry>> {
        self.authorize(owner_id).await?;
        ListingEngine::new(self.db.pool())
            .list_children(owner_id, parent_id)
            .await
    }

    /// Run a filtered query. Exactly one filter flag must be set.
    pub async fn query_items(&self, owner_id: &str, query: ItemQuery) -> Result<Vec<ItemEntry>> {
        self.authorize(owner_id).await?;
        let filter = query.into_filter()?;
        ListingEngine::new(self.db.pool())
            .query(owner_id, filter)
            .await
    }

    /// List items shared with the caller.
    ///
    /// With a folder, lists the folder's private active children; the
    /// folder must be visible to the caller.
    pub async fn shared_items(
        &self,
        user_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<ItemEntry>> {
        self.authorize(user_id).await?;
        let engine = SharingEngine::new(self.db.pool());
        match folder_id {
            Some(folder_id) => engine.shared_in_folder(user_id, folder_id).await,
            None => engine.shared_with(user_id).await,
        }
    }

    pub async fn count_summary(&self, user_id: &str) -> Result<CountSummary> {
        self.authorize(user_id).await?;
        ListingEngine::new(self.db.pool())
            .count_summary(user_id)
            .await
    }

    /// Rename an item and optionally change its privacy.
    ///
    /// Making an item public removes its grants.
    pub async fn edit_item(&self, owner_id: &str, item_id: &str, edit: &ItemEdit) -> Result<Item> {
        self.authorize(owner_id).await?;
        edit.validate()?;
        self.check_name(&edit.name)?;

        let mut tx = self.db.begin_write().await?;

        let item = fetch_owned(&mut tx, owner_id, item_id)
            .await?
            .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;

        let is_private = edit.is_private.unwrap_or(item.is_private);
        if item.name == edit.name && item.is_private == is_private {
            debug!("Edit of {} changes nothing", item.id);
            return Ok(item);
        }

        sqlx::query(
            "UPDATE items SET name = ?, is_private = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(&edit.name)
        .bind(is_private)
        .bind(&item.id)
        .execute(&mut *tx)
        .await?;

        if item.is_private && !is_private {
            let revoked = revoke_grants(&mut tx, &item.id).await?;
            debug!("Revoked {} grant(s) on {}", revoked, item.id);
        }

        let updated = fetch_item(&mut tx, &item.id)
            .await?
            .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;
        tx.commit().await?;

        info!("Edited item {} for {}", updated.id, owner_id);
        Ok(updated)
    }

    /// Flip the starred flag of an owned item.
    pub async fn toggle_star(&self, owner_id: &str, item_id: &str) -> Result<Item> {
        self.authorize(owner_id).await?;

        let mut tx = self.db.begin_write().await?;

        let result = sqlx::query(
            "UPDATE items SET is_starred = NOT is_starred, updated_at = datetime('now')
             WHERE id = ? AND owner_id = ?",
        )
        .bind(item_id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ShelfError::NotFound("item".to_string()));
        }

        let item = fetch_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;
        tx.commit().await?;

        info!(
            "Item {} is now {}starred",
            item.id,
            if item.is_starred { "" } else { "un" }
        );
        Ok(item)
    }

    /// Grant a private item to another user, or revoke an existing grant.
    pub async fn toggle_share(
        &self,
        owner_id: &str,
        item_id: &str,
        target_id: &str,
    ) -> Result<ShareOutcome> {
        self.authorize(owner_id).await?;

        let mut tx = self.db.begin_write().await?;
        let outcome = toggle_grant(&mut tx, owner_id, item_id, target_id).await?;
        tx.commit().await?;

        info!("Share of {} with {}: {:?}", item_id, target_id, outcome);
        Ok(outcome)
    }

    /// Move an active item under another folder, or to the root.
    ///
    /// The item's size leaves the old ancestor chain and joins the new one.
    pub async fn move_item(
        &self,
        owner_id: &str,
        item_id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<Item> {
        self.authorize(owner_id).await?;

        let mut tx = self.db.begin_write().await?;

        let item = fetch_owned(&mut tx, owner_id, item_id)
            .await?
            .filter(|i| i.is_active())
            .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;

        if item.parent_id.as_deref() == new_parent_id {
            debug!("Item {} is already in place", item.id);
            return Ok(item);
        }

        let new_depth = match new_parent_id {
            Some(parent_id) => {
                let parent = require_active_folder(&mut tx, owner_id, parent_id).await?;
                let chain = ancestor_chain(&mut tx, &parent.id, self.limits.max_depth).await?;
                if chain.iter().any(|id| id == &item.id) {
                    return Err(ShelfError::Validation(
                        "parent_id: cannot move an item into itself or its descendants"
                            .to_string(),
                    ));
                }
                chain.len()
            }
            None => 0,
        };
        let height = subtree_height(&mut tx, &item.id).await?;
        self.check_depth(new_depth + height)?;

        let max_steps = self.limits.max_depth;
        propagate_size(&mut tx, item.parent_id.as_deref(), -item.size, max_steps).await?;

        sqlx::query("UPDATE items SET parent_id = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(new_parent_id)
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;

        propagate_size(&mut tx, new_parent_id, item.size, max_steps).await?;

        let moved = fetch_item(&mut tx, &item.id)
            .await?
            .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;
        tx.commit().await?;

        info!(
            "Moved item {} from {:?} to {:?}",
            moved.id, item.parent_id, moved.parent_id
        );
        Ok(moved)
    }

    /// Move an active item to the trash. Sizes are unchanged.
    pub async fn trash(&self, owner_id: &str, item_id: &str) -> Result<Item> {
        self.transition(owner_id, item_id, LifecycleEvent::Trash)
            .await
    }

    /// Restore a trashed item. Sizes are unchanged.
    pub async fn restore(&self, owner_id: &str, item_id: &str) -> Result<Item> {
        self.transition(owner_id, item_id, LifecycleEvent::Restore)
            .await
    }

    async fn transition(
        &self,
        owner_id: &str,
        item_id: &str,
        event: LifecycleEvent,
    ) -> Result<Item> {
        self.authorize(owner_id).await?;

        let mut tx = self.db.begin_write().await?;
        let item = apply_transition(&mut tx, owner_id, item_id, event).await?;
        tx.commit().await?;

        info!("Item {} is now {}", item.id, item.lifecycle);
        Ok(item)
    }

    /// Permanently delete a trashed item and its subtree.
    ///
    /// The removed files' blobs are queued for reclamation once the delete
    /// has committed.
    pub async fn permanent_delete(&self, owner_id: &str, item_id: &str) -> Result<DeleteOutcome> {
        self.authorize(owner_id).await?;

        let mut tx = self.db.begin_write().await?;
        let outcome = purge(&mut tx, owner_id, item_id, self.limits.max_depth).await?;
        tx.commit().await?;

        self.reclaimer.release(outcome.released.clone());
        Ok(outcome)
    }

    /// Report the caller's folders whose size disagrees with their children.
    pub async fn verify_sizes(&self, owner_id: &str) -> Result<Vec<SizeMismatch>> {
        self.authorize(owner_id).await?;
        SizeAggregator::new(self.db.pool()).verify(owner_id).await
    }
}

//! Visibility and sharing.
//!
//! An item is visible to its owner, and to any user holding a grant on it
//! while it is private and active. Grants only exist on private items.

use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use super::repository::{fetch_item, fetch_owned, ENTRY_ORDER, ENTRY_SELECT};
use super::types::{Item, ItemEntry, ShareOutcome};
use crate::db::DbPool;
use crate::{Result, ShelfError};

/// Check whether `user_id` holds a grant on the item.
pub(crate) async fn has_grant(
    conn: &mut SqliteConnection,
    item_id: &str,
    user_id: &str,
) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM shared_items WHERE item_id = ? AND user_id = ?")
            .bind(item_id)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(count > 0)
}

/// Check whether `item` is visible to `user_id`.
pub(crate) async fn is_visible(
    conn: &mut SqliteConnection,
    item: &Item,
    user_id: &str,
) -> Result<bool> {
    if item.is_owned_by(user_id) {
        return Ok(true);
    }
    if !item.is_private || !item.is_active() {
        return Ok(false);
    }
    has_grant(conn, &item.id, user_id).await
}

/// Create or remove the grant of `item_id` to `target_id`.
///
/// The caller must own the item, and the item must be private and active.
pub(crate) async fn toggle_grant(
    conn: &mut SqliteConnection,
    owner_id: &str,
    item_id: &str,
    target_id: &str,
) -> Result<ShareOutcome> {
    if target_id.trim().is_empty() {
        return Err(ShelfError::Validation("user_id: is required".to_string()));
    }
    if target_id == owner_id {
        return Err(ShelfError::SelfShare);
    }

    let target_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(target_id)
        .fetch_one(&mut *conn)
        .await?;
    if target_exists == 0 {
        return Err(ShelfError::NotFound("user".to_string()));
    }

    let item = fetch_owned(conn, owner_id, item_id)
        .await?
        .filter(|i| i.is_private && i.is_active())
        .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;

    let removed = sqlx::query("DELETE FROM shared_items WHERE item_id = ? AND user_id = ?")
        .bind(&item.id)
        .bind(target_id)
        .execute(&mut *conn)
        .await?;

    if removed.rows_affected() > 0 {
        debug!("Revoked grant on {} for {}", item.id, target_id);
        return Ok(ShareOutcome::Unshared);
    }

    sqlx::query("INSERT INTO shared_items (id, owner_id, user_id, item_id) VALUES (?, ?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(owner_id)
        .bind(target_id)
        .bind(&item.id)
        .execute(&mut *conn)
        .await?;

    debug!("Granted {} to {}", item.id, target_id);
    Ok(ShareOutcome::Shared)
}

/// Remove every grant on an item. Returns the number removed.
pub(crate) async fn revoke_grants(conn: &mut SqliteConnection, item_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM shared_items WHERE item_id = ?")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Read-side sharing queries.
pub struct SharingEngine<'a> {
    pool: &'a DbPool,
}

impl<'a> SharingEngine<'a> {
    /// Create a new SharingEngine with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get an item if it is visible to the user.
    pub async fn visible_item(&self, user_id: &str, item_id: &str) -> Result<Item> {
        let mut conn = self.pool.acquire().await?;

        let item = fetch_item(&mut conn, item_id)
            .await?
            .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;

        if !is_visible(&mut conn, &item, user_id).await? {
            return Err(ShelfError::NotFound("item".to_string()));
        }
        Ok(item)
    }

    /// Private active items, across all owners, granted to the user.
    pub async fn shared_with(&self, user_id: &str) -> Result<Vec<ItemEntry>> {
        let entries = sqlx::query_as::<_, ItemEntry>(&format!(
            "{ENTRY_SELECT}
             WHERE i.is_private = 1 AND i.state = 'active'
               AND EXISTS (SELECT 1 FROM shared_items s WHERE s.item_id = i.id AND s.user_id = ?)
             {ENTRY_ORDER}"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Private active children of a folder the user can see.
    pub async fn shared_in_folder(&self, user_id: &str, folder_id: &str) -> Result<Vec<ItemEntry>> {
        let mut conn = self.pool.acquire().await?;

        let folder = fetch_item(&mut conn, folder_id)
            .await?
            .filter(|f| f.is_folder && f.is_active())
            .ok_or_else(|| ShelfError::NotFound("folder".to_string()))?;

        if !is_visible(&mut conn, &folder, user_id).await? {
            return Err(ShelfError::NotFound("folder".to_string()));
        }

        let entries = sqlx::query_as::<_, ItemEntry>(&format!(
            "{ENTRY_SELECT}
             WHERE i.parent_id = ? AND i.is_private = 1 AND i.state = 'active'
             {ENTRY_ORDER}"
        ))
        .bind(&folder.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }
}

//! Item lifecycle: Active -> Trashed -> Deleted.
//!
//! Trash and restore flip the `state` column of a single item with a
//! conditional update, so only one of two racing transitions can win.
//! Purging removes the item and its whole subtree and releases the size it
//! contributed to its ancestors.

use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::aggregate::propagate_size;
use super::repository::fetch_owned;
use super::types::{DeleteOutcome, Item, Lifecycle, LifecycleEvent};
use crate::{Result, ShelfError};

/// A member of a subtree scheduled for deletion.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SubtreeMember {
    id: String,
    is_folder: bool,
    media: Option<String>,
}

/// Fetch an owned item and check that `event` may be applied to it.
///
/// Missing, foreign and wrong-state items are all reported as `NotFound`.
async fn checked_target(
    conn: &mut SqliteConnection,
    owner_id: &str,
    item_id: &str,
    event: LifecycleEvent,
) -> Result<(Item, Lifecycle)> {
    let item = fetch_owned(conn, owner_id, item_id)
        .await?
        .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;

    let next = item
        .lifecycle
        .next(event)
        .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;

    Ok((item, next))
}

/// Apply a trash or restore transition.
pub(crate) async fn apply_transition(
    conn: &mut SqliteConnection,
    owner_id: &str,
    item_id: &str,
    event: LifecycleEvent,
) -> Result<Item> {
    if event == LifecycleEvent::Purge {
        return Err(ShelfError::Validation(
            "purge must go through permanent delete".to_string(),
        ));
    }

    let (mut item, next) = checked_target(conn, owner_id, item_id, event).await?;

    let result = sqlx::query(
        "UPDATE items SET state = ?, updated_at = datetime('now')
         WHERE id = ? AND owner_id = ? AND state = ?",
    )
    .bind(next.as_str())
    .bind(&item.id)
    .bind(owner_id)
    .bind(event.required_state().as_str())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ShelfError::NotFound("item".to_string()));
    }

    debug!("Item {} moved from {} to {}", item.id, item.lifecycle, next);
    item.lifecycle = next;
    Ok(item)
}

/// Permanently delete a trashed item and everything beneath it.
///
/// The item's size is subtracted from each ancestor in the same
/// transaction. The returned locators belong to the deleted files; the
/// caller releases them after commit.
pub(crate) async fn purge(
    conn: &mut SqliteConnection,
    owner_id: &str,
    item_id: &str,
    max_depth: usize,
) -> Result<DeleteOutcome> {
    let (item, _) = checked_target(conn, owner_id, item_id, LifecycleEvent::Purge).await?;

    let members = sqlx::query_as::<_, SubtreeMember>(
        "WITH RECURSIVE subtree(id) AS (
             SELECT id FROM items WHERE id = ?
             UNION
             SELECT c.id FROM items c JOIN subtree s ON c.parent_id = s.id
         )
         SELECT i.id, i.is_folder, i.media FROM items i JOIN subtree s ON s.id = i.id",
    )
    .bind(&item.id)
    .fetch_all(&mut *conn)
    .await?;

    // Descendants and grants go with the root through ON DELETE CASCADE.
    let result = sqlx::query("DELETE FROM items WHERE id = ? AND owner_id = ? AND state = ?")
        .bind(&item.id)
        .bind(owner_id)
        .bind(LifecycleEvent::Purge.required_state().as_str())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ShelfError::NotFound("item".to_string()));
    }

    propagate_size(conn, item.parent_id.as_deref(), -item.size, max_depth).await?;

    let mut outcome = DeleteOutcome::default();
    for member in members {
        if !member.is_folder {
            if let Some(locator) = member.media {
                outcome.released.push(locator);
            }
        }
        outcome.deleted_ids.push(member.id);
    }

    info!(
        "Purged item {} ({} record(s), {} blob(s))",
        item.id,
        outcome.deleted_ids.len(),
        outcome.released.len()
    );
    Ok(outcome)
}

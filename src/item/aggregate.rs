//! Folder size aggregation.
//!
//! A folder's `size` is the sum of its direct children's sizes. Structural
//! changes apply a signed delta to every ancestor with `size = size + ?`,
//! so each step re-reads the persisted value inside the caller's
//! transaction and concurrent writers never lose each other's updates.

use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::db::DbPool;
use crate::{Result, ShelfError};

/// A folder whose recorded size disagrees with its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SizeMismatch {
    pub folder_id: String,
    pub name: String,
    pub recorded: i64,
    pub expected: i64,
}

/// Add `delta` to `start` and every folder above it.
///
/// Returns the number of folders updated. `max_steps` bounds the walk so a
/// corrupted (cyclic) parent chain fails instead of looping.
pub(crate) async fn propagate_size(
    conn: &mut SqliteConnection,
    start: Option<&str>,
    delta: i64,
    max_steps: usize,
) -> Result<usize> {
    if delta == 0 {
        return Ok(0);
    }

    let mut current = start.map(str::to_string);
    let mut updated = 0;

    while let Some(folder_id) = current {
        if updated >= max_steps {
            return Err(ShelfError::Database(format!(
                "ancestor chain of {folder_id} exceeds {max_steps} levels"
            )));
        }

        // SQLite turns an overflowing integer sum into a REAL.
        let ceiling = if delta > 0 { i64::MAX - delta } else { i64::MAX };
        let parent: Option<Option<String>> = sqlx::query_scalar(
            "UPDATE items SET size = size + ?, updated_at = datetime('now')
             WHERE id = ? AND size <= ? RETURNING parent_id",
        )
        .bind(delta)
        .bind(&folder_id)
        .bind(ceiling)
        .fetch_optional(&mut *conn)
        .await?;

        match parent {
            Some(next) => {
                updated += 1;
                current = next;
            }
            None => {
                let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE id = ?")
                    .bind(&folder_id)
                    .fetch_one(&mut *conn)
                    .await?;
                if exists > 0 {
                    return Err(ShelfError::Validation(
                        "size: folder total too large".to_string(),
                    ));
                }
                return Err(ShelfError::NotFound("folder".to_string()));
            }
        }
    }

    debug!("Applied size delta {} to {} folder(s)", delta, updated);
    Ok(updated)
}

/// Collect the ancestor IDs of `start`, nearest first, including `start`.
pub(crate) async fn ancestor_chain(
    conn: &mut SqliteConnection,
    start: &str,
    max_steps: usize,
) -> Result<Vec<String>> {
    let mut chain = Vec::new();
    let mut current = Some(start.to_string());

    while let Some(id) = current {
        if chain.len() > max_steps {
            return Err(ShelfError::Database(format!(
                "ancestor chain of {start} exceeds {max_steps} levels"
            )));
        }

        let parent: Option<Option<String>> =
            sqlx::query_scalar("SELECT parent_id FROM items WHERE id = ?")
                .bind(&id)
                .fetch_optional(&mut *conn)
                .await?;

        chain.push(id);
        current = parent.flatten();
    }

    Ok(chain)
}

/// Depth of an item: 0 for root items, 1 for their children, and so on.
pub(crate) async fn depth_of(
    conn: &mut SqliteConnection,
    id: &str,
    max_steps: usize,
) -> Result<usize> {
    Ok(ancestor_chain(conn, id, max_steps).await?.len() - 1)
}

/// Height of the subtree under `id`: 0 for a leaf.
pub(crate) async fn subtree_height(conn: &mut SqliteConnection, id: &str) -> Result<usize> {
    let height: i64 = sqlx::query_scalar(
        "WITH RECURSIVE subtree(id, level) AS (
             SELECT id, 0 FROM items WHERE id = ?
             UNION ALL
             SELECT c.id, s.level + 1 FROM items c JOIN subtree s ON c.parent_id = s.id
         )
         SELECT COALESCE(MAX(level), 0) FROM subtree",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(height as usize)
}

/// Read-side audit of folder sizes.
pub struct SizeAggregator<'a> {
    pool: &'a DbPool,
}

impl<'a> SizeAggregator<'a> {
    /// Create a new SizeAggregator with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// List the owner's folders whose recorded size differs from the sum of
    /// their direct children.
    pub async fn verify(&self, owner_id: &str) -> Result<Vec<SizeMismatch>> {
        let mismatches = sqlx::query_as::<_, SizeMismatch>(
            "SELECT folder_id, name, recorded, expected FROM (
                 SELECT f.id AS folder_id, f.name AS name, f.size AS recorded,
                        COALESCE((SELECT SUM(c.size) FROM items c WHERE c.parent_id = f.id), 0)
                            AS expected
                 FROM items f
                 WHERE f.owner_id = ? AND f.is_folder = 1
             )
             WHERE recorded != expected
             ORDER BY folder_id",
        )
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        Ok(mismatches)
    }
}

//! Item repository for cloudshelf.
//!
//! Pool-backed reads live on [`ItemRepository`]. The connection-level
//! helpers take a `&mut SqliteConnection` so they can run inside the
//! transaction of a larger mutation.

use sqlx::SqliteConnection;
use uuid::Uuid;

use super::types::{generate_preview_token, Item, MediaType, ShareGrant};
use crate::db::DbPool;
use crate::{Result, ShelfError};

/// Item columns, qualified with the `i` alias.
pub(crate) const ITEM_COLUMNS: &str = "i.id, i.owner_id, i.parent_id, i.is_folder, i.name, i.media, \
     i.media_type, i.size, i.preview_url, i.is_private, i.is_starred, i.state, i.created_at, \
     i.updated_at";

/// Listing projection: item columns plus the owner's profile and the
/// number of direct children. Rows decode into `ItemEntry`.
pub(crate) const ENTRY_SELECT: &str = "SELECT i.id, i.owner_id, i.parent_id, i.is_folder, \
     i.name, i.media, i.media_type, i.size, i.preview_url, i.is_private, i.is_starred, i.state, \
     i.created_at, i.updated_at, \
     u.email AS owner_email, u.name AS owner_name, u.image AS owner_image, \
     (SELECT COUNT(*) FROM items c WHERE c.parent_id = i.id) AS child_count \
     FROM items i JOIN users u ON u.id = i.owner_id";

/// Listing order: folders first, then name (case-insensitive), then ID.
pub(crate) const ENTRY_ORDER: &str = "ORDER BY i.is_folder DESC, i.name COLLATE NOCASE, i.id";

/// Row data for inserting an item. Sizes and privacy are already resolved.
#[derive(Debug, Clone)]
pub(crate) struct ItemInsert<'a> {
    pub owner_id: &'a str,
    pub parent_id: Option<&'a str>,
    pub is_folder: bool,
    pub name: &'a str,
    pub media: Option<&'a str>,
    pub media_type: MediaType,
    pub size: i64,
    pub is_private: bool,
}

/// Repository for item records.
pub struct ItemRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new ItemRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// List the grants of an item with the grantees' public profiles.
    pub async fn list_grants(&self, item_id: &str) -> Result<Vec<ShareGrant>> {
        let grants = sqlx::query_as::<_, ShareGrant>(
            "SELECT s.id, s.user_id, u.email, u.name, u.image, s.created_at
             FROM shared_items s JOIN users u ON u.id = s.user_id
             WHERE s.item_id = ? ORDER BY s.created_at, s.id",
        )
        .bind(item_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(grants)
    }
}

/// Fetch an item by ID on the given connection.
pub(crate) async fn fetch_item(conn: &mut SqliteConnection, id: &str) -> Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items i WHERE i.id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

/// Fetch an item owned by `owner_id`.
///
/// Items owned by someone else are reported as missing.
pub(crate) async fn fetch_owned(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items i WHERE i.id = ? AND i.owner_id = ?"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

/// Fetch an active folder owned by `owner_id`, or fail with `NotFound`.
pub(crate) async fn require_active_folder(
    conn: &mut SqliteConnection,
    owner_id: &str,
    folder_id: &str,
) -> Result<Item> {
    fetch_owned(conn, owner_id, folder_id)
        .await?
        .filter(|f| f.is_folder && f.is_active())
        .ok_or_else(|| ShelfError::NotFound("folder".to_string()))
}

/// Check whether the owner already has an item with this name.
pub(crate) async fn name_taken(
    conn: &mut SqliteConnection,
    owner_id: &str,
    name: &str,
) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE owner_id = ? AND name = ?")
            .bind(owner_id)
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

    Ok(count > 0)
}

/// Insert an item and return the stored row.
pub(crate) async fn insert_item(conn: &mut SqliteConnection, row: &ItemInsert<'_>) -> Result<Item> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO items (id, owner_id, parent_id, is_folder, name, media, media_type, size,
                            preview_url, is_private)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(row.owner_id)
    .bind(row.parent_id)
    .bind(row.is_folder)
    .bind(row.name)
    .bind(row.media)
    .bind(row.media_type.as_str())
    .bind(row.size)
    .bind(generate_preview_token())
    .bind(row.is_private)
    .execute(&mut *conn)
    .await?;

    fetch_item(conn, &id)
        .await?
        .ok_or_else(|| ShelfError::NotFound("item".to_string()))
}

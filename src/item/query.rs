//! Listings, filtered queries and counts.

use serde::Serialize;
use tracing::debug;

use super::repository::{
    fetch_owned, require_active_folder, ItemRepository, ENTRY_ORDER, ENTRY_SELECT,
};
use super::types::{ItemEntry, ItemInfo, MediaType};
use crate::db::DbPool;
use crate::{Result, ShelfError};

/// A single query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFilter {
    /// Active files of the given media type.
    ByType(MediaType),
    /// Active starred items.
    Starred,
    /// Private active items other users granted to the caller.
    SharedWithMe,
    /// The caller's active private items.
    Private,
    /// The caller's trashed items.
    Trashed,
}

/// Raw query flags as supplied by a caller.
///
/// Exactly one flag must be set; see [`ItemQuery::into_filter`].
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub media_type: Option<MediaType>,
    pub starred: bool,
    pub shared_with_me: bool,
    pub private: bool,
    pub trashed: bool,
}

impl ItemQuery {
    /// Resolve the flags into a single filter.
    pub fn into_filter(self) -> Result<ItemFilter> {
        let mut filters = Vec::with_capacity(1);
        if let Some(media_type) = self.media_type {
            filters.push(ItemFilter::ByType(media_type));
        }
        if self.starred {
            filters.push(ItemFilter::Starred);
        }
        if self.shared_with_me {
            filters.push(ItemFilter::SharedWithMe);
        }
        if self.private {
            filters.push(ItemFilter::Private);
        }
        if self.trashed {
            filters.push(ItemFilter::Trashed);
        }

        match filters.as_slice() {
            [filter] => Ok(*filter),
            [] => Err(ShelfError::Validation(
                "query: a filter is required".to_string(),
            )),
            _ => Err(ShelfError::Validation(
                "query: only one filter may be given".to_string(),
            )),
        }
    }
}

impl From<ItemFilter> for ItemQuery {
    fn from(filter: ItemFilter) -> Self {
        let mut query = ItemQuery::default();
        match filter {
            ItemFilter::ByType(media_type) => query.media_type = Some(media_type),
            ItemFilter::Starred => query.starred = true,
            ItemFilter::SharedWithMe => query.shared_with_me = true,
            ItemFilter::Private => query.private = true,
            ItemFilter::Trashed => query.trashed = true,
        }
        query
    }
}

/// Per-user counts.
///
/// Folder, file and private counts include trashed items; the shared
/// counts are numbers of grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountSummary {
    pub folders: i64,
    pub files: i64,
    pub private: i64,
    pub shared_by_user: i64,
    pub shared_with_user: i64,
}

/// A labelled count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub name: &'static str,
    pub count: i64,
}

impl CountSummary {
    /// The counts as labelled entries, in display order.
    pub fn entries(&self) -> Vec<CountEntry> {
        [
            ("Folder", self.folders),
            ("File", self.files),
            ("Private", self.private),
            ("Shared by You", self.shared_by_user),
            ("Shared with You", self.shared_with_user),
        ]
        .into_iter()
        .map(|(name, count)| CountEntry { name, count })
        .collect()
    }
}

/// Read-side listing engine.
pub struct ListingEngine<'a> {
    pool: &'a DbPool,
}

impl<'a> ListingEngine<'a> {
    /// Create a new ListingEngine with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Active children of an owned folder, or of the owner's root.
    pub async fn list_children(
        &self,
        owner_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<ItemEntry>> {
        let mut conn = self.pool.acquire().await?;

        let entries = match parent_id {
            Some(parent_id) => {
                let folder = require_active_folder(&mut conn, owner_id, parent_id).await?;
                sqlx::query_as::<_, ItemEntry>(&format!(
                    "{ENTRY_SELECT} WHERE i.parent_id = ? AND i.state = 'active' {ENTRY_ORDER}"
                ))
                .bind(&folder.id)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, ItemEntry>(&format!(
                    "{ENTRY_SELECT}
                     WHERE i.owner_id = ? AND i.parent_id IS NULL AND i.state = 'active'
                     {ENTRY_ORDER}"
                ))
                .bind(owner_id)
                .fetch_all(&mut *conn)
                .await?
            }
        };

        debug!("Listed {} child item(s) for {}", entries.len(), owner_id);
        Ok(entries)
    }

    /// Items matching a single filter.
    pub async fn query(&self, owner_id: &str, filter: ItemFilter) -> Result<Vec<ItemEntry>> {
        let condition = match filter {
            ItemFilter::ByType(_) => {
                "i.owner_id = ? AND i.is_folder = 0 AND i.media_type = ? AND i.state = 'active'"
            }
            ItemFilter::Starred => "i.owner_id = ? AND i.is_starred = 1 AND i.state = 'active'",
            ItemFilter::SharedWithMe => {
                "i.is_private = 1 AND i.state = 'active'
                 AND EXISTS (SELECT 1 FROM shared_items s WHERE s.item_id = i.id AND s.user_id = ?)"
            }
            ItemFilter::Private => "i.owner_id = ? AND i.is_private = 1 AND i.state = 'active'",
            ItemFilter::Trashed => "i.owner_id = ? AND i.state = 'trashed'",
        };

        let sql = format!("{ENTRY_SELECT} WHERE {condition} {ENTRY_ORDER}");
        let mut query = sqlx::query_as::<_, ItemEntry>(&sql).bind(owner_id);
        if let ItemFilter::ByType(media_type) = filter {
            query = query.bind(media_type.as_str());
        }

        let entries = query.fetch_all(self.pool).await?;
        debug!(
            "Query {:?} returned {} item(s) for {}",
            filter,
            entries.len(),
            owner_id
        );
        Ok(entries)
    }

    /// An active owned item with its grants.
    pub async fn item_info(&self, owner_id: &str, item_id: &str) -> Result<ItemInfo> {
        let mut conn = self.pool.acquire().await?;

        let item = fetch_owned(&mut conn, owner_id, item_id)
            .await?
            .filter(|i| i.is_active())
            .ok_or_else(|| ShelfError::NotFound("item".to_string()))?;

        drop(conn);

        let shared_with = ItemRepository::new(self.pool).list_grants(&item.id).await?;

        Ok(ItemInfo { item, shared_with })
    }

    /// Counts for the user, read in one transaction.
    pub async fn count_summary(&self, user_id: &str) -> Result<CountSummary> {
        let mut tx = self.pool.begin().await?;

        let (folders, files, private): (i64, i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(is_folder = 1), 0),
                    COALESCE(SUM(is_folder = 0), 0),
                    COALESCE(SUM(is_private = 1), 0)
             FROM items WHERE owner_id = ?",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let shared_by_user: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shared_items WHERE owner_id = ?")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        let shared_with_user: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shared_items WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(CountSummary {
            folders,
            files,
            private,
            shared_by_user,
            shared_with_user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::item::repository::{insert_item, ItemInsert};
    use crate::item::sharing::toggle_grant;
    use crate::item::Item;
    use crate::Database;
    use sqlx::SqliteConnection;

    async fn setup() -> (Database, String, String) {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        let owner = repo
            .create(&NewUser::new("owner@example.com", "Owner"))
            .await
            .unwrap();
        let friend = repo
            .create(&NewUser::new("friend@example.com", "Friend"))
            .await
            .unwrap();
        (db, owner.id, friend.id)
    }

    async fn file(
        conn: &mut SqliteConnection,
        owner: &str,
        parent: Option<&str>,
        name: &str,
        media_type: MediaType,
        is_private: bool,
    ) -> Item {
        insert_item(
            conn,
            &ItemInsert {
                owner_id: owner,
                parent_id: parent,
                is_folder: false,
                name,
                media: Some("blob"),
                media_type,
                size: 1,
                is_private,
            },
        )
        .await
        .unwrap()
    }

    async fn folder(conn: &mut SqliteConnection, owner: &str, name: &str) -> Item {
        insert_item(
            conn,
            &ItemInsert {
                owner_id: owner,
                parent_id: None,
                is_folder: true,
                name,
                media: None,
                media_type: MediaType::Unknown,
                size: 0,
                is_private: false,
            },
        )
        .await
        .unwrap()
    }

    async fn set_state(conn: &mut SqliteConnection, id: &str, state: &str) {
        sqlx::query("UPDATE items SET state = ? WHERE id = ?")
            .bind(state)
            .bind(id)
            .execute(&mut *conn)
            .await
            .unwrap();
    }

    #[test]
    fn test_into_filter_requires_exactly_one() {
        assert!(matches!(
            ItemQuery::default().into_filter(),
            Err(ShelfError::Validation(_))
        ));

        let both = ItemQuery {
            starred: true,
            trashed: true,
            ..Default::default()
        };
        assert!(matches!(both.into_filter(), Err(ShelfError::Validation(_))));

        let by_type = ItemQuery {
            media_type: Some(MediaType::Video),
            ..Default::default()
        };
        assert_eq!(
            by_type.into_filter().unwrap(),
            ItemFilter::ByType(MediaType::Video)
        );
        assert_eq!(
            ItemQuery::from(ItemFilter::Private).into_filter().unwrap(),
            ItemFilter::Private
        );
    }

    #[test]
    fn test_count_entries_labels() {
        let summary = CountSummary {
            folders: 2,
            files: 5,
            private: 1,
            shared_by_user: 3,
            shared_with_user: 4,
        };
        let names: Vec<_> = summary.entries().iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec!["Folder", "File", "Private", "Shared by You", "Shared with You"]
        );
        assert_eq!(summary.entries()[1].count, 5);
    }

    #[tokio::test]
    async fn test_list_children_order_and_state() {
        let (db, owner, _) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        file(&mut conn, &owner, None, "beta.pdf", MediaType::Pdf, false).await;
        file(&mut conn, &owner, None, "Alpha.pdf", MediaType::Pdf, false).await;
        let zeta = folder(&mut conn, &owner, "zeta").await;
        let gone = file(&mut conn, &owner, None, "gone.pdf", MediaType::Pdf, false).await;
        set_state(&mut conn, &gone.id, "trashed").await;
        file(&mut conn, &owner, Some(&zeta.id), "inner.pdf", MediaType::Pdf, false).await;
        drop(conn);

        let engine = ListingEngine::new(db.pool());
        let root = engine.list_children(&owner, None).await.unwrap();
        let names: Vec<_> = root.iter().map(|e| e.item.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "Alpha.pdf", "beta.pdf"]);
        assert_eq!(root[0].child_count, 1);
        assert_eq!(root[0].owner.email, "owner@example.com");

        let inner = engine.list_children(&owner, Some(&zeta.id)).await.unwrap();
        assert_eq!(inner.len(), 1);
    }

    #[tokio::test]
    async fn test_list_children_of_foreign_folder_is_not_found() {
        let (db, owner, friend) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let docs = folder(&mut conn, &owner, "Docs").await;
        drop(conn);

        let engine = ListingEngine::new(db.pool());
        let result = engine.list_children(&friend, Some(&docs.id)).await;
        assert!(matches!(result, Err(ShelfError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_query_filters() {
        let (db, owner, friend) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let movie = file(&mut conn, &owner, None, "movie.mp4", MediaType::Video, true).await;
        file(&mut conn, &owner, None, "doc.pdf", MediaType::Pdf, false).await;
        let old = file(&mut conn, &owner, None, "old.mp4", MediaType::Video, false).await;
        set_state(&mut conn, &old.id, "trashed").await;
        sqlx::query("UPDATE items SET is_starred = 1 WHERE id = ?")
            .bind(&movie.id)
            .execute(&mut *conn)
            .await
            .unwrap();
        toggle_grant(&mut conn, &owner, &movie.id, &friend)
            .await
            .unwrap();
        drop(conn);

        let engine = ListingEngine::new(db.pool());
        let ids = |entries: Vec<ItemEntry>| -> Vec<String> {
            entries.into_iter().map(|e| e.item.id).collect()
        };

        let videos = engine
            .query(&owner, ItemFilter::ByType(MediaType::Video))
            .await
            .unwrap();
        assert_eq!(ids(videos), vec![movie.id.clone()]);

        let starred = engine.query(&owner, ItemFilter::Starred).await.unwrap();
        assert_eq!(ids(starred), vec![movie.id.clone()]);

        let private = engine.query(&owner, ItemFilter::Private).await.unwrap();
        assert_eq!(ids(private), vec![movie.id.clone()]);

        let trashed = engine.query(&owner, ItemFilter::Trashed).await.unwrap();
        assert_eq!(ids(trashed), vec![old.id.clone()]);

        let shared = engine
            .query(&friend, ItemFilter::SharedWithMe)
            .await
            .unwrap();
        assert_eq!(ids(shared), vec![movie.id.clone()]);
        assert!(engine
            .query(&owner, ItemFilter::SharedWithMe)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_item_info_includes_grants() {
        let (db, owner, friend) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let item = file(&mut conn, &owner, None, "plan.pdf", MediaType::Pdf, true).await;
        toggle_grant(&mut conn, &owner, &item.id, &friend)
            .await
            .unwrap();
        let trashed = file(&mut conn, &owner, None, "bin.pdf", MediaType::Pdf, false).await;
        set_state(&mut conn, &trashed.id, "trashed").await;
        drop(conn);

        let engine = ListingEngine::new(db.pool());
        let info = engine.item_info(&owner, &item.id).await.unwrap();
        assert_eq!(info.shared_with.len(), 1);
        assert_eq!(info.shared_with[0].user_id, friend);
        assert_eq!(info.shared_with[0].user.name, "Friend");

        assert!(matches!(
            engine.item_info(&friend, &item.id).await,
            Err(ShelfError::NotFound(_))
        ));
        assert!(matches!(
            engine.item_info(&owner, &trashed.id).await,
            Err(ShelfError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_count_summary() {
        let (db, owner, friend) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        folder(&mut conn, &owner, "Docs").await;
        let secret = file(&mut conn, &owner, None, "a.pdf", MediaType::Pdf, true).await;
        let old = file(&mut conn, &owner, None, "b.pdf", MediaType::Pdf, false).await;
        set_state(&mut conn, &old.id, "trashed").await;
        toggle_grant(&mut conn, &owner, &secret.id, &friend)
            .await
            .unwrap();
        drop(conn);

        let engine = ListingEngine::new(db.pool());
        let owner_counts = engine.count_summary(&owner).await.unwrap();
        assert_eq!(
            owner_counts,
            CountSummary {
                folders: 1,
                files: 2,
                private: 1,
                shared_by_user: 1,
                shared_with_user: 0,
            }
        );

        let friend_counts = engine.count_summary(&friend).await.unwrap();
        assert_eq!(friend_counts.shared_with_user, 1);
        assert_eq!(friend_counts.files, 0);
    }
}

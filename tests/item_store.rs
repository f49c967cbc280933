//! End-to-end tests of the item store through its public API.

mod common;

use cloudshelf::blob::BlobStore;
use cloudshelf::{
    BlobReclaimer, Config, Database, ItemEdit, ItemFilter, ItemQuery, ItemService,
    LocalBlobStore, MediaType, NewFile, NewFolder, ShareOutcome, ShelfError,
};
use tempfile::TempDir;

use common::{pdf, TestStore};

async fn size_of(service: &ItemService<'_>, owner: &str, id: &str) -> i64 {
    service.get_item_info(owner, id).await.unwrap().item.size
}

#[tokio::test]
async fn test_folder_sizes_through_lifecycle() {
    let store = TestStore::open().await;
    let owner = store.user("owner@example.com", "Owner").await;
    let service = ItemService::new(&store.db, &store.reclaimer);

    let a = service
        .create_folder(&owner, &NewFolder::new("A"))
        .await
        .unwrap();
    let b = service
        .create_item(&owner, &pdf("b.txt", 50).with_parent(&a.id))
        .await
        .unwrap();
    let c = service
        .create_folder(&owner, &NewFolder::new("C").with_parent(&a.id))
        .await
        .unwrap();
    service
        .create_item(&owner, &pdf("d.txt", 100).with_parent(&c.id))
        .await
        .unwrap();

    assert_eq!(size_of(&service, &owner, &a.id).await, 150);

    service.trash(&owner, &b.id).await.unwrap();
    assert_eq!(size_of(&service, &owner, &a.id).await, 150);

    service.restore(&owner, &b.id).await.unwrap();
    service.trash(&owner, &b.id).await.unwrap();
    let outcome = service.permanent_delete(&owner, &b.id).await.unwrap();
    assert_eq!(outcome.released, vec!["blob-b.txt".to_string()]);
    assert_eq!(size_of(&service, &owner, &a.id).await, 100);

    let children = service.list_children(&owner, Some(&a.id)).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].item.id, c.id);
    assert_eq!(children[0].child_count, 1);
}

#[tokio::test]
async fn test_cascade_delete_releases_exact_locators() {
    let store = TestStore::open().await;
    let owner = store.user("owner@example.com", "Owner").await;
    let service = ItemService::new(&store.db, &store.reclaimer);

    let top = service
        .create_folder(&owner, &NewFolder::new("Top"))
        .await
        .unwrap();
    let mid = service
        .create_folder(&owner, &NewFolder::new("Mid").with_parent(&top.id))
        .await
        .unwrap();
    let mut locators = Vec::new();
    for (parent, name) in [(&top.id, "one.pdf"), (&mid.id, "two.pdf"), (&mid.id, "three.pdf")] {
        let item = service
            .create_item(&owner, &pdf(name, 1).with_parent(parent))
            .await
            .unwrap();
        store.blobs.insert(item.media.clone().unwrap(), "content");
        locators.push(item.media.unwrap());
    }

    service.trash(&owner, &top.id).await.unwrap();
    let outcome = service.permanent_delete(&owner, &top.id).await.unwrap();

    // The folder, its subfolder and three files.
    assert_eq!(outcome.deleted_ids.len(), 5);
    let mut released = outcome.released.clone();
    released.sort();
    locators.sort();
    assert_eq!(released, locators);

    assert!(service.list_children(&owner, None).await.unwrap().is_empty());
    let counts = service.count_summary(&owner).await.unwrap();
    assert_eq!(counts.folders, 0);
    assert_eq!(counts.files, 0);
}

#[tokio::test]
async fn test_sharing_round_trip() {
    let store = TestStore::open().await;
    let owner = store.user("owner@example.com", "Owner").await;
    let friend = store.user("friend@example.com", "Friend").await;
    let service = ItemService::new(&store.db, &store.reclaimer);

    let item = service
        .create_item(&owner, &pdf("plan.pdf", 3).with_private(true))
        .await
        .unwrap();

    let shared_with_me = ItemQuery {
        shared_with_me: true,
        ..Default::default()
    };

    assert_eq!(
        service.toggle_share(&owner, &item.id, &friend).await.unwrap(),
        ShareOutcome::Shared
    );
    let visible = service
        .query_items(&friend, shared_with_me.clone())
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].owner.email, "owner@example.com");

    let counts = service.count_summary(&owner).await.unwrap();
    assert_eq!(counts.shared_by_user, 1);
    let entries = counts.entries();
    assert_eq!(entries[3].name, "Shared by You");
    assert_eq!(entries[3].count, 1);

    // Trashing hides the item from the grantee without removing the grant.
    service.trash(&owner, &item.id).await.unwrap();
    assert!(service
        .query_items(&friend, shared_with_me.clone())
        .await
        .unwrap()
        .is_empty());
    service.restore(&owner, &item.id).await.unwrap();
    assert_eq!(
        service
            .query_items(&friend, shared_with_me.clone())
            .await
            .unwrap()
            .len(),
        1
    );

    assert_eq!(
        service.toggle_share(&owner, &item.id, &friend).await.unwrap(),
        ShareOutcome::Unshared
    );
    assert!(service
        .query_items(&friend, shared_with_me)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_query_requires_exactly_one_filter() {
    let store = TestStore::open().await;
    let owner = store.user("owner@example.com", "Owner").await;
    let service = ItemService::new(&store.db, &store.reclaimer);

    let result = service.query_items(&owner, ItemQuery::default()).await;
    assert!(matches!(result, Err(ShelfError::Validation(_))));

    let two = ItemQuery {
        media_type: Some(MediaType::Image),
        private: true,
        ..Default::default()
    };
    let result = service.query_items(&owner, two).await;
    assert!(matches!(result, Err(ShelfError::Validation(_))));

    service
        .create_item(
            &owner,
            &NewFile::new("cat.png", "blob-cat", MediaType::Image, 9),
        )
        .await
        .unwrap();
    let images = service
        .query_items(&owner, ItemFilter::ByType(MediaType::Image).into())
        .await
        .unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].item.media_type, MediaType::Image);
}

#[tokio::test]
async fn test_edit_and_error_codes() {
    let store = TestStore::open().await;
    let owner = store.user("owner@example.com", "Owner").await;
    let service = ItemService::new(&store.db, &store.reclaimer);

    let item = service
        .create_item(&owner, &pdf("draft.pdf", 1))
        .await
        .unwrap();
    let renamed = service
        .edit_item(&owner, &item.id, &ItemEdit::rename("final.pdf"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "final.pdf");
    assert_eq!(renamed.preview_url, item.preview_url);

    let err = service
        .edit_item("", &item.id, &ItemEdit::rename("x"))
        .await
        .unwrap_err();
    assert_eq!(err.code().status_code(), 401);

    let err = service
        .get_item_info(&owner, "missing")
        .await
        .unwrap_err();
    assert_eq!(err.code().status_code(), 404);

    let err = service
        .create_folder(&owner, &NewFolder::new("final.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShelfError::Conflict(_)));
    assert_eq!(err.code().status_code(), 409);
}

#[tokio::test]
async fn test_local_blob_store_reclamation() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.database.path = dir.path().join("shelf.db").to_string_lossy().into_owned();
    config.blob.root = dir.path().join("blobs").to_string_lossy().into_owned();

    let db = Database::open(&config.database.path, config.database.max_connections)
        .await
        .unwrap();
    let owner = cloudshelf::UserRepository::new(db.pool())
        .create(&cloudshelf::NewUser::new("owner@example.com", "Owner"))
        .await
        .unwrap()
        .id;

    let blobs = LocalBlobStore::new(&config.blob.root).unwrap();
    let path = blobs.path_for("ab12.pdf").unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"%PDF").unwrap();

    let reclaimer = BlobReclaimer::spawn(blobs.clone());
    let service = ItemService::with_limits(&db, &reclaimer, config.limits);
    let item = service
        .create_item(&owner, &NewFile::new("a.pdf", "ab12.pdf", MediaType::Pdf, 4))
        .await
        .unwrap();
    service.trash(&owner, &item.id).await.unwrap();
    service.permanent_delete(&owner, &item.id).await.unwrap();

    let stats = reclaimer.shutdown().await;
    assert_eq!(stats.deleted, 1);
    assert!(!path.exists());
    assert!(!blobs.delete("ab12.pdf").await.unwrap());
}

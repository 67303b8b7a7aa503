use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use lumen::accounting::{AccountingError, StorageAccounting};
use lumen::object_store::{Listing, LocalStore, ObjectStore, ObjectStoreError};
use lumen::storage::models::{Blacklist, Domain, FileRecord, ShortUrl, User, UserSettings};
use lumen::storage::{Database, DomainRemoval};

struct Fixture {
    _dir: tempfile::TempDir,
    db: Database,
    store: Arc<LocalStore>,
    accounting: StorageAccounting,
}

fn fixture() -> Fixture {
    fixture_with_page_size(1000)
}

fn fixture_with_page_size(page_size: usize) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let store =
        Arc::new(LocalStore::with_page_size(dir.path().join("files"), page_size).unwrap());
    let accounting = StorageAccounting::new(db.clone(), Arc::clone(&store) as Arc<dyn ObjectStore>);
    Fixture {
        _dir: dir,
        db,
        store,
        accounting,
    }
}

fn sample_user(id: &str) -> User {
    User {
        id: id.to_string(),
        username: format!("name-{id}"),
        key: format!("key-{id}"),
        invite: "inv-0".to_string(),
        invites: 0,
        invited_by: None,
        admin: false,
        strikes: 0,
        blacklisted: Blacklist::default(),
        uploads: 0,
        registered_at: Utc::now(),
        settings: UserSettings::with_domain("example.com"),
    }
}

fn sample_file(filename: &str, uploader: &str, domain: &str) -> FileRecord {
    FileRecord {
        filename: filename.to_string(),
        original_name: None,
        mime_type: "image/png".to_string(),
        domain: domain.to_string(),
        deletion_key: format!("del-{filename}"),
        uploader_id: uploader.to_string(),
        created_at: Utc::now(),
    }
}

/// Write the object and commit its bookkeeping, like an upload handler does.
async fn upload(f: &Fixture, file: &FileRecord) {
    let key = f.accounting.object_key(file).unwrap();
    f.store.put(&key, Bytes::from_static(b"data")).await.unwrap();
    f.accounting.record_upload(file).unwrap();
}

// ============================================================================
// Upload / delete accounting
// ============================================================================

#[tokio::test]
async fn upload_then_delete_settles_counter() {
    let f = fixture();
    f.db.put_user(&sample_user("u1")).unwrap();

    let file = sample_file("aaa.png", "u1", "example.com");
    upload(&f, &file).await;
    assert_eq!(f.db.get_user("u1").unwrap().unwrap().uploads, 1);
    assert!(f.store.exists("u1/aaa.png").await.unwrap());

    f.accounting.delete_file(&file).await.unwrap();
    assert_eq!(f.db.get_user("u1").unwrap().unwrap().uploads, 0);
    assert!(!f.store.exists("u1/aaa.png").await.unwrap());
    assert!(f.db.get_file("aaa.png").unwrap().is_none());
}

#[tokio::test]
async fn double_delete_is_not_found_and_counter_unchanged() {
    let f = fixture();
    f.db.put_user(&sample_user("u1")).unwrap();

    let file = sample_file("aaa.png", "u1", "example.com");
    upload(&f, &file).await;
    f.accounting.delete_file(&file).await.unwrap();

    let err = f.accounting.delete_file(&file).await.unwrap_err();
    assert!(matches!(err, AccountingError::NotFound));
    assert_eq!(f.db.get_user("u1").unwrap().unwrap().uploads, 0);
}

#[tokio::test]
async fn delete_tolerates_missing_object() {
    let f = fixture();
    f.db.put_user(&sample_user("u1")).unwrap();

    // Record exists but the object was never written (or already lost)
    let file = sample_file("aaa.png", "u1", "example.com");
    f.accounting.record_upload(&file).unwrap();

    f.accounting.delete_file(&file).await.unwrap();
    assert!(f.db.get_file("aaa.png").unwrap().is_none());
    assert_eq!(f.db.get_user("u1").unwrap().unwrap().uploads, 0);
}

#[tokio::test]
async fn invisible_url_cascades_with_its_file() {
    let f = fixture();
    let user = sample_user("u1");
    f.db.put_user(&user).unwrap();

    let file = sample_file("aaa.png", "u1", "example.com");
    upload(&f, &file).await;

    let url = f
        .accounting
        .link_invisible_url(&user, &file, "https://example.com/aaa.png")
        .unwrap();
    assert_eq!(url.filename.as_deref(), Some("aaa.png"));
    assert!(f.db.get_short_url(&url.short_id).unwrap().is_some());

    // Deleting the file takes its invisible link with it
    f.accounting.delete_file(&file).await.unwrap();
    assert!(f.db.get_short_url(&url.short_id).unwrap().is_none());
}

#[tokio::test]
async fn rollback_removes_orphaned_object() {
    let f = fixture();
    f.db.put_user(&sample_user("u1")).unwrap();

    let file = sample_file("aaa.png", "u1", "example.com");
    let key = f.accounting.object_key(&file).unwrap();
    f.store.put(&key, Bytes::from_static(b"data")).await.unwrap();

    f.accounting.rollback_upload(&file).await;
    assert!(!f.store.exists("u1/aaa.png").await.unwrap());
}

// ============================================================================
// Prefix attribution
// ============================================================================

#[tokio::test]
async fn user_only_domain_uses_domain_prefix() {
    let f = fixture();
    f.db.put_user(&sample_user("u1")).unwrap();
    f.db.put_domain(&Domain {
        name: "donated.example".to_string(),
        wildcard: false,
        user_only: true,
        donated_by: Some("u1".to_string()),
        added_at: Utc::now(),
    })
    .unwrap();

    let file = sample_file("aaa.png", "u1", "donated.example");
    assert_eq!(
        f.accounting.object_key(&file).unwrap(),
        "donated.example/aaa.png"
    );

    // A shared domain falls back to the uploader's id prefix
    let file = sample_file("bbb.png", "u1", "example.com");
    assert_eq!(f.accounting.object_key(&file).unwrap(), "u1/bbb.png");
}

#[tokio::test]
async fn donated_domain_removal_refused_until_drained() {
    let f = fixture();
    f.db.put_user(&sample_user("u1")).unwrap();
    f.db.put_domain(&Domain {
        name: "donated.example".to_string(),
        wildcard: false,
        user_only: true,
        donated_by: Some("u1".to_string()),
        added_at: Utc::now(),
    })
    .unwrap();

    let file = sample_file("aaa.png", "u1", "donated.example");
    upload(&f, &file).await;

    // Dropping the domain now would re-point the record to u1/ and strand
    // the object under donated.example/
    assert_eq!(
        f.db.remove_domain("donated.example").unwrap(),
        DomainRemoval::InUse
    );
    assert!(f.store.exists("donated.example/aaa.png").await.unwrap());
    assert!(f.db.get_file("aaa.png").unwrap().is_some());

    f.accounting.wipe("u1").await.unwrap();
    assert_eq!(
        f.db.remove_domain("donated.example").unwrap(),
        DomainRemoval::Removed
    );
}

// ============================================================================
// Wipe
// ============================================================================

#[tokio::test]
async fn wipe_clears_objects_records_and_counter() {
    let f = fixture();
    f.db.put_user(&sample_user("u1")).unwrap();

    for name in ["a.png", "b.png", "c.png"] {
        upload(&f, &sample_file(name, "u1", "example.com")).await;
    }
    f.db.create_short_url(&ShortUrl {
        short_id: "s1".to_string(),
        destination: "https://example.org".to_string(),
        filename: None,
        deletion_key: "udel-s1".to_string(),
        user_id: "u1".to_string(),
        created_at: Utc::now(),
    })
    .unwrap();

    let count = f.accounting.wipe("u1").await.unwrap();
    assert_eq!(count, 3);

    assert!(f.store.list("u1/", None).await.unwrap().keys.is_empty());
    assert!(f.db.get_files_by_uploader("u1").unwrap().is_empty());
    assert!(f.db.get_urls_by_user("u1").unwrap().is_empty());
    assert_eq!(f.db.get_user("u1").unwrap().unwrap().uploads, 0);
}

#[tokio::test]
async fn wipe_is_idempotent() {
    let f = fixture();
    f.db.put_user(&sample_user("u1")).unwrap();
    upload(&f, &sample_file("a.png", "u1", "example.com")).await;

    assert_eq!(f.accounting.wipe("u1").await.unwrap(), 1);
    assert_eq!(f.accounting.wipe("u1").await.unwrap(), 0);
}

#[tokio::test]
async fn wipe_unknown_user_is_not_found() {
    let f = fixture();
    let err = f.accounting.wipe("ghost").await.unwrap_err();
    assert!(matches!(err, AccountingError::NotFound));
}

#[tokio::test]
async fn wipe_paginates_across_listing_pages() {
    // Page size 2 against 5 objects forces three listing rounds
    let f = fixture_with_page_size(2);
    f.db.put_user(&sample_user("u1")).unwrap();

    for name in ["a.png", "b.png", "c.png", "d.png", "e.png"] {
        upload(&f, &sample_file(name, "u1", "example.com")).await;
    }

    let count = f.accounting.wipe("u1").await.unwrap();
    assert_eq!(count, 5);
    assert!(f.store.list("u1/", None).await.unwrap().keys.is_empty());
}

#[tokio::test]
async fn wipe_covers_donated_domain_prefixes() {
    let f = fixture();
    f.db.put_user(&sample_user("u1")).unwrap();
    f.db.put_domain(&Domain {
        name: "donated.example".to_string(),
        wildcard: false,
        user_only: true,
        donated_by: Some("u1".to_string()),
        added_at: Utc::now(),
    })
    .unwrap();

    upload(&f, &sample_file("a.png", "u1", "example.com")).await;
    upload(&f, &sample_file("b.png", "u1", "donated.example")).await;
    upload(&f, &sample_file("c.png", "u1", "donated.example")).await;

    let count = f.accounting.wipe("u1").await.unwrap();
    assert_eq!(count, 3);

    assert!(f.store.list("u1/", None).await.unwrap().keys.is_empty());
    assert!(f
        .store
        .list("donated.example/", None)
        .await
        .unwrap()
        .keys
        .is_empty());
    assert_eq!(f.db.get_user("u1").unwrap().unwrap().uploads, 0);
}

// ============================================================================
// Backend failure ordering
// ============================================================================

/// Wraps a real store and fails every batched delete after the first.
struct FailingDeletes {
    inner: LocalStore,
    calls: AtomicU32,
}

#[async_trait]
impl ObjectStore for FailingDeletes {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError> {
        self.inner.put(key, data).await
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.inner.delete(key).await
    }

    async fn list(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<Listing, ObjectStoreError> {
        self.inner.list(prefix, continuation).await
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<u64, ObjectStoreError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(ObjectStoreError::Backend("simulated outage".to_string()));
        }
        self.inner.delete_objects(keys).await
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        self.inner.exists(key).await
    }
}

#[tokio::test]
async fn wipe_backend_failure_leaves_bookkeeping_intact() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let store = Arc::new(FailingDeletes {
        inner: LocalStore::with_page_size(dir.path().join("files"), 2).unwrap(),
        calls: AtomicU32::new(0),
    });
    let accounting = StorageAccounting::new(db.clone(), Arc::clone(&store) as Arc<dyn ObjectStore>);

    db.put_user(&sample_user("u1")).unwrap();
    for name in ["a.png", "b.png", "c.png", "d.png"] {
        let file = sample_file(name, "u1", "example.com");
        let key = accounting.object_key(&file).unwrap();
        store
            .inner
            .put(&key, Bytes::from_static(b"data"))
            .await
            .unwrap();
        accounting.record_upload(&file).unwrap();
    }

    // Second delete batch fails, aborting the wipe before the commit
    let err = accounting.wipe("u1").await.unwrap_err();
    assert!(matches!(err, AccountingError::Backend(_)));

    // All bookkeeping survives, so a retry starts from intact records
    assert_eq!(db.get_user("u1").unwrap().unwrap().uploads, 4);
    assert_eq!(db.get_files_by_uploader("u1").unwrap().len(), 4);
}

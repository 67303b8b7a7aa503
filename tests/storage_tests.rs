use chrono::Utc;
use lumen::storage::models::{
    AutoWipe, Blacklist, Domain, FileRecord, Invite, ShortUrl, User, UserSettings,
};
use lumen::storage::{Database, DomainRemoval};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
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

fn sample_file(filename: &str, uploader: &str) -> FileRecord {
    FileRecord {
        filename: filename.to_string(),
        original_name: Some("photo.png".to_string()),
        mime_type: "image/png".to_string(),
        domain: "example.com".to_string(),
        deletion_key: format!("del-{filename}"),
        uploader_id: uploader.to_string(),
        created_at: Utc::now(),
    }
}

fn sample_url(short_id: &str, user: &str, filename: Option<&str>) -> ShortUrl {
    ShortUrl {
        short_id: short_id.to_string(),
        destination: "https://example.org/page".to_string(),
        filename: filename.map(|f| f.to_string()),
        deletion_key: format!("udel-{short_id}"),
        user_id: user.to_string(),
        created_at: Utc::now(),
    }
}

// ============================================================================
// Users
// ============================================================================

#[test]
fn test_put_and_get_user() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();

    let user = db.get_user("u1").unwrap().expect("user should exist");
    assert_eq!(user.username, "name-u1");
    assert_eq!(user.uploads, 0);
    assert!(!user.admin);
}

#[test]
fn test_get_user_by_key() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();

    let user = db.get_user_by_key("key-u1").unwrap().expect("key lookup");
    assert_eq!(user.id, "u1");

    assert!(db.get_user_by_key("wrong-key").unwrap().is_none());
}

#[test]
fn test_username_exists() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();

    assert!(db.username_exists("name-u1").unwrap());
    assert!(!db.username_exists("someone-else").unwrap());
}

#[test]
fn test_upload_counter_floors_at_zero() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();
    db.create_file(&sample_file("aaa.png", "u1")).unwrap();
    assert_eq!(db.get_user("u1").unwrap().unwrap().uploads, 1);

    // Clobber the counter to zero, as a double-delete race would
    let mut user = db.get_user("u1").unwrap().unwrap();
    user.uploads = 0;
    db.put_user(&user).unwrap();

    // Removal skips the decrement instead of going negative
    let removed = db.remove_file("aaa.png").unwrap().unwrap();
    assert!(!removed.decremented);
    assert_eq!(db.get_user("u1").unwrap().unwrap().uploads, 0);
}

#[test]
fn test_set_blacklist_and_strikes() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();

    assert_eq!(db.add_strike("u1").unwrap(), 1);
    assert_eq!(db.add_strike("u1").unwrap(), 2);

    let updated = db
        .set_blacklist(
            "u1",
            Blacklist {
                status: true,
                reason: Some("spam".to_string()),
            },
        )
        .unwrap();
    assert!(updated);

    let user = db.get_user("u1").unwrap().unwrap();
    assert!(user.blacklisted.status);
    assert_eq!(user.strikes, 2);

    assert!(!db.set_blacklist("ghost", Blacklist::default()).unwrap());
}

#[test]
fn test_set_auto_wipe() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();

    db.set_auto_wipe(
        "u1",
        AutoWipe {
            enabled: true,
            interval_secs: 3600,
        },
    )
    .unwrap();

    let user = db.get_user("u1").unwrap().unwrap();
    assert!(user.settings.auto_wipe.enabled);
    assert_eq!(user.settings.auto_wipe.interval_secs, 3600);
}

#[test]
fn test_random_domain_pool() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();

    db.push_random_domain("u1", "a.com").unwrap();
    db.push_random_domain("u1", "b.com").unwrap();
    db.push_random_domain("u1", "a.com").unwrap(); // duplicate ignored

    let user = db.get_user("u1").unwrap().unwrap();
    assert_eq!(user.settings.random_domain.domains, vec!["a.com", "b.com"]);

    db.pull_random_domain("u1", "a.com").unwrap();
    let user = db.get_user("u1").unwrap().unwrap();
    assert_eq!(user.settings.random_domain.domains, vec!["b.com"]);
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_create_file_increments_counter() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();

    db.create_file(&sample_file("aaa.png", "u1")).unwrap();
    db.create_file(&sample_file("bbb.png", "u1")).unwrap();

    assert_eq!(db.get_user("u1").unwrap().unwrap().uploads, 2);
    assert!(db.get_file("aaa.png").unwrap().is_some());
}

#[test]
fn test_get_file_by_deletion_key() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();
    db.create_file(&sample_file("aaa.png", "u1")).unwrap();

    let file = db
        .get_file_by_deletion_key("del-aaa.png")
        .unwrap()
        .expect("deletion key lookup");
    assert_eq!(file.filename, "aaa.png");

    assert!(db.get_file_by_deletion_key("nope").unwrap().is_none());
}

#[test]
fn test_get_files_by_uploader() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();
    db.put_user(&sample_user("u2")).unwrap();
    db.create_file(&sample_file("aaa.png", "u1")).unwrap();
    db.create_file(&sample_file("bbb.png", "u1")).unwrap();
    db.create_file(&sample_file("ccc.png", "u2")).unwrap();

    let files = db.get_files_by_uploader("u1").unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.uploader_id == "u1"));

    assert!(db.get_files_by_uploader("nobody").unwrap().is_empty());
}

#[test]
fn test_remove_file_decrements_and_cleans_indexes() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();
    db.create_file(&sample_file("aaa.png", "u1")).unwrap();

    let removed = db.remove_file("aaa.png").unwrap().expect("file existed");
    assert!(removed.decremented);
    assert_eq!(removed.urls_removed, 0);

    assert!(db.get_file("aaa.png").unwrap().is_none());
    assert!(db.get_file_by_deletion_key("del-aaa.png").unwrap().is_none());
    assert!(db.get_files_by_uploader("u1").unwrap().is_empty());
    assert_eq!(db.get_user("u1").unwrap().unwrap().uploads, 0);
}

#[test]
fn test_remove_file_missing_returns_none() {
    let (_dir, db) = test_db();
    assert!(db.remove_file("ghost.png").unwrap().is_none());
}

#[test]
fn test_remove_file_cascades_linked_urls() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();
    db.create_file(&sample_file("aaa.png", "u1")).unwrap();

    // One invisible URL pointing at the file, one ordinary short URL
    db.create_short_url(&sample_url("s1", "u1", Some("aaa.png")))
        .unwrap();
    db.create_short_url(&sample_url("s2", "u1", None)).unwrap();

    let removed = db.remove_file("aaa.png").unwrap().unwrap();
    assert_eq!(removed.urls_removed, 1);

    assert!(db.get_short_url("s1").unwrap().is_none());
    assert!(db.get_short_url("s2").unwrap().is_some());
    assert!(db.get_short_url_by_deletion_key("udel-s1").unwrap().is_none());
}

#[test]
fn test_wipe_user_records() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();
    db.create_file(&sample_file("aaa.png", "u1")).unwrap();
    db.create_file(&sample_file("bbb.png", "u1")).unwrap();
    db.create_short_url(&sample_url("s1", "u1", None)).unwrap();

    let stats = db.wipe_user_records("u1").unwrap();
    assert_eq!(stats.files, 2);
    assert_eq!(stats.urls, 1);

    assert!(db.get_file("aaa.png").unwrap().is_none());
    assert!(db.get_files_by_uploader("u1").unwrap().is_empty());
    assert!(db.get_urls_by_user("u1").unwrap().is_empty());
    assert_eq!(db.get_user("u1").unwrap().unwrap().uploads, 0);
}

#[test]
fn test_wipe_leaves_other_users_alone() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();
    db.put_user(&sample_user("u2")).unwrap();
    db.create_file(&sample_file("aaa.png", "u1")).unwrap();
    db.create_file(&sample_file("bbb.png", "u2")).unwrap();

    db.wipe_user_records("u1").unwrap();

    assert!(db.get_file("bbb.png").unwrap().is_some());
    assert_eq!(db.get_user("u2").unwrap().unwrap().uploads, 1);
}

// ============================================================================
// Invites
// ============================================================================

#[test]
fn test_register_user_consumes_invite_atomically() {
    let (_dir, db) = test_db();
    let invite = Invite {
        code: "welcome".to_string(),
        created_by: "u1".to_string(),
        used_by: None,
        created_at: Utc::now(),
    };
    db.put_invite(&invite).unwrap();

    assert!(db.register_user(&sample_user("u2"), "welcome").unwrap());
    let stored = db.get_invite("welcome").unwrap().unwrap();
    assert_eq!(stored.used_by.as_deref(), Some("u2"));
    assert!(db.get_user("u2").unwrap().is_some());

    // A racing registration loses and writes nothing
    assert!(!db.register_user(&sample_user("u3"), "welcome").unwrap());
    assert!(db.get_user("u3").unwrap().is_none());

    assert!(!db.register_user(&sample_user("u4"), "unknown").unwrap());
    assert!(db.get_user("u4").unwrap().is_none());
}

#[test]
fn test_take_invite_credit() {
    let (_dir, db) = test_db();
    let mut user = sample_user("u1");
    user.invites = 1;
    db.put_user(&user).unwrap();

    assert!(db.take_invite_credit("u1").unwrap());
    assert!(!db.take_invite_credit("u1").unwrap());
    assert_eq!(db.get_user("u1").unwrap().unwrap().invites, 0);
}

// ============================================================================
// Domains
// ============================================================================

#[test]
fn test_domains_and_donations() {
    let (_dir, db) = test_db();
    db.put_domain(&Domain {
        name: "public.example".to_string(),
        wildcard: true,
        user_only: false,
        donated_by: None,
        added_at: Utc::now(),
    })
    .unwrap();
    db.put_domain(&Domain {
        name: "donated.example".to_string(),
        wildcard: false,
        user_only: true,
        donated_by: Some("u1".to_string()),
        added_at: Utc::now(),
    })
    .unwrap();

    assert_eq!(db.get_all_domains().unwrap().len(), 2);

    let donated = db.get_donated_domains("u1").unwrap();
    assert_eq!(donated.len(), 1);
    assert_eq!(donated[0].name, "donated.example");

    assert!(db.get_donated_domains("u2").unwrap().is_empty());

    assert_eq!(
        db.remove_domain("public.example").unwrap(),
        DomainRemoval::Removed
    );
    assert_eq!(
        db.remove_domain("public.example").unwrap(),
        DomainRemoval::NotFound
    );
    assert!(db.get_domain("public.example").unwrap().is_none());
}

#[test]
fn test_remove_domain_refused_while_files_reference_it() {
    let (_dir, db) = test_db();
    db.put_user(&sample_user("u1")).unwrap();
    db.put_domain(&Domain {
        name: "donated.example".to_string(),
        wildcard: false,
        user_only: true,
        donated_by: Some("u1".to_string()),
        added_at: Utc::now(),
    })
    .unwrap();

    let mut file = sample_file("aaa.png", "u1");
    file.domain = "donated.example".to_string();
    db.create_file(&file).unwrap();

    // Removal would strand the stored object under the domain prefix
    assert_eq!(
        db.remove_domain("donated.example").unwrap(),
        DomainRemoval::InUse
    );
    assert!(db.get_domain("donated.example").unwrap().is_some());

    db.remove_file("aaa.png").unwrap().unwrap();
    assert_eq!(
        db.remove_domain("donated.example").unwrap(),
        DomainRemoval::Removed
    );
}

// ============================================================================
// Short URLs
// ============================================================================

#[test]
fn test_short_url_roundtrip_and_indexes() {
    let (_dir, db) = test_db();
    db.create_short_url(&sample_url("s1", "u1", None)).unwrap();

    let url = db.get_short_url("s1").unwrap().expect("url should exist");
    assert_eq!(url.user_id, "u1");

    let by_key = db
        .get_short_url_by_deletion_key("udel-s1")
        .unwrap()
        .expect("deletion key lookup");
    assert_eq!(by_key.short_id, "s1");

    let mine = db.get_urls_by_user("u1").unwrap();
    assert_eq!(mine.len(), 1);

    assert!(db.remove_short_url("s1").unwrap());
    assert!(!db.remove_short_url("s1").unwrap());
    assert!(db.get_urls_by_user("u1").unwrap().is_empty());
}

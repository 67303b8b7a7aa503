use redb::TableDefinition;

/// User records: uuid -> User (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Upload key index: key -> user uuid
pub const USER_KEYS: TableDefinition<&str, &str> = TableDefinition::new("user_keys");

/// Username index: username -> user uuid
pub const USERNAMES: TableDefinition<&str, &str> = TableDefinition::new("usernames");

/// File records: filename -> FileRecord (msgpack)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Deletion key index: deletion_key -> filename
pub const DELETION_KEYS: TableDefinition<&str, &str> = TableDefinition::new("deletion_keys");

/// Uploader index: user uuid -> msgpack Vec of filenames
pub const USER_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("user_files");

/// Domain registry: name -> Domain (msgpack)
pub const DOMAINS: TableDefinition<&str, &[u8]> = TableDefinition::new("domains");

/// Short URL records: short_id -> ShortUrl (msgpack)
pub const SHORT_URLS: TableDefinition<&str, &[u8]> = TableDefinition::new("short_urls");

/// Short URL deletion key index: deletion_key -> short_id
pub const SHORT_DELETION_KEYS: TableDefinition<&str, &str> =
    TableDefinition::new("short_deletion_keys");

/// Creator index: user uuid -> msgpack Vec of short_ids
pub const USER_URLS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_urls");

/// Invite codes: code -> Invite (msgpack)
pub const INVITES: TableDefinition<&str, &[u8]> = TableDefinition::new("invites");

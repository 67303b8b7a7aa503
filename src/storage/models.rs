use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user and their quota state.
///
/// `uploads` is the live upload counter: after any complete operation it
/// equals the number of file records whose uploader is this user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Upload key secret presented in the `key` header.
    pub key: String,
    /// Invite code this user registered with.
    pub invite: String,
    /// Invites the user may still mint.
    pub invites: u32,
    pub invited_by: Option<String>,
    pub admin: bool,
    /// Auto-mod strikes (IP-logger shortening attempts).
    pub strikes: u32,
    pub blacklisted: Blacklist,
    pub uploads: u64,
    pub registered_at: DateTime<Utc>,
    pub settings: UserSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blacklist {
    pub status: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub domain: HomeDomain,
    pub random_domain: RandomDomain,
    pub auto_wipe: AutoWipe,
    pub long_url: bool,
    /// Uploads return an invisible short link instead of the direct file URL.
    #[serde(default)]
    pub invisible_url: bool,
}

/// The domain (and optional subdomain) baked into returned URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeDomain {
    pub name: String,
    pub subdomain: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomDomain {
    pub enabled: bool,
    pub domains: Vec<String>,
}

/// Recurring wipe schedule. Process-local timers are rehydrated from this
/// at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoWipe {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl UserSettings {
    pub fn with_domain(name: &str) -> Self {
        Self {
            domain: HomeDomain {
                name: name.to_string(),
                subdomain: None,
            },
            random_domain: RandomDomain::default(),
            auto_wipe: AutoWipe::default(),
            long_url: false,
            invisible_url: false,
        }
    }
}

/// One entry per stored object.
///
/// `filename` is the key leaf; the full storage key depends on the domain's
/// namespace (see `StorageAccounting`). Ownership is always attributed to
/// `uploader_id`, even for objects stored under a donated domain's prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub original_name: Option<String>,
    pub mime_type: String,
    /// Storage namespace the object was written under.
    pub domain: String,
    /// Capability secret enabling unauthenticated deletion.
    pub deletion_key: String,
    pub uploader_id: String,
    pub created_at: DateTime<Utc>,
}

/// A named storage namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub wildcard: bool,
    /// Exclusively associated with the donating user; objects live under
    /// `{name}/` rather than the uploader's id prefix.
    pub user_only: bool,
    pub donated_by: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// A shortened URL, cascade-deleted when its creator is wiped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortUrl {
    pub short_id: String,
    pub destination: String,
    /// Set when the destination is a hosted file (invisible URL); such
    /// records are cascade-deleted with the file.
    pub filename: Option<String>,
    pub deletion_key: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub code: String,
    pub created_by: String,
    pub used_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

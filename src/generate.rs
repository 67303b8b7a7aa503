//! Random identifiers and capability tokens.

use uuid::Uuid;

/// Random lowercase hex string of the requested length.
fn hex(len: usize) -> String {
    let mut out = String::with_capacity(len + 32);
    while out.len() < len {
        out.push_str(&Uuid::new_v4().simple().to_string());
    }
    out.truncate(len);
    out
}

/// Storage key leaf for an uploaded file (extension appended separately).
pub fn file_name() -> String {
    hex(10)
}

/// Capability secret enabling unauthenticated deletion.
pub fn deletion_key() -> String {
    hex(40)
}

/// Upload key issued at registration, presented in the `key` header.
pub fn upload_key() -> String {
    hex(32)
}

pub fn invite_code() -> String {
    hex(16)
}

/// Short URL token; long ids make destinations unguessable.
pub fn short_id(long_url: bool) -> String {
    hex(if long_url { 17 } else { 7 })
}

/// Uniform-enough random pick for the random-domain pool.
pub fn pick<T>(items: &[T]) -> Option<&T> {
    if items.is_empty() {
        return None;
    }
    let n = u128::from_le_bytes(*Uuid::new_v4().as_bytes());
    items.get((n % items.len() as u128) as usize)
}

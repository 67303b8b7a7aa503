mod admin;
mod auth;
mod domains;
mod files;
mod shortener;
mod users;

pub use admin::{admin_delete_file, blacklist_user, health};
pub use auth::{create_invite, register};
pub use domains::{create_domain, list_domains, remove_domain};
pub use files::{delete_by_key, delete_own_file, upload_file, wipe_files};
pub use shortener::{delete_short_url, shorten};
pub use users::{get_me, list_my_files, update_wipe_settings};

use crate::accounting::AccountingError;
use crate::api::response::ApiError;

/// Map an AccountingError to an ApiError
fn accounting_error(e: AccountingError) -> ApiError {
    match e {
        AccountingError::NotFound => ApiError::not_found("File not found."),
        AccountingError::Backend(cause) => ApiError::unavailable(cause),
        AccountingError::Database(e) => ApiError::internal(e.to_string()),
    }
}
